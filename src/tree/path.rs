//! Node path helpers
//!
//! Paths are absolute, slash-separated, and never carry a trailing slash
//! except for the namespace root `/`.

/// Namespace the coordination service reserves for its own bookkeeping.
pub const RESERVED_ROOT: &str = "/zookeeper";

/// Normalize a path string: strip trailing slashes, keeping the bare root.
pub fn normalize_path_string(path: &str) -> String {
    let mut result = path.to_string();
    if result.len() > 1 {
        while result.len() > 1 && result.ends_with('/') {
            result.pop();
        }
    }
    if result.is_empty() {
        result.push('/');
    }
    result
}

/// Check that a normalized path is absolute and has no empty components.
pub fn validate_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("path must start with '/': {}", path));
    }
    if path == "/" {
        return Ok(());
    }
    if path[1..].split('/').any(|component| component.is_empty()) {
        return Err(format!("path contains an empty component: {}", path));
    }
    Ok(())
}

/// Join a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Last component of a path; empty for the root.
pub fn name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Proper ancestors of a path, outermost first, excluding `/`.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if components.len() < 2 {
        return result;
    }
    for component in &components[..components.len() - 1] {
        current.push('/');
        current.push_str(component);
        result.push(current.clone());
    }
    result
}

/// Map a path under `from_root` onto the same relative location under `to_root`.
///
/// Returns `None` when `path` is not inside `from_root`.
pub fn rebase(path: &str, from_root: &str, to_root: &str) -> Option<String> {
    if path == from_root {
        return Some(to_root.to_string());
    }
    let relative = if from_root == "/" {
        path.strip_prefix('/')?
    } else {
        path.strip_prefix(from_root)?.strip_prefix('/')?
    };
    Some(join(to_root, relative))
}

/// Whether a path lies inside the service's reserved namespace.
pub fn is_reserved(path: &str) -> bool {
    path == RESERVED_ROOT
        || path
            .strip_prefix(RESERVED_ROOT)
            .is_some_and(|rest| rest.starts_with('/'))
}
