//! In-process coordination service
//!
//! Implements the [`Coordinator`] contract over a shared map so the engine can
//! be exercised without a live cluster. Supports node versions, ephemeral
//! owners, fault injection, artificial latency, and mutation counters.

use crate::client::{Connector, Coordinator, NodeStat};
use crate::error::ClientError;
use crate::tree::path;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Owner id used for ephemeral nodes seeded without a session
const SEED_OWNER: i64 = i64::MAX;

#[derive(Debug, Clone)]
struct MemNode {
    data: Option<Vec<u8>>,
    version: i32,
    ephemeral_owner: i64,
}

impl MemNode {
    fn stat(&self) -> NodeStat {
        NodeStat {
            version: self.version,
            ephemeral: self.ephemeral_owner != 0,
        }
    }
}

/// Mutations applied through client sessions (seeding is not counted)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationCounts {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl MutationCounts {
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.deletes
    }
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, MemNode>,
    next_session: i64,
    expired: HashSet<i64>,
    latency: Option<Duration>,
    fail_after: Option<usize>,
    expire_after: Option<usize>,
    failing_paths: HashMap<String, ClientError>,
    mutations: MutationCounts,
    calls: usize,
}

impl State {
    fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            MemNode {
                data: None,
                version: 0,
                ephemeral_owner: 0,
            },
        );
        Self {
            nodes,
            next_session: 1,
            ..Self::default()
        }
    }

    fn check_fault(&mut self, session_id: i64, path: &str) -> Result<(), ClientError> {
        self.calls += 1;
        if self.expire_after == Some(0) {
            self.expire_after = None;
            for id in 1..self.next_session {
                self.expire(id);
            }
        } else if let Some(remaining) = self.expire_after.as_mut() {
            *remaining -= 1;
        }
        if self.expired.contains(&session_id) {
            return Err(ClientError::SessionExpired);
        }
        if let Some(err) = self.failing_paths.get(path) {
            return Err(err.clone());
        }
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(ClientError::ConnectionLoss);
            }
            *remaining -= 1;
        }
        Ok(())
    }

    fn child_names(&self, parent: &str) -> Vec<String> {
        let prefix = if parent == "/" {
            "/".to_string()
        } else {
            format!("{}/", parent)
        };
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect()
    }

    fn stat_of(&self, path: &str) -> Option<NodeStat> {
        self.nodes.get(path).map(MemNode::stat)
    }

    /// Mark a session dead and drop the ephemeral nodes it owns
    fn expire(&mut self, session_id: i64) {
        self.expired.insert(session_id);
        self.nodes
            .retain(|_, node| node.ephemeral_owner != session_id);
    }

    fn parent_of(path: &str) -> String {
        match path.rfind('/') {
            Some(0) | None => "/".to_string(),
            Some(idx) => path[..idx].to_string(),
        }
    }
}

struct Shared {
    state: Mutex<State>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements the in-flight counter when a call finishes
struct InFlight<'a> {
    shared: &'a Shared,
}

impl<'a> InFlight<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let current = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.max_in_flight.fetch_max(current, Ordering::SeqCst);
        Self { shared }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A shared in-memory namespace; clone to share between sessions
#[derive(Clone)]
pub struct MemoryEnsemble {
    shared: Arc<Shared>,
}

impl Default for MemoryEnsemble {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEnsemble {
    /// Create an ensemble holding only the namespace root
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Open a new client session
    pub fn session(&self) -> MemorySession {
        let mut state = self.shared.state.lock();
        let session_id = state.next_session;
        state.next_session += 1;
        MemorySession {
            ensemble: self.clone(),
            session_id,
        }
    }

    /// Seed a persistent node, creating missing ancestors with no payload
    pub fn insert(&self, node_path: &str, payload: Option<&[u8]>) {
        self.seed(node_path, payload, 0);
    }

    /// Seed an ephemeral node owned by no live session
    pub fn insert_ephemeral(&self, node_path: &str, payload: Option<&[u8]>) {
        self.seed(node_path, payload, SEED_OWNER);
    }

    fn seed(&self, node_path: &str, payload: Option<&[u8]>, owner: i64) {
        let mut state = self.shared.state.lock();
        for ancestor in path::ancestors(node_path) {
            state.nodes.entry(ancestor).or_insert(MemNode {
                data: None,
                version: 0,
                ephemeral_owner: 0,
            });
        }
        let version = state
            .nodes
            .get(node_path)
            .map(|node| node.version + 1)
            .unwrap_or(0);
        state.nodes.insert(
            node_path.to_string(),
            MemNode {
                data: payload.map(<[u8]>::to_vec),
                version,
                ephemeral_owner: owner,
            },
        );
    }

    /// Remove a node and its descendants without going through a session
    pub fn remove(&self, node_path: &str) {
        let mut state = self.shared.state.lock();
        let prefix = format!("{}/", node_path);
        state
            .nodes
            .retain(|key, _| key != node_path && !key.starts_with(&prefix));
    }

    pub fn contains(&self, node_path: &str) -> bool {
        self.shared.state.lock().nodes.contains_key(node_path)
    }

    /// Payload of a node; outer `None` when the node does not exist
    pub fn payload(&self, node_path: &str) -> Option<Option<Vec<u8>>> {
        self.shared
            .state
            .lock()
            .nodes
            .get(node_path)
            .map(|node| node.data.clone())
    }

    pub fn version(&self, node_path: &str) -> Option<i32> {
        self.shared
            .state
            .lock()
            .nodes
            .get(node_path)
            .map(|node| node.version)
    }

    pub fn is_ephemeral(&self, node_path: &str) -> bool {
        self.shared
            .state
            .lock()
            .nodes
            .get(node_path)
            .is_some_and(|node| node.ephemeral_owner != 0)
    }

    /// All paths at or below `root`, sorted
    pub fn paths_under(&self, root: &str) -> Vec<String> {
        let prefix = if root == "/" {
            "/".to_string()
        } else {
            format!("{}/", root)
        };
        self.shared
            .state
            .lock()
            .nodes
            .keys()
            .filter(|key| key.as_str() == root || key.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// End a session, removing the ephemeral nodes it owns. Later calls
    /// through that session fail with [`ClientError::SessionExpired`].
    pub fn expire_session(&self, session_id: i64) {
        self.shared.state.lock().expire(session_id);
    }

    /// Expire every session opened so far once `calls` more calls were made
    pub fn expire_after(&self, calls: usize) {
        self.shared.state.lock().expire_after = Some(calls);
    }

    /// Number of sessions opened against this ensemble
    pub fn sessions_opened(&self) -> usize {
        (self.shared.state.lock().next_session - 1) as usize
    }

    /// Fail every call with a connection loss once `calls` more have succeeded
    pub fn fail_after(&self, calls: usize) {
        self.shared.state.lock().fail_after = Some(calls);
    }

    /// Fail every call touching `node_path` with a connection loss
    pub fn fail_path(&self, node_path: &str) {
        self.fail_path_with(node_path, ClientError::ConnectionLoss);
    }

    /// Fail every call touching `node_path` with `error`
    pub fn fail_path_with(&self, node_path: &str, error: ClientError) {
        self.shared
            .state
            .lock()
            .failing_paths
            .insert(node_path.to_string(), error);
    }

    pub fn clear_faults(&self) {
        let mut state = self.shared.state.lock();
        state.fail_after = None;
        state.expire_after = None;
        state.failing_paths.clear();
    }

    /// Delay every call, to force interleaving between concurrent callers
    pub fn set_latency(&self, latency: Duration) {
        self.shared.state.lock().latency = Some(latency);
    }

    pub fn mutations(&self) -> MutationCounts {
        self.shared.state.lock().mutations
    }

    pub fn reset_mutations(&self) {
        self.shared.state.lock().mutations = MutationCounts::default();
    }

    /// Number of calls made through all sessions
    pub fn calls(&self) -> usize {
        self.shared.state.lock().calls
    }

    /// Highest number of calls observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }

    async fn begin_call(
        &self,
        session_id: i64,
        node_path: &str,
    ) -> Result<InFlight<'_>, ClientError> {
        let guard = InFlight::enter(&self.shared);
        let latency = self.shared.state.lock().latency;
        match latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
        self.shared
            .state
            .lock()
            .check_fault(session_id, node_path)?;
        Ok(guard)
    }
}

#[async_trait]
impl Connector for MemoryEnsemble {
    type Session = MemorySession;

    async fn open(&self) -> Result<MemorySession, ClientError> {
        Ok(self.session())
    }

    fn describe(&self) -> String {
        "memory://ensemble".to_string()
    }
}

/// A client session on a [`MemoryEnsemble`]
#[derive(Clone)]
pub struct MemorySession {
    ensemble: MemoryEnsemble,
    session_id: i64,
}

impl MemorySession {
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn ensemble(&self) -> &MemoryEnsemble {
        &self.ensemble
    }

    /// Create an ephemeral node owned by this session
    pub async fn create_ephemeral(
        &self,
        node_path: &str,
        payload: Option<&[u8]>,
    ) -> Result<(), ClientError> {
        self.create_node(node_path, payload, self.session_id).await
    }

    async fn create_node(
        &self,
        node_path: &str,
        payload: Option<&[u8]>,
        owner: i64,
    ) -> Result<(), ClientError> {
        let _call = self.ensemble.begin_call(self.session_id, node_path).await?;
        let mut state = self.ensemble.shared.state.lock();
        if state.nodes.contains_key(node_path) {
            return Err(ClientError::NodeExists(node_path.to_string()));
        }
        let parent = State::parent_of(node_path);
        match state.nodes.get(&parent) {
            None => return Err(ClientError::NoNode(node_path.to_string())),
            Some(node) if node.ephemeral_owner != 0 => {
                return Err(ClientError::Other(format!(
                    "ephemeral node {} cannot have children",
                    parent
                )))
            }
            Some(_) => {}
        }
        state.nodes.insert(
            node_path.to_string(),
            MemNode {
                data: payload.map(<[u8]>::to_vec),
                version: 0,
                ephemeral_owner: owner,
            },
        );
        state.mutations.creates += 1;
        Ok(())
    }
}

#[async_trait]
impl Coordinator for MemorySession {
    async fn exists(&self, node_path: &str) -> Result<Option<NodeStat>, ClientError> {
        let _call = self.ensemble.begin_call(self.session_id, node_path).await?;
        Ok(self.ensemble.shared.state.lock().stat_of(node_path))
    }

    async fn get_data(&self, node_path: &str) -> Result<(Option<Vec<u8>>, NodeStat), ClientError> {
        let _call = self.ensemble.begin_call(self.session_id, node_path).await?;
        let state = self.ensemble.shared.state.lock();
        let node = state
            .nodes
            .get(node_path)
            .ok_or_else(|| ClientError::NoNode(node_path.to_string()))?;
        Ok((node.data.clone(), node.stat()))
    }

    async fn get_children(&self, node_path: &str) -> Result<Vec<String>, ClientError> {
        let _call = self.ensemble.begin_call(self.session_id, node_path).await?;
        let state = self.ensemble.shared.state.lock();
        if !state.nodes.contains_key(node_path) {
            return Err(ClientError::NoNode(node_path.to_string()));
        }
        Ok(state.child_names(node_path))
    }

    async fn create(&self, node_path: &str, payload: Option<&[u8]>) -> Result<(), ClientError> {
        self.create_node(node_path, payload, 0).await
    }

    async fn set_data(
        &self,
        node_path: &str,
        payload: Option<&[u8]>,
        expected_version: Option<i32>,
    ) -> Result<NodeStat, ClientError> {
        let _call = self.ensemble.begin_call(self.session_id, node_path).await?;
        let mut state = self.ensemble.shared.state.lock();
        let node = state
            .nodes
            .get_mut(node_path)
            .ok_or_else(|| ClientError::NoNode(node_path.to_string()))?;
        if expected_version.is_some_and(|version| version != node.version) {
            return Err(ClientError::BadVersion(node_path.to_string()));
        }
        node.data = payload.map(<[u8]>::to_vec);
        node.version += 1;
        state.mutations.updates += 1;
        state
            .stat_of(node_path)
            .ok_or_else(|| ClientError::NoNode(node_path.to_string()))
    }

    async fn delete(&self, node_path: &str, expected_version: Option<i32>) -> Result<(), ClientError> {
        let _call = self.ensemble.begin_call(self.session_id, node_path).await?;
        if node_path == "/" {
            return Err(ClientError::Other("the namespace root cannot be deleted".to_string()));
        }
        let mut state = self.ensemble.shared.state.lock();
        let version = state
            .nodes
            .get(node_path)
            .map(|node| node.version)
            .ok_or_else(|| ClientError::NoNode(node_path.to_string()))?;
        if expected_version.is_some_and(|expected| expected != version) {
            return Err(ClientError::BadVersion(node_path.to_string()));
        }
        if !state.child_names(node_path).is_empty() {
            return Err(ClientError::NotEmpty(node_path.to_string()));
        }
        state.nodes.remove(node_path);
        state.mutations.deletes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory://session-{}", self.session_id)
    }
}
