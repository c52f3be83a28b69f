//! Session recovery
//!
//! [`Reconnecting`] wraps the sessions produced by a [`Connector`] and
//! replaces the current one when a call reports that it expired. Callers keep
//! their retry loop; the next attempt runs on the fresh session.
//!
//! Each session carries a generation number. A caller that saw an expiry on
//! generation `g` only reconnects if the current session is still `g`, so a
//! burst of concurrent failures on one dead session opens one replacement.

use crate::client::{Coordinator, NodeStat};
use crate::error::ClientError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Opens new sessions against one cluster
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Coordinator + 'static;

    async fn open(&self) -> Result<Self::Session, ClientError>;

    /// Human-readable description of the cluster, for logs
    fn describe(&self) -> String;
}

struct Current<S> {
    generation: u64,
    session: Arc<S>,
}

/// A [`Coordinator`] that survives session expiry by reconnecting
pub struct Reconnecting<C: Connector> {
    connector: C,
    current: RwLock<Current<C::Session>>,
}

impl<C: Connector> Reconnecting<C> {
    /// Open the first session
    pub async fn open(connector: C) -> Result<Self, ClientError> {
        let session = connector.open().await?;
        info!(cluster = %connector.describe(), "Session established");
        Ok(Self {
            connector,
            current: RwLock::new(Current {
                generation: 0,
                session: Arc::new(session),
            }),
        })
    }

    /// Number of times the session has been replaced
    pub async fn generation(&self) -> u64 {
        self.current.read().await.generation
    }

    async fn session(&self) -> (u64, Arc<C::Session>) {
        let current = self.current.read().await;
        (current.generation, Arc::clone(&current.session))
    }

    async fn recover(&self, generation: u64) {
        let mut current = self.current.write().await;
        if current.generation != generation {
            // Already replaced by a concurrent caller
            return;
        }
        match self.connector.open().await {
            Ok(session) => {
                current.session = Arc::new(session);
                current.generation += 1;
                warn!(
                    cluster = %self.connector.describe(),
                    generation = current.generation,
                    "Session expired, reconnected"
                );
            }
            Err(e) => warn!(
                cluster = %self.connector.describe(),
                error = %e,
                "Session recovery failed"
            ),
        }
    }

    async fn finish<T>(
        &self,
        generation: u64,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        if let Err(ClientError::SessionExpired) = &result {
            self.recover(generation).await;
        }
        result
    }
}

#[async_trait]
impl<C: Connector> Coordinator for Reconnecting<C> {
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, ClientError> {
        let (generation, session) = self.session().await;
        let result = session.exists(path).await;
        self.finish(generation, result).await
    }

    async fn get_data(&self, path: &str) -> Result<(Option<Vec<u8>>, NodeStat), ClientError> {
        let (generation, session) = self.session().await;
        let result = session.get_data(path).await;
        self.finish(generation, result).await
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        let (generation, session) = self.session().await;
        let result = session.get_children(path).await;
        self.finish(generation, result).await
    }

    async fn create(&self, path: &str, payload: Option<&[u8]>) -> Result<(), ClientError> {
        let (generation, session) = self.session().await;
        let result = session.create(path, payload).await;
        self.finish(generation, result).await
    }

    async fn set_data(
        &self,
        path: &str,
        payload: Option<&[u8]>,
        expected_version: Option<i32>,
    ) -> Result<NodeStat, ClientError> {
        let (generation, session) = self.session().await;
        let result = session.set_data(path, payload, expected_version).await;
        self.finish(generation, result).await
    }

    async fn delete(&self, path: &str, expected_version: Option<i32>) -> Result<(), ClientError> {
        let (generation, session) = self.session().await;
        let result = session.delete(path, expected_version).await;
        self.finish(generation, result).await
    }

    fn describe(&self) -> String {
        self.connector.describe()
    }
}
