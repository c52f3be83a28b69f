//! ZooKeeper-backed [`Coordinator`]

use crate::client::{Connector, Coordinator, NodeStat, Reconnecting};
use crate::error::ClientError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;
use zookeeper_client as zk;

/// A ZooKeeper session that reconnects after expiry
pub type ZooKeeperCoordinator = Reconnecting<ZooKeeperConnector>;

impl ZooKeeperCoordinator {
    /// Open a session against `connect` (`host:port[,host:port...]`)
    #[instrument(skip(session_timeout))]
    pub async fn connect(connect: &str, session_timeout: Duration) -> Result<Self, ClientError> {
        Reconnecting::open(ZooKeeperConnector {
            connect: connect.to_string(),
            session_timeout,
        })
        .await
    }
}

/// Opens sessions on one ZooKeeper ensemble
pub struct ZooKeeperConnector {
    connect: String,
    session_timeout: Duration,
}

#[async_trait]
impl Connector for ZooKeeperConnector {
    type Session = ZooKeeperSession;

    async fn open(&self) -> Result<ZooKeeperSession, ClientError> {
        let client = zk::Client::connector()
            .session_timeout(self.session_timeout)
            .connect(&self.connect)
            .await
            .map_err(|e| ClientError::Connect {
                connect: self.connect.clone(),
                reason: e.to_string(),
            })?;
        Ok(ZooKeeperSession { client })
    }

    fn describe(&self) -> String {
        format!("zookeeper://{}", self.connect)
    }
}

/// One live session. The client multiplexes requests over a single
/// connection, so read workers share it.
pub struct ZooKeeperSession {
    client: zk::Client,
}

fn map_error(err: zk::Error, path: &str) -> ClientError {
    match err {
        zk::Error::NoNode => ClientError::NoNode(path.to_string()),
        zk::Error::NodeExists => ClientError::NodeExists(path.to_string()),
        zk::Error::NotEmpty => ClientError::NotEmpty(path.to_string()),
        zk::Error::BadVersion => ClientError::BadVersion(path.to_string()),
        zk::Error::ConnectionLoss => ClientError::ConnectionLoss,
        zk::Error::SessionExpired => ClientError::SessionExpired,
        other => ClientError::Other(format!("{}: {}", path, other)),
    }
}

fn to_stat(stat: &zk::Stat) -> NodeStat {
    NodeStat {
        version: stat.version,
        ephemeral: stat.ephemeral_owner != 0,
    }
}

#[async_trait]
impl Coordinator for ZooKeeperSession {
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, ClientError> {
        self.client
            .check_stat(path)
            .await
            .map(|stat| stat.as_ref().map(to_stat))
            .map_err(|e| map_error(e, path))
    }

    async fn get_data(&self, path: &str) -> Result<(Option<Vec<u8>>, NodeStat), ClientError> {
        self.client
            .get_data(path)
            .await
            .map(|(data, stat)| (Some(data), to_stat(&stat)))
            .map_err(|e| map_error(e, path))
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        self.client
            .get_children(path)
            .await
            .map(|(children, _)| children)
            .map_err(|e| map_error(e, path))
    }

    async fn create(&self, path: &str, payload: Option<&[u8]>) -> Result<(), ClientError> {
        let options = zk::CreateMode::Persistent.with_acls(zk::Acls::anyone_all());
        self.client
            .create(path, payload.unwrap_or(&[]), &options)
            .await
            .map(|_| ())
            .map_err(|e| map_error(e, path))
    }

    async fn set_data(
        &self,
        path: &str,
        payload: Option<&[u8]>,
        expected_version: Option<i32>,
    ) -> Result<NodeStat, ClientError> {
        self.client
            .set_data(path, payload.unwrap_or(&[]), expected_version)
            .await
            .map(|stat| to_stat(&stat))
            .map_err(|e| map_error(e, path))
    }

    async fn delete(&self, path: &str, expected_version: Option<i32>) -> Result<(), ClientError> {
        self.client
            .delete(path, expected_version)
            .await
            .map_err(|e| map_error(e, path))
    }

    fn describe(&self) -> String {
        "zookeeper session".to_string()
    }
}
