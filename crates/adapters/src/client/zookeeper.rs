// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ZooKeeper-backed coordination client

use super::{
    Acl, ClientError, CoordinationClient, CreateMode, SessionState, Stat, Watch, WatchEvent,
};
use async_trait::async_trait;
use tokio::sync::watch;
use zkl_core::config::ClientConfig;
use zookeeper_client as zk;

/// Client for a ZooKeeper ensemble
#[derive(Clone)]
pub struct ZooKeeperClient {
    client: zk::Client,
    state_rx: watch::Receiver<SessionState>,
}

impl ZooKeeperClient {
    /// Connect to the ensemble named by `config.hosts`
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let connect = async {
            let mut connector = zk::Client::connector();
            connector.session_timeout(config.session_timeout);
            connector.connect(&config.hosts).await
        };
        let client = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| ClientError::OperationTimeout)?
            .map_err(convert_error)?;

        tracing::info!(hosts = %config.hosts, "connected to zookeeper");

        let (state_tx, state_rx) = watch::channel(SessionState::Connected);
        let mut states = client.state_watcher();
        tokio::spawn(async move {
            loop {
                let state = convert_state(states.changed().await);
                tracing::debug!(%state, "session state changed");
                state_tx.send_replace(state);
                if state.is_terminal() {
                    break;
                }
            }
        });

        Ok(Self { client, state_rx })
    }
}

fn convert_error(err: zk::Error) -> ClientError {
    match err {
        zk::Error::NoNode => ClientError::NoNode(String::new()),
        zk::Error::NodeExists => ClientError::NodeExists(String::new()),
        zk::Error::BadVersion => ClientError::BadVersion(String::new()),
        zk::Error::NotEmpty => ClientError::NotEmpty(String::new()),
        zk::Error::ConnectionLoss => ClientError::ConnectionLoss,
        zk::Error::OperationTimeout => ClientError::OperationTimeout,
        zk::Error::SessionExpired => ClientError::SessionExpired,
        zk::Error::AuthFailed => ClientError::AuthFailed,
        zk::Error::ClientClosed => ClientError::Closed,
        other => ClientError::Other(other.to_string()),
    }
}

/// Attach the path to errors that name a node
fn with_path(path: &str) -> impl Fn(zk::Error) -> ClientError + '_ {
    move |err| match convert_error(err) {
        ClientError::NoNode(_) => ClientError::NoNode(path.to_string()),
        ClientError::NodeExists(_) => ClientError::NodeExists(path.to_string()),
        ClientError::BadVersion(_) => ClientError::BadVersion(path.to_string()),
        ClientError::NotEmpty(_) => ClientError::NotEmpty(path.to_string()),
        other => other,
    }
}

fn convert_state(state: zk::SessionState) -> SessionState {
    match state {
        zk::SessionState::SyncConnected | zk::SessionState::ConnectedReadOnly => {
            SessionState::Connected
        }
        zk::SessionState::Expired => SessionState::Expired,
        zk::SessionState::AuthFailed => SessionState::AuthFailed,
        zk::SessionState::Closed => SessionState::Closed,
        // Disconnected: the client library reconnects on its own
        _ => SessionState::Connecting,
    }
}

fn convert_stat(stat: &zk::Stat) -> Stat {
    Stat {
        version: stat.version,
        ctime: stat.ctime,
        mtime: stat.mtime,
        ephemeral_owner: stat.ephemeral_owner,
        num_children: stat.num_children,
    }
}

fn convert_mode(mode: CreateMode) -> zk::CreateMode {
    match mode {
        CreateMode::Persistent => zk::CreateMode::Persistent,
        CreateMode::Ephemeral => zk::CreateMode::Ephemeral,
        CreateMode::PersistentSequential => zk::CreateMode::PersistentSequential,
        CreateMode::EphemeralSequential => zk::CreateMode::EphemeralSequential,
    }
}

/// Forward a oneshot watcher into a [`Watch`]
fn forward(watcher: zk::OneshotWatcher) -> Watch {
    let (trigger, watch) = Watch::channel();
    tokio::spawn(async move {
        let event = watcher.changed().await;
        let converted = match event.event_type {
            zk::EventType::NodeCreated => WatchEvent::NodeCreated,
            zk::EventType::NodeDataChanged => WatchEvent::NodeDataChanged,
            zk::EventType::NodeDeleted => WatchEvent::NodeDeleted,
            zk::EventType::NodeChildrenChanged => WatchEvent::NodeChildrenChanged,
            _ => WatchEvent::Session(convert_state(event.session_state)),
        };
        trigger.fire(converted);
    });
    watch
}

#[async_trait]
impl CoordinationClient for ZooKeeperClient {
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[Acl],
        mode: CreateMode,
    ) -> Result<String, ClientError> {
        if acl.iter().any(|entry| entry.scheme != "world") {
            tracing::warn!(path, "only world ACLs are supported, creating with open ACL");
        }
        let options = convert_mode(mode).with_acls(zk::Acls::anyone_all());
        let (_, sequence) = self
            .client
            .create(path, data, &options)
            .await
            .map_err(with_path(path))?;

        if mode.is_sequential() {
            Ok(format!("{}{}", path, sequence))
        } else {
            Ok(path.to_string())
        }
    }

    async fn delete(&self, path: &str, version: Option<i32>) -> Result<(), ClientError> {
        self.client
            .delete(path, version)
            .await
            .map_err(with_path(path))
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError> {
        let (data, stat) = self.client.get_data(path).await.map_err(with_path(path))?;
        Ok((data, convert_stat(&stat)))
    }

    async fn get_and_watch(&self, path: &str) -> Result<(Vec<u8>, Stat, Watch), ClientError> {
        let (data, stat, watcher) = self
            .client
            .get_and_watch_data(path)
            .await
            .map_err(with_path(path))?;
        Ok((data, convert_stat(&stat), forward(watcher)))
    }

    async fn set(
        &self,
        path: &str,
        data: &[u8],
        version: Option<i32>,
    ) -> Result<Stat, ClientError> {
        let stat = self
            .client
            .set_data(path, data, version)
            .await
            .map_err(with_path(path))?;
        Ok(convert_stat(&stat))
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>, ClientError> {
        let stat = self.client.check_stat(path).await.map_err(with_path(path))?;
        Ok(stat.as_ref().map(convert_stat))
    }

    async fn exists_and_watch(&self, path: &str) -> Result<(Option<Stat>, Watch), ClientError> {
        let (stat, watcher) = self
            .client
            .check_and_watch_stat(path)
            .await
            .map_err(with_path(path))?;
        Ok((stat.as_ref().map(convert_stat), forward(watcher)))
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        self.client
            .list_children(path)
            .await
            .map_err(with_path(path))
    }

    fn session_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }
}
