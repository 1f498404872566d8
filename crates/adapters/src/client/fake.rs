// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory coordination service for testing
#![cfg_attr(coverage_nightly, coverage(off))]
//!
//! Models the parts of a ZooKeeper ensemble the lock protocol relies on: a
//! node tree, per-parent sequence counters, ephemeral ownership, one-shot
//! watches, and sessions that can be disconnected, reconnected, or expired.
//! Faults can be queued per session to simulate lost requests and lost
//! acknowledgements.

use super::{
    Acl, ClientError, CoordinationClient, CreateMode, SessionState, Stat, Watch, WatchEvent,
    WatchTrigger,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use zkl_core::node::{split_path, validate_path, SEQUENCE_WIDTH};

/// Recorded client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Create { path: String, mode: CreateMode },
    Delete { path: String },
    Get { path: String, watch: bool },
    Set { path: String, data: Vec<u8> },
    Exists { path: String, watch: bool },
    GetChildren { path: String },
}

impl ClientCall {
    pub fn path(&self) -> &str {
        match self {
            ClientCall::Create { path, .. }
            | ClientCall::Delete { path }
            | ClientCall::Get { path, .. }
            | ClientCall::Set { path, .. }
            | ClientCall::Exists { path, .. }
            | ClientCall::GetChildren { path } => path,
        }
    }
}

/// Fault applied to the next call of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail without applying the call
    Fail(ClientError),
    /// Apply the call, then report connection loss
    LoseReply,
}

#[derive(Debug)]
struct FakeNode {
    data: Vec<u8>,
    stat: Stat,
    owner: Option<i64>,
    next_sequence: u64,
}

impl FakeNode {
    fn new(data: &[u8], owner: Option<i64>, now: i64) -> Self {
        Self {
            data: data.to_vec(),
            stat: Stat {
                version: 0,
                ctime: now,
                mtime: now,
                ephemeral_owner: owner.unwrap_or(0),
                num_children: 0,
            },
            owner,
            next_sequence: 0,
        }
    }
}

struct SessionEntry {
    state: watch::Sender<SessionState>,
    faults: VecDeque<Fault>,
}

struct PendingWatch {
    session: i64,
    trigger: WatchTrigger,
}

struct ServiceState {
    nodes: BTreeMap<String, FakeNode>,
    sessions: HashMap<i64, SessionEntry>,
    next_session: i64,
    watches: HashMap<String, Vec<PendingWatch>>,
    calls: Vec<(i64, ClientCall)>,
}

impl Default for ServiceState {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), FakeNode::new(b"", None, now_ms()));
        Self {
            nodes,
            sessions: HashMap::new(),
            next_session: 1,
            watches: HashMap::new(),
            calls: Vec::new(),
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn child_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path)
    }
}

impl ServiceState {
    fn session_state(&self, session: i64) -> SessionState {
        self.sessions
            .get(&session)
            .map(|entry| *entry.state.borrow())
            .unwrap_or(SessionState::Closed)
    }

    /// Record a call, check the session, and apply any queued fault.
    /// Returns whether the reply must be dropped after applying the call.
    fn begin(&mut self, session: i64, call: ClientCall) -> Result<bool, ClientError> {
        self.calls.push((session, call));

        match self.session_state(session) {
            SessionState::Connected => {}
            SessionState::Connecting | SessionState::Disconnected => {
                return Err(ClientError::ConnectionLoss)
            }
            SessionState::Expired => return Err(ClientError::SessionExpired),
            SessionState::AuthFailed => return Err(ClientError::AuthFailed),
            SessionState::Closed => return Err(ClientError::Closed),
        }

        let fault = self
            .sessions
            .get_mut(&session)
            .and_then(|entry| entry.faults.pop_front());
        match fault {
            Some(Fault::Fail(err)) => Err(err),
            Some(Fault::LoseReply) => Ok(true),
            None => Ok(false),
        }
    }

    fn fire(&mut self, path: &str, event: WatchEvent) {
        if let Some(pending) = self.watches.remove(path) {
            for watch in pending {
                watch.trigger.fire(event);
            }
        }
    }

    fn add_watch(&mut self, session: i64, path: &str) -> Watch {
        let (trigger, watch) = Watch::channel();
        self.watches
            .entry(path.to_string())
            .or_default()
            .push(PendingWatch { session, trigger });
        watch
    }

    fn children(&self, path: &str) -> Vec<String> {
        let prefix = child_prefix(path);
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect()
    }

    fn create(
        &mut self,
        session: i64,
        path: &str,
        data: &[u8],
        mode: CreateMode,
    ) -> Result<String, ClientError> {
        // Sequential requests name a prefix; the suffix completes the path
        let base = if mode.is_sequential() {
            format!("{}0", path)
        } else {
            path.to_string()
        };
        validate_path(&base).map_err(|_| ClientError::InvalidPath(path.to_string()))?;
        let (parent, _) =
            split_path(&base).ok_or_else(|| ClientError::InvalidPath(path.to_string()))?;
        let parent = parent.to_string();

        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| ClientError::NoNode(parent.clone()))?;
        if parent_node.owner.is_some() {
            return Err(ClientError::Other(format!(
                "ephemeral node cannot have children: {}",
                parent
            )));
        }

        let actual = if mode.is_sequential() {
            let sequence = parent_node.next_sequence;
            parent_node.next_sequence += 1;
            format!("{}{:0width$}", path, sequence, width = SEQUENCE_WIDTH)
        } else {
            path.to_string()
        };

        if self.nodes.contains_key(&actual) {
            return Err(ClientError::NodeExists(actual));
        }

        let owner = mode.is_ephemeral().then_some(session);
        self.nodes
            .insert(actual.clone(), FakeNode::new(data, owner, now_ms()));
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.stat.num_children += 1;
        }
        self.fire(&actual, WatchEvent::NodeCreated);
        Ok(actual)
    }

    fn remove(&mut self, path: &str) {
        if self.nodes.remove(path).is_some() {
            if let Some((parent, _)) = split_path(path) {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.stat.num_children -= 1;
                }
            }
            self.fire(path, WatchEvent::NodeDeleted);
        }
    }

    fn delete(&mut self, path: &str, version: Option<i32>) -> Result<(), ClientError> {
        let node = self
            .nodes
            .get(path)
            .ok_or_else(|| ClientError::NoNode(path.to_string()))?;
        if version.is_some_and(|v| v != node.stat.version) {
            return Err(ClientError::BadVersion(path.to_string()));
        }
        if node.stat.num_children > 0 {
            return Err(ClientError::NotEmpty(path.to_string()));
        }
        self.remove(path);
        Ok(())
    }

    fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError> {
        self.nodes
            .get(path)
            .map(|node| (node.data.clone(), node.stat.clone()))
            .ok_or_else(|| ClientError::NoNode(path.to_string()))
    }

    fn set(&mut self, path: &str, data: &[u8], version: Option<i32>) -> Result<Stat, ClientError> {
        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| ClientError::NoNode(path.to_string()))?;
        if version.is_some_and(|v| v != node.stat.version) {
            return Err(ClientError::BadVersion(path.to_string()));
        }
        node.data = data.to_vec();
        node.stat.version += 1;
        node.stat.mtime = now_ms();
        let stat = node.stat.clone();
        self.fire(path, WatchEvent::NodeDataChanged);
        Ok(stat)
    }

    /// End a session: its watches see the terminal state, then its
    /// ephemeral nodes are removed and other sessions' watches fire.
    fn end_session(&mut self, session: i64, terminal: SessionState) {
        for pending in self.watches.values_mut() {
            let (own, others): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|w| w.session == session);
            *pending = others;
            for watch in own {
                watch.trigger.fire(WatchEvent::Session(terminal));
            }
        }
        self.watches.retain(|_, pending| !pending.is_empty());

        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.owner == Some(session))
            .map(|(path, _)| path.clone())
            .collect();
        for path in owned {
            self.remove(&path);
        }

        if let Some(entry) = self.sessions.get(&session) {
            entry.state.send_replace(terminal);
        }
    }
}

/// In-memory coordination service shared by any number of fake clients
#[derive(Clone, Default)]
pub struct FakeCoordinationService {
    inner: Arc<Mutex<ServiceState>>,
}

impl FakeCoordinationService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a new connected session
    pub fn connect(&self) -> FakeClient {
        let mut state = self.state();
        let session = state.next_session;
        state.next_session += 1;
        let (tx, rx) = watch::channel(SessionState::Connected);
        state.sessions.insert(
            session,
            SessionEntry {
                state: tx,
                faults: VecDeque::new(),
            },
        );
        FakeClient {
            service: self.clone(),
            session,
            state_rx: rx,
        }
    }

    /// Drop a session's connection; its calls fail until reconnected
    pub fn disconnect(&self, session: i64) {
        let state = self.state();
        if let Some(entry) = state.sessions.get(&session) {
            if !entry.state.borrow().is_terminal() {
                entry.state.send_replace(SessionState::Connecting);
            }
        }
    }

    /// Restore a disconnected session
    pub fn reconnect(&self, session: i64) {
        let state = self.state();
        if let Some(entry) = state.sessions.get(&session) {
            if !entry.state.borrow().is_terminal() {
                entry.state.send_replace(SessionState::Connected);
            }
        }
    }

    /// Expire a session, deleting its ephemeral nodes
    pub fn expire(&self, session: i64) {
        self.state().end_session(session, SessionState::Expired);
    }

    /// Queue a fault for the next call of a session
    pub fn inject(&self, session: i64, fault: Fault) {
        if let Some(entry) = self.state().sessions.get_mut(&session) {
            entry.faults.push_back(fault);
        }
    }

    /// Whether a node exists
    pub fn node_exists(&self, path: &str) -> bool {
        self.state().nodes.contains_key(path)
    }

    /// Data of a node
    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.state().nodes.get(path).map(|node| node.data.clone())
    }

    /// Children of a node, sorted by name
    pub fn children(&self, path: &str) -> Vec<String> {
        self.state().children(path)
    }

    /// Number of watches pending on a path
    pub fn watch_count(&self, path: &str) -> usize {
        self.state().watches.get(path).map_or(0, Vec::len)
    }

    /// All recorded calls across sessions
    pub fn calls(&self) -> Vec<ClientCall> {
        self.state()
            .calls
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Recorded calls of one session
    pub fn session_calls(&self, session: i64) -> Vec<ClientCall> {
        self.state()
            .calls
            .iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, call)| call.clone())
            .collect()
    }
}

/// One session's view of a [`FakeCoordinationService`]
#[derive(Clone)]
pub struct FakeClient {
    service: FakeCoordinationService,
    session: i64,
    state_rx: watch::Receiver<SessionState>,
}

impl FakeClient {
    pub fn session_id(&self) -> i64 {
        self.session
    }

    pub fn service(&self) -> &FakeCoordinationService {
        &self.service
    }

    /// Recorded calls of this session
    pub fn calls(&self) -> Vec<ClientCall> {
        self.service.session_calls(self.session)
    }

    /// Queue a fault for this session's next call
    pub fn inject(&self, fault: Fault) {
        self.service.inject(self.session, fault);
    }

    pub fn disconnect(&self) {
        self.service.disconnect(self.session);
    }

    pub fn reconnect(&self) {
        self.service.reconnect(self.session);
    }

    pub fn expire(&self) {
        self.service.expire(self.session);
    }

    /// Close the session, deleting its ephemeral nodes
    pub fn close(&self) {
        self.service
            .state()
            .end_session(self.session, SessionState::Closed);
    }

    /// Run one call against the service under its lock
    fn call<T>(
        &self,
        call: ClientCall,
        op: impl FnOnce(&mut ServiceState) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut state = self.service.state();
        let lose_reply = state.begin(self.session, call)?;
        let result = op(&mut state)?;
        if lose_reply {
            return Err(ClientError::ConnectionLoss);
        }
        Ok(result)
    }
}

#[async_trait]
impl CoordinationClient for FakeClient {
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        _acl: &[Acl],
        mode: CreateMode,
    ) -> Result<String, ClientError> {
        let session = self.session;
        self.call(
            ClientCall::Create {
                path: path.to_string(),
                mode,
            },
            |state| state.create(session, path, data, mode),
        )
    }

    async fn delete(&self, path: &str, version: Option<i32>) -> Result<(), ClientError> {
        self.call(
            ClientCall::Delete {
                path: path.to_string(),
            },
            |state| state.delete(path, version),
        )
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), ClientError> {
        self.call(
            ClientCall::Get {
                path: path.to_string(),
                watch: false,
            },
            |state| state.get(path),
        )
    }

    async fn get_and_watch(&self, path: &str) -> Result<(Vec<u8>, Stat, Watch), ClientError> {
        let session = self.session;
        self.call(
            ClientCall::Get {
                path: path.to_string(),
                watch: true,
            },
            |state| {
                let (data, stat) = state.get(path)?;
                let watch = state.add_watch(session, path);
                Ok((data, stat, watch))
            },
        )
    }

    async fn set(
        &self,
        path: &str,
        data: &[u8],
        version: Option<i32>,
    ) -> Result<Stat, ClientError> {
        self.call(
            ClientCall::Set {
                path: path.to_string(),
                data: data.to_vec(),
            },
            |state| state.set(path, data, version),
        )
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>, ClientError> {
        self.call(
            ClientCall::Exists {
                path: path.to_string(),
                watch: false,
            },
            |state| Ok(state.nodes.get(path).map(|node| node.stat.clone())),
        )
    }

    async fn exists_and_watch(&self, path: &str) -> Result<(Option<Stat>, Watch), ClientError> {
        let session = self.session;
        self.call(
            ClientCall::Exists {
                path: path.to_string(),
                watch: true,
            },
            |state| {
                let stat = state.nodes.get(path).map(|node| node.stat.clone());
                let watch = state.add_watch(session, path);
                Ok((stat, watch))
            },
        )
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        self.call(
            ClientCall::GetChildren {
                path: path.to_string(),
            },
            |state| {
                if !state.nodes.contains_key(path) {
                    return Err(ClientError::NoNode(path.to_string()));
                }
                Ok(state.children(path))
            },
        )
    }

    fn session_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
