use std::collections::HashMap;
use std::sync::Arc;

use flowdbg_config::DebugConfig;
use parking_lot::RwLock;

use crate::channel::DebugChannel;
use crate::error::{DebugError, DebugResult};
use crate::session::DebugSession;

/// Open debug sessions, keyed by connection id.
///
/// The transport calls [`open`](Self::open) when a client connects and
/// [`close`](Self::close) when the connection goes away; closing tears the session down and
/// releases any worker parked at one of its breakpoints.
pub struct DebugSessionManager<C: DebugChannel> {
    config: DebugConfig,
    sessions: RwLock<HashMap<String, Arc<DebugSession<C>>>>,
}

impl<C: DebugChannel> DebugSessionManager<C> {
    pub fn new(config: DebugConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn open(&self, channel: C, tenant: &str) -> DebugResult<Arc<DebugSession<C>>> {
        let connection_id = channel.id().to_string();
        let mut sessions = self.sessions.write();

        if sessions.contains_key(&connection_id) {
            return Err(DebugError::DuplicateConnection(connection_id));
        }
        if let Some(limit) = self.config.max_sessions_per_tenant {
            let open = sessions
                .values()
                .filter(|session| session.tenant() == tenant)
                .count();
            if open >= limit {
                return Err(DebugError::TenantSessionLimit {
                    tenant: tenant.to_string(),
                    limit,
                });
            }
        }

        let session = Arc::new(DebugSession::with_channel(
            channel,
            tenant,
            self.config.clone(),
        ));
        sessions.insert(connection_id, Arc::clone(&session));
        tracing::info!(parent: session.span(), "debug session opened");
        Ok(session)
    }

    pub fn get(&self, connection_id: &str) -> Option<Arc<DebugSession<C>>> {
        self.sessions.read().get(connection_id).cloned()
    }

    /// Sessions belonging to `tenant`, ordered by connection id.
    pub fn sessions_for_tenant(&self, tenant: &str) -> Vec<Arc<DebugSession<C>>> {
        let mut sessions: Vec<_> = self
            .sessions
            .read()
            .values()
            .filter(|session| session.tenant() == tenant)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.connection_id().cmp(b.connection_id()));
        sessions
    }

    /// Remove and tear down the session of `connection_id`.
    ///
    /// Returns `false` if no such session was open.
    pub fn close(&self, connection_id: &str) -> bool {
        let Some(session) = self.sessions.write().remove(connection_id) else {
            return false;
        };
        session.close();
        true
    }

    pub fn close_all(&self) {
        let sessions: Vec<_> = self.sessions.write().drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.close();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl<C: DebugChannel> Drop for DebugSessionManager<C> {
    fn drop(&mut self) {
        self.close_all();
    }
}
