use super::CallOrchestrator;
use crate::peer::ice::probe_ice_server;
use crate::resolver::IceServer;
use crate::session::Session;
use std::time::Duration;
use tracing::info;

impl CallOrchestrator {
    /// Media is flowing on the current call
    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    pub fn session(&self) -> Option<Session> {
        self.engine.snapshot()
    }
}

/// Probes every server in turn; results line up with `servers`.
pub async fn check_ice_servers(servers: &[IceServer], wait: Duration) -> Vec<bool> {
    let mut results = Vec::with_capacity(servers.len());
    for server in servers {
        results.push(probe_ice_server(server, wait).await);
    }
    let reachable = results.iter().filter(|ok| **ok).count();
    info!(reachable, total = servers.len(), "ICE server check finished");
    results
}
