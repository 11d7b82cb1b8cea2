//! Remote validation of candidate paths.

use crate::transport::RemoteTransport;
use crate::types::{PathCategory, ServerDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Asks the transport whether a candidate directory holds the artifacts of a
/// category. Every transport failure, including an elapsed timeout, is
/// reported as `false`.
#[derive(Clone)]
pub struct RemotePathValidator {
    transport: Arc<dyn RemoteTransport>,
    timeout: Duration,
}

impl RemotePathValidator {
    pub fn new(transport: Arc<dyn RemoteTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub async fn validate(
        &self,
        server: &ServerDescriptor,
        path: &str,
        category: PathCategory,
    ) -> bool {
        let pattern = category.artifact_pattern();
        let listing = timeout(
            self.timeout,
            self.transport.list_artifacts(server, path, pattern),
        )
        .await;

        match listing {
            Ok(Ok(names)) => {
                let found = names.iter().filter(|name| pattern.matches(name)).count();
                debug!(server = %server.name, %category, path, found, "Validated candidate");
                found > 0
            }
            Ok(Err(e)) => {
                debug!(server = %server.name, %category, path, error = %e, "Candidate rejected by transport");
                false
            }
            Err(_) => {
                debug!(server = %server.name, %category, path, "Candidate validation timed out");
                false
            }
        }
    }

    /// Whether the server's host can be reached at all.
    pub async fn is_reachable(&self, server: &ServerDescriptor) -> bool {
        match timeout(self.timeout, self.transport.test_connection(server)).await {
            Ok(Ok(reachable)) => reachable,
            Ok(Err(e)) => {
                debug!(server = %server.name, error = %e, "Connection test failed");
                false
            }
            Err(_) => {
                debug!(server = %server.name, "Connection test timed out");
                false
            }
        }
    }
}
