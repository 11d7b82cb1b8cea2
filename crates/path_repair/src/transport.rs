//! Remote file transport seam.
//!
//! The actual SFTP client lives outside this crate. Implementations own their
//! connect/read timeouts; the validator adds an outer bound on top.

use crate::error::TransportError;
use crate::types::{ArtifactPattern, ServerDescriptor};
use async_trait::async_trait;

#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Checks that the server's remote host accepts connections.
    async fn test_connection(&self, server: &ServerDescriptor) -> Result<bool, TransportError>;

    /// Lists artifact names under `path` on the server's host that match
    /// `pattern`. `path` overrides whatever path the descriptor carries.
    async fn list_artifacts(
        &self,
        server: &ServerDescriptor,
        path: &str,
        pattern: ArtifactPattern,
    ) -> Result<Vec<String>, TransportError>;
}
