//! Transport over locally mounted remote filesystems.
//!
//! Every server host is mounted (sshfs or similar) at `<mount_root>/<host>`;
//! candidate paths are resolved below that directory.

use async_trait::async_trait;
use path_repair::{ArtifactPattern, RemoteTransport, ServerDescriptor, TransportError};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;
use tracing::trace;

pub struct MountTransport {
    root: PathBuf,
    timeout: Duration,
}

impl MountTransport {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
        }
    }

    /// Mount directory of the server's host. The host must be a single plain
    /// path component so it can never leave the mount root.
    fn host_root(&self, server: &ServerDescriptor) -> Result<(String, PathBuf), TransportError> {
        let host = server.effective_host().ok_or_else(|| {
            TransportError::Connection(format!("server {} has no host configured", server.name))
        })?;

        let mut components = Path::new(host).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => Ok((host.to_string(), self.root.join(part))),
            _ => Err(TransportError::Connection(format!(
                "server {} has an invalid host: {}",
                server.name, host
            ))),
        }
    }

    /// Joins `path` below `base`, refusing anything that could escape it.
    fn resolve_below(base: &Path, path: &str) -> Result<PathBuf, TransportError> {
        let mut resolved = base.to_path_buf();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(TransportError::NotFound(path.to_string()));
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl RemoteTransport for MountTransport {
    async fn test_connection(&self, server: &ServerDescriptor) -> Result<bool, TransportError> {
        let (host, host_root) = self.host_root(server)?;
        match timeout(self.timeout, tokio::fs::metadata(&host_root)).await {
            Ok(Ok(metadata)) => Ok(metadata.is_dir()),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Ok(false),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Err(_) => Err(TransportError::Timeout(host)),
        }
    }

    async fn list_artifacts(
        &self,
        server: &ServerDescriptor,
        path: &str,
        pattern: ArtifactPattern,
    ) -> Result<Vec<String>, TransportError> {
        let (host, host_root) = self.host_root(server)?;
        let dir = Self::resolve_below(&host_root, path)?;

        let listing = async {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(TransportError::NotFound(path.to_string()));
                }
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    return Err(TransportError::Authentication(host.clone()));
                }
                Err(e) => return Err(TransportError::Io(e)),
            };

            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_file() {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    if pattern.matches(name) {
                        names.push(name.to_string());
                    }
                }
            }
            names.sort();
            Ok::<_, TransportError>(names)
        };

        let names = timeout(self.timeout, listing)
            .await
            .map_err(|_| TransportError::Timeout(host.clone()))??;
        trace!(host = %host, path, found = names.len(), "Listed {} artifacts", pattern);
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use path_repair::{PathCategory, TenantId};
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("10.0.0.1").join("10.0.0.1_42").join("actual1").join("deathlogs");
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(logs.join("2024.03.01-10.00.00.csv"), "").unwrap();
        std::fs::write(logs.join("notes.txt"), "").unwrap();
        std::fs::create_dir(logs.join("archive.csv")).unwrap();
        dir
    }

    fn server() -> ServerDescriptor {
        ServerDescriptor::new(TenantId(1), "x")
            .with_sftp_host("10.0.0.1")
            .with_server_key("42")
    }

    #[tokio::test]
    async fn test_lists_matching_files_only() {
        let dir = layout();
        let transport = MountTransport::new(dir.path(), Duration::from_secs(5));

        let names = transport
            .list_artifacts(
                &server(),
                "10.0.0.1_42/actual1/deathlogs",
                PathCategory::KillLog.artifact_pattern(),
            )
            .await
            .unwrap();
        assert_eq!(names, vec!["2024.03.01-10.00.00.csv"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let dir = layout();
        let transport = MountTransport::new(dir.path(), Duration::from_secs(5));

        let result = transport
            .list_artifacts(&server(), "nowhere/Logs", PathCategory::TextLog.artifact_pattern())
            .await;
        assert!(matches!(result, Err(TransportError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_parent_components_are_rejected() {
        let dir = layout();
        let transport = MountTransport::new(dir.path(), Duration::from_secs(5));

        let result = transport
            .list_artifacts(&server(), "../../etc", PathCategory::TextLog.artifact_pattern())
            .await;
        assert!(matches!(result, Err(TransportError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_connection_checks_host_mount() {
        let dir = layout();
        let transport = MountTransport::new(dir.path(), Duration::from_secs(5));

        assert!(transport.test_connection(&server()).await.unwrap());
        let elsewhere = server().with_sftp_host("10.9.9.9");
        assert!(!transport.test_connection(&elsewhere).await.unwrap());
        let hostless = ServerDescriptor::new(TenantId(1), "x");
        assert!(transport.test_connection(&hostless).await.is_err());
    }

    #[tokio::test]
    async fn test_host_cannot_escape_mount_root() {
        let dir = layout();
        let transport = MountTransport::new(dir.path().join("10.0.0.1"), Duration::from_secs(5));
        let pattern = PathCategory::KillLog.artifact_pattern();

        for host in ["/etc", "..", "../10.0.0.1", "a/b"] {
            let server = server().with_sftp_host(host);
            assert!(
                matches!(
                    transport.test_connection(&server).await,
                    Err(TransportError::Connection(_))
                ),
                "host {host} accepted"
            );
            assert!(
                matches!(
                    transport.list_artifacts(&server, "actual1/deathlogs", pattern).await,
                    Err(TransportError::Connection(_))
                ),
                "host {host} accepted"
            );
        }
    }
}
