//! Test doubles for the transport and repository seams.

use crate::error::{RepositoryError, TransportError};
use crate::repository::{InMemoryServerRepository, ServerRepository};
use crate::transport::RemoteTransport;
use crate::types::{ArtifactPattern, ServerDescriptor, ServerId, TenantId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct Script {
    dirs: HashMap<String, Vec<String>>,
    probes: Vec<String>,
    fail_all: bool,
    unreachable: bool,
    delay: Option<Duration>,
}

/// Transport serving a fixed set of remote directories and recording every
/// path it is asked to list.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    connection_tests: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: &str, files: &[&str]) {
        let mut script = self.script.lock().unwrap();
        script
            .dirs
            .insert(path.to_string(), files.iter().map(|f| f.to_string()).collect());
    }

    pub fn fail_all(&self) {
        self.script.lock().unwrap().fail_all = true;
    }

    pub fn set_unreachable(&self) {
        self.script.lock().unwrap().unreachable = true;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.script.lock().unwrap().delay = Some(delay);
    }

    pub fn probes(&self) -> Vec<String> {
        self.script.lock().unwrap().probes.clone()
    }

    pub fn connection_tests(&self) -> usize {
        self.connection_tests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteTransport for ScriptedTransport {
    async fn test_connection(&self, server: &ServerDescriptor) -> Result<bool, TransportError> {
        self.connection_tests.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap();
        if script.fail_all {
            return Err(TransportError::Connection(server.name.clone()));
        }
        Ok(!script.unreachable)
    }

    async fn list_artifacts(
        &self,
        _server: &ServerDescriptor,
        path: &str,
        pattern: ArtifactPattern,
    ) -> Result<Vec<String>, TransportError> {
        let (delay, result) = {
            let mut script = self.script.lock().unwrap();
            script.probes.push(path.to_string());
            let result = if script.fail_all {
                Err(TransportError::Timeout(path.to_string()))
            } else {
                script
                    .dirs
                    .get(path)
                    .map(|files| files.iter().filter(|f| pattern.matches(f)).cloned().collect())
                    .ok_or_else(|| TransportError::NotFound(path.to_string()))
            };
            (script.delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

/// Repository whose `save` always fails; reads go to an in-memory store.
#[derive(Default)]
pub struct FailingSaveRepository {
    pub inner: InMemoryServerRepository,
}

#[async_trait]
impl ServerRepository for FailingSaveRepository {
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: ServerId,
    ) -> Result<Option<ServerDescriptor>, RepositoryError> {
        self.inner.find_by_id(tenant_id, id).await
    }

    async fn find_all_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ServerDescriptor>, RepositoryError> {
        self.inner.find_all_by_tenant(tenant_id).await
    }

    async fn tenants(&self) -> Result<Vec<TenantId>, RepositoryError> {
        self.inner.tenants().await
    }

    async fn save(&self, _server: &ServerDescriptor) -> Result<(), RepositoryError> {
        Err(RepositoryError::Storage("database unavailable".to_string()))
    }
}
