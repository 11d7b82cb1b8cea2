//! Server repository seam and the stores shipped with the crate.

use crate::error::RepositoryError;
use crate::types::{ServerDescriptor, ServerId, TenantId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tenant-scoped access to durable server records.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: ServerId,
    ) -> Result<Option<ServerDescriptor>, RepositoryError>;

    async fn find_all_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ServerDescriptor>, RepositoryError>;

    /// Every tenant that owns at least one server.
    async fn tenants(&self) -> Result<Vec<TenantId>, RepositoryError>;

    /// Inserts or replaces the record with the descriptor's id.
    async fn save(&self, server: &ServerDescriptor) -> Result<(), RepositoryError>;
}

/// Process-local store, used for tests and as the working set of
/// [`JsonFileServerRepository`].
#[derive(Debug, Default)]
pub struct InMemoryServerRepository {
    servers: DashMap<ServerId, ServerDescriptor>,
}

impl InMemoryServerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_servers(servers: impl IntoIterator<Item = ServerDescriptor>) -> Self {
        let repository = Self::new();
        for server in servers {
            repository.insert(server);
        }
        repository
    }

    pub fn insert(&self, server: ServerDescriptor) {
        self.servers.insert(server.id, server);
    }

    pub fn get(&self, id: ServerId) -> Option<ServerDescriptor> {
        self.servers.get(&id).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// All servers, ordered by tenant then name.
    pub fn snapshot(&self) -> Vec<ServerDescriptor> {
        let mut servers: Vec<ServerDescriptor> =
            self.servers.iter().map(|s| s.value().clone()).collect();
        servers.sort_by(|a, b| (a.tenant_id, &a.name).cmp(&(b.tenant_id, &b.name)));
        servers
    }
}

#[async_trait]
impl ServerRepository for InMemoryServerRepository {
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: ServerId,
    ) -> Result<Option<ServerDescriptor>, RepositoryError> {
        Ok(self.get(id).filter(|s| s.tenant_id == tenant_id))
    }

    async fn find_all_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ServerDescriptor>, RepositoryError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|s| s.tenant_id == tenant_id)
            .collect())
    }

    async fn tenants(&self) -> Result<Vec<TenantId>, RepositoryError> {
        let mut tenants: Vec<TenantId> = self.servers.iter().map(|s| s.tenant_id).collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }

    async fn save(&self, server: &ServerDescriptor) -> Result<(), RepositoryError> {
        self.insert(server.clone());
        Ok(())
    }
}

/// Servers kept in a JSON document. Every save rewrites the document through
/// a temporary file and a rename.
pub struct JsonFileServerRepository {
    path: PathBuf,
    servers: InMemoryServerRepository,
    write_lock: Mutex<()>,
}

impl JsonFileServerRepository {
    /// Loads `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        let servers = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            let servers: Vec<ServerDescriptor> = serde_json::from_str(&content)?;
            info!("Loaded {} servers from {}", servers.len(), path.display());
            InMemoryServerRepository::with_servers(servers)
        } else {
            info!("Server store {} does not exist yet, starting empty", path.display());
            InMemoryServerRepository::new()
        };

        Ok(Self {
            path,
            servers,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    async fn flush(&self) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let document = serde_json::to_string_pretty(&self.servers.snapshot())?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, document).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Flushed {} servers to {}", self.servers.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ServerRepository for JsonFileServerRepository {
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: ServerId,
    ) -> Result<Option<ServerDescriptor>, RepositoryError> {
        self.servers.find_by_id(tenant_id, id).await
    }

    async fn find_all_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ServerDescriptor>, RepositoryError> {
        self.servers.find_all_by_tenant(tenant_id).await
    }

    async fn tenants(&self) -> Result<Vec<TenantId>, RepositoryError> {
        self.servers.tenants().await
    }

    async fn save(&self, server: &ServerDescriptor) -> Result<(), RepositoryError> {
        self.servers.save(server).await?;
        self.flush().await
    }
}
