//! Last-known-good path cache.
//!
//! Concurrent reads and writes go straight to a sharded [`DashMap`]; a `put`
//! replaces the whole entry, so readers always see one written value.

use crate::types::{PathCategory, ServerDescriptor, ServerId, TenantId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;
use tracing::debug;

/// Identity of one cached path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tenant_id: TenantId,
    pub server_id: ServerId,
    pub category: PathCategory,
}

impl CacheKey {
    pub fn new(tenant_id: TenantId, server_id: ServerId, category: PathCategory) -> Self {
        Self {
            tenant_id,
            server_id,
            category,
        }
    }

    pub fn for_server(server: &ServerDescriptor, category: PathCategory) -> Self {
        Self::new(server.tenant_id, server.id, category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    path: String,
    resolved_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PathCache {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).map(|entry| entry.path.clone())
    }

    /// Records `path` as the latest validated path for `key`, overwriting any
    /// previous entry.
    pub fn put(&self, key: CacheKey, path: impl Into<String>) {
        let entry = CacheEntry {
            path: path.into(),
            resolved_at: Utc::now(),
        };
        self.entries.insert(key, entry);
    }

    /// True when `key` holds exactly `path` and was resolved within `max_age`.
    pub fn is_fresh(&self, key: &CacheKey, path: &str, max_age: Duration) -> bool {
        let Some(entry) = self.entries.get(key) else {
            return false;
        };
        if entry.path != path {
            return false;
        }
        let age = Utc::now().signed_duration_since(entry.resolved_at);
        age.to_std().map(|age| age <= max_age).unwrap_or(true)
    }

    pub fn clear_server(&self, tenant_id: TenantId, server_id: ServerId) {
        self.entries
            .retain(|key, _| !(key.tenant_id == tenant_id && key.server_id == server_id));
        debug!(%tenant_id, %server_id, "Cleared cached paths for server");
    }

    pub fn clear_tenant(&self, tenant_id: TenantId) {
        self.entries.retain(|key, _| key.tenant_id != tenant_id);
        debug!(%tenant_id, "Cleared cached paths for tenant");
    }

    pub fn clear_all(&self) {
        self.entries.clear();
        debug!("Cleared all cached paths");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
