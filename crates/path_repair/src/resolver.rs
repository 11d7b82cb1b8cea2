//! Path resolution and repair.
//!
//! [`PathResolver::resolve`] confirms the configured path of a server, or
//! walks the candidate list until the remote host confirms one, then writes
//! the winner through the cache and the server repository.
//!
//! Candidates are probed one at a time, in order, so a single resolution never
//! puts more than one request in flight against a remote host.

use crate::cache::{CacheKey, PathCache};
use crate::candidates::{generate_candidates, normalize_path};
use crate::config::RepairConfig;
use crate::error::{RepairResult, RepositoryError};
use crate::repository::ServerRepository;
use crate::stats::RepairStatistics;
use crate::transport::RemoteTransport;
use crate::types::{PathCategory, ResolutionOutcome, ServerDescriptor, ServerId, TenantId};
use crate::validator::RemotePathValidator;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// Outcome of resolving both categories of one server.
#[derive(Debug, Clone)]
pub struct ServerRepair {
    pub server_id: ServerId,
    pub server_name: String,
    pub kill_log: ResolutionOutcome,
    pub text_log: ResolutionOutcome,
}

impl ServerRepair {
    /// Either category's configured path was replaced.
    pub fn changed(&self) -> bool {
        self.kill_log.changed || self.text_log.changed
    }

    pub fn outcomes(&self) -> [&ResolutionOutcome; 2] {
        [&self.kill_log, &self.text_log]
    }
}

/// A category that could not be resolved during a bulk repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPath {
    pub server_id: ServerId,
    pub server_name: String,
    pub category: PathCategory,
    pub candidates_tried: usize,
}

/// Aggregate result of repairing every server of a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairSummary {
    pub tenant_id: TenantId,
    pub checked: usize,
    pub fixed: usize,
    pub unresolved: Vec<UnresolvedPath>,
}

pub struct PathResolver {
    cache: Arc<PathCache>,
    validator: RemotePathValidator,
    repository: Arc<dyn ServerRepository>,
    statistics: Arc<RepairStatistics>,
    key_locks: DashMap<CacheKey, Arc<Mutex<()>>>,
    serialize_per_key: bool,
}

impl PathResolver {
    pub fn new(
        cache: Arc<PathCache>,
        transport: Arc<dyn RemoteTransport>,
        repository: Arc<dyn ServerRepository>,
        statistics: Arc<RepairStatistics>,
        config: &RepairConfig,
    ) -> Self {
        Self {
            cache,
            validator: RemotePathValidator::new(transport, config.validation_timeout),
            repository,
            statistics,
            key_locks: DashMap::new(),
            serialize_per_key: config.serialize_per_key,
        }
    }

    pub fn cache(&self) -> &Arc<PathCache> {
        &self.cache
    }

    pub fn statistics(&self) -> &Arc<RepairStatistics> {
        &self.statistics
    }

    pub fn validator(&self) -> &RemotePathValidator {
        &self.validator
    }

    pub fn repository(&self) -> &Arc<dyn ServerRepository> {
        &self.repository
    }

    /// Resolves the path of `category` for `server`.
    ///
    /// Every call counts as one check, rejected input included. On success
    /// the descriptor carries the resolved path (persisted when it changed).
    /// On failure the descriptor is left exactly as it was.
    #[instrument(skip_all, fields(tenant_id = %server.tenant_id, server = %server.name, category = %category))]
    pub async fn resolve(
        &self,
        server: &mut ServerDescriptor,
        category: PathCategory,
    ) -> ResolutionOutcome {
        self.statistics.record_check();
        let original = server.path(category).to_string();
        if let Err(e) = server.validate() {
            warn!("Refusing to resolve: {}", e);
            return ResolutionOutcome::invalid(category, original, e.to_string());
        }

        let key = CacheKey::for_server(server, category);
        let _guard = self.lock_key(key).await;

        let current = normalize_path(&original);
        let mut tried: Vec<String> = Vec::new();

        if !current.is_empty() && category.is_plausible(&current) {
            tried.push(current.clone());
            if self.validator.validate(server, &current, category).await {
                self.cache.put(key, current.clone());
                debug!(path = %current, "Configured path is valid");
                return ResolutionOutcome::unchanged(category, original, current, tried);
            }
        }

        let cached = self.cache.get(&key);
        let candidates = generate_candidates(server, category, cached.as_deref());

        for candidate in candidates {
            if tried.contains(&candidate) {
                continue;
            }
            tried.push(candidate.clone());
            debug!(path = %candidate, attempt = tried.len(), "Probing candidate");

            if !self.validator.validate(server, &candidate, category).await {
                continue;
            }

            self.cache.put(key, candidate.clone());
            if candidate == current {
                debug!(path = %candidate, "Configured path is valid");
                return ResolutionOutcome::unchanged(category, original, candidate, tried);
            }

            server.set_path(category, candidate.clone());
            self.statistics.record_fix();
            let durable = match self.repository.save(server).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        path = %candidate,
                        error = %e,
                        "Resolved path could not be persisted; it will revert on restart"
                    );
                    false
                }
            };
            info!(from = %original, to = %candidate, "Repaired {} path", category);
            return ResolutionOutcome::repaired(category, original, candidate, tried, durable);
        }

        warn!(candidates = tried.len(), "No valid {} path found", category);
        ResolutionOutcome::not_found(category, original, tried)
    }

    /// Resolves both categories; true if either configured path changed.
    pub async fn fix_both_categories(&self, server: &mut ServerDescriptor) -> bool {
        self.repair_server(server).await.changed()
    }

    /// Resolves both categories and returns both outcomes.
    pub async fn repair_server(&self, server: &mut ServerDescriptor) -> ServerRepair {
        let kill_log = self.resolve(server, PathCategory::KillLog).await;
        let text_log = self.resolve(server, PathCategory::TextLog).await;
        ServerRepair {
            server_id: server.id,
            server_name: server.name.clone(),
            kill_log,
            text_log,
        }
    }

    /// Loads one server from the repository and repairs it.
    pub async fn fix_server(&self, tenant_id: TenantId, id: ServerId) -> RepairResult<ServerRepair> {
        let mut server = self
            .repository
            .find_by_id(tenant_id, id)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        Ok(self.repair_server(&mut server).await)
    }

    /// Repairs every server of a tenant, exempt ones included.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn fix_all_servers_for_tenant(&self, tenant_id: TenantId) -> RepairResult<RepairSummary> {
        let servers = self.repository.find_all_by_tenant(tenant_id).await?;
        let mut summary = RepairSummary {
            tenant_id,
            checked: 0,
            fixed: 0,
            unresolved: Vec::new(),
        };

        for mut server in servers {
            let repair = self.repair_server(&mut server).await;
            summary.checked += 1;
            if repair.changed() {
                summary.fixed += 1;
            }
            for outcome in repair.outcomes() {
                if !outcome.success {
                    summary.unresolved.push(UnresolvedPath {
                        server_id: repair.server_id,
                        server_name: repair.server_name.clone(),
                        category: outcome.category,
                        candidates_tried: outcome.candidates_tried.len(),
                    });
                }
            }
        }

        info!(
            checked = summary.checked,
            fixed = summary.fixed,
            unresolved = summary.unresolved.len(),
            "Tenant repair finished"
        );
        Ok(summary)
    }

    pub fn get_statistics(&self) -> String {
        self.statistics.get_statistics()
    }

    async fn lock_key(&self, key: CacheKey) -> Option<KeyLockGuard<'_>> {
        if !self.serialize_per_key {
            return None;
        }
        let lock = self
            .key_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Some(KeyLockGuard {
            locks: &self.key_locks,
            key,
            guard: Some(lock.lock_owned().await),
        })
    }
}

/// Holds the per-key lock of one resolution. On drop the lock is released
/// and its map entry removed once no other resolution holds or awaits it.
struct KeyLockGuard<'a> {
    locks: &'a DashMap<CacheKey, Arc<Mutex<()>>>,
    key: CacheKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryServerRepository;
    use crate::testing::{FailingSaveRepository, ScriptedTransport};
    use crate::types::FailureReason;

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        repository: Arc<InMemoryServerRepository>,
        resolver: PathResolver,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(ScriptedTransport::new());
        let repository = Arc::new(InMemoryServerRepository::new());
        let resolver = PathResolver::new(
            Arc::new(PathCache::new()),
            transport.clone(),
            repository.clone(),
            Arc::new(RepairStatistics::new()),
            &RepairConfig::default(),
        );
        Fixture {
            transport,
            repository,
            resolver,
        }
    }

    fn alpha() -> ServerDescriptor {
        ServerDescriptor::new(TenantId(7), "Alpha Server")
            .with_sftp_host("203.0.113.5")
            .with_server_key("Alpha")
    }

    #[tokio::test]
    async fn test_finds_and_persists_generated_path() {
        let f = fixture();
        f.transport
            .add_dir("203.0.113.5_Alpha/actual/deathlogs", &["2024.05.01-12.00.00.csv"]);
        let mut server = alpha();
        f.repository.insert(server.clone());

        let outcome = f.resolver.resolve(&mut server, PathCategory::KillLog).await;

        assert!(outcome.success);
        assert!(outcome.changed);
        assert!(outcome.durable);
        assert_eq!(outcome.resolved_path.as_deref(), Some("203.0.113.5_Alpha/actual/deathlogs"));
        assert_eq!(
            outcome.candidates_tried,
            vec!["203.0.113.5_Alpha/actual1/deathlogs", "203.0.113.5_Alpha/actual/deathlogs"]
        );
        assert_eq!(server.killlog_path, "203.0.113.5_Alpha/actual/deathlogs");
        assert_eq!(
            f.repository.get(server.id).unwrap().killlog_path,
            "203.0.113.5_Alpha/actual/deathlogs"
        );
        let key = CacheKey::for_server(&server, PathCategory::KillLog);
        assert_eq!(
            f.resolver.cache().get(&key).as_deref(),
            Some("203.0.113.5_Alpha/actual/deathlogs")
        );
        assert_eq!(f.resolver.statistics().snapshot().total_fixed, 1);
    }

    #[tokio::test]
    async fn test_valid_configured_path_is_a_noop() {
        let f = fixture();
        f.transport.add_dir("custom/deathlogs", &["a.csv"]);
        let mut server = alpha().with_path(PathCategory::KillLog, "custom/deathlogs");
        let before = server.clone();

        let outcome = f.resolver.resolve(&mut server, PathCategory::KillLog).await;

        assert!(outcome.success);
        assert!(!outcome.changed);
        assert_eq!(outcome.candidates_tried, vec!["custom/deathlogs"]);
        assert_eq!(server, before);
        assert!(f.repository.is_empty(), "nothing should be persisted");
        assert_eq!(f.transport.probes().len(), 1);

        let again = f.resolver.resolve(&mut server, PathCategory::KillLog).await;
        assert!(again.success && !again.changed);
        assert_eq!(server, before);
        let stats = f.resolver.statistics().snapshot();
        assert_eq!(stats.total_checked, 2);
        assert_eq!(stats.total_fixed, 0);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let f = fixture();
        f.transport.add_dir("203.0.113.5_Alpha/Logs", &["Deadside.log"]);
        f.transport.add_dir("Alpha/Logs", &["Deadside.log"]);
        let mut server = alpha();

        let outcome = f.resolver.resolve(&mut server, PathCategory::TextLog).await;

        assert_eq!(outcome.resolved_path.as_deref(), Some("203.0.113.5_Alpha/Logs"));
        assert_eq!(f.transport.probes(), vec!["203.0.113.5_Alpha/Logs"]);
    }

    #[tokio::test]
    async fn test_all_failures_leave_descriptor_untouched() {
        let f = fixture();
        f.transport.fail_all();
        let mut server = alpha().with_path(PathCategory::KillLog, "stale/actual/deathlogs");
        let before = server.clone();

        let outcome = f.resolver.resolve(&mut server, PathCategory::KillLog).await;

        assert!(!outcome.success);
        assert_eq!(outcome.failure, Some(FailureReason::NoValidPathFound));
        assert_eq!(server, before);
        // configured path once, then the six templates
        assert_eq!(outcome.candidates_tried.len(), 7);
        assert_eq!(f.transport.probes(), outcome.candidates_tried);
        assert_eq!(outcome.candidates_tried[0], "stale/actual/deathlogs");

        let stats = f.resolver.statistics().snapshot();
        assert_eq!(stats.total_checked, 1);
        assert_eq!(stats.total_fixed, 0);
        assert!(f.resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cached_path_tried_after_configured() {
        let f = fixture();
        f.transport.add_dir("moved/actual/deathlogs", &["x.csv"]);
        let mut server = alpha().with_path(PathCategory::KillLog, "old/actual/deathlogs");
        f.resolver.cache().put(
            CacheKey::for_server(&server, PathCategory::KillLog),
            "moved/actual/deathlogs",
        );

        let outcome = f.resolver.resolve(&mut server, PathCategory::KillLog).await;

        assert_eq!(
            outcome.candidates_tried,
            vec!["old/actual/deathlogs", "moved/actual/deathlogs"]
        );
        assert_eq!(server.killlog_path, "moved/actual/deathlogs");
    }

    #[tokio::test]
    async fn test_implausible_configured_path_still_tried_first() {
        let f = fixture();
        f.transport.add_dir("odd/place", &["x.csv"]);
        let mut server = alpha().with_path(PathCategory::KillLog, "odd/place");

        let outcome = f.resolver.resolve(&mut server, PathCategory::KillLog).await;

        assert!(outcome.success);
        assert!(!outcome.changed);
        assert_eq!(f.transport.probes(), vec!["odd/place"]);
    }

    #[tokio::test]
    async fn test_invalid_input_performs_no_io() {
        let f = fixture();
        let mut server = ServerDescriptor::new(TenantId(7), "   ");

        let outcome = f.resolver.resolve(&mut server, PathCategory::KillLog).await;

        assert!(!outcome.success);
        assert!(matches!(outcome.failure, Some(FailureReason::InvalidInput(_))));
        assert!(f.transport.probes().is_empty());
        let stats = f.resolver.statistics().snapshot();
        assert_eq!(stats.total_checked, 1);
        assert_eq!(stats.total_fixed, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_reports_success() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.add_dir("203.0.113.5_Alpha/actual1/deathlogs", &["a.csv"]);
        let resolver = PathResolver::new(
            Arc::new(PathCache::new()),
            transport,
            Arc::new(FailingSaveRepository::default()),
            Arc::new(RepairStatistics::new()),
            &RepairConfig::default(),
        );
        let mut server = alpha();

        let outcome = resolver.resolve(&mut server, PathCategory::KillLog).await;

        assert!(outcome.success);
        assert!(outcome.changed);
        assert!(!outcome.durable);
        assert_eq!(server.killlog_path, "203.0.113.5_Alpha/actual1/deathlogs");
    }

    #[tokio::test]
    async fn test_fix_both_categories() {
        let f = fixture();
        f.transport.add_dir("203.0.113.5_Alpha/Deadside/Logs", &["Deadside.log"]);
        let mut server = alpha();

        assert!(f.resolver.fix_both_categories(&mut server).await);
        assert_eq!(server.textlog_path, "203.0.113.5_Alpha/Deadside/Logs");
        assert!(server.killlog_path.is_empty());
        assert!(!f.resolver.fix_both_categories(&mut server).await);
    }

    #[tokio::test]
    async fn test_fix_all_servers_for_tenant() {
        let f = fixture();
        f.transport.add_dir("203.0.113.5_Alpha/actual/deathlogs", &["a.csv"]);
        f.transport.add_dir("203.0.113.5_Alpha/Logs", &["Deadside.log"]);
        let good = alpha();
        let broken = ServerDescriptor::new(TenantId(7), "Bravo").with_sftp_host("198.51.100.1");
        let other_tenant = ServerDescriptor::new(TenantId(8), "Other");
        f.repository.insert(good.clone());
        f.repository.insert(broken.clone());
        f.repository.insert(other_tenant);

        let summary = f.resolver.fix_all_servers_for_tenant(TenantId(7)).await.unwrap();

        assert_eq!(summary.checked, 2);
        assert_eq!(summary.fixed, 1);
        assert_eq!(summary.unresolved.len(), 2);
        assert!(summary.unresolved.iter().all(|u| u.server_id == broken.id));
        assert_eq!(
            f.repository.get(good.id).unwrap().textlog_path,
            "203.0.113.5_Alpha/Logs"
        );
    }

    #[tokio::test]
    async fn test_fix_server_unknown_id() {
        let f = fixture();
        let result = f.resolver.fix_server(TenantId(7), ServerId::new()).await;
        assert!(matches!(
            result,
            Err(crate::error::RepairError::Repository(RepositoryError::NotFound(_)))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolutions_of_same_key() {
        let f = fixture();
        f.transport.add_dir("203.0.113.5_Alpha/actual/deathlogs", &["a.csv"]);
        let resolver = Arc::new(f.resolver);
        let server = alpha();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let resolver = resolver.clone();
                let mut copy = server.clone();
                tokio::spawn(async move { resolver.resolve(&mut copy, PathCategory::KillLog).await })
            })
            .collect();

        for task in tasks {
            let outcome = task.await.unwrap();
            assert_eq!(
                outcome.resolved_path.as_deref(),
                Some("203.0.113.5_Alpha/actual/deathlogs")
            );
        }
        // the first resolution probes two paths, the rest hit the cached one
        assert_eq!(f.transport.probes().len(), 5);
        assert!(resolver.key_locks.is_empty(), "released locks are pruned");
    }

    #[tokio::test]
    async fn test_key_locks_are_pruned_after_resolution() {
        let f = fixture();
        f.transport.add_dir("203.0.113.5_Alpha/Logs", &["Deadside.log"]);
        let mut server = alpha();

        f.resolver.repair_server(&mut server).await;
        assert!(f.resolver.key_locks.is_empty());

        let other = ServerDescriptor::new(TenantId(7), "Gone").with_sftp_host("198.51.100.7");
        f.resolver.resolve(&mut other.clone(), PathCategory::TextLog).await;
        assert!(f.resolver.key_locks.is_empty());
    }
}
