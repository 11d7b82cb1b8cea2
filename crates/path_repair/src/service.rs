//! Composition root for the repair engine.

use crate::cache::PathCache;
use crate::config::RepairConfig;
use crate::error::{RepairError, RepairResult};
use crate::monitor::HealthMonitor;
use crate::repository::ServerRepository;
use crate::resolver::PathResolver;
use crate::stats::RepairStatistics;
use crate::transport::RemoteTransport;
use std::sync::Arc;

/// One explicitly constructed set of cache, statistics, resolver and
/// monitor. Command handlers share the resolver; the owning application
/// drives the monitor.
pub struct RepairService {
    resolver: Arc<PathResolver>,
    monitor: HealthMonitor,
}

impl RepairService {
    pub fn new(
        config: RepairConfig,
        transport: Arc<dyn RemoteTransport>,
        repository: Arc<dyn ServerRepository>,
    ) -> RepairResult<Self> {
        config.validate().map_err(RepairError::Config)?;

        let resolver = Arc::new(PathResolver::new(
            Arc::new(PathCache::new()),
            transport,
            repository,
            Arc::new(RepairStatistics::new()),
            &config,
        ));
        let monitor = HealthMonitor::new(resolver.clone(), &config);

        Ok(Self { resolver, monitor })
    }

    pub fn resolver(&self) -> Arc<PathResolver> {
        self.resolver.clone()
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn cache(&self) -> Arc<PathCache> {
        self.resolver.cache().clone()
    }

    pub fn statistics(&self) -> Arc<RepairStatistics> {
        self.resolver.statistics().clone()
    }

    pub fn get_statistics(&self) -> String {
        self.resolver.get_statistics()
    }
}
