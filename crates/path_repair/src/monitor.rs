//! Periodic health sweep over every tenant's servers.
//!
//! A single background task drives the sweep: first run after the initial
//! delay, then once per period. The sweep runs inline in that task, so an
//! overrunning cycle delays the next one instead of overlapping it.

use crate::cache::CacheKey;
use crate::candidates::normalize_path;
use crate::config::RepairConfig;
use crate::error::RepairResult;
use crate::resolver::PathResolver;
use crate::types::{PathCategory, ServerDescriptor, TenantId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

/// Counts from one sweep over all tenants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub tenants: usize,
    pub failed_tenants: usize,
    /// Servers with at least one category needing a check
    pub checked: usize,
    /// Servers with at least one path replaced
    pub fixed: usize,
    pub exempt: usize,
    pub unreachable: usize,
}

#[derive(Debug, Default)]
struct TenantSweep {
    checked: usize,
    fixed: usize,
    exempt: usize,
    unreachable: usize,
}

struct RunningTask {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Shared state of the sweep, reachable from the background task.
struct Sweeper {
    resolver: Arc<PathResolver>,
    revalidate_after: Duration,
    /// Held for the whole sweep so scheduled and manual sweeps never overlap
    cycle_lock: Mutex<()>,
}

impl Sweeper {
    async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;
        let started = Instant::now();
        let mut report = CycleReport::default();

        let tenants = match self.resolver.repository().tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                error!("Health sweep could not enumerate tenants: {}", e);
                return report;
            }
        };

        for tenant_id in tenants {
            report.tenants += 1;
            let span = info_span!("tenant_sweep", tenant_id = %tenant_id);
            match self.sweep_tenant(tenant_id).instrument(span).await {
                Ok(sweep) => {
                    report.checked += sweep.checked;
                    report.fixed += sweep.fixed;
                    report.exempt += sweep.exempt;
                    report.unreachable += sweep.unreachable;
                }
                Err(e) => {
                    report.failed_tenants += 1;
                    error!(%tenant_id, "Health sweep failed for tenant: {}", e);
                }
            }
        }

        self.resolver
            .statistics()
            .record_cycle(report.checked as u64, report.fixed as u64);
        info!(
            tenants = report.tenants,
            checked = report.checked,
            fixed = report.fixed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Health sweep finished"
        );
        report
    }

    async fn sweep_tenant(&self, tenant_id: TenantId) -> RepairResult<TenantSweep> {
        let servers = self.resolver.repository().find_all_by_tenant(tenant_id).await?;
        let mut sweep = TenantSweep::default();

        for mut server in servers {
            if server.repair_exempt {
                debug!(server = %server.name, "Skipping exempt server");
                sweep.exempt += 1;
                continue;
            }

            let pending: Vec<PathCategory> = PathCategory::ALL
                .into_iter()
                .filter(|category| !self.is_validated(&server, *category))
                .collect();
            if pending.is_empty() {
                continue;
            }

            sweep.checked += 1;
            if !self.resolver.validator().is_reachable(&server).await {
                warn!(server = %server.name, "Remote host unreachable, skipping this cycle");
                sweep.unreachable += 1;
                continue;
            }

            let mut changed = false;
            for category in pending {
                changed |= self.resolver.resolve(&mut server, category).await.changed;
            }
            if changed {
                sweep.fixed += 1;
            }
        }

        Ok(sweep)
    }

    fn is_validated(&self, server: &ServerDescriptor, category: PathCategory) -> bool {
        let path = normalize_path(server.path(category));
        !path.is_empty()
            && self.resolver.cache().is_fresh(
                &CacheKey::for_server(server, category),
                &path,
                self.revalidate_after,
            )
    }
}

/// Background scheduler for health sweeps.
pub struct HealthMonitor {
    sweeper: Arc<Sweeper>,
    initial_delay: Duration,
    period: Duration,
    shutdown_grace: Duration,
    task: Mutex<Option<RunningTask>>,
}

impl HealthMonitor {
    pub fn new(resolver: Arc<PathResolver>, config: &RepairConfig) -> Self {
        Self {
            sweeper: Arc::new(Sweeper {
                resolver,
                revalidate_after: config.revalidate_after,
                cycle_lock: Mutex::new(()),
            }),
            initial_delay: config.initial_delay,
            period: config.check_interval,
            shutdown_grace: config.shutdown_grace,
            task: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> MonitorState {
        match self.task.lock().await.as_ref() {
            Some(task) if !task.handle.is_finished() => MonitorState::Running,
            _ => MonitorState::Stopped,
        }
    }

    /// Schedules the sweep. Returns false, doing nothing, when already running.
    pub async fn start(&self) -> bool {
        let mut task = self.task.lock().await;
        if let Some(running) = task.as_ref() {
            if !running.handle.is_finished() {
                debug!("Health monitor already running");
                return false;
            }
        }

        let (shutdown, mut shutdown_rx) = broadcast::channel(1);
        let sweeper = self.sweeper.clone();
        let period = self.period;
        let first_run = Instant::now() + self.initial_delay;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(first_run, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // Shutdown wins over a tick that fell due during an overrunning sweep.
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        debug!("Health monitor received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        sweeper.run_cycle().await;
                    }
                }
            }
        });

        info!(
            "🩺 Health monitor started (first sweep in {:?}, then every {:?})",
            self.initial_delay, self.period
        );
        *task = Some(RunningTask { shutdown, handle });
        true
    }

    /// Cancels the schedule, giving an in-flight sweep the grace period to
    /// finish before aborting it.
    pub async fn stop(&self) {
        let Some(RunningTask { shutdown, mut handle }) = self.task.lock().await.take() else {
            return;
        };

        let _ = shutdown.send(());
        match timeout(self.shutdown_grace, &mut handle).await {
            Ok(_) => info!("Health monitor stopped"),
            Err(_) => {
                warn!(
                    "Health sweep still running after {:?}, aborting it",
                    self.shutdown_grace
                );
                handle.abort();
            }
        }
    }

    /// Runs one sweep right now on the caller's task.
    pub async fn run_cycle(&self) -> CycleReport {
        self.sweeper.run_cycle().await
    }
}
