//! pathwarden daemon entry point.
//!
//! Loads configuration, wires the repair service to the mounted hosts and
//! the JSON server store, then either runs one sweep (`--once`) or keeps
//! the health monitor running until a shutdown signal arrives.

mod cli;
mod config;
mod logging;
mod signals;
mod transport;

use anyhow::{anyhow, Context, Result};
use cli::CliArgs;
use config::AppConfig;
use path_repair::{JsonFileServerRepository, RepairService, TenantId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use transport::MountTransport;

/// Interval of the periodic statistics log line.
const STATS_INTERVAL: Duration = Duration::from_secs(300);

pub struct Application {
    config: AppConfig,
    args: CliArgs,
    service: RepairService,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path)
            .await
            .with_context(|| format!("loading {}", args.config_path.display()))?;

        if let Some(log_level) = &args.log_level {
            config.logging.level = log_level.clone();
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Some(mount_root) = &args.mount_root {
            config.transport.mount_root = mount_root.to_string_lossy().to_string();
        }

        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        logging::setup_logging(&config.logging)?;
        display_banner();

        let repository = Arc::new(
            JsonFileServerRepository::open(&config.storage.servers_file)
                .await
                .with_context(|| format!("opening {}", config.storage.servers_file))?,
        );
        info!(
            "📂 Loaded {} server records from {}",
            repository.len(),
            repository.path().display()
        );

        let transport = Arc::new(MountTransport::new(
            &config.transport.mount_root,
            config.transport_timeout(),
        ));
        let service = RepairService::new(config.to_repair_config(), transport, repository)?;

        Ok(Self {
            config,
            args,
            service,
        })
    }

    pub async fn run(self) -> Result<()> {
        if self.args.once {
            return self.run_once().await;
        }

        info!("📋 Configuration Summary:");
        info!("  📁 Mount root: {}", self.config.transport.mount_root);
        info!("  🗄️ Servers file: {}", self.config.storage.servers_file);
        info!(
            "  ⏱️ Sweep every {}s, first after {}s",
            self.config.monitor.interval_secs, self.config.monitor.initial_delay_secs
        );

        self.service.monitor().start().await;

        let monitoring_handle = {
            let statistics = self.service.statistics();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(STATS_INTERVAL);
                let mut last_checked = 0u64;

                loop {
                    interval.tick().await;

                    let stats = statistics.snapshot();
                    info!(
                        "📊 Repair Health - {} checks this period | {}",
                        stats.total_checked - last_checked,
                        stats
                    );
                    last_checked = stats.total_checked;
                }
            })
        };

        info!("✅ pathwarden is now running");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        signals::wait_for_shutdown().await?;

        info!("🛑 Shutdown signal received, stopping health monitor...");
        monitoring_handle.abort();
        self.service.monitor().stop().await;

        let stats = self.service.statistics().snapshot();
        info!("📊 Final Statistics: {}", stats);
        info!("  - Sweeps completed: {}", stats.cycles_completed);
        info!("👋 pathwarden shutdown complete");

        Ok(())
    }

    async fn run_once(self) -> Result<()> {
        match self.args.tenant {
            Some(tenant) => {
                let summary = self
                    .service
                    .resolver()
                    .fix_all_servers_for_tenant(TenantId(tenant))
                    .await?;
                info!(
                    "🔧 Tenant {}: {} servers checked, {} fixed",
                    summary.tenant_id, summary.checked, summary.fixed
                );
                for unresolved in &summary.unresolved {
                    warn!(
                        "  ❌ {} ({}): no {} directory after {} candidates",
                        unresolved.server_name,
                        unresolved.server_id,
                        unresolved.category,
                        unresolved.candidates_tried
                    );
                }
            }
            None => {
                let report = self.service.monitor().run_cycle().await;
                info!(
                    "🔧 Sweep over {} tenants: {} checked, {} fixed, {} exempt, {} unreachable, {} failed tenants",
                    report.tenants,
                    report.checked,
                    report.fixed,
                    report.exempt,
                    report.unreachable,
                    report.failed_tenants
                );
            }
        }

        info!("📊 {}", self.service.get_statistics());
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start pathwarden: {:?}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║              🧭 PATHWARDEN 🧭            ║");
    info!("║                  v{:<8}               ║", version);
    info!("║                                          ║");
    info!("║  Game server log path resolution         ║");
    info!("║  and repair                              ║");
    info!("╚══════════════════════════════════════════╝");
}
