//! # Path Repair - Remote Log Path Resolution
//!
//! Game server integrations read two kinds of artifacts from each server's
//! remote host: a directory of kill/death CSV files and the rotating text
//! log. Hosting providers lay those directories out differently, so the
//! configured paths drift or are never set at all. This crate finds them.
//!
//! ## Components
//!
//! * [`generate_candidates`] - ordered guesses built from the configured
//!   path, the cached path, and fixed `{host}`/`{server}` templates
//! * [`PathCache`] - last-known-good path per tenant, server and category
//! * [`RemotePathValidator`] - asks a [`RemoteTransport`] whether a
//!   directory holds matching artifacts; transport errors become `false`
//! * [`PathResolver`] - probes candidates in order and persists the first
//!   confirmed one through a [`ServerRepository`]
//! * [`HealthMonitor`] - periodic sweep over every tenant's servers
//! * [`RepairStatistics`] - process-lifetime checked/fixed counters
//!
//! [`RepairService`] wires them together around one cache and one set of
//! counters.
//!
//! ## Example
//!
//! ```rust,ignore
//! let service = RepairService::new(RepairConfig::default(), transport, repository)?;
//! let outcome = service.resolver().resolve(&mut server, PathCategory::KillLog).await;
//! if outcome.changed {
//!     println!("{} -> {:?}", outcome.original_path, outcome.resolved_path);
//! }
//! service.monitor().start().await;
//! ```

pub use cache::{CacheKey, PathCache};
pub use candidates::{generate_candidates, normalize_path};
pub use config::RepairConfig;
pub use error::{RepairError, RepairResult, RepositoryError, TransportError};
pub use monitor::{CycleReport, HealthMonitor, MonitorState};
pub use repository::{InMemoryServerRepository, JsonFileServerRepository, ServerRepository};
pub use resolver::{PathResolver, RepairSummary, ServerRepair, UnresolvedPath};
pub use service::RepairService;
pub use stats::{RepairStatistics, StatisticsSnapshot};
pub use transport::RemoteTransport;
pub use types::{
    ArtifactPattern, FailureReason, PathCategory, ResolutionOutcome, ServerDescriptor, ServerId,
    TenantId,
};
pub use validator::RemotePathValidator;

pub mod cache;
pub mod candidates;
pub mod config;
pub mod error;
pub mod monitor;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod stats;
pub mod transport;
pub mod types;
pub mod validator;

#[cfg(test)]
mod testing;
