#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Fleet Reconciler
//!
//! Periodic reconciliation core for a fleet-management backend.
//!
//! ## Overview
//!
//! Managed agents report health, versions and scheduled tasks; operators
//! configure retention and publish agent versions. This crate keeps the derived
//! state in line with both on a fixed cadence:
//!
//! - **Retention pruning**: one background job per enabled history domain
//! - **Expired run-once tasks**: removal jobs once the zone-adjusted fire time has passed
//! - **Status aggregation**: cached failing status and agent count per site and client
//! - **Agent reconciliation**: update finalization, scheduled task sync, alert
//!   resolution and per-agent cache refresh
//!
//! ## Module Organization
//!
//! - [`models`] - Fleet entities read and updated by the core
//! - [`store`] - Persistence seam with in-memory and PostgreSQL implementations
//! - [`state_machine`] - Scheduled task `sync_status` transitions
//! - [`orchestration`] - The four components and the services that drive them
//! - [`jobs`] / [`remote`] - Outbound seams: job submission, agent scheduler, alerting
//! - [`config`] - Layered configuration and the per-cycle deployment snapshot
//! - [`errors`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fleet_reconciler::config::ReconcilerConfig;
//! use fleet_reconciler::orchestration::StatusAggregator;
//! use fleet_reconciler::store::InMemoryFleetStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = ReconcilerConfig::default();
//! config.deployment.latest_agent_version = "2.4.0".to_string();
//! config.validate()?;
//!
//! let store = Arc::new(InMemoryFleetStore::new());
//! let report = StatusAggregator::new(store).run().await?;
//! println!("refreshed {} sites", report.sites.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod jobs;
pub mod logging;
pub mod macros;
pub mod metrics;
pub mod models;
pub mod orchestration;
pub mod remote;
pub mod state_machine;
pub mod store;

pub use config::{ConfigManager, ReconcileSnapshot, ReconcilerConfig};
pub use errors::{ReconcileError, ReconcileResult};
pub use jobs::{ChannelJobDispatcher, JobDispatcher, JobReceiver, JobRequest};
pub use logging::init_structured_logging;
pub use orchestration::{
    AgentReconciler, CacheRefreshService, ExpiredTaskReaper, MaintenanceService,
    ReconcilerDependencies, ReconcilerSystem, RetentionPruningDispatcher, StatusAggregator,
};
pub use remote::{AlertResolver, RemoteError, TaskRemote};
pub use state_machine::{SyncEvent, SyncStatus};
pub use store::{FleetStore, InMemoryFleetStore, PgFleetStore};
