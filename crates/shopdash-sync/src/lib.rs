//! Catalog reconciliation: the single-flight sync engine that mirrors the
//! external store into Postgres, plus the read-only status accessors the
//! dashboard polls.

pub mod engine;
pub mod error;
pub mod status;

pub use engine::{RunOutcome, SyncOptions, SyncService, TriggerOutcome};
pub use error::SyncError;
pub use status::{current_status, dashboard_stats, last_completed_job, DashboardStats, SyncStatus};
