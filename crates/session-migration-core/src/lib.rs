//! Core library for session-migration
//!
//! Discovers migration scripts under `<data dir>/session-migration/scripts`
//! for every entry of the system data search path, runs each script once per
//! user and session, and records what ran in a per-session state file.

pub mod config;
pub mod engine;
pub mod error;
pub mod freshness;
pub mod paths;
pub mod report;
pub mod runner;
pub mod scripts;
pub mod state;

pub use config::{MigrationConfig, Mode};
pub use engine::{MigrationEngine, RunSummary};
pub use error::{MigrationError, Result};
pub use paths::Environment;
pub use report::Reporter;
pub use runner::{ProcessRunner, ScriptRunner};
pub use scripts::ScriptEntry;
pub use state::{MigrationRecord, StateStore};
