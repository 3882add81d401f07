//! session-migration: run per-application session migration scripts once per user
//!
//! The binary resolves CLI flags, an optional settings file and the session
//! environment into a [`session_migration_core::MigrationConfig`] and hands it
//! to the core engine.

pub mod config;
