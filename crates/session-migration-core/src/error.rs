//! Error type for the migration core.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a migration run or a single operation
#[derive(Debug, Error)]
pub enum MigrationError {
    /// No session identity was provided
    #[error("no session identity: DESKTOP_SESSION is not set")]
    MissingSession,

    /// The user data home could not be determined
    #[error("cannot determine the user data directory: XDG_DATA_HOME and HOME are both unset")]
    MissingDataHome,

    /// The state directory could not be created
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateStateDir { path: PathBuf, source: io::Error },

    /// The state file exists but could not be read
    #[error("{}: {source}", .path.display())]
    ReadState { path: PathBuf, source: io::Error },

    /// The state file was read but is damaged or incomplete
    #[error("{}: {reason}", .path.display())]
    InvalidState { path: PathBuf, reason: String },

    /// The state file could not be written
    #[error("Failed to write state file {}: {source}", .path.display())]
    WriteState { path: PathBuf, source: io::Error },

    /// A script directory exists but could not be listed
    #[error("Failed to open '{}': {}", .path.display(), crate::runner::os_reason(.source))]
    ReadDir { path: PathBuf, source: io::Error },

    /// A script could not be launched
    #[error("Failed to execute child process \"{}\" ({})", .path.display(), crate::runner::os_reason(.source))]
    Launch { path: PathBuf, source: io::Error },
}

/// Result alias for migration operations
pub type Result<T> = std::result::Result<T, MigrationError>;
