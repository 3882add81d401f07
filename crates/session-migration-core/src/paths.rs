//! Script directory and state file resolution
//!
//! Scripts live in `<dir>/session-migration/scripts` for every entry of the
//! system data search path. Per-user state lives in
//! `<data home>/session_migration-<session>`.

use std::path::{Path, PathBuf};

use crate::error::{MigrationError, Result};

/// Subdirectory of each search-path entry that holds migration scripts
pub const SCRIPTS_SUBDIR: &str = "session-migration/scripts";

/// Prefix of the per-session state file name
pub const STATE_FILE_PREFIX: &str = "session_migration-";

/// Search path used when `XDG_DATA_DIRS` is unset or empty
pub const DEFAULT_SEARCH_PATH: &str = "/usr/local/share/:/usr/share/";

/// Environment variable naming the session type
pub const SESSION_VAR: &str = "DESKTOP_SESSION";

/// Environment variable for the user data home
pub const DATA_HOME_VAR: &str = "XDG_DATA_HOME";

/// Environment variable for the system data search path
pub const SEARCH_PATH_VAR: &str = "XDG_DATA_DIRS";

/// Snapshot of the environment variables the tool reads
///
/// Captured once at startup; empty values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Value of `DESKTOP_SESSION`
    pub session: Option<String>,
    /// Value of `XDG_DATA_HOME`
    pub data_home: Option<PathBuf>,
    /// Value of `XDG_DATA_DIRS`
    pub search_path: Option<String>,
    /// The user's home directory
    pub home: Option<PathBuf>,
}

impl Environment {
    /// Read the relevant variables from the process environment
    pub fn capture() -> Self {
        Self {
            session: non_empty_var(SESSION_VAR),
            data_home: non_empty_var(DATA_HOME_VAR).map(PathBuf::from),
            search_path: non_empty_var(SEARCH_PATH_VAR),
            home: dirs::home_dir(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Split a colon-separated search path into base directories
///
/// Empty entries are dropped. Relative entries are dropped with a warning,
/// since they would resolve against whatever directory the session started in.
pub fn split_search_path(search_path: &str) -> Vec<PathBuf> {
    search_path
        .split(':')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let path = PathBuf::from(entry);
            if path.is_absolute() {
                Some(path)
            } else {
                tracing::warn!("Ignoring relative search path entry '{}'", entry);
                None
            }
        })
        .collect()
}

/// Candidate script directories, in search-path order
///
/// Existence is not checked here; the engine reports missing ones.
pub fn script_dirs(base_dirs: &[PathBuf]) -> Vec<PathBuf> {
    base_dirs.iter().map(|dir| dir.join(SCRIPTS_SUBDIR)).collect()
}

/// Location of the state file for a session
pub fn state_file_path(data_home: &Path, session: &str) -> PathBuf {
    data_home.join(format!("{}{}", STATE_FILE_PREFIX, session))
}

/// Resolve the user data home: `XDG_DATA_HOME`, then the fallback, then `~/.local/share`
pub fn resolve_data_home(env: &Environment, fallback: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = &env.data_home {
        return Ok(dir.clone());
    }
    if let Some(dir) = fallback {
        return Ok(dir.to_path_buf());
    }
    env.home
        .as_ref()
        .map(|home| home.join(".local/share"))
        .ok_or(MigrationError::MissingDataHome)
}

/// Resolve the search path: `XDG_DATA_DIRS`, then the fallback, then the XDG default
pub fn resolve_search_dirs(env: &Environment, fallback: Option<&str>) -> Vec<PathBuf> {
    let raw = env
        .search_path
        .as_deref()
        .or(fallback.filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_SEARCH_PATH);
    split_search_path(raw)
}
