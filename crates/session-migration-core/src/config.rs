//! Resolved run configuration

use std::path::{Path, PathBuf};

use crate::error::{MigrationError, Result};
use crate::paths;

/// What a run does
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    /// Run new scripts and record them
    #[default]
    Normal,
    /// Report what would run without running or recording anything
    DryRun,
    /// Run exactly this script, ignoring and leaving state alone
    SingleFile(PathBuf),
}

impl Mode {
    /// Whether this mode reads the state file
    pub fn uses_state(&self) -> bool {
        !matches!(self, Mode::SingleFile(_))
    }
}

/// Everything a run needs, resolved once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Base directories from the search path, in order
    pub search_dirs: Vec<PathBuf>,
    /// User data home holding the state file
    pub data_home: Option<PathBuf>,
    /// Session identity selecting the state file
    pub session: Option<String>,
    /// Print progress lines
    pub verbose: bool,
    pub mode: Mode,
}

impl MigrationConfig {
    /// Script directories to walk, in order
    pub fn script_dirs(&self) -> Vec<PathBuf> {
        paths::script_dirs(&self.search_dirs)
    }

    /// Path of this session's state file
    pub fn state_file(&self) -> Result<PathBuf> {
        let session = self.session.as_deref().ok_or(MigrationError::MissingSession)?;
        let data_home = self
            .data_home
            .as_deref()
            .ok_or(MigrationError::MissingDataHome)?;
        Ok(paths::state_file_path(data_home, session))
    }

    pub fn is_dry_run(&self) -> bool {
        self.mode == Mode::DryRun
    }

    /// The forced script, in single-file mode
    pub fn single_file(&self) -> Option<&Path> {
        match &self.mode {
            Mode::SingleFile(path) => Some(path),
            _ => None,
        }
    }
}
