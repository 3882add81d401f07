use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use session_migration_core::paths::{self, Environment};
use session_migration_core::{MigrationConfig, MigrationError, Mode};

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Migrate in user session settings.",
    long_about = "Runs every migration script found under <dir>/session-migration/scripts \
                  for each <dir> in XDG_DATA_DIRS exactly once per user and DESKTOP_SESSION."
)]
pub struct Config {
    /// Show verbose messages
    #[arg(long)]
    pub verbose: bool,

    /// Do not perform any changes
    #[arg(long)]
    pub dry_run: bool,

    /// Force a migration from this file only (no storage of migrated status)
    #[arg(long, value_name = "PATH", conflicts_with = "dry_run")]
    pub file: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Mode selected by the flags
    pub fn mode(&self) -> Mode {
        match (&self.file, self.dry_run) {
            (Some(path), _) => Mode::SingleFile(path.clone()),
            (None, true) => Mode::DryRun,
            (None, false) => Mode::Normal,
        }
    }
}

/// Application settings (from config file)
///
/// Path values are fallbacks for when the session environment does not
/// provide them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Print progress lines without `--verbose`
    #[serde(default)]
    pub verbose: bool,

    /// Search path used when `XDG_DATA_DIRS` is unset
    #[serde(default)]
    pub search_path: Option<String>,

    /// Data home used when `XDG_DATA_HOME` is unset
    #[serde(default)]
    pub data_home: Option<PathBuf>,

    /// Session name used when `DESKTOP_SESSION` is unset
    #[serde(default)]
    pub session: Option<String>,
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must exist
        if let Some(p) = path {
            return Self::read(p);
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("session-migration/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/session-migration/config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read(path);
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Merge CLI flags into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if cli.verbose {
            self.verbose = true;
        }
    }

    /// Build the run configuration from settings, environment and CLI
    ///
    /// The session environment wins over settings-file fallbacks. A data
    /// home is only required by modes that touch state.
    pub fn resolve(&self, cli: &Config, env: &Environment) -> Result<MigrationConfig> {
        let mode = cli.mode();
        let needs_state = mode.uses_state();

        let data_home = match paths::resolve_data_home(env, self.data_home.as_deref()) {
            Ok(dir) => Some(dir),
            Err(e) if needs_state => return Err(e.into()),
            Err(_) => None,
        };

        let session = env.session.clone().or_else(|| self.session.clone());
        if needs_state && session.is_none() {
            return Err(MigrationError::MissingSession.into());
        }

        Ok(MigrationConfig {
            search_dirs: paths::resolve_search_dirs(env, self.search_path.as_deref()),
            data_home,
            session,
            verbose: self.verbose,
            mode,
        })
    }
}
