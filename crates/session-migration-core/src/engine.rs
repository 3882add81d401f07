//! Migration engine
//!
//! Walks the script directories in search-path order and runs every script
//! not yet recorded for the session. Per directory:
//!
//! 1. missing: report and move on
//! 2. mtime not newer than the stored timestamp: report up to date
//! 3. otherwise list scripts, skip recorded names, launch the rest
//!
//! The ledger is written once at the end, and only when something new ran.
//! A script is recorded when it launches, whatever its exit status.

use std::path::{Path, PathBuf};

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::freshness;
use crate::report::Reporter;
use crate::runner::{ProcessRunner, ScriptRunner};
use crate::scripts;
use crate::state::{MigrationRecord, StateStore};

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Names newly recorded this run (would-be recorded in dry-run)
    pub migrated: Vec<String>,
    /// Scripts that failed to launch
    pub failed: Vec<PathBuf>,
    /// Whether the state file was rewritten
    pub state_saved: bool,
}

/// Runs migrations for one session
pub struct MigrationEngine<R: ScriptRunner = ProcessRunner> {
    config: MigrationConfig,
    runner: R,
    reporter: Reporter,
}

impl MigrationEngine<ProcessRunner> {
    /// Engine launching real processes and reporting on stdio
    pub fn new(config: MigrationConfig) -> Self {
        let reporter = Reporter::stdio(config.verbose);
        Self::with_parts(config, ProcessRunner, reporter)
    }
}

impl<R: ScriptRunner> MigrationEngine<R> {
    pub fn with_parts(config: MigrationConfig, runner: R, reporter: Reporter) -> Self {
        Self {
            config,
            runner,
            reporter,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run according to the configured mode
    ///
    /// Missing directories, unreadable state and launch failures are
    /// reported and absorbed. Errors are returned only for an unresolvable
    /// state location or a failed state write.
    pub fn run(&mut self) -> Result<RunSummary> {
        if let Some(script) = self.config.single_file().map(Path::to_path_buf) {
            return Ok(self.run_single(&script));
        }

        let store = StateStore::new(self.config.state_file()?);
        let (mut record, problems) = store.load();
        for problem in &problems {
            self.reporter.error(problem);
        }
        let mut summary = RunSummary::default();

        for dir in self.config.script_dirs() {
            self.migrate_dir(&dir, &mut record, &mut summary);
        }

        if summary.migrated.is_empty() || self.config.is_dry_run() {
            tracing::debug!("Nothing new migrated, state left untouched");
            return Ok(summary);
        }

        record.touch();
        store.save(&record)?;
        summary.state_saved = true;
        tracing::debug!(
            "Recorded {} new migration(s) in {:?}",
            summary.migrated.len(),
            store.path()
        );
        Ok(summary)
    }

    /// Run one script unconditionally; state is neither read nor written
    fn run_single(&mut self, script: &Path) -> RunSummary {
        let mut summary = RunSummary::default();
        self.reporter.executing(script);
        match self.runner.launch(script) {
            Ok(()) => {
                if let Some(name) = script.file_name() {
                    summary.migrated.push(name.to_string_lossy().into_owned());
                }
            }
            Err(e) => {
                self.reporter.launch_failed(&e);
                summary.failed.push(script.to_path_buf());
            }
        }
        summary
    }

    fn migrate_dir(&mut self, dir: &Path, record: &mut MigrationRecord, summary: &mut RunSummary) {
        let mtime = match freshness::dir_mtime(dir) {
            Ok(Some(mtime)) => mtime,
            Ok(None) => {
                self.reporter.missing_directory(dir);
                return;
            }
            Err(source) => {
                self.reporter.error(&MigrationError::ReadDir {
                    path: dir.to_path_buf(),
                    source,
                });
                return;
            }
        };

        if freshness::is_fresh(mtime, record) {
            self.reporter.up_to_date(dir);
            return;
        }

        let scripts = match scripts::enumerate(dir) {
            Ok(scripts) => scripts,
            Err(e) => {
                self.reporter.error(&e);
                return;
            }
        };
        self.reporter.using_directory(dir);

        for script in scripts {
            if record.is_migrated(&script.name) {
                self.reporter.already_migrated(&script.name);
                continue;
            }

            self.reporter.executing(&script.path);
            if self.config.is_dry_run() {
                // Keeps the preview identical when a name repeats in a later directory
                record.mark_migrated(&script.name);
                summary.migrated.push(script.name);
                continue;
            }

            match self.runner.launch(&script.path) {
                Ok(()) => {
                    record.mark_migrated(&script.name);
                    summary.migrated.push(script.name);
                }
                Err(e) => {
                    tracing::debug!("Launch failed, {} stays pending", script.name);
                    self.reporter.launch_failed(&e);
                    summary.failed.push(script.path);
                }
            }
        }
    }
}
