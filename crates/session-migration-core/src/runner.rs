//! Script launching

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use nix::errno::Errno;

use crate::error::{MigrationError, Result};

/// Launches a migration script
///
/// `Ok` means the script was started; its exit status does not matter.
pub trait ScriptRunner {
    fn launch(&mut self, script: &Path) -> Result<()>;
}

/// Runs scripts as child processes sharing this process's stdio
///
/// Each child is waited on before returning so scripts never overlap.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ScriptRunner for ProcessRunner {
    fn launch(&mut self, script: &Path) -> Result<()> {
        let mut child = Command::new(script)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| MigrationError::Launch {
                path: script.to_path_buf(),
                source,
            })?;

        match child.wait() {
            Ok(status) => tracing::debug!("{:?} finished with {}", script, status),
            Err(e) => tracing::warn!("Failed to wait for {:?}: {}", script, e),
        }
        Ok(())
    }
}

/// OS description of an I/O error without the "(os error N)" suffix
pub fn os_reason(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => Errno::from_raw(code).desc().to_string(),
        None => err.to_string(),
    }
}
