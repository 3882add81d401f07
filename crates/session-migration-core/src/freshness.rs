//! Directory freshness check
//!
//! A script directory whose mtime is not newer than the last recorded run
//! cannot contain scripts added since, so it is skipped without listing.
//! Both sides are whole seconds.

use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::state::MigrationRecord;

/// Modification time of `dir` in Unix seconds, `None` if it does not exist
pub fn dir_mtime(dir: &Path) -> io::Result<Option<i64>> {
    match std::fs::metadata(dir) {
        Ok(metadata) => Ok(Some(metadata.mtime())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whether a directory with this mtime is already fully processed
pub fn is_fresh(dir_mtime: i64, record: &MigrationRecord) -> bool {
    match record.timestamp {
        Some(stored) => dir_mtime <= stored,
        None => false,
    }
}
