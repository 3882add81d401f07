//! Per-session migration ledger
//!
//! The state file is a small key file:
//!
//! ```text
//! [State]
//! timestamp=1349872315
//! migrated=01_test.sh;02_test.sh;10_test.sh;
//! ```
//!
//! Loading never fails: a missing, unreadable or damaged file is an empty
//! ledger.
//! Saving replaces the file atomically through a sibling temp file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{MigrationError, Result};

const GROUP: &str = "State";
const TIMESTAMP_KEY: &str = "timestamp";
const MIGRATED_KEY: &str = "migrated";

/// Scripts already run for a session plus the time of the last recorded run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Unix seconds of the last write; `None` until the first save
    pub timestamp: Option<i64>,
    /// Script file names in the order they were first migrated
    migrated: Vec<String>,
}

impl MigrationRecord {
    /// Create a record from parts
    pub fn new(timestamp: Option<i64>, migrated: Vec<String>) -> Self {
        let mut record = Self {
            timestamp,
            migrated: Vec::with_capacity(migrated.len()),
        };
        for name in migrated {
            record.mark_migrated(&name);
        }
        record
    }

    /// Whether a script with this file name has already run
    pub fn is_migrated(&self, name: &str) -> bool {
        self.migrated.iter().any(|n| n == name)
    }

    /// Record a script name; returns false if it was already present
    pub fn mark_migrated(&mut self, name: &str) -> bool {
        if self.is_migrated(name) {
            return false;
        }
        self.migrated.push(name.to_string());
        true
    }

    /// Migrated names in insertion order
    pub fn migrated(&self) -> &[String] {
        &self.migrated
    }

    /// Whether the record has ever been saved
    pub fn is_initialized(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Set the timestamp to the current wall-clock time
    pub fn touch(&mut self) {
        self.timestamp = Some(chrono::Utc::now().timestamp());
    }

    /// Serialize to the key file format
    pub fn to_key_file(&self) -> String {
        let mut list = String::new();
        for name in &self.migrated {
            list.push_str(&escape_item(name));
            list.push(';');
        }
        format!(
            "[{}]\n{}={}\n{}={}\n",
            GROUP,
            TIMESTAMP_KEY,
            self.timestamp.unwrap_or(0),
            MIGRATED_KEY,
            list
        )
    }

    /// Parse the key file format
    ///
    /// A damaged file is an error and nothing from it is kept: a line that
    /// is neither a group header, a comment nor `key=value`, a key before the
    /// first group, or a timestamp that is not an integer. A well-formed file
    /// missing a key gives the record plus one note per missing key.
    pub fn parse(content: &str) -> std::result::Result<(Self, Vec<String>), String> {
        let mut timestamp = None;
        let mut migrated = None;
        let mut group: Option<&str> = None;

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| format!("invalid group header on line {}", lineno + 1))?;
                group = Some(name);
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| format!("line {} is not a key=value pair", lineno + 1))?;
            match group {
                None => return Err("Key file does not start with a group".to_string()),
                Some(GROUP) => {}
                Some(_) => continue,
            }
            match key.trim() {
                TIMESTAMP_KEY => {
                    let ts = value
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| format!("invalid timestamp '{}'", value.trim()))?;
                    timestamp = Some(ts);
                }
                MIGRATED_KEY => migrated = Some(parse_list(value.trim_start())),
                _ => {}
            }
        }

        let mut missing = Vec::new();
        for (key, present) in [
            (TIMESTAMP_KEY, timestamp.is_some()),
            (MIGRATED_KEY, migrated.is_some()),
        ] {
            if !present {
                missing.push(format!(
                    "Key file does not have key '{}' in group '{}'",
                    key, GROUP
                ));
            }
        }

        Ok((Self::new(timestamp, migrated.unwrap_or_default()), missing))
    }
}

/// Load and save `MigrationRecord`s at a fixed path
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store for the given state file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path to the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, treating a missing file as empty
    ///
    /// Never fails. An unreadable or damaged file also gives an empty record;
    /// the returned problems are for the caller to report.
    pub fn load(&self) -> (MigrationRecord, Vec<MigrationError>) {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return (MigrationRecord::default(), Vec::new())
            }
            Err(source) => {
                tracing::debug!(path = %self.path.display(), "Unreadable state file: {}", source);
                let problem = MigrationError::ReadState {
                    path: self.path.clone(),
                    source,
                };
                return (MigrationRecord::default(), vec![problem]);
            }
        };

        let invalid = |reason: String| MigrationError::InvalidState {
            path: self.path.clone(),
            reason,
        };
        match MigrationRecord::parse(&content) {
            Ok((record, missing)) => {
                tracing::debug!(
                    "Loaded state: timestamp={:?}, {} migrated",
                    record.timestamp,
                    record.migrated().len()
                );
                (record, missing.into_iter().map(invalid).collect())
            }
            Err(reason) => {
                tracing::debug!(path = %self.path.display(), "Damaged state file discarded: {}", reason);
                (MigrationRecord::default(), vec![invalid(reason)])
            }
        }
    }

    /// Write the record atomically
    ///
    /// Creates the parent directory if needed, writes `<file>.tmp` with
    /// create-new semantics, syncs it and renames it over the state file.
    pub fn save(&self, record: &MigrationRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| MigrationError::CreateStateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let temp_path = self.temp_path();
        let write_err = |source: io::Error| MigrationError::WriteState {
            path: self.path.clone(),
            source,
        };

        // Leftover from an interrupted write
        let _ = fs::remove_file(&temp_path);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(write_err)?;
        file.write_all(record.to_key_file().as_bytes())
            .map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(e));
        }

        tracing::debug!(path = %self.path.display(), "Saved state");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn escape_item(item: &str) -> String {
    let mut out = String::with_capacity(item.len());
    for (i, c) in item.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            ' ' if i == 0 => out.push_str("\\s"),
            c => out.push(c),
        }
    }
    out
}

fn parse_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('s') => current.push(' '),
                Some('n') => current.push('\n'),
                Some('t') => current.push('\t'),
                Some('r') => current.push('\r'),
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            ';' => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mark_migrated_preserves_order_and_dedups() {
        let mut record = MigrationRecord::default();
        assert!(record.mark_migrated("10_test.sh"));
        assert!(record.mark_migrated("01_test.sh"));
        assert!(!record.mark_migrated("10_test.sh"));
        assert_eq!(record.migrated(), &["10_test.sh", "01_test.sh"]);
        assert!(record.is_migrated("01_test.sh"));
        assert!(!record.is_migrated("02_test.sh"));
    }

    #[test]
    fn test_key_file_format() {
        let record = MigrationRecord::new(
            Some(1349872315),
            vec!["01_test.sh".into(), "02_test.sh".into(), "10_test.sh".into()],
        );
        assert_eq!(
            record.to_key_file(),
            "[State]\ntimestamp=1349872315\nmigrated=01_test.sh;02_test.sh;10_test.sh;\n"
        );
    }

    #[test]
    fn test_parse_key_file() {
        let content = "# written by session-migration\n\n[State]\ntimestamp = 42\nmigrated=a.sh;b.sh;\nextra=1\n";
        let (record, problems) = MigrationRecord::parse(content).unwrap();
        assert!(problems.is_empty(), "{:?}", problems);
        assert_eq!(record.timestamp, Some(42));
        assert_eq!(record.migrated(), &["a.sh", "b.sh"]);
    }

    #[test]
    fn test_parse_ignores_other_groups() {
        let content = "[Other]\nmigrated=x.sh;\n[State]\ntimestamp=7\nmigrated=y.sh;\n";
        let (record, _) = MigrationRecord::parse(content).unwrap();
        assert_eq!(record.migrated(), &["y.sh"]);
    }

    #[test]
    fn test_parse_missing_keys_reports_problems() {
        let (record, problems) = MigrationRecord::parse("[State]\nmigrated=a.sh;\n").unwrap();
        assert_eq!(record.timestamp, None);
        assert_eq!(record.migrated(), &["a.sh"]);
        assert_eq!(
            problems,
            vec!["Key file does not have key 'timestamp' in group 'State'"]
        );
    }

    #[test]
    fn test_parse_rejects_damaged_files() {
        for content in [
            "not a key file at all",
            "timestamp=5\n[State]\nmigrated=a.sh;\n",
            "[State\ntimestamp=5\nmigrated=a.sh;\n",
            "[State]\ntimestamp=99999999999\n<<<torn write>>>\nmigrated=a.sh;\n",
            "[State]\ntimestamp=12ab\nmigrated=a.sh;\n",
        ] {
            assert!(MigrationRecord::parse(content).is_err(), "{:?}", content);
        }
    }

    #[test]
    fn test_load_discards_damaged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_migration-test");
        fs::write(
            &path,
            "[State]\ntimestamp=99999999999\n<<<torn write>>>\nmigrated=01_test.sh;\n",
        )
        .unwrap();

        let (record, problems) = StateStore::new(path.clone()).load();

        assert_eq!(record, MigrationRecord::default());
        assert!(!record.is_initialized());
        let messages: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            messages,
            vec![format!("{}: line 3 is not a key=value pair", path.display())]
        );
    }

    #[test]
    fn test_escaped_names_survive_save_and_load() {
        let record = MigrationRecord::new(
            Some(1),
            vec![" lead".into(), "semi;colon".into(), "back\\slash".into()],
        );
        let text = record.to_key_file();
        assert!(text.contains("migrated=\\slead;semi\\;colon;back\\\\slash;"));
        let (parsed, problems) = MigrationRecord::parse(&text).unwrap();
        assert!(problems.is_empty());
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("session_migration-test"));
        let (record, problems) = store.load();
        assert_eq!(record, MigrationRecord::default());
        assert!(problems.is_empty());
        assert!(!record.is_initialized());
    }

    #[test]
    fn test_save_creates_parents_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/home/session_migration-test");
        let store = StateStore::new(path.clone());

        let mut record = MigrationRecord::default();
        record.mark_migrated("01_test.sh");
        record.touch();
        store.save(&record).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested/home/session_migration-test.tmp").exists());
        assert_eq!(store.load().0, record);
    }

    #[test]
    fn test_save_replaces_stale_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_migration-test");
        fs::write(dir.path().join("session_migration-test.tmp"), "garbage").unwrap();

        let store = StateStore::new(path.clone());
        let record = MigrationRecord::new(Some(5), vec!["a.sh".into()]);
        store.save(&record).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[State]\ntimestamp=5\nmigrated=a.sh;\n"
        );
    }

    #[test]
    fn test_touch_sets_current_time() {
        let before = chrono::Utc::now().timestamp();
        let mut record = MigrationRecord::default();
        record.touch();
        let after = chrono::Utc::now().timestamp();
        let ts = record.timestamp.unwrap();
        assert!(ts >= before && ts <= after);
    }
}
