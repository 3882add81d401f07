//! User-facing progress and diagnostic lines
//!
//! Progress goes to stdout and only when verbose; diagnostics always go to
//! stderr. The message shapes are stable and consumed by scripts and tests.

use std::io::{self, Write};
use std::path::Path;

use crate::error::MigrationError;

/// Writes progress and diagnostic lines
pub struct Reporter {
    verbose: bool,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Reporter {
    /// Reporter on the process's stdout and stderr
    pub fn stdio(verbose: bool) -> Self {
        Self::new(verbose, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Reporter on arbitrary writers
    pub fn new(verbose: bool, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self { verbose, out, err }
    }

    pub fn missing_directory(&mut self, dir: &Path) {
        self.progress(format_args!(
            "Directory '{}' does not exist, nothing to do",
            dir.display()
        ));
    }

    pub fn up_to_date(&mut self, dir: &Path) {
        self.progress(format_args!(
            "Directory '{}' all uptodate, nothing to do",
            dir.display()
        ));
    }

    pub fn using_directory(&mut self, dir: &Path) {
        self.progress(format_args!("Using '{}' directory", dir.display()));
    }

    pub fn already_migrated(&mut self, name: &str) {
        self.progress(format_args!("File '{} already migrated, skipping", name));
    }

    pub fn executing(&mut self, script: &Path) {
        self.progress(format_args!("Executing: {}", script.display()));
    }

    /// A script could not be started; the child produced no output
    pub fn launch_failed(&mut self, error: &MigrationError) {
        self.diagnostic(format_args!(
            "{}\nstdout: (null)\nstderr: (null)",
            error
        ));
    }

    /// Any other non-fatal error
    pub fn error(&mut self, error: &MigrationError) {
        self.diagnostic(format_args!("{}", error));
    }

    fn progress(&mut self, line: std::fmt::Arguments<'_>) {
        if !self.verbose {
            return;
        }
        // Flush before children inherit the same stdout
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }

    fn diagnostic(&mut self, line: std::fmt::Arguments<'_>) {
        let _ = writeln!(self.err, "{}", line);
        let _ = self.err.flush();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::SharedBuffer;
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn capture(verbose: bool) -> (Reporter, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let reporter = Reporter::new(verbose, Box::new(out.clone()), Box::new(err.clone()));
        (reporter, out, err)
    }

    #[test]
    fn test_message_shapes() {
        let (mut reporter, out, err) = capture(true);
        let dir = Path::new("/usr/share/session-migration/scripts");
        reporter.missing_directory(dir);
        reporter.up_to_date(dir);
        reporter.using_directory(dir);
        reporter.already_migrated("01_test.sh");
        reporter.executing(&dir.join("02_test.sh"));

        assert_eq!(
            out.contents(),
            "Directory '/usr/share/session-migration/scripts' does not exist, nothing to do\n\
             Directory '/usr/share/session-migration/scripts' all uptodate, nothing to do\n\
             Using '/usr/share/session-migration/scripts' directory\n\
             File '01_test.sh already migrated, skipping\n\
             Executing: /usr/share/session-migration/scripts/02_test.sh\n"
        );
        assert_eq!(err.contents(), "");
    }

    #[test]
    fn test_quiet_suppresses_progress_only() {
        let (mut reporter, out, err) = capture(false);
        reporter.executing(Path::new("/x/01.sh"));
        reporter.launch_failed(&MigrationError::Launch {
            path: PathBuf::from("/x/08_test.sh"),
            source: io::Error::from_raw_os_error(nix::errno::Errno::EACCES as i32),
        });

        assert_eq!(out.contents(), "");
        assert_eq!(
            err.contents(),
            "Failed to execute child process \"/x/08_test.sh\" (Permission denied)\nstdout: (null)\nstderr: (null)\n"
        );
    }
}
