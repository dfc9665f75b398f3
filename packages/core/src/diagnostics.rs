//! Startup diagnostics log
//!
//! Append-only `key=value` lines under the per-user directory, written on
//! every bootstrap attempt and for every blocked navigation. The log is the
//! operator's first stop when a deployment misbehaves, so writes are best
//! effort: a failure to log never fails the pipeline. The core never
//! rotates or truncates the file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::paths;

/// Handle to the append-only startup log.
///
/// Cheap to clone; every clone appends to the same file.
#[derive(Debug, Clone)]
pub struct StartupLog {
    path: Option<PathBuf>,
}

impl StartupLog {
    /// Log under the per-user directory (`…/kiosk-client/logs/startup.log`).
    /// Disabled when the platform config directory cannot be determined.
    pub fn in_user_dir() -> Self {
        Self {
            path: paths::startup_log_file(),
        }
    }

    /// Log at an explicit path (tests)
    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// A log that drops everything
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Append one line, creating parent directories on first use
    pub fn append(&self, line: &str) {
        let Some(path) = &self.path else {
            return;
        };

        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{line}");
        }
    }

    /// Append a batch of lines
    pub fn append_all<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.append(line.as_ref());
        }
    }
}

/// Seconds since the Unix epoch, for log line timestamps
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
