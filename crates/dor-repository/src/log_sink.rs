use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use tracing::info;

/// Receiver for user-supplied log messages attached to repository actions.
///
/// The engine calls this best-effort: a failing sink is reported through
/// `tracing` and never fails the operation it describes.
pub trait LogSink: Send + Sync {
    fn commit(&self, component: &str, operation: &str, message: &str) -> io::Result<()>;
}

/// Forwards log messages to the `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn commit(&self, component: &str, operation: &str, message: &str) -> io::Result<()> {
        info!(component, operation, message, "log message");
        Ok(())
    }
}

/// Appends log messages to a file, one tab-separated line per message:
/// `<rfc3339 timestamp>\t<component>\t<operation>\t<message>`.
///
/// Tabs and line breaks inside fields are replaced by spaces so every
/// message stays on one line.
pub struct FileLogSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileLogSink {
    /// Open (or create) the log file in append mode.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sanitize(field: &str) -> String {
        field.replace(['\t', '\r', '\n'], " ")
    }
}

impl LogSink for FileLogSink {
    fn commit(&self, component: &str, operation: &str, message: &str) -> io::Result<()> {
        let line = format!(
            "{}\t{}\t{}\t{}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::sanitize(component),
            Self::sanitize(operation),
            Self::sanitize(message),
        );
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

impl std::fmt::Debug for FileLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogSink").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_sink_appends_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("repository.log");
        let sink = FileLogSink::open(&path).unwrap();
        sink.commit("repository", "delete", "cleanup").unwrap();
        sink.commit("repository", "store", "multi\nline\tmessage").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields.len(), 4);
        assert!(chrono::DateTime::parse_from_rfc3339(fields[0]).is_ok());
        assert_eq!(&fields[1..], &["repository", "delete", "cleanup"]);

        assert!(lines[1].ends_with("multi line message"));
    }

    #[test]
    fn file_sink_reopens_in_append_mode() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repository.log");
        FileLogSink::open(&path).unwrap().commit("a", "b", "first").unwrap();
        FileLogSink::open(&path).unwrap().commit("a", "b", "second").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn open_fails_when_parent_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(FileLogSink::open(blocker.join("repository.log")).is_err());
    }

    #[test]
    fn tracing_sink_never_fails() {
        assert!(TracingLogSink.commit("c", "o", "m").is_ok());
    }
}
