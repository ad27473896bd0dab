//! Log sinks
//!
//! Two process-wide sinks: one for access and info lines, one for errors and
//! warnings. Each is stdout/stderr or an append-mode file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

static SINKS: OnceLock<LogWriter> = OnceLock::new();

/// One serialized output stream
struct Sink(Mutex<Box<dyn Write + Send>>);

impl Sink {
    fn new(out: impl Write + Send + 'static) -> Self {
        Self(Mutex::new(Box::new(out)))
    }

    /// Append to `path`, creating it and its parent directories
    fn file(path: &str) -> io::Result<Self> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }

    fn line(&self, message: &str) {
        // A writer that panicked mid-line leaves the stream usable
        let mut out = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(out, "{message}");
        let _ = out.flush();
    }
}

pub struct LogWriter {
    access: Sink,
    error: Sink,
}

impl LogWriter {
    fn open(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        let access = access_log_file.map_or_else(|| Ok(Sink::new(io::stdout())), Sink::file)?;
        let error = error_log_file.map_or_else(|| Ok(Sink::new(io::stderr())), Sink::file)?;
        Ok(Self { access, error })
    }

    pub fn write_access(&self, message: &str) {
        self.access.line(message);
    }

    /// Info lines share the access sink
    pub fn write_info(&self, message: &str) {
        self.access.line(message);
    }

    pub fn write_error(&self, message: &str) {
        self.error.line(message);
    }
}

/// Open the configured sinks; only the first call takes effect
pub fn init(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<()> {
    let writer = LogWriter::open(access_log_file, error_log_file)?;
    SINKS
        .set(writer)
        .map_err(|_| io::Error::new(io::ErrorKind::AlreadyExists, "log sinks already open"))
}

/// The global sinks, once `init` has run
pub fn get() -> Option<&'static LogWriter> {
    SINKS.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sinks_append() {
        let dir = tempfile::tempdir().unwrap();
        let access = dir.path().join("logs/access.log");
        let error = dir.path().join("logs/error.log");

        let writer =
            LogWriter::open(Some(access.to_str().unwrap()), Some(error.to_str().unwrap())).unwrap();
        writer.write_access("GET /api/protected-assets/a.png 200");
        writer.write_info("started");
        writer.write_error("[ERROR] disk");

        let access_text = std::fs::read_to_string(&access).unwrap();
        assert_eq!(access_text, "GET /api/protected-assets/a.png 200\nstarted\n");
        let error_text = std::fs::read_to_string(&error).unwrap();
        assert_eq!(error_text, "[ERROR] disk\n");
    }
}
