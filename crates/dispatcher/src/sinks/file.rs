//! FileSink - writes each message to a timestamped file

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use contracts::{ContractError, Message, OutputConfig};
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;
use crate::metrics::SinkMetrics;

/// Filename timestamp, local wall time
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Extension used when none is configured
pub const DEFAULT_EXTENSION: &str = ".txt";

/// Sink that writes raw messages to disk files
///
/// Holds no mutable state; one instance is shared by every file task.
#[derive(Debug)]
pub struct FileSink {
    name: String,
    directory: PathBuf,
    extension: String,
    metrics: Arc<SinkMetrics>,
}

impl FileSink {
    /// Create a FileSink writing into `directory`
    ///
    /// The directory is not created; startup validation makes sure it exists.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            name: "file".to_string(),
            directory: directory.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Use `extension` (appended verbatim, e.g. `.astm`)
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Create from the `[output]` section
    ///
    /// # Errors
    /// The output directory does not exist or is not a directory
    pub fn from_config(config: &OutputConfig) -> Result<Self, DispatcherError> {
        if !config.directory.is_dir() {
            return Err(DispatcherError::sink_creation(
                "file",
                format!(
                    "output directory '{}' does not exist or is not a directory",
                    config.directory.display()
                ),
            ));
        }
        Ok(Self::new(&config.directory).with_extension(&config.extension))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// `<sender>-<timestamp><ext>`, or `<timestamp><ext>` without a sender
    ///
    /// The sender comes off the wire, so path separators, NUL and leading
    /// dots are replaced with `_` to keep the file inside the directory.
    pub fn filename(sender: &str, at: NaiveDateTime, extension: &str) -> String {
        let timestamp = at.format(TIMESTAMP_FORMAT);
        let sender = sanitize_sender(sender);
        if sender.is_empty() {
            format!("{timestamp}{extension}")
        } else {
            format!("{sender}-{timestamp}{extension}")
        }
    }

    /// Write `message` as if the clock read `at`
    ///
    /// The whole message goes out in a single write. A file written in the
    /// same second for the same sender is replaced.
    pub fn write_at(&self, message: &Message, at: NaiveDateTime) -> Result<PathBuf, ContractError> {
        let path = self
            .directory
            .join(Self::filename(&message.sender_name(), at, &self.extension));

        let content = message.to_bytes();
        File::create(&path)
            .and_then(|mut file| file.write_all(&content))
            .map_err(|e| {
                ContractError::sink_write(&self.name, format!("{}: {e}", path.display()))
            })?;

        Ok(path)
    }

    /// Write `message` stamped with the local wall clock
    pub fn write(&self, message: &Message) -> Result<PathBuf, ContractError> {
        self.write_at(message, Local::now().naive_local())
    }

    /// Write on the blocking pool
    ///
    /// Once started, the write runs to completion even if the awaiting task
    /// is aborted, so no file is left half written.
    #[instrument(
        name = "file_sink_persist",
        skip(self, message),
        fields(sink = %self.name, lines = message.len())
    )]
    pub async fn persist(self: Arc<Self>, message: Message) -> Result<PathBuf, ContractError> {
        let sink = Arc::clone(&self);
        let written = tokio::task::spawn_blocking(move || sink.write(&message))
            .await
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
            .and_then(|result| result);

        match &written {
            Ok(path) => {
                self.metrics.inc_write_count();
                observability::record_file_write(true);
                debug!(path = %path.display(), "Message written");
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                observability::record_file_write(false);
                error!(error = %e, "Write failed");
            }
        }
        written
    }
}

/// Sender reduced to a single plain path component
fn sanitize_sender(sender: &str) -> String {
    let mut leading = true;
    sender
        .chars()
        .map(|c| {
            let replace = matches!(c, '/' | '\\' | '\0') || (leading && c == '.');
            leading = leading && c == '.';
            if replace {
                '_'
            } else {
                c
            }
        })
        .collect()
}
