//! Publisher error types

use contracts::OutputKind;
use thiserror::Error;

/// Output-side errors
#[derive(Debug, Error)]
pub enum OutputError {
    /// Nothing has been published for this output yet
    #[error("buffer not ready: {kind}")]
    BufferNotReady { kind: String },

    /// Export directory could not be prepared
    #[error("failed to create exporter at '{path}': {message}")]
    ExporterCreation { path: String, message: String },

    /// Serialization failure while exporting
    #[error("encode error: {0}")]
    Encode(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OutputError {
    pub fn not_ready(kind: OutputKind) -> Self {
        Self::BufferNotReady {
            kind: crate::kind_label(kind).to_string(),
        }
    }

    pub fn exporter_creation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExporterCreation {
            path: path.into(),
            message: message.into(),
        }
    }
}
