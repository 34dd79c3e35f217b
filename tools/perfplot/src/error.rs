//! Error taxonomy for the report pipeline.
//!
//! Every variant is fatal to a run. Structural problems in a log carry the
//! file and line that caused them so the log can be fixed without re-running.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the pipeline stages.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors produced by the report pipeline.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A file could not be read, written, copied or removed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// What was being attempted (`reading`, `copying`, ...).
        action: &'static str,
        /// The offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The log does not match the configured record layout.
    #[error("malformed log {}:{line}: {detail}", .file.display())]
    MalformedLog {
        /// Log file being decoded.
        file: PathBuf,
        /// 1-based line number in the source file (0 when the problem is
        /// not tied to a single line).
        line: usize,
        /// Expected vs. observed description.
        detail: String,
    },

    /// Samples cannot be reshaped into the requested tensor.
    #[error("shape mismatch for {what}: {detail}")]
    ShapeMismatch {
        /// Tensor being built, e.g. `speedup/time (s)`.
        what: String,
        /// Expected vs. observed shape or coordinate.
        detail: String,
    },

    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The plotting backend failed to produce an image.
    #[error("rendering {}: {message}", .path.display())]
    Render {
        /// Image being rendered.
        path: PathBuf,
        /// Backend error message.
        message: String,
    },

    /// A render target already exists.
    #[error("refusing to overwrite existing artifact {}", .0.display())]
    ArtifactExists(PathBuf),
}

impl ReportError {
    /// Build an [`ReportError::Io`] from a failed operation on `path`.
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Build a [`ReportError::MalformedLog`].
    pub fn malformed(file: impl Into<PathBuf>, line: usize, detail: impl Into<String>) -> Self {
        Self::MalformedLog {
            file: file.into(),
            line,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_log_names_file_and_line() {
        let err = ReportError::malformed("perf.log", 17, "expected 6 fields, found 4");
        assert_eq!(
            err.to_string(),
            "malformed log perf.log:17: expected 6 fields, found 4"
        );
    }

    #[test]
    fn io_error_names_action_and_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ReportError::io("reading", "/tmp/missing.log", source);
        let msg = err.to_string();
        assert!(msg.starts_with("reading /tmp/missing.log"), "unexpected: {msg}");
    }
}
