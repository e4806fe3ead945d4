//! Error types shared by every harness stage.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::method::Method;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Failure of an external program invocation.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {after:?} and was killed")]
    Timeout { program: String, after: Duration },

    #[error("'{program}' exited with {status}{}", fmt_output(.output))]
    NonZeroExit {
        program: String,
        status: String,
        output: String,
    },

    #[error("waiting on '{program}' failed: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn fmt_output(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(": {}", output)
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("building the {method} structure failed: {reason}")]
    StructureBuild { method: Method, reason: String },

    #[error("structure for {method} not found at {}", .path.display())]
    MissingStructure { method: Method, path: PathBuf },

    #[error("malformed measurement file {}: {detail}", .path.display())]
    MalformedSidecar { path: PathBuf, detail: String },

    #[error("malformed distance output {}: {detail}", .path.display())]
    MalformedOutput { path: PathBuf, detail: String },

    #[error("invalid query set {}: {detail}", .path.display())]
    QuerySet { path: PathBuf, detail: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot aggregate: {0}")]
    InvalidAggregate(String),

    #[error("session cancelled")]
    Cancelled,

    #[error("session deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error only invalidates the trial that produced it.
    pub fn is_measurement_error(&self) -> bool {
        matches!(
            self,
            HarnessError::MalformedSidecar { .. } | HarnessError::MalformedOutput { .. }
        )
    }
}
