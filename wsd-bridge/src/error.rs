//! Error types for the WSD bridge.
//!
//! The variants map onto the failure categories a classifier call can hit:
//! protocol desynchronization, an unhealthy or failed worker process,
//! corrupt probability values, and truncated output. A call either fully
//! succeeds or surfaces one of these; partial results are never produced.

use std::io;
use std::num::ParseFloatError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the saldowsd classifier.
#[derive(Error, Debug)]
pub enum WsdError {
    #[error("Failed to spawn classifier process: {0}")]
    Spawn(#[source] io::Error),

    #[error("I/O error while talking to the classifier: {0}")]
    Io(#[from] io::Error),

    #[error("Classifier exited with {status}: {stderr}")]
    WorkerFailed { status: String, stderr: String },

    #[error("Classifier worker is unhealthy: {0}")]
    WorkerUnhealthy(String),

    #[error("Classifier did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Protocol desynchronization: expected {expected} {unit}, got {got}")]
    Desync {
        expected: usize,
        got: usize,
        unit: &'static str,
    },

    #[error("Malformed classifier record ({0} fields): {1:?}")]
    MalformedRecord(usize, String),

    #[error("Classifier output ended prematurely")]
    TruncatedOutput,

    #[error("Classifier output is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("Invalid probability {value:?} returned for sense {sense:?}")]
    InvalidProbability {
        sense: String,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("Annotation arrays are not index-aligned: {0}")]
    AnnotationMismatch(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl WsdError {
    /// Desynchronization error with a positional unit name for the message.
    pub(crate) fn desync(expected: usize, got: usize, unit: &'static str) -> Self {
        Self::Desync {
            expected,
            got,
            unit,
        }
    }
}
