//! Error taxonomy for the risk pipeline.
//!
//! The split matters for recovery: `Upstream` aborts a run only when it comes
//! from routing, `Decode` and `Scoring` are confined to a single route, and
//! `ModelLoad` is fatal for the whole process.

use thiserror::Error;

/// A collaborator (routing or weather service) failed or returned bad data.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("{service} returned error status: {status}")]
    Status { service: &'static str, status: String },
    #[error("{service} response missing {field}")]
    MalformedResponse { service: &'static str, field: &'static str },
    #[error("no hour block matching {0} in today's forecast")]
    NoCurrentHour(String),
}

/// A route geometry could not be decoded into points.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("polyline truncated at byte {0}")]
    Truncated(usize),
    #[error("invalid polyline byte {byte:#04x} at {index}")]
    InvalidByte { byte: u8, index: usize },
    #[error("polyline value at byte {0} is too long")]
    Overflow(usize),
    #[error("coordinate out of range: ({lat}, {lon})")]
    OutOfRange { lat: f64, lon: f64 },
}

/// The scoring artifact rejected a feature frame. Confined to one route.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("frame has no rows")]
    EmptyFrame,
    #[error("frame has {got} columns, model expects {expected}")]
    ColumnMismatch { got: usize, expected: usize },
    #[error("non-finite score for route")]
    NonFinite,
}

/// The scoring artifact or its column schema could not be loaded.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("schema names unknown column {0:?}")]
    UnknownColumn(String),
    #[error("model is missing weight for column {0:?}")]
    MissingWeight(String),
}

/// A submitted location code failed validation. Recovered by re-prompting.
#[derive(Debug, Error)]
#[error("invalid location code {0:?}: expected six characters, letter-digit alternating")]
pub struct InvalidLocationCode(pub String);
