//! Error types.

use std::io;

pub type Result<T> = core::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

/// Crate-wide error type.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Channel can't be reached or was reset in the middle of a call.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),
    #[error("{0} is not available")]
    UnknownAddress(String),
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("truncated stream: field {field} got {filled} of {expected} elements")]
    TruncatedStream {
        field: String,
        filled: usize,
        expected: usize,
    },
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    #[error("invalid variant: {0}")]
    InvalidVariant(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("journal syntax error at line {line}: {message}")]
    JournalSyntax { line: usize, message: String },

    // IoError(#[from] io::Error),
    #[error("io error: {0}")]
    IoError(String),

    #[error("other error: {0}")]
    Other(String),
}

impl Error {
    /// Builds an `UnknownAddress` error for `name`, suggesting the closest
    /// of the `available` names if one is similar enough.
    pub fn not_available(name: &str, available: &[String]) -> Self {
        let suggestion = available
            .iter()
            .map(|a| (strsim::jaro_winkler(name, a), a))
            .filter(|(score, _)| *score > 0.8)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, a)| a);
        match suggestion {
            Some(s) => Error::UnknownAddress(format!("{} (did you mean {}?)", name, s)),
            None => Error::UnknownAddress(name.to_string()),
        }
    }
}

#[test]
fn not_available_suggests_close_names() {
    let available = vec!["velocity_inlet".to_string(), "wall".to_string()];
    let e = Error::not_available("velocity_inlt", &available);
    assert_eq!(
        e.to_string(),
        "velocity_inlt (did you mean velocity_inlet?) is not available"
    );
    let e = Error::not_available("xyz", &available);
    assert_eq!(e, Error::UnknownAddress("xyz".to_string()));
}
