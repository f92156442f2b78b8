use crate::msg::{ErrorKind, MessageType};
use num_enum::TryFromPrimitiveError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Enumeration of errors that may occur during network operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bincode error: {0}")]
    BincodeError(#[from] bincode::Error),

    #[cfg(feature = "msgpack_encoding")]
    #[error("rmp_serde decode error: {0}")]
    RmpsDecodeError(#[from] rmp_serde::decode::Error),
    #[cfg(feature = "msgpack_encoding")]
    #[error("rmp_serde encode error: {0}")]
    RmpsEncodeError(#[from] rmp_serde::encode::Error),

    #[cfg(feature = "json_encoding")]
    #[error("serde_json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("encoding unavailable: {0}")]
    EncodingUnavailable(String),
    #[error("compressed payload received, but compression support is disabled")]
    CompressionUnavailable,

    #[error("unknown message code: {0}")]
    UnknownMsgCode(#[from] TryFromPrimitiveError<MessageType>),
    #[error("unexpected message: expected {expected:?}, got {found:?}")]
    UnexpectedMessage {
        expected: MessageType,
        found: MessageType,
    },

    /// Error reported by the server in an `ErrorResponse`.
    #[error("server error ({kind:?}): {message}")]
    Server { kind: ErrorKind, message: String },

    #[error("invalid server info: {0}")]
    ServerInfo(String),

    #[error("core error: {0}")]
    CoreError(#[from] simlink::error::Error),

    #[error("other: {0}")]
    Other(String),
}

impl From<Error> for simlink::error::Error {
    fn from(e: Error) -> Self {
        use simlink::error::Error as CoreError;
        match e {
            Error::Server { kind, message } => match kind {
                ErrorKind::Unauthenticated => CoreError::AuthenticationRejected(message),
                ErrorKind::NotFound => CoreError::UnknownAddress(message),
                ErrorKind::InvalidArgument => CoreError::InvalidMutation(message),
                ErrorKind::FailedPrecondition => CoreError::SchemaMismatch(message),
                _ => CoreError::TransportUnavailable(message),
            },
            Error::CoreError(e) => e,
            Error::ServerInfo(msg) => CoreError::InvalidAddress(msg),
            e => CoreError::TransportUnavailable(e.to_string()),
        }
    }
}
