//! Message definitions.
//!
//! Every exchange with the server is a [`Message`] envelope carrying one
//! serialized payload struct. Payload structs declare their
//! [`MessageType`] through the [`Payload`] trait.

use std::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_repr::*;

use crate::client::CompressionPolicy;
use crate::socket::{pack, unpack, Encoding};
use crate::{Error, Result};

mod datamodel;
mod field_data;

pub use datamodel::*;
pub use field_data::*;

/// Type codes of all known messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageType {
    ErrorResponse = 0,
    Disconnect,

    GetAttributeValueRequest,
    GetAttributeValueResponse,
    GetStateRequest,
    GetStateResponse,
    SetStateRequest,
    SetStateResponse,
    ExecuteCommandRequest,
    ExecuteCommandResponse,

    GetFieldsRequest,
    FieldChunk,
    StreamEnd,
    GetRangeRequest,
    GetRangeResponse,
    GetFieldsInfoRequest,
    GetFieldsInfoResponse,
    GetVectorFieldsInfoRequest,
    GetVectorFieldsInfoResponse,
    GetSurfacesInfoRequest,
    GetSurfacesInfoResponse,
}

/// Allows payload structs to state their message type.
pub trait Payload: Serialize + DeserializeOwned {
    const TYPE: MessageType;
}

/// Defines a single message, which is a wrapper around a payload.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Message {
    /// Type code of the payload
    pub type_: u8,
    /// Session credentials
    pub auth: String,
    /// Size of uncompressed payload
    pub payload_size: u32,
    /// Byte representation of the payload
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

impl Message {
    /// Creates a complete `Message` from a payload struct, compressing the
    /// payload if the policy says so.
    pub fn from_payload<P: Payload>(
        payload: &P,
        auth: &str,
        encoding: &Encoding,
        compression: &CompressionPolicy,
    ) -> Result<Message> {
        let bytes = pack(payload, encoding)?;
        let payload_size = bytes.len() as u32;
        let payload = if compression.applies(bytes.len()) {
            compress_payload(bytes)?
        } else {
            bytes
        };
        Ok(Message {
            type_: P::TYPE.into(),
            auth: auth.to_string(),
            payload_size,
            payload,
        })
    }

    pub fn type_(&self) -> Result<MessageType> {
        Ok(MessageType::try_from(self.type_)?)
    }

    /// Payload is compressed whenever its size differs from the declared
    /// uncompressed size.
    pub fn is_compressed(&self) -> bool {
        self.payload_size as usize != self.payload.len()
    }

    /// Unpacks message payload into a payload struct of provided type.
    pub fn unpack_payload<P: Payload>(&self, encoding: &Encoding) -> Result<P> {
        let found = self.type_()?;
        if found != P::TYPE {
            return Err(Error::UnexpectedMessage {
                expected: P::TYPE,
                found,
            });
        }
        if self.is_compressed() {
            let decompressed = decompress_payload(&self.payload, self.payload_size)?;
            unpack(&decompressed, encoding)
        } else {
            unpack(&self.payload, encoding)
        }
    }

    /// Unpacks the reply to a request. An `ErrorResponse` from the server
    /// is turned into an error.
    pub fn into_response<P: Payload>(self, encoding: &Encoding) -> Result<P> {
        if self.type_()? == MessageType::ErrorResponse {
            let resp: ErrorResponse = self.unpack_payload(encoding)?;
            return Err(resp.into());
        }
        self.unpack_payload(encoding)
    }
}

#[cfg(feature = "lz4")]
fn compress_payload(bytes: Vec<u8>) -> Result<Vec<u8>> {
    let compressed = lz4::block::compress(&bytes, None, false)?;
    // an equal length would read as uncompressed on the other side
    if compressed.len() >= bytes.len() {
        return Ok(bytes);
    }
    Ok(compressed)
}

#[cfg(not(feature = "lz4"))]
fn compress_payload(bytes: Vec<u8>) -> Result<Vec<u8>> {
    Ok(bytes)
}

#[cfg(feature = "lz4")]
fn decompress_payload(bytes: &[u8], size: u32) -> Result<Vec<u8>> {
    Ok(lz4::block::decompress(bytes, Some(size as i32))?)
}

#[cfg(not(feature = "lz4"))]
fn decompress_payload(_bytes: &[u8], _size: u32) -> Result<Vec<u8>> {
    Err(Error::CompressionUnavailable)
}

/// Category of a failure reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ErrorKind {
    Unknown,
    Unauthenticated,
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    Unavailable,
    Internal,
}

/// Sent by the server instead of the expected response, or in place of
/// the next chunk of a stream.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}
impl Payload for ErrorResponse {
    const TYPE: MessageType = MessageType::ErrorResponse;
}

impl From<ErrorResponse> for Error {
    fn from(resp: ErrorResponse) -> Self {
        Error::Server {
            kind: resp.kind,
            message: resp.message,
        }
    }
}

/// One-way notice that the client is going away.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Disconnect {}
impl Payload for Disconnect {
    const TYPE: MessageType = MessageType::Disconnect;
}
