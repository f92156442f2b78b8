use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_repr::*;

use crate::{Error, Result};

mod tcp;

pub(crate) use tcp::TcpSocket;

/// List of possible formats for encoding data sent over the network.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum Encoding {
    /// Fast binary format, useful for communicating directly between Rust apps
    Bincode,
    /// Binary format with implementations in many different languages
    MsgPack,
    /// Very common but more verbose format
    Json,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Bincode
    }
}

impl FromStr for Encoding {
    type Err = Error;
    fn from_str(s: &str) -> core::result::Result<Self, Error> {
        let e = match s.to_lowercase().as_str() {
            "bincode" | "bin" => Self::Bincode,
            #[cfg(feature = "msgpack_encoding")]
            "msgpack" | "messagepack" | "rmp" => Self::MsgPack,
            #[cfg(feature = "json_encoding")]
            "json" => Self::Json,
            _ => {
                return Err(Error::EncodingUnavailable(format!(
                    "failed parsing encoding from string: {}",
                    s
                )))
            }
        };
        Ok(e)
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bincode => write!(f, "bincode"),
            Self::MsgPack => write!(f, "msgpack"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Packs serializable object to bytes based on selected encoding.
pub(crate) fn pack<S: Serialize>(obj: &S, encoding: &Encoding) -> Result<Vec<u8>> {
    let packed: Vec<u8> = match encoding {
        Encoding::Bincode => bincode::serialize(obj)?,
        Encoding::MsgPack => {
            #[cfg(not(feature = "msgpack_encoding"))]
            return Err(Error::EncodingUnavailable(encoding.to_string()));
            #[cfg(feature = "msgpack_encoding")]
            {
                let mut buf = Vec::new();
                obj.serialize(&mut rmp_serde::Serializer::new(&mut buf))?;
                buf
            }
        }
        Encoding::Json => {
            #[cfg(not(feature = "json_encoding"))]
            return Err(Error::EncodingUnavailable(encoding.to_string()));
            #[cfg(feature = "json_encoding")]
            {
                serde_json::to_vec(obj)?
            }
        }
    };
    Ok(packed)
}

/// Unpacks object from bytes based on selected encoding.
pub(crate) fn unpack<'de, P: Deserialize<'de>>(bytes: &'de [u8], encoding: &Encoding) -> Result<P> {
    let unpacked = match encoding {
        Encoding::Bincode => bincode::deserialize(bytes)?,
        Encoding::MsgPack => {
            #[cfg(not(feature = "msgpack_encoding"))]
            return Err(Error::EncodingUnavailable(encoding.to_string()));
            #[cfg(feature = "msgpack_encoding")]
            {
                let mut de = rmp_serde::Deserializer::new(bytes).with_binary();
                Deserialize::deserialize(&mut de)?
            }
        }
        Encoding::Json => {
            #[cfg(not(feature = "json_encoding"))]
            return Err(Error::EncodingUnavailable(encoding.to_string()));
            #[cfg(feature = "json_encoding")]
            {
                serde_json::from_slice(bytes)?
            }
        }
    };
    Ok(unpacked)
}

#[test]
fn encoding_from_str() {
    assert_eq!(Encoding::from_str("Bincode").unwrap(), Encoding::Bincode);
    assert_eq!(Encoding::from_str("bin").unwrap(), Encoding::Bincode);
    assert!(Encoding::from_str("yaml").is_err());
}

#[cfg(not(feature = "json_encoding"))]
#[test]
fn disabled_encoding_is_an_error() {
    match pack(&1u32, &Encoding::Json) {
        Err(Error::EncodingUnavailable(e)) => assert_eq!(e, "json"),
        r => panic!("unexpected result: {:?}", r),
    }
}
