//! This library provides a network transport for `simlink` sessions.
//!
//! The core library talks to the server exclusively through its channel
//! traits. `Client` implements both of them on top of a single TCP
//! connection, exchanging length-prefixed [`Message`](msg::Message)
//! envelopes with the server.
//!
//! # Messages
//!
//! Each request and response is a payload struct serialized into the
//! envelope together with its type code and the session credentials.
//! Request/response pairs are strictly sequential, one in flight at a time.
//! The only exception is field data export, where a single request is
//! answered with any number of `FieldChunk` messages closed by a
//! `StreamEnd`.
//!
//! # Encodings
//!
//! `bincode` is always available. Other encodings are enabled with
//! crate features:
//!
//! ```toml
//! simlink-net = { version = "*", features = ["msgpack_encoding"] }
//! ```
//!
//! Payload compression with `lz4` is on by default and can be switched off
//! by disabling default features.
//!
//! # Connecting
//!
//! ```ignore
//! let mut session = simlink_net::connect("server_info.txt", ClientConfig::default())?;
//! let energy = session.root().child("setup")?.child("models")?.child("energy")?;
//! energy.set("enabled", true)?;
//! session.exit()?;
//! ```

#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

extern crate simlink_core as simlink;

pub mod msg;

mod client;
mod error;
mod server_info;
mod socket;

#[cfg(test)]
mod fake;

pub use client::{connect, Client, ClientConfig, CompressionPolicy};
pub use error::{Error, Result};
pub use server_info::ServerInfo;
pub use socket::Encoding;
