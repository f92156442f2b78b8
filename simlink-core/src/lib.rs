//! This library implements the client side of a remote simulation model.
//!
//! Programming interface is centered around the [`Session`] structure,
//! which owns the channels to a running server. The server's settings tree
//! is exposed as a tree of [`Node`]s, discovered lazily as it's navigated.
//! Nodes can be read, written and called, and named object containers
//! support creating, renaming and deleting their members. Field data
//! computed by the server is requested in batches through
//! [`FieldData`](field::FieldData).
//!
//! Every mutation can be mirrored into a [`Journal`](journal::Journal),
//! which can later be replayed against another session.
//!
//! # Networking
//!
//! By itself, this library does not provide any networking capability. All
//! communication goes through the [`ModelChannel`] and [`FieldChannel`]
//! traits. For an implementation talking to a server over TCP see
//! `simlink-net`.
//!
//! # Using the library
//!
//! To use `simlink-core` in your Rust project add the following to your
//! `Cargo.toml`:
//!
//! ```toml
//! simlink-core = "0.1.0"
//! ```
//!
//! ## Example
//!
//! ```ignore
//! extern crate simlink_core as simlink;
//! use simlink::{Session, Var};
//!
//! let mut session = Session::new(model_channel, field_channel);
//! let energy = session.root().child("setup")?.child("models")?.child("energy")?;
//! energy.set("enabled", true)?;
//! assert_eq!(energy.get("enabled")?, Var::Bool(true));
//!
//! let inlets = session
//!     .root()
//!     .child("setup")?
//!     .child("boundary_conditions")?
//!     .child("velocity_inlet")?
//!     .as_container()?;
//! inlets.create_or_update("cold-inlet", Var::Null)?;
//! inlets.rename("cold-inlet", "inlet-1")?;
//! ```
//!
//! [`Session`]: session/struct.Session.html
//! [`Node`]: node/enum.Node.html

#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

// reexports
pub use address::Address;
pub use channel::{Attribute, FieldChannel, ModelChannel};
pub use error::{Error, Result};
pub use node::{Node, NodeKind};
pub use session::Session;
pub use var::{Var, VarMap, VarType};

pub mod address;
pub mod channel;
pub mod codec;
pub mod error;
pub mod field;
pub mod journal;
pub mod node;
pub mod session;
pub mod var;

#[cfg(test)]
pub(crate) mod mock;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// Floating point number type used throughout the library.
pub type Float = f64;
