//! Interfaces to the remote server.
//!
//! The core only talks to the server through these two traits. A concrete
//! transport (see `simlink-net`) implements both; tests use an in-memory
//! server instead.

use linked_hash_map::LinkedHashMap;
use serde_repr::*;

use crate::address::Address;
use crate::codec::Variant;
use crate::error::Result;
use crate::field::info::{GetRangeRequest, ScalarFieldInfo, SurfaceInfo, VectorFieldInfo};
use crate::field::{Chunk, GetFieldsRequest};
use crate::Float;

/// Value reported for the `DataType` attribute of named object containers.
pub const CONTAINER_DATA_TYPE: &str = "NamedObjectContainer";

/// Server-declared metadata that can be queried for any address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Attribute {
    /// Names of the child nodes
    ChildNames,
    /// Names of the members of a named object container
    ObjectNames,
    /// Type of the node, see `CONTAINER_DATA_TYPE`
    DataType,
    /// Whether calling the node without arguments reads its state
    IsExtendedMenu,
    HelpString,
}

/// Request/response access to the remote model.
///
/// Implementations attach session credentials to every call and translate
/// their own failures into crate errors. No retries happen at this level.
pub trait ModelChannel: Send + Sync {
    fn get_attribute_value(&self, address: &Address, attribute: Attribute) -> Result<Variant>;

    fn get_state(&self, address: &Address) -> Result<Variant>;

    /// Writes new state. `None` clears the state at the address, which
    /// deletes a container member.
    fn set_state(&self, address: &Address, state: Option<Variant>) -> Result<()>;

    fn execute_command(
        &self,
        address: &Address,
        args: LinkedHashMap<String, Variant>,
    ) -> Result<Variant>;

    /// Releases the underlying transport.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Lazy, finite, non-restartable sequence of chunks. Every `next` call may
/// block until the server delivers the next chunk.
pub type ChunkStream<'a> = Box<dyn Iterator<Item = Result<Chunk>> + 'a>;

/// Access to field data computed by the server.
pub trait FieldChannel: Send + Sync {
    /// Issues one streaming request for all sub-requests of the batch.
    fn get_fields(&self, request: GetFieldsRequest) -> Result<ChunkStream<'_>>;

    /// Returns minimum and maximum of a field over the given surfaces.
    fn get_range(&self, request: GetRangeRequest) -> Result<(Float, Float)>;

    fn get_fields_info(&self) -> Result<Vec<ScalarFieldInfo>>;

    fn get_vector_fields_info(&self) -> Result<Vec<VectorFieldInfo>>;

    fn get_surfaces_info(&self) -> Result<Vec<SurfaceInfo>>;
}
