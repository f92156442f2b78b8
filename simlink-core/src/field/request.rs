use std::sync::Arc;

use serde_repr::*;

use crate::channel::FieldChannel;
use crate::error::Result;

use super::reassembly::ChunkReassembler;
use super::{Fields, SurfaceId};

/// Default size of a single streamed chunk in bytes.
pub const DEFAULT_CHUNK_SIZE: u32 = 256 * 1024;
/// Vector field requested when no name is given.
pub const DEFAULT_VECTOR_FIELD: &str = "velocity";

/// Where scalar field values are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum DataLocation {
    Nodes,
    Elements,
}

/// Geometry options for surface requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceRequestOptions {
    pub overset_mesh: bool,
    pub provide_vertices: bool,
    pub provide_faces: bool,
    pub provide_faces_centroid: bool,
    pub provide_faces_normal: bool,
}

impl Default for SurfaceRequestOptions {
    fn default() -> Self {
        SurfaceRequestOptions {
            overset_mesh: false,
            provide_vertices: true,
            provide_faces: true,
            provide_faces_centroid: false,
            provide_faces_normal: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRequest {
    pub surface_id: SurfaceId,
    pub options: SurfaceRequestOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFieldRequest {
    pub surface_id: SurfaceId,
    pub scalar_field_name: String,
    pub data_location: DataLocation,
    pub provide_boundary_values: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorFieldRequest {
    pub surface_id: SurfaceId,
    pub vector_field_name: String,
}

/// One outbound field export request holding every sub-request of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetFieldsRequest {
    pub provide_bytes_stream: bool,
    pub chunk_size: u32,
    pub surface_requests: Vec<SurfaceRequest>,
    pub scalar_field_requests: Vec<ScalarFieldRequest>,
    pub vector_field_requests: Vec<VectorFieldRequest>,
}

impl GetFieldsRequest {
    pub fn new(config: &FieldDataConfig) -> Self {
        GetFieldsRequest {
            provide_bytes_stream: config.bytes_stream,
            chunk_size: config.chunk_size,
            surface_requests: Vec::new(),
            scalar_field_requests: Vec::new(),
            vector_field_requests: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.surface_requests.is_empty()
            && self.scalar_field_requests.is_empty()
            && self.vector_field_requests.is_empty()
    }
}

/// Streaming settings applied to every batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDataConfig {
    pub chunk_size: u32,
    /// Ask for raw little-endian byte payloads instead of typed ones
    pub bytes_stream: bool,
}

impl Default for FieldDataConfig {
    fn default() -> Self {
        FieldDataConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            bytes_stream: true,
        }
    }
}

/// Batches field export requests.
///
/// Any number of `add_*` calls accumulate into a single request that is
/// sent by [`FieldData::get_fields`]. The batch is consumed by that call,
/// so a second call without new requests returns an empty result.
pub struct FieldData {
    channel: Arc<dyn FieldChannel>,
    config: FieldDataConfig,
    request: Option<GetFieldsRequest>,
}

impl FieldData {
    pub fn new(channel: Arc<dyn FieldChannel>, config: FieldDataConfig) -> Self {
        FieldData {
            channel,
            config,
            request: None,
        }
    }

    pub fn config(&self) -> &FieldDataConfig {
        &self.config
    }

    /// Currently accumulated batch, if any.
    pub fn pending(&self) -> Option<&GetFieldsRequest> {
        self.request.as_ref()
    }

    fn request_mut(&mut self) -> &mut GetFieldsRequest {
        let config = &self.config;
        self.request
            .get_or_insert_with(|| GetFieldsRequest::new(config))
    }

    /// Requests surface geometry (vertices, faces and so on) for each of
    /// the surfaces.
    pub fn add_get_surfaces_request(
        &mut self,
        surface_ids: &[SurfaceId],
        options: SurfaceRequestOptions,
    ) {
        let request = self.request_mut();
        request
            .surface_requests
            .extend(surface_ids.iter().map(|&surface_id| SurfaceRequest {
                surface_id,
                options,
            }));
    }

    /// Requests a scalar field sampled at nodes when `node_value` is set,
    /// at elements otherwise.
    pub fn add_get_scalar_fields_request(
        &mut self,
        surface_ids: &[SurfaceId],
        field_name: &str,
        node_value: bool,
        boundary_value: bool,
    ) {
        let data_location = if node_value {
            DataLocation::Nodes
        } else {
            DataLocation::Elements
        };
        let request = self.request_mut();
        request
            .scalar_field_requests
            .extend(surface_ids.iter().map(|&surface_id| ScalarFieldRequest {
                surface_id,
                scalar_field_name: field_name.to_string(),
                data_location,
                provide_boundary_values: boundary_value,
            }));
    }

    /// Requests a vector field, `velocity` if no name is given.
    pub fn add_get_vector_fields_request(
        &mut self,
        surface_ids: &[SurfaceId],
        field_name: Option<&str>,
    ) {
        let name = field_name.unwrap_or(DEFAULT_VECTOR_FIELD);
        let request = self.request_mut();
        request
            .vector_field_requests
            .extend(surface_ids.iter().map(|&surface_id| VectorFieldRequest {
                surface_id,
                vector_field_name: name.to_string(),
            }));
    }

    /// Sends the accumulated batch and reassembles the reply.
    pub fn get_fields(&mut self) -> Result<Fields> {
        let request = match self.request.take() {
            Some(request) if !request.is_empty() => request,
            _ => return Ok(Fields::default()),
        };
        debug!(
            "get_fields: {} surface, {} scalar, {} vector requests",
            request.surface_requests.len(),
            request.scalar_field_requests.len(),
            request.vector_field_requests.len()
        );
        let stream = self.channel.get_fields(request)?;
        ChunkReassembler::new(stream).into_fields()
    }
}
