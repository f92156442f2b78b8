//! Field data export and field metadata.

use simlink::field::info::{GetRangeRequest as RangeQuery, ScalarFieldInfo, SurfaceInfo, VectorFieldInfo};
use simlink::field::{Chunk, GetFieldsRequest as FieldsQuery};
use simlink::Float;

use crate::msg::{MessageType, Payload};

/// Starts a field export. The server answers with a sequence of
/// `FieldChunk` messages followed by `StreamEnd`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetFieldsRequest {
    pub request: FieldsQuery,
}
impl Payload for GetFieldsRequest {
    const TYPE: MessageType = MessageType::GetFieldsRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FieldChunk {
    pub chunk: Chunk,
}
impl Payload for FieldChunk {
    const TYPE: MessageType = MessageType::FieldChunk;
}

/// Closes a field export stream.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StreamEnd {}
impl Payload for StreamEnd {
    const TYPE: MessageType = MessageType::StreamEnd;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetRangeRequest {
    pub request: RangeQuery,
}
impl Payload for GetRangeRequest {
    const TYPE: MessageType = MessageType::GetRangeRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetRangeResponse {
    pub min: Float,
    pub max: Float,
}
impl Payload for GetRangeResponse {
    const TYPE: MessageType = MessageType::GetRangeResponse;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetFieldsInfoRequest {}
impl Payload for GetFieldsInfoRequest {
    const TYPE: MessageType = MessageType::GetFieldsInfoRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetFieldsInfoResponse {
    pub fields: Vec<ScalarFieldInfo>,
}
impl Payload for GetFieldsInfoResponse {
    const TYPE: MessageType = MessageType::GetFieldsInfoResponse;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetVectorFieldsInfoRequest {}
impl Payload for GetVectorFieldsInfoRequest {
    const TYPE: MessageType = MessageType::GetVectorFieldsInfoRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetVectorFieldsInfoResponse {
    pub fields: Vec<VectorFieldInfo>,
}
impl Payload for GetVectorFieldsInfoResponse {
    const TYPE: MessageType = MessageType::GetVectorFieldsInfoResponse;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetSurfacesInfoRequest {}
impl Payload for GetSurfacesInfoRequest {
    const TYPE: MessageType = MessageType::GetSurfacesInfoRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetSurfacesInfoResponse {
    pub surfaces: Vec<SurfaceInfo>,
}
impl Payload for GetSurfacesInfoResponse {
    const TYPE: MessageType = MessageType::GetSurfacesInfoResponse;
}
