//! Field data export.
//!
//! Field data (surface geometry, scalar and vector fields) is requested in
//! batches. [`FieldData`] collects requests into a single
//! [`GetFieldsRequest`], and the server answers it with a stream of
//! [`Chunk`]s that the [`ChunkReassembler`] turns back into typed arrays.
//!
//! Results are grouped by payload tag mask, then by surface id, then by
//! field name:
//!
//! ```ignore
//! let mut field_data = session.field_data();
//! field_data.add_get_scalar_fields_request(&[1, 2], "pressure", true, false);
//! let fields = field_data.get_fields()?;
//! let pressure = &fields[&0][&1]["pressure"];
//! ```

use byteorder::{ByteOrder, LittleEndian};
use fnv::FnvHashMap;
use serde_repr::*;

use crate::error::{Error, Result};

pub mod info;
mod reassembly;
mod request;

pub use info::FieldInfo;
pub use reassembly::{AssembledField, ChunkReassembler, MAX_FIELD_BYTES};
pub use request::{
    DataLocation, FieldData, FieldDataConfig, GetFieldsRequest, ScalarFieldRequest,
    SurfaceRequest, SurfaceRequestOptions, VectorFieldRequest, DEFAULT_CHUNK_SIZE,
    DEFAULT_VECTOR_FIELD,
};

/// Surface identifier type.
pub type SurfaceId = u32;

/// Reassembled result of one export: mask -> surface -> field name -> array.
pub type Fields = FnvHashMap<u32, FnvHashMap<SurfaceId, FnvHashMap<String, FieldArray>>>;

/// Element datatype of a streamed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum FieldType {
    IntArray,
    LongArray,
    FloatArray,
    DoubleArray,
}

impl FieldType {
    /// Size of a single element in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            FieldType::IntArray | FieldType::FloatArray => 4,
            FieldType::LongArray | FieldType::DoubleArray => 8,
        }
    }
}

/// Classification markers attached to streamed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum PayloadTag {
    OversetMesh,
    ElementLocation,
    NodeLocation,
    BoundaryValues,
}

impl PayloadTag {
    pub fn bit(&self) -> u32 {
        match self {
            PayloadTag::OversetMesh => 1,
            PayloadTag::ElementLocation => 2,
            PayloadTag::NodeLocation => 4,
            PayloadTag::BoundaryValues => 8,
        }
    }
}

/// Combines a set of tags into the mask used as the outermost result key.
/// No tags gives 0.
pub fn payload_tag_mask(tags: &[PayloadTag]) -> u32 {
    tags.iter().fold(0, |mask, tag| mask | tag.bit())
}

/// Header announcing a new field in the chunk stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadInfo {
    pub field_name: String,
    pub field_type: FieldType,
    /// Number of elements the field is made of
    pub field_size: u64,
    pub surface_id: SurfaceId,
    pub payload_tags: Vec<PayloadTag>,
}

/// Data carried by a single chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChunkPayload {
    Empty,
    /// Raw little-endian elements
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

/// Single unit of the streamed field data reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Set on the chunk that starts a new field
    pub payload_info: Option<PayloadInfo>,
    pub payload: ChunkPayload,
}

impl Chunk {
    pub fn header(info: PayloadInfo) -> Self {
        Chunk {
            payload_info: Some(info),
            payload: ChunkPayload::Empty,
        }
    }

    pub fn data(payload: ChunkPayload) -> Self {
        Chunk {
            payload_info: None,
            payload,
        }
    }
}

/// Fixed-length typed array of a reassembled field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldArray {
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

macro_rules! cast_into {
    ($dst:expr, $payload:expr) => {
        match $payload {
            ChunkPayload::Int(src) => cast_copy($dst, src),
            ChunkPayload::Long(src) => cast_copy($dst, src),
            ChunkPayload::Float(src) => cast_copy($dst, src),
            ChunkPayload::Double(src) => cast_copy($dst, src),
            ChunkPayload::Bytes(_) | ChunkPayload::Empty => 0,
        }
    };
}

macro_rules! impl_cast_copy {
    ($($src:ty => $($dst:ty),*);*) => {
        $($(
            impl CastFrom<$src> for $dst {
                fn cast_from(v: $src) -> Self {
                    v as $dst
                }
            }
        )*)*
    };
}

trait CastFrom<T> {
    fn cast_from(v: T) -> Self;
}

impl_cast_copy!(
    i32 => i32, i64, f32, f64;
    i64 => i32, i64, f32, f64;
    f32 => i32, i64, f32, f64;
    f64 => i32, i64, f32, f64
);

/// Copies as many elements as fit, returning the count.
fn cast_copy<S: Copy, D: CastFrom<S>>(dst: &mut [D], src: &[S]) -> usize {
    let count = src.len().min(dst.len());
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = D::cast_from(*s);
    }
    count
}

impl FieldArray {
    /// Zero-filled array of the given type and size.
    pub fn new(field_type: FieldType, size: usize) -> Self {
        match field_type {
            FieldType::IntArray => FieldArray::Int(vec![0; size]),
            FieldType::LongArray => FieldArray::Long(vec![0; size]),
            FieldType::FloatArray => FieldArray::Float(vec![0.; size]),
            FieldType::DoubleArray => FieldArray::Double(vec![0.; size]),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldArray::Int(_) => FieldType::IntArray,
            FieldArray::Long(_) => FieldType::LongArray,
            FieldArray::Float(_) => FieldType::FloatArray,
            FieldArray::Double(_) => FieldType::DoubleArray,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldArray::Int(v) => v.len(),
            FieldArray::Long(v) => v.len(),
            FieldArray::Float(v) => v.len(),
            FieldArray::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies chunk payload into the array starting at index `at`. Returns
    /// the number of elements written, never more than what's left.
    pub fn fill(&mut self, at: usize, payload: &ChunkPayload) -> Result<usize> {
        if at > self.len() {
            return Err(Error::MalformedStream(format!(
                "fill index {} past array length {}",
                at,
                self.len()
            )));
        }
        let count = match payload {
            ChunkPayload::Bytes(bytes) => self.fill_bytes(at, bytes),
            _ => match self {
                FieldArray::Int(arr) => cast_into!(&mut arr[at..], payload),
                FieldArray::Long(arr) => cast_into!(&mut arr[at..], payload),
                FieldArray::Float(arr) => cast_into!(&mut arr[at..], payload),
                FieldArray::Double(arr) => cast_into!(&mut arr[at..], payload),
            },
        };
        Ok(count)
    }

    fn fill_bytes(&mut self, at: usize, bytes: &[u8]) -> usize {
        let size = self.field_type().element_size();
        let count = (bytes.len() / size).min(self.len() - at);
        let src = &bytes[..count * size];
        match self {
            FieldArray::Int(arr) => LittleEndian::read_i32_into(src, &mut arr[at..at + count]),
            FieldArray::Long(arr) => LittleEndian::read_i64_into(src, &mut arr[at..at + count]),
            FieldArray::Float(arr) => LittleEndian::read_f32_into(src, &mut arr[at..at + count]),
            FieldArray::Double(arr) => LittleEndian::read_f64_into(src, &mut arr[at..at + count]),
        }
        count
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            FieldArray::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            FieldArray::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            FieldArray::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            FieldArray::Long(v) => Some(v),
            _ => None,
        }
    }
}
