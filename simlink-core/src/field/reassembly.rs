use std::convert::TryFrom;

use crate::error::{Error, Result};

use super::{payload_tag_mask, Chunk, FieldArray, Fields, PayloadInfo, SurfaceId};

/// Largest field a header may declare, in bytes.
pub const MAX_FIELD_BYTES: u64 = 1 << 32;

/// Single field rebuilt from the chunk stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledField {
    pub mask: u32,
    pub surface_id: SurfaceId,
    pub name: String,
    pub data: FieldArray,
}

struct OpenField {
    info: PayloadInfo,
    data: FieldArray,
    filled: usize,
}

impl OpenField {
    fn is_complete(&self) -> bool {
        self.filled == self.data.len()
    }

    fn truncated(self) -> Error {
        Error::TruncatedStream {
            field: self.info.field_name,
            filled: self.filled,
            expected: self.data.len(),
        }
    }

    fn finish(self) -> AssembledField {
        AssembledField {
            mask: payload_tag_mask(&self.info.payload_tags),
            surface_id: self.info.surface_id,
            name: self.info.field_name,
            data: self.data,
        }
    }
}

/// Rebuilds typed arrays from an ordered chunk stream.
///
/// Works as an iterator yielding one [`AssembledField`] per completed
/// field. Chunks are only pulled from the underlying stream as needed.
///
/// A header chunk may carry data of its own. Those elements are the first
/// of the field, so a server can send a small field in a single chunk.
/// Headers declaring more than [`MAX_FIELD_BYTES`] are rejected as
/// malformed before anything is allocated.
pub struct ChunkReassembler<I> {
    chunks: I,
    open: Option<OpenField>,
    failed: bool,
}

impl<I> ChunkReassembler<I>
where
    I: Iterator<Item = Result<Chunk>>,
{
    pub fn new(chunks: I) -> Self {
        ChunkReassembler {
            chunks,
            open: None,
            failed: false,
        }
    }

    /// Consumes the whole stream, grouping fields by tag mask, then
    /// surface id, then field name.
    pub fn into_fields(self) -> Result<Fields> {
        let mut fields = Fields::default();
        for field in self {
            let field = field?;
            fields
                .entry(field.mask)
                .or_default()
                .entry(field.surface_id)
                .or_default()
                .insert(field.name, field.data);
        }
        Ok(fields)
    }

    fn step(&mut self) -> Result<Option<AssembledField>> {
        loop {
            let chunk = match self.chunks.next() {
                Some(chunk) => chunk?,
                None => {
                    return match self.open.take() {
                        Some(open) => Err(open.truncated()),
                        None => Ok(None),
                    };
                }
            };

            if let Some(info) = chunk.payload_info {
                if let Some(open) = self.open.take() {
                    return Err(open.truncated());
                }
                trace!(
                    "field {} on surface {}: {:?} x {}",
                    info.field_name,
                    info.surface_id,
                    info.field_type,
                    info.field_size
                );
                let data = FieldArray::new(info.field_type, field_len(&info)?);
                self.open = Some(OpenField {
                    info,
                    data,
                    filled: 0,
                });
            }

            let open = match self.open.as_mut() {
                Some(open) => open,
                None => {
                    return Err(Error::MalformedStream(
                        "data chunk without a field header".to_string(),
                    ))
                }
            };
            let count = open.data.fill(open.filled, &chunk.payload)?;
            open.filled += count;
            trace!(
                "chunk: {} elements, {}/{}",
                count,
                open.filled,
                open.data.len()
            );

            if open.is_complete() {
                if let Some(open) = self.open.take() {
                    return Ok(Some(open.finish()));
                }
            }
        }
    }
}

fn field_len(info: &PayloadInfo) -> Result<usize> {
    let bytes = info
        .field_size
        .checked_mul(info.field_type.element_size() as u64);
    match bytes {
        Some(bytes) if bytes <= MAX_FIELD_BYTES => usize::try_from(info.field_size)
            .map_err(|_| Error::MalformedStream(format!("field {} is too large", info.field_name))),
        _ => Err(Error::MalformedStream(format!(
            "field {} declares {} elements, more than {} bytes",
            info.field_name, info.field_size, MAX_FIELD_BYTES
        ))),
    }
}

impl<I> Iterator for ChunkReassembler<I>
where
    I: Iterator<Item = Result<Chunk>>,
{
    type Item = Result<AssembledField>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.step() {
            Ok(field) => field.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use byteorder::{ByteOrder, LittleEndian};

    use super::*;
    use crate::field::{ChunkPayload, FieldType, PayloadTag};

    fn header(name: &str, field_type: FieldType, size: u64, surface: u32) -> Chunk {
        Chunk::header(PayloadInfo {
            field_name: name.to_string(),
            field_type,
            field_size: size,
            surface_id: surface,
            payload_tags: vec![],
        })
    }

    fn doubles(values: &[f64]) -> Chunk {
        let mut bytes = vec![0u8; values.len() * 8];
        LittleEndian::write_f64_into(values, &mut bytes);
        Chunk::data(ChunkPayload::Bytes(bytes))
    }

    fn reassemble(chunks: Vec<Chunk>) -> Result<Fields> {
        ChunkReassembler::new(chunks.into_iter().map(Ok)).into_fields()
    }

    #[test]
    fn field_split_over_two_chunks() {
        let fields = reassemble(vec![
            header("pressure", FieldType::DoubleArray, 5, 1),
            doubles(&[0., 1., 2.]),
            doubles(&[3., 4.]),
        ])
        .unwrap();
        assert_eq!(
            fields[&0][&1]["pressure"],
            FieldArray::Double(vec![0., 1., 2., 3., 4.])
        );
    }

    #[test]
    fn payload_on_header_chunk_counts() {
        let mut chunk = header("ids", FieldType::IntArray, 3, 4);
        chunk.payload = ChunkPayload::Int(vec![7, 8]);
        let fields = reassemble(vec![chunk, Chunk::data(ChunkPayload::Int(vec![9]))]).unwrap();
        assert_eq!(fields[&0][&4]["ids"], FieldArray::Int(vec![7, 8, 9]));
    }

    #[test]
    fn oversized_field_is_rejected() {
        let err = reassemble(vec![
            header("pressure", FieldType::DoubleArray, u64::MAX / 4, 1),
            doubles(&[1.0]),
        ])
        .unwrap_err();
        match err {
            Error::MalformedStream(message) => assert!(message.contains("pressure")),
            e => panic!("unexpected error: {}", e),
        }

        let largest = MAX_FIELD_BYTES / 4;
        assert!(reassemble(vec![header("ids", FieldType::IntArray, largest + 1, 1)]).is_err());
    }

    #[test]
    fn tags_select_outer_key() {
        let mut chunk = header("temperature", FieldType::FloatArray, 2, 3);
        chunk.payload_info.as_mut().unwrap().payload_tags =
            vec![PayloadTag::ElementLocation, PayloadTag::BoundaryValues];
        let fields = reassemble(vec![chunk, Chunk::data(ChunkPayload::Float(vec![1., 2.]))]).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[&10][&3]["temperature"], FieldArray::Float(vec![1., 2.]));
    }

    #[test]
    fn several_fields_and_surfaces() {
        let fields = reassemble(vec![
            header("pressure", FieldType::DoubleArray, 2, 1),
            doubles(&[1., 2.]),
            header("pressure", FieldType::DoubleArray, 1, 2),
            doubles(&[3.]),
            header("velocity", FieldType::DoubleArray, 3, 1),
            doubles(&[4., 5., 6.]),
        ])
        .unwrap();
        assert_eq!(fields[&0].len(), 2);
        assert_eq!(fields[&0][&1].len(), 2);
        assert_eq!(fields[&0][&2]["pressure"], FieldArray::Double(vec![3.]));
    }

    #[test]
    fn stream_ending_early_is_truncated() {
        let err = reassemble(vec![
            header("pressure", FieldType::DoubleArray, 5, 1),
            doubles(&[0., 1., 2., 3.]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            Error::TruncatedStream {
                field: "pressure".to_string(),
                filled: 4,
                expected: 5
            }
        );
    }

    #[test]
    fn new_header_before_completion_is_truncated() {
        let err = reassemble(vec![
            header("pressure", FieldType::DoubleArray, 2, 1),
            doubles(&[0.]),
            header("velocity", FieldType::DoubleArray, 1, 1),
            doubles(&[1.]),
        ])
        .unwrap_err();
        match err {
            Error::TruncatedStream { field, .. } => assert_eq!(field, "pressure"),
            e => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn data_without_header_is_malformed() {
        match reassemble(vec![doubles(&[1.])]) {
            Err(Error::MalformedStream(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_field_completes_on_header() {
        let fields = reassemble(vec![header("empty", FieldType::LongArray, 0, 9)]).unwrap();
        assert!(fields[&0][&9]["empty"].is_empty());
    }

    #[test]
    fn stream_errors_pass_through() {
        let chunks = vec![
            Ok(header("pressure", FieldType::DoubleArray, 2, 1)),
            Err(Error::TransportUnavailable("connection reset".to_string())),
        ];
        let mut reassembler = ChunkReassembler::new(chunks.into_iter());
        assert!(reassembler.next().unwrap().is_err());
        assert!(reassembler.next().is_none());
    }
}
