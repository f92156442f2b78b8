//! In-memory server used by tests.
//!
//! Serves a small fixed model resembling a solver settings tree and
//! synthesizes field data for any request. Every call is logged so tests
//! can count round trips.

use std::sync::{Mutex, MutexGuard};

use byteorder::{ByteOrder, LittleEndian};
use fnv::FnvHashMap;
use linked_hash_map::LinkedHashMap;

use crate::address::{escape, unescape, Address};
use crate::channel::{Attribute, ChunkStream, FieldChannel, ModelChannel, CONTAINER_DATA_TYPE};
use crate::codec::{decode, encode, Variant};
use crate::error::{Error, Result};
use crate::field::info::{GetRangeRequest, ScalarFieldInfo, SurfaceInfo, VectorFieldInfo};
use crate::field::{
    Chunk, ChunkPayload, DataLocation, FieldType, GetFieldsRequest, PayloadInfo, PayloadTag,
};
use crate::var::{Var, VarMap};
use crate::Float;

type Children = Vec<(&'static str, Schema)>;

pub(crate) enum Schema {
    Group(Children),
    /// Named object container, holding the schema of its members
    Container(Children),
    /// Value with its default
    Leaf(Var),
    Command,
}

enum Position<'a> {
    Group(&'a Children),
    Container(&'a Children),
    Member(&'a Children),
    Leaf(&'a Var),
    Command,
}

#[derive(Default)]
pub(crate) struct MockState {
    pub values: FnvHashMap<String, Var>,
    pub members: FnvHashMap<String, Vec<String>>,
    pub calls: Vec<String>,
    pub field_requests: Vec<GetFieldsRequest>,
    pub closed: bool,
}

pub(crate) struct MockServer {
    root: Children,
    state: Mutex<MockState>,
}

fn group(children: Children) -> Schema {
    Schema::Group(children)
}

fn leaf(default: impl Into<Var>) -> Schema {
    Schema::Leaf(default.into())
}

impl MockServer {
    pub fn new() -> Self {
        let root = vec![
            (
                "setup",
                group(vec![
                    (
                        "models",
                        group(vec![("energy", group(vec![("enabled", leaf(false))]))]),
                    ),
                    (
                        "boundary_conditions",
                        group(vec![(
                            "velocity_inlet",
                            Schema::Container(vec![(
                                "momentum",
                                group(vec![
                                    ("velocity", leaf(0.0)),
                                    ("reference_frame", leaf("Absolute")),
                                ]),
                            )]),
                        )]),
                    ),
                ]),
            ),
            (
                "results",
                group(vec![(
                    "graphics",
                    group(vec![(
                        "mesh",
                        Schema::Container(vec![
                            ("surfaces_list", leaf(Vec::<Var>::new())),
                            ("show_edges", leaf(false)),
                        ]),
                    )]),
                )]),
            ),
            (
                "solution",
                group(vec![(
                    "run_calculation",
                    group(vec![
                        ("iter_count", leaf(1)),
                        ("iterate", Schema::Command),
                    ]),
                )]),
            ),
            (
                "file",
                group(vec![
                    ("import", group(vec![("case", Schema::Command)])),
                    ("read_case", Schema::Command),
                ]),
            ),
        ];
        MockServer {
            root,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Adds a command directly below the root.
    pub fn with_root_command(mut self, name: &'static str) -> Self {
        self.root.push((name, Schema::Command));
        self
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Number of logged calls starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }

    fn log(&self, call: String) {
        self.state().calls.push(call);
    }

    fn locate(&self, address: &Address) -> Result<Position<'_>> {
        let mut position = Position::Group(&self.root);
        for segment in address.segments() {
            let children = match position {
                Position::Group(c) | Position::Member(c) => c,
                _ => return Err(Error::UnknownAddress(address.to_string())),
            };
            let name = unescape(&segment.name);
            let schema = children
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, s)| s)
                .ok_or_else(|| Error::UnknownAddress(address.to_string()))?;
            position = match (schema, &segment.instance) {
                (Schema::Group(c), None) => Position::Group(c),
                (Schema::Container(c), None) => Position::Container(c),
                (Schema::Container(c), Some(_)) => Position::Member(c),
                (Schema::Leaf(v), None) => Position::Leaf(v),
                (Schema::Command, None) => Position::Command,
                _ => return Err(Error::UnknownAddress(address.to_string())),
            };
        }
        Ok(position)
    }

    fn member_exists(state: &MockState, address: &Address) -> bool {
        let container = address.container().to_wire_path();
        match (state.members.get(&container), address.last()) {
            (Some(members), Some(last)) => last
                .instance
                .as_ref()
                .map(|i| members.contains(i))
                .unwrap_or(false),
            _ => false,
        }
    }

    fn read(&self, state: &MockState, address: &Address) -> Result<Var> {
        let read_children = |children: &Children, fields: &mut VarMap| -> Result<()> {
            for (name, schema) in children {
                if let Schema::Command = schema {
                    continue;
                }
                let value = self.read(state, &address.child(&escape(name)))?;
                fields.insert(name.to_string(), value);
            }
            Ok(())
        };
        match self.locate(address)? {
            Position::Leaf(default) => Ok(state
                .values
                .get(&address.to_wire_path())
                .cloned()
                .unwrap_or_else(|| default.clone())),
            Position::Group(children) => {
                let mut fields = VarMap::new();
                read_children(children, &mut fields)?;
                Ok(Var::Struct(fields))
            }
            Position::Member(children) => {
                if !Self::member_exists(state, address) {
                    return Err(Error::UnknownAddress(address.to_string()));
                }
                let mut fields = VarMap::new();
                let instance = address
                    .last()
                    .and_then(|s| s.instance.clone())
                    .unwrap_or_default();
                fields.insert("name".to_string(), Var::from(instance));
                read_children(children, &mut fields)?;
                Ok(Var::Struct(fields))
            }
            Position::Container(_) => {
                let mut fields = VarMap::new();
                let names = state
                    .members
                    .get(&address.to_wire_path())
                    .cloned()
                    .unwrap_or_default();
                for name in names {
                    let value = self.read(state, &address.member(&name))?;
                    fields.insert(name, value);
                }
                Ok(Var::Struct(fields))
            }
            Position::Command => Err(Error::SchemaMismatch(format!(
                "{} is a command",
                address
            ))),
        }
    }

    fn write(&self, state: &mut MockState, address: &Address, value: Option<Var>) -> Result<()> {
        match self.locate(address)? {
            Position::Leaf(_) => {
                match value {
                    Some(v) => state.values.insert(address.to_wire_path(), v),
                    None => state.values.remove(&address.to_wire_path()),
                };
                Ok(())
            }
            Position::Group(_) => match value {
                Some(Var::Struct(fields)) => {
                    for (name, v) in fields {
                        self.write(state, &address.child(&escape(&name)), Some(v))?;
                    }
                    Ok(())
                }
                _ => Err(Error::InvalidMutation(format!("{} takes a struct", address))),
            },
            Position::Member(_) => self.write_member(state, address, value),
            Position::Container(_) => Err(Error::InvalidMutation(format!(
                "{} can't be written as a whole",
                address
            ))),
            Position::Command => Err(Error::SchemaMismatch(format!(
                "{} is a command",
                address
            ))),
        }
    }

    fn write_member(
        &self,
        state: &mut MockState,
        address: &Address,
        value: Option<Var>,
    ) -> Result<()> {
        let container = address.container().to_wire_path();
        let instance = address
            .last()
            .and_then(|s| s.instance.clone())
            .unwrap_or_default();
        let prefix = format!("{}/", address.to_wire_path());

        let mut fields = match value {
            None => {
                let members = state.members.entry(container).or_default();
                let idx = members
                    .iter()
                    .position(|m| *m == instance)
                    .ok_or_else(|| Error::UnknownAddress(address.to_string()))?;
                members.remove(idx);
                state.values.retain(|k, _| !k.starts_with(&prefix));
                return Ok(());
            }
            Some(Var::Struct(fields)) => fields,
            Some(other) => {
                return Err(Error::InvalidMutation(format!(
                    "{} takes a struct, got {}",
                    address,
                    other.get_type()
                )))
            }
        };

        let members = state.members.entry(container).or_default();
        if !members.contains(&instance) {
            members.push(instance.clone());
        }

        let mut target = address.clone();
        if let Some(Var::String(new_name)) = fields.remove("name") {
            if new_name != instance {
                if members.contains(&new_name) {
                    return Err(Error::InvalidMutation(format!("{} already exists", new_name)));
                }
                for m in members.iter_mut() {
                    if *m == instance {
                        *m = new_name.clone();
                    }
                }
                target = address.member(&new_name);
                let new_prefix = format!("{}/", target.to_wire_path());
                let moved: Vec<(String, Var)> = state
                    .values
                    .iter()
                    .filter(|(k, _)| k.starts_with(&prefix))
                    .map(|(k, v)| (format!("{}{}", new_prefix, &k[prefix.len()..]), v.clone()))
                    .collect();
                state.values.retain(|k, _| !k.starts_with(&prefix));
                state.values.extend(moved);
            }
        }
        for (name, v) in fields {
            self.write(state, &target.child(&escape(&name)), Some(v))?;
        }
        Ok(())
    }

    /// Values synthesized for a scalar field on a surface.
    pub fn scalar_values(surface_id: u32) -> Vec<f64> {
        (0..5).map(|i| (surface_id * 10 + i) as f64).collect()
    }

    /// Values synthesized for a vector field on a surface.
    pub fn vector_values(surface_id: u32) -> Vec<f32> {
        (0..6).map(|i| (surface_id * 100 + i) as f32).collect()
    }

    fn field_chunks(request: &GetFieldsRequest) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let doubles = |values: &[f64]| -> ChunkPayload {
            if request.provide_bytes_stream {
                let mut bytes = vec![0u8; values.len() * 8];
                LittleEndian::write_f64_into(values, &mut bytes);
                ChunkPayload::Bytes(bytes)
            } else {
                ChunkPayload::Double(values.to_vec())
            }
        };
        for r in &request.surface_requests {
            let mut tags = Vec::new();
            if r.options.overset_mesh {
                tags.push(PayloadTag::OversetMesh);
            }
            if r.options.provide_vertices {
                chunks.push(Chunk::header(PayloadInfo {
                    field_name: "vertices".to_string(),
                    field_type: FieldType::DoubleArray,
                    field_size: 6,
                    surface_id: r.surface_id,
                    payload_tags: tags.clone(),
                }));
                chunks.push(Chunk::data(doubles(&[0., 0., 0., 1., 1., 1.])));
            }
            if r.options.provide_faces {
                chunks.push(Chunk::header(PayloadInfo {
                    field_name: "faces".to_string(),
                    field_type: FieldType::IntArray,
                    field_size: 4,
                    surface_id: r.surface_id,
                    payload_tags: tags.clone(),
                }));
                chunks.push(Chunk::data(ChunkPayload::Int(vec![3, 0, 1, 2])));
            }
        }
        for r in &request.scalar_field_requests {
            let mut tags = Vec::new();
            if r.data_location == DataLocation::Elements {
                tags.push(PayloadTag::ElementLocation);
            }
            if r.provide_boundary_values {
                tags.push(PayloadTag::BoundaryValues);
            }
            let values = Self::scalar_values(r.surface_id);
            chunks.push(Chunk::header(PayloadInfo {
                field_name: r.scalar_field_name.clone(),
                field_type: FieldType::DoubleArray,
                field_size: values.len() as u64,
                surface_id: r.surface_id,
                payload_tags: tags,
            }));
            chunks.push(Chunk::data(doubles(&values[..3])));
            chunks.push(Chunk::data(doubles(&values[3..])));
        }
        for r in &request.vector_field_requests {
            let values = Self::vector_values(r.surface_id);
            let mut header = Chunk::header(PayloadInfo {
                field_name: r.vector_field_name.clone(),
                field_type: FieldType::FloatArray,
                field_size: values.len() as u64,
                surface_id: r.surface_id,
                payload_tags: vec![],
            });
            header.payload = ChunkPayload::Float(values[..2].to_vec());
            chunks.push(header);
            chunks.push(Chunk::data(ChunkPayload::Float(values[2..].to_vec())));
        }
        chunks
    }
}

impl ModelChannel for MockServer {
    fn get_attribute_value(&self, address: &Address, attribute: Attribute) -> Result<Variant> {
        self.log(format!("get_attribute_value {} {:?}", address, attribute));
        let position = self.locate(address)?;
        let var = match attribute {
            Attribute::ChildNames => match position {
                Position::Group(c) | Position::Member(c) => {
                    Var::from(c.iter().map(|(n, _)| *n).collect::<Vec<_>>())
                }
                _ => Var::Null,
            },
            Attribute::ObjectNames => match position {
                Position::Container(_) => Var::from(
                    self.state()
                        .members
                        .get(&address.to_wire_path())
                        .cloned()
                        .unwrap_or_default(),
                ),
                _ => Var::Null,
            },
            Attribute::DataType => match position {
                Position::Container(_) => Var::from(CONTAINER_DATA_TYPE),
                Position::Leaf(_) => Var::from("Leaf"),
                Position::Command => Var::from("Command"),
                _ => Var::from("Group"),
            },
            Attribute::IsExtendedMenu => match position {
                Position::Command => Var::from(false),
                _ => Var::from(true),
            },
            Attribute::HelpString => Var::from(format!("help for {}", address)),
        };
        Ok(encode(&var))
    }

    fn get_state(&self, address: &Address) -> Result<Variant> {
        self.log(format!("get_state {}", address));
        let state = self.state();
        Ok(encode(&self.read(&state, address)?))
    }

    fn set_state(&self, address: &Address, value: Option<Variant>) -> Result<()> {
        self.log(format!("set_state {}", address));
        let value = match value {
            Some(v) => Some(decode(&v)?),
            None => None,
        };
        let mut state = self.state();
        self.write(&mut state, address, value)
    }

    fn execute_command(
        &self,
        address: &Address,
        args: LinkedHashMap<String, Variant>,
    ) -> Result<Variant> {
        self.log(format!("execute_command {}", address));
        match self.locate(address)? {
            Position::Command => (),
            _ => {
                return Err(Error::SchemaMismatch(format!(
                    "{} is not a command",
                    address
                )))
            }
        }
        // commands echo their arguments
        Ok(Variant::new(crate::codec::VariantKind::StructValue(args)))
    }

    fn close(&self) -> Result<()> {
        self.log("close".to_string());
        self.state().closed = true;
        Ok(())
    }
}

impl FieldChannel for MockServer {
    fn get_fields(&self, request: GetFieldsRequest) -> Result<ChunkStream<'_>> {
        self.log("get_fields".to_string());
        let chunks = Self::field_chunks(&request);
        self.state().field_requests.push(request);
        Ok(Box::new(chunks.into_iter().map(Ok)))
    }

    fn get_range(&self, request: GetRangeRequest) -> Result<(Float, Float)> {
        self.log(format!("get_range {}", request.field_name));
        Ok((-1.0, request.surface_ids.len() as Float))
    }

    fn get_fields_info(&self) -> Result<Vec<ScalarFieldInfo>> {
        Ok(vec![ScalarFieldInfo {
            display_name: "Static Pressure".to_string(),
            solver_name: "pressure".to_string(),
            section: "Pressure...".to_string(),
            domain: "mixture".to_string(),
        }])
    }

    fn get_vector_fields_info(&self) -> Result<Vec<VectorFieldInfo>> {
        Ok(vec![VectorFieldInfo {
            display_name: "velocity".to_string(),
            x_component: "x-velocity".to_string(),
            y_component: "y-velocity".to_string(),
            z_component: "z-velocity".to_string(),
        }])
    }

    fn get_surfaces_info(&self) -> Result<Vec<SurfaceInfo>> {
        Ok(vec![
            SurfaceInfo {
                surface_name: "wall".to_string(),
                surface_ids: vec![1],
                zone_id: 3,
                zone_type: "wall".to_string(),
                type_: "zone-surf".to_string(),
            },
            SurfaceInfo {
                surface_name: "inlet".to_string(),
                surface_ids: vec![2],
                zone_id: 5,
                zone_type: "velocity-inlet".to_string(),
                type_: "zone-surf".to_string(),
            },
        ])
    }
}
