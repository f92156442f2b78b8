//! Loopback server speaking the client protocol, used by the tests.

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;

use byteorder::{ByteOrder, LittleEndian};
use fnv::FnvHashMap;

use simlink::codec::{decode, encode, Variant};
use simlink::field::info::{ScalarFieldInfo, SurfaceInfo, VectorFieldInfo};
use simlink::field::{Chunk, ChunkPayload, FieldType, PayloadInfo, SurfaceId};
use simlink::{Attribute, Var};

use crate::client::CompressionPolicy;
use crate::msg::*;
use crate::server_info::ServerInfo;
use crate::socket::{Encoding, TcpSocket};
use crate::Result;

const ENABLED_PATH: &str = "/setup/enabled";
const ITERATE_PATH: &str = "/setup/iterate";

pub(crate) struct FakeServer {
    addr: SocketAddr,
    password: String,
    received: Arc<Mutex<Vec<MessageType>>>,
}

impl FakeServer {
    /// Starts listening on a free local port. Serves a single connection.
    pub fn start(password: &str) -> FakeServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let mut handler = Handler {
            password: password.to_string(),
            received: received.clone(),
            values: FnvHashMap::default(),
        };
        handler
            .values
            .insert(ENABLED_PATH.to_string(), encode(&Var::Bool(false)));
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                let mut socket = TcpSocket::from_stream(stream, Encoding::Bincode).unwrap();
                handler.serve(&mut socket);
            }
        });
        FakeServer {
            addr,
            password: password.to_string(),
            received,
        }
    }

    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            password: self.password.clone(),
        }
    }

    /// Contents of a server info file pointing at this server.
    pub fn info_file_contents(&self) -> String {
        format!("{}\n{}\n", self.addr, self.password)
    }

    pub fn received(&self) -> Vec<MessageType> {
        self.received.lock().unwrap().clone()
    }
}

fn scalar_values(surface_id: SurfaceId) -> Vec<f64> {
    (0..5).map(|i| (surface_id * 10 + i) as f64).collect()
}

fn bytes_of(values: &[f64]) -> ChunkPayload {
    let mut bytes = vec![0; values.len() * 8];
    LittleEndian::write_f64_into(values, &mut bytes);
    ChunkPayload::Bytes(bytes)
}

struct Handler {
    password: String,
    received: Arc<Mutex<Vec<MessageType>>>,
    values: FnvHashMap<String, Variant>,
}

impl Handler {
    fn serve(&mut self, socket: &mut TcpSocket) {
        while let Ok(msg) = socket.recv_msg() {
            let type_ = match msg.type_() {
                Ok(t) => t,
                Err(_) => break,
            };
            self.received.lock().unwrap().push(type_);
            if type_ == MessageType::Disconnect {
                break;
            }
            let handled = if msg.auth != self.password {
                reply_error(socket, ErrorKind::Unauthenticated, "bad password")
            } else {
                self.handle(socket, type_, &msg)
            };
            if handled.is_err() {
                break;
            }
        }
    }

    fn handle(&mut self, socket: &mut TcpSocket, type_: MessageType, msg: &Message) -> Result<()> {
        let encoding = *socket.encoding();
        match type_ {
            MessageType::GetAttributeValueRequest => {
                let req: GetAttributeValueRequest = msg.unpack_payload(&encoding)?;
                match attribute(&req.path, req.attribute) {
                    Some(var) => reply(socket, &GetAttributeValueResponse { result: encode(&var) }),
                    None => reply_error(socket, ErrorKind::NotFound, &req.path),
                }
            }
            MessageType::GetStateRequest => {
                let req: GetStateRequest = msg.unpack_payload(&encoding)?;
                match self.values.get(&req.path) {
                    Some(state) => {
                        let resp = GetStateResponse {
                            state: state.clone(),
                        };
                        reply(socket, &resp)
                    }
                    None => reply_error(socket, ErrorKind::NotFound, &req.path),
                }
            }
            MessageType::SetStateRequest => {
                let req: SetStateRequest = msg.unpack_payload(&encoding)?;
                if !self.values.contains_key(&req.path) {
                    return reply_error(socket, ErrorKind::NotFound, &req.path);
                }
                match req.state.as_ref().map(decode) {
                    Some(Ok(Var::Bool(_))) => {
                        self.values.insert(req.path, req.state.unwrap_or_default());
                        reply(socket, &SetStateResponse {})
                    }
                    _ => reply_error(socket, ErrorKind::InvalidArgument, "expected a boolean"),
                }
            }
            MessageType::ExecuteCommandRequest => {
                let req: ExecuteCommandRequest = msg.unpack_payload(&encoding)?;
                match req.path.as_str() {
                    ITERATE_PATH => {
                        let result = encode(&Var::from(req.args.len() as u32));
                        reply(socket, &ExecuteCommandResponse { result })
                    }
                    ENABLED_PATH => {
                        reply_error(socket, ErrorKind::FailedPrecondition, "not a command")
                    }
                    _ => reply_error(socket, ErrorKind::NotFound, &req.path),
                }
            }
            MessageType::GetFieldsRequest => {
                let req: GetFieldsRequest = msg.unpack_payload(&encoding)?;
                for scalar in &req.request.scalar_field_requests {
                    let values = scalar_values(scalar.surface_id);
                    let header = Chunk::header(PayloadInfo {
                        field_name: scalar.scalar_field_name.clone(),
                        field_type: FieldType::DoubleArray,
                        field_size: values.len() as u64,
                        surface_id: scalar.surface_id,
                        payload_tags: Vec::new(),
                    });
                    match scalar.scalar_field_name.as_str() {
                        "pressure" => {
                            reply(socket, &FieldChunk { chunk: header })?;
                            let head = Chunk::data(bytes_of(&values[..3]));
                            reply(socket, &FieldChunk { chunk: head })?;
                            let tail = Chunk::data(bytes_of(&values[3..]));
                            reply(socket, &FieldChunk { chunk: tail })?;
                        }
                        "broken" => {
                            reply(socket, &FieldChunk { chunk: header })?;
                            let head = Chunk::data(bytes_of(&values[..3]));
                            reply(socket, &FieldChunk { chunk: head })?;
                            return reply_error(socket, ErrorKind::Internal, "solver crashed");
                        }
                        "garbled" => {
                            reply(socket, &FieldChunk { chunk: header })?;
                            let head = Chunk::data(bytes_of(&values[..3]));
                            reply(socket, &FieldChunk { chunk: head })?;
                            reply(socket, &GetRangeResponse { min: 0., max: 0. })?;
                            let tail = Chunk::data(bytes_of(&values[3..]));
                            reply(socket, &FieldChunk { chunk: tail })?;
                        }
                        name => return reply_error(socket, ErrorKind::NotFound, name),
                    }
                }
                reply(socket, &StreamEnd {})
            }
            MessageType::GetRangeRequest => {
                let req: GetRangeRequest = msg.unpack_payload(&encoding)?;
                let resp = GetRangeResponse {
                    min: -1.,
                    max: req.request.surface_ids.len() as f64,
                };
                reply(socket, &resp)
            }
            MessageType::GetFieldsInfoRequest => {
                let fields = vec![ScalarFieldInfo {
                    display_name: "Static Pressure".to_string(),
                    solver_name: "pressure".to_string(),
                    section: "Pressure...".to_string(),
                    domain: "mixture".to_string(),
                }];
                reply(socket, &GetFieldsInfoResponse { fields })
            }
            MessageType::GetVectorFieldsInfoRequest => {
                let fields = vec![VectorFieldInfo {
                    display_name: "velocity".to_string(),
                    x_component: "x-velocity".to_string(),
                    y_component: "y-velocity".to_string(),
                    z_component: "z-velocity".to_string(),
                }];
                reply(socket, &GetVectorFieldsInfoResponse { fields })
            }
            MessageType::GetSurfacesInfoRequest => {
                let surfaces = vec![SurfaceInfo {
                    surface_name: "wall".to_string(),
                    surface_ids: vec![1],
                    zone_id: 3,
                    zone_type: "wall".to_string(),
                    type_: "zone-surf".to_string(),
                }];
                reply(socket, &GetSurfacesInfoResponse { surfaces })
            }
            _ => reply_error(socket, ErrorKind::Unknown, "unsupported request"),
        }
    }
}

fn attribute(path: &str, attribute: Attribute) -> Option<Var> {
    let children: Vec<&str> = match path {
        "" => vec!["setup"],
        "/setup" => vec!["enabled", "iterate"],
        ENABLED_PATH | ITERATE_PATH => Vec::new(),
        _ => return None,
    };
    let var = match attribute {
        Attribute::ChildNames => Var::from(children),
        Attribute::ObjectNames => Var::Null,
        Attribute::DataType => Var::from("Group"),
        Attribute::IsExtendedMenu => Var::from(path != ITERATE_PATH),
        Attribute::HelpString => Var::from(format!("help for {}", path)),
    };
    Some(var)
}

fn reply<P: Payload>(socket: &mut TcpSocket, payload: &P) -> Result<()> {
    let encoding = *socket.encoding();
    let msg = Message::from_payload(payload, "", &encoding, &CompressionPolicy::Nothing)?;
    socket.send_msg(&msg)
}

fn reply_error(socket: &mut TcpSocket, kind: ErrorKind, message: &str) -> Result<()> {
    let resp = ErrorResponse {
        kind,
        message: message.to_string(),
    };
    reply(socket, &resp)
}
