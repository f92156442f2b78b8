use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use linked_hash_map::LinkedHashMap;

use simlink::channel::ChunkStream;
use simlink::codec::Variant;
use simlink::field::info::{
    GetRangeRequest as RangeQuery, ScalarFieldInfo, SurfaceInfo, VectorFieldInfo,
};
use simlink::field::{Chunk, FieldDataConfig, GetFieldsRequest as FieldsQuery};
use simlink::{Address, Attribute, FieldChannel, Float, ModelChannel, Session, Var};

use crate::msg::*;
use crate::server_info::ServerInfo;
use crate::socket::{Encoding, TcpSocket};
use crate::{Error, Result};

/// Decides which outgoing payloads get compressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionPolicy {
    Everything,
    /// Compress payloads larger than given number of bytes
    LargerThan(usize),
    Nothing,
}

impl CompressionPolicy {
    pub fn applies(&self, payload_size: usize) -> bool {
        match self {
            CompressionPolicy::Everything => true,
            CompressionPolicy::LargerThan(size) => payload_size > *size,
            CompressionPolicy::Nothing => false,
        }
    }
}

/// Configuration settings for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Encoding used for envelopes and payloads, has to match the server
    pub encoding: Encoding,
    pub compression: CompressionPolicy,
    pub connect_timeout: Option<Duration>,
    /// Upper bound on waiting for a single reply, `None` waits forever
    pub read_timeout: Option<Duration>,
    /// Journal file started right after connecting
    pub journal: Option<PathBuf>,
    pub field_data: FieldDataConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Bincode,
            compression: CompressionPolicy::Nothing,
            connect_timeout: Some(Duration::from_secs(5)),
            read_timeout: None,
            journal: None,
            field_data: FieldDataConfig::default(),
        }
    }
}

/// Connection to a server.
///
/// Implements both channel traits of the core library. Only one request is
/// in flight at any time: every call holds the connection until its reply
/// arrives, a field export holds it until the stream ends.
pub struct Client {
    config: ClientConfig,
    /// Attached to every outgoing message
    password: String,
    socket: Mutex<TcpSocket>,
}

impl Client {
    pub fn new(info: &ServerInfo, config: ClientConfig) -> Result<Client> {
        let addr = info.socket_addr()?;
        let socket = TcpSocket::connect(&addr, config.connect_timeout, config.encoding)?;
        socket.set_read_timeout(config.read_timeout)?;
        info!("connected to server at {}", addr);
        Ok(Client {
            config,
            password: info.password.clone(),
            socket: Mutex::new(socket),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, TcpSocket>> {
        self.socket
            .lock()
            .map_err(|_| Error::Other("connection lock poisoned".to_string()))
    }

    fn send<P: Payload>(&self, socket: &mut TcpSocket, payload: &P) -> Result<()> {
        let msg = Message::from_payload(
            payload,
            &self.password,
            &self.config.encoding,
            &self.config.compression,
        )?;
        socket.send_msg(&msg)
    }

    /// Sends a request and waits for the response of the expected type.
    pub fn request<Req: Payload, Resp: Payload>(&self, req: &Req) -> Result<Resp> {
        let mut socket = self.lock()?;
        debug!("{:?}", Req::TYPE);
        self.send(&mut socket, req)?;
        socket.recv_msg()?.into_response(&self.config.encoding)
    }

    /// Starts a field export. The returned stream keeps the connection
    /// locked until it's exhausted or dropped.
    pub fn stream_fields(&self, request: FieldsQuery) -> Result<FieldStream<'_>> {
        let mut socket = self.lock()?;
        debug!("{:?}", MessageType::GetFieldsRequest);
        self.send(&mut socket, &GetFieldsRequest { request })?;
        Ok(FieldStream {
            socket,
            encoding: self.config.encoding,
            finished: false,
            failed: false,
        })
    }

    /// Notifies the server and shuts the connection down.
    pub fn disconnect(&self) -> Result<()> {
        let mut socket = self.lock()?;
        self.send(&mut socket, &Disconnect {})?;
        socket.shutdown()?;
        info!("disconnected");
        Ok(())
    }
}

/// Chunks of a single field export, read one message at a time.
///
/// The first error ends iteration. The stream is only over on the wire
/// after `StreamEnd`, an `ErrorResponse` or a broken connection, so a
/// message that fails to decode leaves the rest to be drained on drop.
pub struct FieldStream<'a> {
    socket: MutexGuard<'a, TcpSocket>,
    encoding: Encoding,
    /// Nothing more will arrive for this request.
    finished: bool,
    failed: bool,
}

/// Whether the server sends nothing more for the request after this error.
fn ends_stream(e: &Error) -> bool {
    matches!(
        e,
        Error::Io(_) | Error::Server { .. } | Error::FrameTooLarge { .. }
    )
}

impl<'a> FieldStream<'a> {
    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let msg = self.socket.recv_msg()?;
        match msg.type_()? {
            MessageType::StreamEnd => Ok(None),
            _ => {
                let resp: FieldChunk = msg.into_response(&self.encoding)?;
                Ok(Some(resp.chunk))
            }
        }
    }
}

impl<'a> Iterator for FieldStream<'a> {
    type Item = simlink::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.failed {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => {
                trace!(
                    "chunk: header: {}",
                    chunk
                        .payload_info
                        .as_ref()
                        .map(|i| i.field_name.as_str())
                        .unwrap_or("none")
                );
                Some(Ok(chunk))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = ends_stream(&e);
                self.failed = true;
                Some(Err(e.into()))
            }
        }
    }
}

impl<'a> Drop for FieldStream<'a> {
    /// Reads out the rest of an unfinished stream so that the connection
    /// can be used for the next request.
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("field stream dropped before the end, draining");
        loop {
            match self.next_chunk() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) if ends_stream(&e) => {
                    warn!("stopped draining field stream: {}", e);
                    break;
                }
                Err(e) => warn!("skipping message while draining field stream: {}", e),
            }
        }
    }
}

impl ModelChannel for Client {
    fn get_attribute_value(
        &self,
        address: &Address,
        attribute: Attribute,
    ) -> simlink::Result<Variant> {
        let resp: GetAttributeValueResponse = self.request(&GetAttributeValueRequest {
            path: address.to_wire_path(),
            attribute,
        })?;
        Ok(resp.result)
    }

    fn get_state(&self, address: &Address) -> simlink::Result<Variant> {
        let resp: GetStateResponse = self.request(&GetStateRequest {
            path: address.to_wire_path(),
        })?;
        Ok(resp.state)
    }

    fn set_state(&self, address: &Address, state: Option<Variant>) -> simlink::Result<()> {
        let _: SetStateResponse = self.request(&SetStateRequest {
            path: address.to_wire_path(),
            state,
        })?;
        Ok(())
    }

    fn execute_command(
        &self,
        address: &Address,
        args: LinkedHashMap<String, Variant>,
    ) -> simlink::Result<Variant> {
        let resp: ExecuteCommandResponse = self.request(&ExecuteCommandRequest {
            path: address.to_wire_path(),
            args,
        })?;
        Ok(resp.result)
    }

    fn close(&self) -> simlink::Result<()> {
        Ok(self.disconnect()?)
    }
}

impl FieldChannel for Client {
    fn get_fields(&self, request: FieldsQuery) -> simlink::Result<ChunkStream<'_>> {
        Ok(Box::new(self.stream_fields(request)?))
    }

    fn get_range(&self, request: RangeQuery) -> simlink::Result<(Float, Float)> {
        let resp: GetRangeResponse = self.request(&GetRangeRequest { request })?;
        Ok((resp.min, resp.max))
    }

    fn get_fields_info(&self) -> simlink::Result<Vec<ScalarFieldInfo>> {
        let resp: GetFieldsInfoResponse = self.request(&GetFieldsInfoRequest {})?;
        Ok(resp.fields)
    }

    fn get_vector_fields_info(&self) -> simlink::Result<Vec<VectorFieldInfo>> {
        let resp: GetVectorFieldsInfoResponse = self.request(&GetVectorFieldsInfoRequest {})?;
        Ok(resp.fields)
    }

    fn get_surfaces_info(&self) -> simlink::Result<Vec<SurfaceInfo>> {
        let resp: GetSurfacesInfoResponse = self.request(&GetSurfacesInfoRequest {})?;
        Ok(resp.surfaces)
    }
}

/// Connects to the server described by the server info file and opens a
/// session on top of the connection.
///
/// If a journal is configured it's started right away, beginning with a
/// `start` call naming the server info file.
pub fn connect<P: AsRef<Path>>(server_info_file: P, config: ClientConfig) -> Result<Session> {
    let path = server_info_file.as_ref();
    let info = ServerInfo::from_file(path)?;
    let client = Arc::new(Client::new(&info, config.clone())?);
    let session = Session::with_config(client.clone(), client, config.field_data.clone());
    if let Some(journal) = &config.journal {
        session.start_journal_file(journal)?;
        session.record_call("start", vec![Var::from(path.display().to_string())])?;
    }
    Ok(session)
}
