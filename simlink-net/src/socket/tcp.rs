use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};

use crate::msg::Message;
use crate::socket::{pack, unpack, Encoding};
use crate::{Error, Result};

/// Largest frame accepted in either direction.
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Blocking tcp socket exchanging length-prefixed messages.
///
/// Each frame is a 4 byte little-endian length followed by the encoded
/// `Message`.
pub(crate) struct TcpSocket {
    stream: TcpStream,
    encoding: Encoding,
}

impl TcpSocket {
    pub fn connect(
        addr: &SocketAddr,
        timeout: Option<Duration>,
        encoding: Encoding,
    ) -> Result<Self> {
        let stream = match timeout {
            Some(t) => TcpStream::connect_timeout(addr, t)?,
            None => TcpStream::connect(addr)?,
        };
        trace!("connected to {:?}", stream.peer_addr()?);
        Self::from_stream(stream, encoding)
    }

    pub fn from_stream(stream: TcpStream, encoding: Encoding) -> Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { stream, encoding })
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn send_msg(&mut self, msg: &Message) -> Result<()> {
        let bytes = pack(msg, &self.encoding)?;
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                len: bytes.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        // encode the length
        let mut len_buf = [0; 4];
        LittleEndian::write_u32(&mut len_buf, bytes.len() as u32);

        self.stream.write_all(&len_buf)?;
        self.stream.write_all(&bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Reads the next message, blocking until the whole frame arrives.
    ///
    /// A frame over [`MAX_FRAME_SIZE`] leaves the stream out of sync, so
    /// the connection is shut down.
    pub fn recv_msg(&mut self) -> Result<Message> {
        let mut len_buf = [0; 4];
        self.stream.read_exact(&mut len_buf)?;
        let len = LittleEndian::read_u32(&len_buf) as usize;
        if len > MAX_FRAME_SIZE {
            warn!("peer sent a {} byte frame, closing connection", len);
            if let Err(e) = self.shutdown() {
                debug!("shutdown failed: {}", e);
            }
            return Err(Error::FrameTooLarge {
                len,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut buf = vec![0; len];
        self.stream.read_exact(&mut buf)?;
        unpack(&buf, &self.encoding)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.stream.shutdown(Shutdown::Both)?;
        Ok(())
    }
}
