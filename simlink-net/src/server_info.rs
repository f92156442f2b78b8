use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Result};

/// Connection details published by a running server.
///
/// The server info file holds the `host:port` address on the first line
/// and the session password on the second one.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
    pub password: String,
}

impl ServerInfo {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ServerInfo(format!("{}: {}", path.as_ref().display(), e))
        })?;
        contents.parse()
    }

    /// Resolves the host into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::ServerInfo(format!("can't resolve host: {}", self.host)))
    }
}

impl FromStr for ServerInfo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut lines = s.lines().map(str::trim).filter(|l| !l.is_empty());
        let (address, password) = match (lines.next(), lines.next()) {
            (Some(a), Some(p)) => (a, p),
            _ => {
                return Err(Error::ServerInfo(
                    "expected address and password lines".to_string(),
                ))
            }
        };
        let mut split = address.rsplitn(2, ':');
        let (port, host) = match (split.next(), split.next()) {
            (Some(port), Some(host)) if !host.is_empty() => (port, host),
            _ => return Err(Error::ServerInfo(format!("missing port: {}", address))),
        };
        let port = port
            .parse()
            .map_err(|e| Error::ServerInfo(format!("invalid port {}: {}", port, e)))?;
        Ok(ServerInfo {
            host: host.to_string(),
            port,
            password: password.to_string(),
        })
    }
}
