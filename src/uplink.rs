use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

const SERVER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 117);
const SERVER_PORT: u16 = 20000;

/// Largest token accepted from the server in one receive.
pub const REPLY_BUFFER_LEN: usize = 2000;

pub fn server_address() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(SERVER_IP, SERVER_PORT))
}

pub enum Received {
    Token(Vec<u8>),
    TimedOut,
}

/// The client's only connection to the command server.
pub struct Uplink {
    stream: TcpStream,
    reply: [u8; REPLY_BUFFER_LEN],
    closed: bool,
}

/// Closes the connection from another thread, waking a blocked receive.
pub struct ShutdownHandle {
    stream: TcpStream,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotConnected => {}
            Err(error) => log::warn!("failed to shut down connection: {}", error),
        }
    }
}

impl Uplink {
    pub fn connect(address: SocketAddr) -> Result<Self> {
        let stream =
            TcpStream::connect(address).map_err(|source| Error::Connect { address, source })?;
        log::info!("[Client] Connected to server at {}...ok!", address);
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            reply: [0; REPLY_BUFFER_LEN],
            closed: false,
        }
    }

    pub fn shutdown_handle(&self) -> io::Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            stream: self.stream.try_clone()?,
        })
    }

    /// Blocks for the next token, at most `timeout` when one is given.
    ///
    /// A closed connection is reported as `UnexpectedEof`.
    pub fn receive(&mut self, timeout: Option<Duration>) -> io::Result<Received> {
        self.stream.set_read_timeout(timeout)?;
        let result = loop {
            match self.stream.read(&mut self.reply) {
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        let received = match result {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )),
            Ok(count) => Ok(Received::Token(self.reply[..count].to_vec())),
            Err(error)
                if error.kind() == io::ErrorKind::WouldBlock
                    || error.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(Received::TimedOut)
            }
            Err(error) => Err(error),
        };
        self.reply.iter_mut().for_each(|byte| *byte = 0);
        received
    }

    pub fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.stream.write_all(payload)?;
        self.stream.flush()
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotConnected => {}
            Err(error) => log::warn!("failed to close connection: {}", error),
        }
    }
}
