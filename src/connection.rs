use std::io;
use std::net::SocketAddr;

use thiserror::Error as ThisError;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::buffer::Buffer;
use crate::codec;
use crate::frame::{self, Frame};

/// Per-connection transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Normal,
    InTransaction,
}

#[derive(Debug, ThisError)]
pub enum ConnectionError {
    /// Malformed framing; the server replies with a protocol error and
    /// closes the connection.
    #[error("{0}")]
    Protocol(#[from] frame::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One accepted client: its socket, read buffer, and transaction state.
pub struct Connection {
    stream: TcpStream,
    pub addr: SocketAddr,
    // Data is read from the socket into the read buffer. When a frame is
    // parsed, the corresponding bytes are removed from the buffer.
    buffer: Buffer,
    pub state: TxState,
    pub queue: Vec<Frame>,
}

impl Connection {
    pub fn new(stream: TcpStream, addr: SocketAddr) -> Connection {
        Connection {
            stream,
            addr,
            buffer: Buffer::new(),
            state: TxState::Normal,
            queue: Vec::new(),
        }
    }

    /// Reads the next complete frame, pulling more bytes off the socket as
    /// needed. Returns `None` once the peer has closed the connection.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some(frame) = codec::decode(&mut self.buffer)? {
                return Ok(Some(frame));
            }

            // Wait for readiness, then drain the socket until it reports
            // `WouldBlock`.
            self.stream.readable().await?;
            loop {
                match self.buffer.read_from(&self.stream) {
                    Ok(0) => return Ok(None),
                    Ok(_) => {}
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                    Err(err) => return Err(err.into()),
                }
            }
        }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.stream.write_all(&frame.serialize()).await
    }
}
