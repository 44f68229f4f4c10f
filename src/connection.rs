// ABOUTME: TCP connection to an SMSC split into a buffered frame reader and a frame writer
// ABOUTME: Reads time out per frame so the listener can run keep-alive ticks

use crate::client::error::{SmppError, SmppResult};
use crate::codec::{CodecError, Encodable, Frame};
use bytes::{Buf, BytesMut};
use std::io::Cursor;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, warn};

/// SMPP v3.4 Connection Management
///
/// Handles frame-based communication over TCP for SMPP protocol sessions.
/// This implements the transport layer for SMPP v3.4 as defined in Section 2.1
/// of the protocol.
///
/// A `Connection` is split with [`Connection::into_split`] once it is open:
/// the listener task owns the [`FrameReader`] while the session serialises
/// writers through the [`FrameWriter`]. Reading and writing can then proceed
/// concurrently on the two directions of the socket.
///
/// This struct does not track session state. The session drives the bind
/// state machine and decides which PDUs may be written.
#[derive(Debug)]
pub struct Connection {
    reader: FrameReader,
    writer: FrameWriter,
}

/// Read half of a connection with its frame buffer
#[derive(Debug)]
pub struct FrameReader {
    stream: OwnedReadHalf,

    // The buffer for reading frames.
    buffer: BytesMut,
}

/// Write half of a connection. Not safe to share without a lock.
#[derive(Debug)]
pub struct FrameWriter {
    // The write half is decorated with a `BufWriter` so a PDU goes out in as
    // few syscalls as possible; `write_frame` flushes after every PDU.
    stream: BufWriter<OwnedWriteHalf>,
}

impl Connection {
    /// Create a new `Connection`, backed by `socket`. Read and write buffers
    /// are initialized.
    pub fn new(socket: TcpStream) -> Connection {
        let (read, write) = socket.into_split();
        Connection {
            reader: FrameReader {
                stream: read,
                // 4KB holds a few dozen deliver_sm PDUs
                buffer: BytesMut::with_capacity(4 * 1024),
            },
            writer: FrameWriter {
                stream: BufWriter::new(write),
            },
        }
    }

    /// Open a TCP connection to the SMSC, giving up after `timeout`
    pub async fn connect<A>(addr: A, timeout: Duration) -> SmppResult<Connection>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let target = addr.to_string();
        let socket = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(source)) => {
                return Err(SmppError::Connect {
                    addr: target,
                    source,
                });
            }
            Err(_) => {
                return Err(SmppError::Connect {
                    addr: target,
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("no answer within {timeout:?}"),
                    ),
                });
            }
        };
        socket.set_nodelay(true)?;
        debug!(addr = %target, "tcp connection established");
        Ok(Connection::new(socket))
    }

    pub fn into_split(self) -> (FrameReader, FrameWriter) {
        (self.reader, self.writer)
    }
}

impl FrameReader {
    /// Read a single `Frame` from the stream, waiting at most `timeout`.
    ///
    /// Any data remaining in the read buffer after the frame has been parsed
    /// is kept there for the next call.
    ///
    /// # Errors
    ///
    /// * `Timeout` when no complete frame arrived in time. Partial data stays
    ///   buffered and the next call picks up where this one left off.
    /// * `SessionClosed` when the peer closed or reset the connection, or the
    ///   stream lost frame alignment.
    /// * `Protocol` when a frame's header was unusable. It has been consumed
    ///   and the reader is ready for the next one. A frame whose header is
    ///   fine but whose body is not comes back as `Ok(Frame::Malformed)` so
    ///   it can still be answered.
    pub async fn read_frame(&mut self, timeout: Duration) -> SmppResult<Frame> {
        match tokio::time::timeout(timeout, self.read_frame_inner()).await {
            Ok(result) => result,
            Err(_) => Err(SmppError::Timeout("frame")),
        }
    }

    // Cancel safe: `read_buf` either completes or leaves the buffer untouched,
    // and parsing happens synchronously.
    async fn read_frame_inner(&mut self) -> SmppResult<Frame> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(frame);
            }

            // `0` indicates "end of stream"
            match self.stream.read_buf(&mut self.buffer).await {
                Ok(0) => {
                    if !self.buffer.is_empty() {
                        warn!(
                            pending = self.buffer.len(),
                            "connection reset by peer mid-frame"
                        );
                    }
                    return Err(SmppError::SessionClosed);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "read failed");
                    return Err(SmppError::SessionClosed);
                }
            }
        }
    }

    /// Tries to parse a frame from the buffer. If the buffer contains enough
    /// data, the frame is returned and the data removed from the buffer. If not
    /// enough data has been buffered yet, `Ok(None)` is returned.
    fn parse_frame(&mut self) -> SmppResult<Option<Frame>> {
        let mut buf = Cursor::new(&self.buffer[..]);

        let length = match Frame::check(&mut buf) {
            Ok(length) => length,
            Err(CodecError::Incomplete) => return Ok(None),
            Err(e) => {
                // A bad length leaves no way to find the next frame boundary
                warn!(error = %e, "unrecoverable framing error");
                return Err(SmppError::SessionClosed);
            }
        };

        let parsed = Frame::parse(&mut buf);
        self.buffer.advance(length);

        match parsed {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => Err(SmppError::Protocol(e.to_string())),
        }
    }
}

impl FrameWriter {
    /// Write a single PDU to the underlying stream and flush it.
    pub async fn write_frame<T: Encodable>(&mut self, pdu: &T) -> SmppResult<()> {
        let bytes = pdu.to_bytes()?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Shut down the write direction, which the peer sees as end of stream
    pub async fn shutdown(&mut self) -> SmppResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
