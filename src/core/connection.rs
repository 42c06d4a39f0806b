/// Single-shot request/response transport for the runtime API socket
///
/// Each command dials a fresh connection, writes the command terminated by a
/// line feed, drains the response until the peer closes and drops the
/// connection. There is no pooling, keep-alive or retry at this layer.
use super::{CommandExecutor, Locator};
use crate::error::{RuntimeError, RuntimeResult};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Initial response buffer size; `show stat` on a modest config is a few KB
const RESPONSE_BUFFER_SIZE: usize = 8192;

/// Transport dialing a unix or TCP socket per command
#[derive(Debug, Clone)]
pub struct SocketTransport {
    locator: Locator,
}

impl SocketTransport {
    pub fn new(locator: Locator) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    fn connection_error(&self, source: io::Error) -> RuntimeError {
        RuntimeError::Connection {
            locator: self.locator.to_string(),
            source,
        }
    }
}

#[async_trait]
impl CommandExecutor for SocketTransport {
    async fn execute(&self, command: &str) -> RuntimeResult<Bytes> {
        debug!(locator = %self.locator, command, "Executing runtime API command");

        match &self.locator {
            Locator::Tcp(address) => {
                let mut stream = TcpStream::connect(address.as_str())
                    .await
                    .map_err(|e| self.connection_error(e))?;
                exchange(&mut stream, command).await
            }
            #[cfg(unix)]
            Locator::Unix(path) => {
                let mut stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|e| self.connection_error(e))?;
                exchange(&mut stream, command).await
            }
            #[cfg(not(unix))]
            Locator::Unix(_) => Err(self.connection_error(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not available on this platform",
            ))),
        }
    }
}

/// Write `command` plus a line feed to `stream`, then read until end of stream
pub async fn exchange<S>(stream: &mut S, command: &str) -> RuntimeResult<Bytes>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = BytesMut::with_capacity(command.len() + 1);
    request.extend_from_slice(command.as_bytes());
    request.put_u8(b'\n');

    let write_error = |source: io::Error| RuntimeError::Write {
        command: command.to_string(),
        source,
    };
    stream.write_all(&request).await.map_err(write_error)?;
    stream.flush().await.map_err(write_error)?;

    let mut response = BytesMut::with_capacity(RESPONSE_BUFFER_SIZE);
    loop {
        match stream.read_buf(&mut response).await {
            Ok(0) => break,
            Ok(n) => trace!(bytes = n, "Read response chunk"),
            Err(source) => {
                return Err(RuntimeError::Read {
                    command: command.to_string(),
                    source,
                })
            }
        }
    }

    debug!(command, bytes = response.len(), "Runtime API response received");
    Ok(response.freeze())
}
