/// Runtime API client
///
/// Reference: https://cbonte.github.io/haproxy-dconv/2.5/management.html#9.3
use crate::core::connection::SocketTransport;
use crate::core::{CommandExecutor, Locator, ServerState};
use crate::error::{RuntimeError, RuntimeResult};
use crate::stat::{parse_show_stat, CounterRecord};
use crate::state::{parse_show_servers_state, ServerStateRecord};
use bytes::Bytes;
use std::time::Duration;
use tracing::info;

/// Pause between counter polls while draining
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The only successful answer to a state change
const STATE_CHANGE_ACK: &[u8] = b"\n";

/// Client for one runtime API socket.
///
/// Every call opens its own connection, so a client can be shared freely
/// across tasks.
#[derive(Debug, Clone)]
pub struct RuntimeClient<E: CommandExecutor = SocketTransport> {
    executor: E,
    pub(crate) poll_interval: Duration,
}

impl RuntimeClient<SocketTransport> {
    /// Create a client for a socket expressed as `unix://path` or
    /// `tcp://address:port`
    pub fn new(locator: &str) -> RuntimeResult<Self> {
        let locator = Locator::parse(locator)?;
        Ok(Self::with_executor(SocketTransport::new(locator)))
    }
}

impl<E: CommandExecutor> RuntimeClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Execute a raw command; the result is the unparsed response
    pub async fn execute(&self, command: &str) -> RuntimeResult<Bytes> {
        self.executor.execute(command).await
    }

    /// `set server <backend>/<server> state [ ready | drain | maint ]`
    pub async fn set_server_state(
        &self,
        backend: &str,
        server: &str,
        state: ServerState,
    ) -> RuntimeResult<()> {
        let command = format!("set server {}/{} state {}", backend, server, state);
        let response = self.execute(&command).await?;

        if &response[..] != STATE_CHANGE_ACK {
            return Err(RuntimeError::StateChangeAck {
                backend: backend.to_string(),
                server: server.to_string(),
                state,
                response,
            });
        }

        info!(backend, server, %state, "Server state changed");
        Ok(())
    }

    /// Fetch and decode `show stat`
    pub async fn show_stat(&self) -> RuntimeResult<Vec<CounterRecord>> {
        let response = self.execute("show stat").await?;
        parse_show_stat(&response)
    }

    /// Fetch and decode `show servers state` for every backend
    pub async fn show_servers_state(&self) -> RuntimeResult<Vec<ServerStateRecord>> {
        let response = self.execute("show servers state").await?;
        parse_show_servers_state(&response)
    }

    /// Fetch and decode `show servers state <backend>`
    pub async fn show_servers_state_for(&self, backend: &str) -> RuntimeResult<Vec<ServerStateRecord>> {
        let response = self.execute(&format!("show servers state {}", backend)).await?;
        parse_show_servers_state(&response)
    }
}
