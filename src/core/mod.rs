/// Core abstractions shared by the client, decoders and orchestrator
pub mod connection;

use crate::error::{ConfigError, RuntimeResult};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the runtime API listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `unix://<path>`
    Unix(PathBuf),
    /// `tcp://<host>:<port>`
    Tcp(String),
}

impl Locator {
    const UNIX_PREFIX: &'static str = "unix://";
    const TCP_PREFIX: &'static str = "tcp://";

    /// Parse a locator expressed as a URI, either `unix://path` or
    /// `tcp://address:port`
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        if let Some(path) = uri.strip_prefix(Self::UNIX_PREFIX) {
            if path.is_empty() {
                return Err(ConfigError::InvalidLocator(uri.to_string()));
            }
            Ok(Locator::Unix(PathBuf::from(path)))
        } else if let Some(address) = uri.strip_prefix(Self::TCP_PREFIX) {
            if address.is_empty() {
                return Err(ConfigError::InvalidLocator(uri.to_string()));
            }
            Ok(Locator::Tcp(address.to_string()))
        } else {
            Err(ConfigError::InvalidLocator(uri.to_string()))
        }
    }
}

impl FromStr for Locator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Unix(path) => write!(f, "{}{}", Self::UNIX_PREFIX, path.display()),
            Locator::Tcp(address) => write!(f, "{}{}", Self::TCP_PREFIX, address),
        }
    }
}

/// Executes one runtime API command and returns the raw response.
///
/// Implementations hold no state across calls.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> RuntimeResult<Bytes>;
}

/// Target of a `set server <backend>/<server> state <state>` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Ready,
    Drain,
    #[serde(rename = "maint")]
    Maintenance,
}

impl ServerState {
    /// Keyword understood by the runtime API
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Ready => "ready",
            ServerState::Drain => "drain",
            ServerState::Maintenance => "maint",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(ServerState::Ready),
            "drain" => Ok(ServerState::Drain),
            "maint" | "maintenance" => Ok(ServerState::Maintenance),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown server state '{}': must be ready, drain or maint",
                other
            ))),
        }
    }
}
