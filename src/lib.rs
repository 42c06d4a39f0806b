/// haproxy-runtime - client for the HAProxy runtime API
///
/// Sends one command per connection to the admin socket (`unix://path` or
/// `tcp://address:port`) and decodes the responses:
/// 1. `show stat`: the CSV counter table, one `CounterRecord` per object
/// 2. `show servers state`: the versioned server state table, one
///    `ServerStateRecord` per server with its admin and check masks
///
/// On top of those, `RuntimeClient::server_maintenance` drains a server and
/// places it into maintenance, forcing the transition when the caller's
/// deadline fires first.
pub mod client;
pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod maintenance;
pub mod stat;
pub mod state;

pub use client::{RuntimeClient, DEFAULT_POLL_INTERVAL};
pub use core::connection::SocketTransport;
pub use core::{CommandExecutor, Locator, ServerState};
pub use error::{ConfigError, RuntimeError, RuntimeResult};
pub use maintenance::MaintenanceOutcome;
pub use stat::{find_counter, parse_show_stat, CounterRecord, ObjectKind};
pub use state::{
    parse_show_servers_state, AdminState, CheckResult, CheckState, OperationalState,
    ServerStateRecord,
};
