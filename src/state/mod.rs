/// Server state as reported by `show servers state`
///
/// Reference: http://docs.haproxy.org/2.6/management.html#9.3-show%20servers%20state
///
/// The first line is a format version and must be `1`; the column layout
/// below is only valid for that version. The rest is a space separated
/// table with `#` comment lines, one row per server.
use crate::codec::{data_lines, positional_record, FieldValue, Row};
use crate::error::{RuntimeError, RuntimeResult};
use serde::Serialize;
use std::fmt;
use std::ops::BitOr;

/// The only table layout this decoder understands
pub const SUPPORTED_VERSION: &[u8] = b"1";

/// Server operational state (SRV_ST_*)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationalState {
    /// The server is down
    #[default]
    Stopped,
    /// The server is warming up (up but throttled)
    Starting,
    /// The server is fully up
    Running,
    /// The server is up but soft-stopping (eg: 404)
    Stopping,
}

impl FieldValue for OperationalState {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        match u8::decode(raw)? {
            0 => Ok(OperationalState::Stopped),
            1 => Ok(OperationalState::Starting),
            2 => Ok(OperationalState::Running),
            3 => Ok(OperationalState::Stopping),
            other => Err(format!("unknown operational state {}", other)),
        }
    }

    fn encode(&self, _separator: u8) -> String {
        (*self as u8).to_string()
    }
}

/// Result of the last health check (CHK_RES_*)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    /// Initialized to this by default
    #[default]
    Unknown,
    /// Valid check but no status information
    Neutral,
    Failed,
    /// Check succeeded and server is fully up again
    Passed,
    /// Check reports the server doesn't want new sessions
    CondPass,
}

impl FieldValue for CheckResult {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        match u8::decode(raw)? {
            0 => Ok(CheckResult::Unknown),
            1 => Ok(CheckResult::Neutral),
            2 => Ok(CheckResult::Failed),
            3 => Ok(CheckResult::Passed),
            4 => Ok(CheckResult::CondPass),
            other => Err(format!("unknown check result {}", other)),
        }
    }

    fn encode(&self, _separator: u8) -> String {
        (*self as u8).to_string()
    }
}

/// Declare a flag set over a raw mask.
///
/// Unknown bits are kept so the mask read from the wire is never lossy.
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$doc:meta])*
                const $flag:ident = $bit:literal, $label:literal;
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            $(
                $(#[$doc])*
                pub const $flag: $name = $name($bit);
            )+

            const LABELS: &'static [($name, &'static str)] = &[$(($name::$flag, $label)),+];

            pub const fn from_bits(bits: u32) -> Self {
                $name(bits)
            }

            pub const fn bits(&self) -> u32 {
                self.0
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// True when every bit of `other` is set
            pub const fn contains(&self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            /// True when any bit of `other` is set
            pub const fn intersects(&self, other: $name) -> bool {
                self.0 & other.0 != 0
            }

            /// Labels of the named flags that are set
            pub fn labels(&self) -> Vec<&'static str> {
                Self::LABELS
                    .iter()
                    .filter(|(flag, _)| self.contains(*flag))
                    .map(|(_, label)| *label)
                    .collect()
            }
        }

        impl BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let labels = self.labels();
                if labels.is_empty() {
                    write!(f, "{:#04x}", self.0)
                } else {
                    f.write_str(&labels.join("|"))
                }
            }
        }

        impl FieldValue for $name {
            fn decode(raw: &[u8]) -> Result<Self, String> {
                u32::decode(raw).map($name)
            }

            fn encode(&self, _separator: u8) -> String {
                self.0.to_string()
            }
        }
    };
}

flag_set! {
    /// Why a server is administratively out of rotation (SRV_ADMF_*)
    pub struct AdminState {
        /// The server was explicitly forced into maintenance
        const FORCED_MAINTENANCE = 0x01, "FMAINT";
        /// Maintenance inherited from a tracked server
        const INHERITED_MAINTENANCE = 0x02, "IMAINT";
        /// Maintenance because of the configuration
        const CONFIGURED_MAINTENANCE = 0x04, "CMAINT";
        /// The server was explicitly forced into drain
        const FORCED_DRAIN = 0x08, "FDRAIN";
        /// Drain inherited from a tracked server
        const INHERITED_DRAIN = 0x10, "IDRAIN";
        /// Maintenance because of an IP address resolution failure
        const RESOLUTION_MAINTENANCE = 0x20, "RMAINT";
        /// The server FQDN was set from the stats socket
        const HOST_MAINTENANCE = 0x40, "HMAINT";
    }
}

impl AdminState {
    const MAINTENANCE: AdminState = AdminState(0x01 | 0x02 | 0x04 | 0x20 | 0x40);
    const DRAIN: AdminState = AdminState(0x08 | 0x10);

    /// Any maintenance reason is set
    pub fn in_maintenance(&self) -> bool {
        self.intersects(Self::MAINTENANCE)
    }

    /// Any drain reason is set
    pub fn in_drain(&self) -> bool {
        self.intersects(Self::DRAIN)
    }
}

flag_set! {
    /// State of a health or agent check (CHK_ST_*)
    pub struct CheckState {
        /// A check is currently running
        const IN_PROGRESS = 0x01, "INPROGRESS";
        /// The check is configured and may be enabled
        const CONFIGURED = 0x02, "CONFIGURED";
        /// The check is administratively enabled
        const ENABLED = 0x04, "ENABLED";
        /// Checks are paused because of maintenance (health only)
        const PAUSED = 0x08, "PAUSED";
        /// Agent check rather than health check; only seen in srv_agent_state
        const AGENT = 0x10, "AGENT";
    }
}

positional_record! {
    /// One row of `show servers state`
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
    pub struct ServerStateRecord (separator = b' ', columns = SERVER_STATE_COLUMNS) {
        /// Backend unique id
        0 "be_id" => be_id: u32,
        /// Backend label
        1 "be_name" => be_name: String,
        /// Server unique id within the backend
        2 "srv_id" => srv_id: u32,
        /// Server label
        3 "srv_name" => srv_name: String,
        /// Server IP address
        4 "srv_addr" => srv_addr: String,
        /// Actual health and traffic readiness
        5 "srv_op_state" => op_state: OperationalState,
        /// Mask of administrative reasons (MAINT/DRAIN/...)
        6 "srv_admin_state" => admin_state: AdminState,
        /// User visible weight
        7 "srv_uweight" => uweight: u32,
        /// Initial weight
        8 "srv_iweight" => iweight: u32,
        /// Time since the last operational change
        9 "srv_time_since_last_change" => time_since_last_change: u64,
        /// Last health check status code
        10 "srv_check_status" => check_status: u32,
        11 "srv_check_result" => check_result: CheckResult,
        /// Checks rise/fall current counter
        12 "srv_check_health" => check_health: u32,
        13 "srv_check_state" => check_state: CheckState,
        /// Uses the check state mask plus `CheckState::AGENT`
        14 "srv_agent_state" => agent_state: CheckState,
        /// Backend id is forced by configuration
        15 "bk_f_forced_id" => backend_forced_id: bool,
        /// Server id is forced by configuration
        16 "srv_f_forced_id" => server_forced_id: bool,
        17 "srv_fqdn" => fqdn: String,
        18 "srv_port" => port: String,
        /// DNS SRV record associated with this server
        19 "srvrecord" => srv_record: String,
        20 "srv_use_ssl" => use_ssl: bool,
        21 "srv_check_port" => check_port: String,
        22 "srv_check_addr" => check_addr: String,
        23 "srv_agent_addr" => agent_addr: String,
        24 "srv_agent_port" => agent_port: String,
    }
}

/// Parse the response of `show servers state [<backend>]`
pub fn parse_show_servers_state(response: &[u8]) -> RuntimeResult<Vec<ServerStateRecord>> {
    let (version, table) = match response.iter().position(|b| *b == b'\n') {
        Some(end) => (&response[..end], &response[end + 1..]),
        None => (response, &response[response.len()..]),
    };
    let version = version.strip_suffix(b"\r").unwrap_or(version);

    if version != SUPPORTED_VERSION {
        return Err(RuntimeError::UnsupportedVersion {
            found: String::from_utf8_lossy(version).into_owned(),
        });
    }

    // Line numbers count the version line
    data_lines(table, 2)
        .map(|(line_number, line)| {
            let row = Row::parse(line_number, line, b' ')?;
            ServerStateRecord::from_row(&row)
        })
        .collect()
}
