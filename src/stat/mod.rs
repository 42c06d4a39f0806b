/// Stat counters as reported by `show stat`
///
/// The response is CSV: a `# pxname,svname,...` header followed by one row
/// per listener, frontend, backend and server, in the order the proxies and
/// servers are declared. Column positions follow
/// http://docs.haproxy.org/2.6/management.html#9.1 and must not be
/// reordered. The letters in brackets tell which object types fill a column:
/// L (listeners), F (frontends), B (backends), S (servers). Columns an
/// object type does not track are left empty and decode to zero.
use crate::codec::{data_lines, positional_record, Row};
use crate::error::RuntimeResult;
use serde::Serialize;

/// `svname` of a frontend aggregate row
pub const FRONTEND: &str = "FRONTEND";
/// `svname` of a backend aggregate row
pub const BACKEND: &str = "BACKEND";

positional_record! {
    /// One row of `show stat`
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
    pub struct CounterRecord (separator = b',', columns = STAT_COLUMNS) {
        /// Proxy name [LFBS]
        0 "pxname" => px_name: String,
        /// Service name: FRONTEND, BACKEND, or the server/listener name [LFBS]
        1 "svname" => sv_name: String,
        /// Current queued requests; for a backend, those without a server assigned [..BS]
        2 "qcur" => qcur: u32,
        /// Max value of qcur [..BS]
        3 "qmax" => qmax: u32,
        /// Current sessions [LFBS]
        4 "scur" => scur: u32,
        /// Max sessions [LFBS]
        5 "smax" => smax: u32,
        /// Configured session limit [LFBS]
        6 "slim" => slim: u32,
        /// Cumulative number of sessions [LFBS]
        7 "stot" => stot: u64,
        /// Bytes in [LFBS]
        8 "bin" => bin: u64,
        /// Bytes out [LFBS]
        9 "bout" => bout: u64,
        /// Requests denied because of security concerns [LFB.]
        10 "dreq" => dreq: u64,
        /// Responses denied because of security concerns [LFBS]
        11 "dresp" => dresp: u64,
        /// Request errors [LF..]
        12 "ereq" => ereq: u64,
        /// Requests that hit an error connecting to a server [..BS]
        13 "econ" => econ: u64,
        /// Response errors [..BS]
        14 "eresp" => eresp: u64,
        /// Connection retries [..BS]
        15 "wretr" => wretr: u64,
        /// Redispatches to another server [..BS]
        16 "wredis" => wredis: u64,
        /// UP, DOWN, NOLB, MAINT, MAINT(via), MAINT(resolution), ... [LFBS]
        17 "status" => status: String,
        /// Effective weight (server) or total effective weight (backend) [..BS]
        18 "weight" => weight: u32,
        /// Server is active, or number of active servers [..BS]
        19 "act" => act: u32,
        /// Server is backup, or number of backup servers [..BS]
        20 "bck" => bck: u32,
        /// Failed checks while the server was up [...S]
        21 "chkfail" => chkfail: u64,
        /// UP to DOWN transitions [..BS]
        22 "chkdown" => chkdown: u64,
        /// Seconds since the last UP/DOWN transition [..BS]
        23 "lastchg" => lastchg: u32,
        /// Total downtime in seconds [..BS]
        24 "downtime" => downtime: u32,
        /// Configured maxqueue, empty when unlimited [...S]
        25 "qlimit" => qlimit: u64,
        /// Process id, 0 for the first instance [LFBS]
        26 "pid" => pid: u32,
        /// Unique proxy id [LFBS]
        27 "iid" => iid: u32,
        /// Server id, unique inside a proxy [L..S]
        28 "sid" => sid: u32,
        /// Slowstart throttle percentage [...S]
        29 "throttle" => throttle: u64,
        /// Times the server was selected [..BS]
        30 "lbtot" => lbtot: u64,
        /// Id of the tracked proxy/server [...S]
        31 "tracked" => tracked: u32,
        /// 0=frontend, 1=backend, 2=server, 3=listener [LFBS]
        32 "type" => object_type: u32,
        /// Sessions per second over the last second [.FBS]
        33 "rate" => rate: u32,
        /// Configured limit on new sessions per second [.F..]
        34 "rate_lim" => rate_lim: u32,
        /// Max new sessions per second [.FBS]
        35 "rate_max" => rate_max: u32,
        /// Last health check status, prefixed by "* " while a check runs [...S]
        36 "check_status" => check_status: String,
        /// Layer 5-7 code of the last health check [...S]
        37 "check_code" => check_code: u32,
        /// Duration of the last health check in ms [...S]
        38 "check_duration" => check_duration: u64,
        39 "hrsp_1xx" => hrsp_1xx: u64,
        40 "hrsp_2xx" => hrsp_2xx: u64,
        41 "hrsp_3xx" => hrsp_3xx: u64,
        42 "hrsp_4xx" => hrsp_4xx: u64,
        43 "hrsp_5xx" => hrsp_5xx: u64,
        /// HTTP responses with other codes (protocol error) [.FBS]
        44 "hrsp_other" => hrsp_other: u64,
        /// Failed health check details [...S]
        45 "hanafail" => hanafail: u64,
        /// HTTP requests per second over the last second [.F..]
        46 "req_rate" => req_rate: u32,
        47 "req_rate_max" => req_rate_max: u32,
        /// Total HTTP requests received [.FB.]
        48 "req_tot" => req_tot: u64,
        /// Transfers aborted by the client [..BS]
        49 "cli_abrt" => cli_abrt: u64,
        /// Transfers aborted by the server [..BS]
        50 "srv_abrt" => srv_abrt: u64,
        51 "comp_in" => comp_in: u64,
        52 "comp_out" => comp_out: u64,
        53 "comp_byp" => comp_byp: u64,
        54 "comp_rsp" => comp_rsp: u64,
        /// Seconds since the last session was assigned, -1 if never [..BS]
        55 "lastsess" => lastsess: i64,
        /// Last health check contents or textual error [...S]
        56 "last_chk" => last_chk: String,
        /// Last agent check contents or textual error [...S]
        57 "last_agt" => last_agt: String,
        /// Average queue time in ms over the last 1024 requests [..BS]
        58 "qtime" => qtime: u32,
        /// Average connect time in ms over the last 1024 requests [..BS]
        59 "ctime" => ctime: u32,
        /// Average response time in ms over the last 1024 requests [..BS]
        60 "rtime" => rtime: u32,
        /// Average total session time in ms over the last 1024 requests [..BS]
        61 "ttime" => ttime: u32,
        62 "agent_status" => agent_status: String,
        63 "agent_code" => agent_code: u32,
        64 "agent_duration" => agent_duration: u64,
        /// Human readable description of check_status [...S]
        65 "check_desc" => check_desc: String,
        /// Human readable description of agent_status [...S]
        66 "agent_desc" => agent_desc: String,
        67 "check_rise" => check_rise: u32,
        68 "check_fall" => check_fall: u32,
        /// Health level between 0 and rise+fall-1 [...S]
        69 "check_health" => check_health: u32,
        70 "agent_rise" => agent_rise: u32,
        71 "agent_fall" => agent_fall: u32,
        72 "agent_health" => agent_health: u32,
        /// address:port or "unix" [L..S]
        73 "addr" => addr: String,
        /// Server cookie value or backend cookie name [..BS]
        74 "cookie" => cookie: String,
        /// tcp, http, health or unknown [LFBS]
        75 "mode" => mode: String,
        /// Load balancing algorithm [..B.]
        76 "algo" => algo: String,
        77 "conn_rate" => conn_rate: u32,
        78 "conn_rate_max" => conn_rate_max: u32,
        79 "conn_tot" => conn_tot: u64,
        /// HTTP requests intercepted (redirects, stats, services) [.FB.]
        80 "intercepted" => intercepted: u64,
        /// Denied by "tcp-request connection" rules [LF..]
        81 "dcon" => dcon: u64,
        /// Denied by "tcp-request session" rules [LF..]
        82 "dses" => dses: u64,
        /// Failed header rewrites [LFBS]
        83 "wrew" => wrew: u64,
        /// Connection establishment attempts [..BS]
        84 "connect" => connect: u64,
        /// Connection reuses [..BS]
        85 "reuse" => reuse: u64,
        86 "cache_lookups" => cache_lookups: u64,
        87 "cache_hits" => cache_hits: u64,
        /// Idle connections available for reuse [...S]
        88 "srv_icur" => srv_icur: u32,
        /// Limit on available idle connections [...S]
        89 "src_ilim" => src_ilim: u32,
        90 "qtime_max" => qtime_max: u32,
        91 "ctime_max" => ctime_max: u32,
        92 "rtime_max" => rtime_max: u32,
        93 "ttime_max" => ttime_max: u32,
        /// Internal errors [LFBS]
        94 "eint" => eint: u64,
        95 "idle_conn_cur" => idle_conn_cur: u32,
        96 "safe_conn_cur" => safe_conn_cur: u32,
        97 "used_conn_cur" => used_conn_cur: u32,
        98 "need_conn_est" => need_conn_est: u32,
        /// User weight (server) or total user weight (backend) [..BS]
        99 "uweight" => uweight: u32,
    }
}

/// Object kind encoded in the `type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Frontend,
    Backend,
    Server,
    Listener,
}

impl CounterRecord {
    /// Interpret the `type` column; `None` for codes this client does not know
    pub fn object_kind(&self) -> Option<ObjectKind> {
        match self.object_type {
            0 => Some(ObjectKind::Frontend),
            1 => Some(ObjectKind::Backend),
            2 => Some(ObjectKind::Server),
            3 => Some(ObjectKind::Listener),
            _ => None,
        }
    }

    /// FRONTEND and BACKEND rows aggregate the objects below them
    pub fn is_aggregate(&self) -> bool {
        self.sv_name == FRONTEND || self.sv_name == BACKEND
    }
}

/// Parse the response of `show stat`.
///
/// Rows are returned in the order received. Any malformed row fails the
/// whole call.
pub fn parse_show_stat(response: &[u8]) -> RuntimeResult<Vec<CounterRecord>> {
    data_lines(response, 1)
        .map(|(line_number, line)| {
            let row = Row::parse(line_number, line, b',')?;
            CounterRecord::from_row(&row)
        })
        .collect()
}

/// Find the row for `proxy`/`object`, e.g. a backend and one of its servers
pub fn find_counter<'a>(records: &'a [CounterRecord], proxy: &str, object: &str) -> Option<&'a CounterRecord> {
    records
        .iter()
        .find(|r| r.px_name == proxy && r.sv_name == object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    const SERVER_ROW: &str = "indexws,iws01,0,0,0,1,,8592,1678803,9633529,,0,,4,0,14,0,UP,1,1,0,33,16,10916,15450,,1,4,1,,8578,,2,0,,1,L7OK,200,47,0,8554,0,0,18,0,,,,8572,0,1,,,,,4,,,0,23,31,4590,,,,Layer7 check passed,,2,3,4,,,,172.24.21.40:8080,,http,,,,,,,,0,7992,600,,,7953,,0,175,172,5272,0,7858,95,4294959343,4294959345,1,,,,-,0,0,0,,,,,,,,,,,,,,,,,,,,,,";

    fn empty_row(px_name: &str, sv_name: &str, object_type: u32, scur: u32) -> String {
        let mut columns = vec![String::new(); STAT_COLUMNS.len()];
        columns[0] = px_name.to_string();
        columns[1] = sv_name.to_string();
        columns[4] = scur.to_string();
        columns[32] = object_type.to_string();
        columns.join(",")
    }

    #[test]
    fn test_column_layout() {
        assert_eq!(STAT_COLUMNS.len(), 100);
        assert_eq!(STAT_COLUMNS[0], "pxname");
        assert_eq!(STAT_COLUMNS[4], "scur");
        assert_eq!(STAT_COLUMNS[32], "type");
        assert_eq!(STAT_COLUMNS[55], "lastsess");
        assert_eq!(STAT_COLUMNS[99], "uweight");
    }

    #[test]
    fn test_parse_server_row() {
        let records = parse_show_stat(SERVER_ROW.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let c = &records[0];

        assert_eq!(c.px_name, "indexws");
        assert_eq!(c.sv_name, "iws01");
        assert_eq!(c.qcur, 0);
        assert_eq!(c.scur, 0);
        assert_eq!(c.smax, 1);
        assert_eq!(c.slim, 0);
        assert_eq!(c.stot, 8592);
        assert_eq!(c.bin, 1678803);
        assert_eq!(c.bout, 9633529);
        assert_eq!(c.econ, 4);
        assert_eq!(c.wretr, 14);
        assert_eq!(c.status, "UP");
        assert_eq!(c.weight, 1);
        assert_eq!(c.act, 1);
        assert_eq!(c.bck, 0);
        assert_eq!(c.chkfail, 33);
        assert_eq!(c.chkdown, 16);
        assert_eq!(c.lastchg, 10916);
        assert_eq!(c.downtime, 15450);
        assert_eq!(c.pid, 1);
        assert_eq!(c.iid, 4);
        assert_eq!(c.sid, 1);
        assert_eq!(c.lbtot, 8578);
        assert_eq!(c.object_type, 2);
        assert_eq!(c.object_kind(), Some(ObjectKind::Server));
        assert_eq!(c.rate_max, 1);
        assert_eq!(c.check_status, "L7OK");
        assert_eq!(c.check_code, 200);
        assert_eq!(c.check_duration, 47);
        assert_eq!(c.hrsp_2xx, 8554);
        assert_eq!(c.hrsp_5xx, 18);
        assert_eq!(c.req_tot, 8572);
        assert_eq!(c.srv_abrt, 1);
        assert_eq!(c.lastsess, 4);
        assert_eq!(c.last_chk, "");
        assert_eq!(c.ctime, 23);
        assert_eq!(c.rtime, 31);
        assert_eq!(c.ttime, 4590);
        assert_eq!(c.check_desc, "Layer7 check passed");
        assert_eq!(c.check_rise, 2);
        assert_eq!(c.check_fall, 3);
        assert_eq!(c.check_health, 4);
        assert_eq!(c.agent_rise, 0);
        assert_eq!(c.addr, "172.24.21.40:8080");
        assert_eq!(c.mode, "http");
        assert_eq!(c.algo, "");
        assert_eq!(c.connect, 7992);
        assert_eq!(c.reuse, 600);
        assert_eq!(c.srv_icur, 7953);
        assert_eq!(c.ctime_max, 175);
        assert_eq!(c.rtime_max, 172);
        assert_eq!(c.ttime_max, 5272);
        assert_eq!(c.idle_conn_cur, 7858);
        assert_eq!(c.safe_conn_cur, 95);
        assert_eq!(c.used_conn_cur, 4294959343);
        assert_eq!(c.need_conn_est, 4294959345);
        assert_eq!(c.uweight, 1);
        assert!(!c.is_aggregate());
    }

    #[test]
    fn test_parse_full_response_keeps_order() {
        let response = format!(
            "# {}\n{}\n{}\n{}\n{}\n\n",
            STAT_COLUMNS.join(","),
            empty_row("http-in", FRONTEND, 0, 7),
            empty_row("indexws", "iws02", 2, 3),
            SERVER_ROW,
            empty_row("indexws", BACKEND, 1, 3),
        );

        let records = parse_show_stat(response.as_bytes()).unwrap();
        let names: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.px_name.as_str(), r.sv_name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("http-in", "FRONTEND"),
                ("indexws", "iws02"),
                ("indexws", "iws01"),
                ("indexws", "BACKEND"),
            ]
        );
        assert!(records[0].is_aggregate());
        assert_eq!(records[0].object_kind(), Some(ObjectKind::Frontend));
        assert_eq!(records[3].object_kind(), Some(ObjectKind::Backend));

        let found = find_counter(&records, "indexws", "iws02").unwrap();
        assert_eq!(found.scur, 3);
        assert!(find_counter(&records, "indexws", "iws09").is_none());
    }

    #[test]
    fn test_empty_and_comment_only_responses() {
        assert!(parse_show_stat(b"").unwrap().is_empty());
        assert!(parse_show_stat(b"# pxname,svname,qcur\n").unwrap().is_empty());
    }

    #[test]
    fn test_empty_trailing_columns_decode_to_zero() {
        let mut columns = vec![String::new(); STAT_COLUMNS.len()];
        columns[0] = "be".to_string();
        columns[1] = "s1".to_string();
        let records = parse_show_stat(columns.join(",").as_bytes()).unwrap();
        let c = &records[0];
        assert_eq!(c.uweight, 0);
        assert_eq!(c.need_conn_est, 0);
        assert_eq!(c.eint, 0);
        assert_eq!(c.lastsess, 0);
        assert_eq!(c.status, "");
    }

    #[test]
    fn test_short_row_fails_whole_decode() {
        let response = format!("{}\nbe,s1,0,0\n", SERVER_ROW);
        let err = parse_show_stat(response.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::MissingColumns {
                line: 2,
                expected: 100,
                found: 4
            }
        ));
    }

    #[test]
    fn test_bad_number_fails_whole_decode() {
        let bad = SERVER_ROW.replacen("indexws,iws01,0,0,0,", "indexws,iws01,0,0,x,", 1);
        let response = format!("{}\n{}\n", SERVER_ROW, bad);
        match parse_show_stat(response.as_bytes()).unwrap_err() {
            RuntimeError::FieldParse { line, column, name, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, 4);
                assert_eq!(name, "scur");
                assert_eq!(value, "x");
            }
            other => panic!("Expected field parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_overflowing_counter_is_rejected() {
        let bad = SERVER_ROW.replacen("indexws,iws01,0,0,0,1,", "indexws,iws01,0,0,4294967296,1,", 1);
        assert!(matches!(
            parse_show_stat(bad.as_bytes()),
            Err(RuntimeError::FieldParse { column: 4, .. })
        ));
    }

    #[test]
    fn test_never_used_server_lastsess() {
        let mut columns = vec![String::new(); STAT_COLUMNS.len()];
        columns[55] = "-1".to_string();
        let records = parse_show_stat(columns.join(",").as_bytes()).unwrap();
        assert_eq!(records[0].lastsess, -1);
    }

    #[test]
    fn test_quoted_description_survives_reencoding() {
        let mut columns = vec![String::new(); STAT_COLUMNS.len()];
        columns[0] = "be".to_string();
        columns[1] = "s1".to_string();
        columns[65] = "\"Layer7 wrong status, 503\"".to_string();
        let records = parse_show_stat(columns.join(",").as_bytes()).unwrap();
        assert_eq!(records[0].check_desc, "Layer7 wrong status, 503");

        let again = parse_show_stat(records[0].to_row().as_bytes()).unwrap();
        assert_eq!(again[0], records[0]);
    }

    #[test]
    fn test_reencoded_row_decodes_to_same_values() {
        let record = parse_show_stat(SERVER_ROW.as_bytes()).unwrap().remove(0);
        let row = record.to_row();
        assert_eq!(row.split(',').count(), STAT_COLUMNS.len());

        let decoded = parse_show_stat(row.as_bytes()).unwrap().remove(0);
        assert_eq!(decoded, record);
    }
}
