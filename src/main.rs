use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use haproxy_runtime::config::Config;
use haproxy_runtime::{MaintenanceOutcome, RuntimeClient, RuntimeError, ServerState};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "haproxy-runtime")]
#[command(about = "Query and drive HAProxy through its runtime API socket")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Runtime API socket (unix://path or tcp://address:port), overrides the configuration
    #[arg(short, long, global = true)]
    socket: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show stat counters
    Stat {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show servers state
    State {
        /// Only this backend
        #[arg(short, long)]
        backend: Option<String>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a server to ready, drain or maint
    Set {
        /// backend/server
        target: String,
        /// ready, drain or maint
        state: ServerState,
    },
    /// Drain a server and place it into maintenance
    Maintenance {
        /// backend/server
        target: String,
        /// Force maintenance after this many seconds, overrides the configuration
        #[arg(short, long)]
        timeout_sec: Option<u64>,
    },
    /// Execute a raw runtime API command and print the response
    Exec {
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Generate an example configuration file
    Init {
        /// Socket transport (unix or tcp)
        #[arg(short, long, default_value = "unix")]
        transport: String,
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        path: PathBuf,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { transport, output } => generate_config(&transport, output),
        Commands::Validate { path } => validate_config(path),
        Commands::Version => {
            show_version();
            Ok(())
        }
        command => {
            let config = load_config(cli.config, cli.socket)?;
            init_logging(&config);
            let result = run_command(&config, command).await;
            if let Err(e) = &result {
                if let Some(runtime_error) = e.downcast_ref::<RuntimeError>() {
                    error!(severity = %runtime_error.severity(), "{:#}", e);
                }
            }
            result
        }
    }
}

fn load_config(path: Option<PathBuf>, socket: Option<String>) -> anyhow::Result<Config> {
    let mut config = match &path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };

    if let Some(socket) = socket {
        config.runtime.socket = socket;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run_command(config: &Config, command: Commands) -> anyhow::Result<()> {
    let client = RuntimeClient::new(&config.runtime.socket)?
        .with_poll_interval(config.maintenance.poll_interval());

    execute_command(&client, config, command)
        .await
        .with_context(|| format!("Runtime API at {}", client.executor().locator()))
}

async fn execute_command(
    client: &RuntimeClient,
    config: &Config,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Stat { json } => {
            let counters = client.show_stat().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&counters)?);
            } else {
                println!(
                    "{:<24} {:<24} {:<12} {:>8} {:>8} {:>12}",
                    "pxname", "svname", "status", "scur", "smax", "stot"
                );
                for c in &counters {
                    println!(
                        "{:<24} {:<24} {:<12} {:>8} {:>8} {:>12}",
                        c.px_name, c.sv_name, c.status, c.scur, c.smax, c.stot
                    );
                }
            }
        }
        Commands::State { backend, json } => {
            let states = match backend {
                Some(backend) => client.show_servers_state_for(&backend).await?,
                None => client.show_servers_state().await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&states)?);
            } else {
                println!(
                    "{:<32} {:<10} {:<24} {:<10}",
                    "backend/server", "op_state", "admin_state", "check"
                );
                for s in &states {
                    println!(
                        "{:<32} {:<10} {:<24} {:<10}",
                        format!("{}/{}", s.be_name, s.srv_name),
                        format!("{:?}", s.op_state),
                        s.admin_state.to_string(),
                        format!("{:?}", s.check_result),
                    );
                }
            }
        }
        Commands::Set { target, state } => {
            let (backend, server) = split_target(&target)?;
            client.set_server_state(backend, server, state).await?;
            println!("{}/{} is now {}", backend, server, state);
        }
        Commands::Maintenance { target, timeout_sec } => {
            let (backend, server) = split_target(&target)?;
            let timeout = timeout_sec
                .map(Duration::from_secs)
                .or_else(|| config.maintenance.drain_timeout());

            info!(backend, server, ?timeout, "Starting drain");
            match client
                .server_maintenance_with_timeout(backend, server, timeout)
                .await?
            {
                MaintenanceOutcome::Drained => {
                    println!("{}/{} drained and in maintenance", backend, server);
                }
                MaintenanceOutcome::Forced { last_sessions } => {
                    warn!(backend, server, ?last_sessions, "Maintenance was forced");
                    println!(
                        "{}/{} forced into maintenance ({} sessions at last poll)",
                        backend,
                        server,
                        last_sessions.map_or_else(|| "unknown".to_string(), |s| s.to_string())
                    );
                }
            }
        }
        Commands::Exec { command } => {
            let response = client.execute(&command.join(" ")).await?;
            std::io::stdout().write_all(&response)?;
        }
        Commands::Init { .. } | Commands::Validate { .. } | Commands::Version => {
            unreachable!("handled before connecting")
        }
    }

    Ok(())
}

fn split_target(target: &str) -> anyhow::Result<(&str, &str)> {
    match target.split_once('/') {
        Some((backend, server)) if !backend.is_empty() && !server.is_empty() => {
            Ok((backend, server))
        }
        _ => bail!("Target '{}' must be backend/server", target),
    }
}

fn generate_config(transport: &str, output: PathBuf) -> anyhow::Result<()> {
    println!("Generating {} configuration file: {:?}", transport, output);

    Config::create_example_config(&output, transport)
        .context("Failed to generate config")?;

    println!("Configuration file generated successfully!");
    println!("Edit the socket to match your HAProxy and run:");
    println!("  haproxy-runtime --config {:?} stat", output);

    Ok(())
}

fn validate_config(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating configuration file: {:?}", path);

    match Config::load_from_file(&path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!("  Socket: {}", config.runtime.socket);
            println!("  Poll interval: {}ms", config.maintenance.poll_interval_ms);
            match config.maintenance.drain_timeout_sec {
                Some(timeout) => println!("  Drain timeout: {}s", timeout),
                None => println!("  Drain timeout: none"),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            eprintln!("  {}", e);
            Err(e.into())
        }
    }
}

fn show_version() {
    println!("haproxy-runtime v{}", env!("CARGO_PKG_VERSION"));
    println!("Client for the HAProxy runtime API");
    println!();
    println!("Commands spoken:");
    println!("  • show stat");
    println!("  • show servers state [<backend>]");
    println!("  • set server <backend>/<server> state <ready|drain|maint>");
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    info!("Logging initialized at level: {}", config.logging.level);
}
