use crate::{
    env::BootEnv,
    logging::Logger,
    process::WarmupDelay,
    shim::ProbeInterval,
};
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "warmgate")]
#[command(version, about = "Bootstrap a gateway service behind a warm-up health shim", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bootstrap sequence and supervise the target service
    Run(RunArgs),

    /// Probe the local health endpoint; exits 0 when it answers 200
    Healthcheck(HealthArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Address the shim and the target service bind
    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Service port shared by the shim and the target service
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Durable volume mount point
    #[arg(long, env = "GATEWAY_STATE_DIR", default_value = "/data", value_name = "PATH")]
    pub state_dir: PathBuf,

    /// Configuration document path; defaults to <STATE_DIR>/config/gateway.json
    #[arg(long, env = "GATEWAY_CONFIG_PATH", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Delay after target spawn before the shim vacates the service port.
    /// Unitless numbers are interpreted as seconds.
    #[arg(long, env = "GATEWAY_WARMUP_DELAY", default_value_t = WarmupDelay::default())]
    pub warmup_delay: WarmupDelay,

    /// Upper bound on the shim's lifetime if no release signal arrives
    #[arg(long, env = "GATEWAY_WARMUP_MAX", default_value = "120s")]
    pub warmup_max: WarmupDelay,

    /// Interval between port-takeover probes.
    /// Unitless numbers are interpreted as milliseconds.
    #[arg(long, env = "GATEWAY_PROBE_INTERVAL", default_value_t = ProbeInterval::default())]
    pub probe_interval: ProbeInterval,

    /// Config migration hook run once after a fresh materialization,
    /// e.g. the target service's own `doctor` subcommand
    #[arg(long, env = "GATEWAY_MIGRATE_CMD", value_name = "CMD")]
    pub migrate_cmd: Option<String>,

    /// Deploy environment ingestion
    #[command(flatten)]
    pub env: BootEnv,

    /// Logging configuration
    #[command(flatten)]
    pub logger: Logger,

    /// Target service command, following a `--` separator.
    /// Example: warmgate run -- openclaw gateway
    #[arg(required = true, trailing_var_arg = true, help_heading = None)]
    pub cmd: Vec<String>,
}

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Port to probe on loopback
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Probe timeout in seconds
    #[arg(long, default_value_t = 2, value_name = "SECS")]
    pub timeout: u64,
}

pub mod healthcheck;
pub mod run;

pub use healthcheck::healthcheck;
pub use run::run;
