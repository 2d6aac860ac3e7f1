//! Target service supervision and signal proxying.
//!
//! The supervisor spawns the gateway as a direct child in its own process
//! group, exports the resolved credentials into its environment, forwards
//! termination signals transparently, and propagates the child's exit status
//! as its own. Once the child has been spawned and the warm-up delay has
//! elapsed it releases the readiness shim so the gateway's bind retry can
//! claim the service port.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use secrecy::{ExposeSecret, SecretString};
use std::net::IpAddr;
use std::process::ExitStatus;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("no target command given")]
    EmptyCommand,

    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delay between spawning the target service and releasing the shim.
///
/// Unitless numbers are interpreted as seconds.
#[derive(Debug, Clone, Copy)]
pub struct WarmupDelay(pub Duration);

impl FromStr for WarmupDelay {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(s) = s.parse::<u64>() {
            return Ok(WarmupDelay(Duration::from_secs(s)));
        }
        let duration = humantime::parse_duration(s)?;
        Ok(WarmupDelay(duration))
    }
}

impl std::fmt::Display for WarmupDelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl From<WarmupDelay> for Duration {
    fn from(val: WarmupDelay) -> Self {
        val.0
    }
}

impl Default for WarmupDelay {
    fn default() -> Self {
        WarmupDelay(Duration::from_secs(10))
    }
}

/// Spawns and owns the target service child process.
pub struct Supervisor {
    cmd: Vec<String>,
    exports: Vec<(String, SecretString)>,
    host: IpAddr,
    port: u16,
    warmup: Duration,
    release: watch::Sender<bool>,
}

impl Supervisor {
    pub fn new(
        cmd: Vec<String>,
        exports: Vec<(String, SecretString)>,
        host: IpAddr,
        port: u16,
        warmup: impl Into<Duration>,
        release: watch::Sender<bool>,
    ) -> Self {
        Supervisor {
            cmd,
            exports,
            host,
            port,
            warmup: warmup.into(),
            release,
        }
    }

    /// Spawn the target service and block until it exits.
    ///
    /// The child receives the bind address and port as explicit arguments so
    /// it listens exactly where the shim did. Its exit status is returned
    /// untouched for transparent propagation.
    pub async fn run(self) -> Result<ExitStatus, ProcessError> {
        let (program, args) = self.cmd.split_first().ok_or(ProcessError::EmptyCommand)?;

        let mut command = Command::new(program);
        command.args(args);
        command.arg("--host").arg(self.host.to_string());
        command.arg("--port").arg(self.port.to_string());
        command.envs(self.exports.iter().map(|(k, v)| (k, v.expose_secret())));
        command.process_group(0);
        command.stdin(std::process::Stdio::null());
        // If this future is ever dropped early, take the child down with it;
        // there is no restart logic that would want it kept alive.
        command.kill_on_drop(true);

        info!(cmd = ?self.cmd, "spawning target service");
        let mut child = command.spawn()?;

        let forwarder = child.id().map(|id| {
            // Negative pid targets the whole process group.
            spawn_forwarder(Pid::from_raw(-(id as i32)))
        });

        let release = self.release.clone();
        let warmup = self.warmup;
        tokio::spawn(async move {
            tokio::time::sleep(warmup).await;
            info!(
                warmup = %humantime::format_duration(warmup),
                "warm-up delay elapsed; releasing readiness shim"
            );
            let _ = release.send(true);
        });

        let status = child.wait().await?;
        if let Some(handle) = forwarder {
            handle.abort();
        }

        info!(%status, "target service exited");
        Ok(status)
    }
}

/// Relay termination and user signals to the child's process group so the
/// supervisor is invisible to the platform's signal delivery.
fn spawn_forwarder(target: Pid) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signals = [
            (SignalKind::interrupt(), Signal::SIGINT, "SIGINT"),
            (SignalKind::terminate(), Signal::SIGTERM, "SIGTERM"),
            (SignalKind::hangup(), Signal::SIGHUP, "SIGHUP"),
            (SignalKind::quit(), Signal::SIGQUIT, "SIGQUIT"),
            (SignalKind::user_defined1(), Signal::SIGUSR1, "SIGUSR1"),
            (SignalKind::user_defined2(), Signal::SIGUSR2, "SIGUSR2"),
        ];

        let (tx, mut rx) = tokio::sync::mpsc::channel(32);

        for (kind, sig, name) in signals {
            match signal(kind) {
                Ok(mut stream) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        while stream.recv().await.is_some() {
                            if tx.send((sig, name)).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(e) => tracing::warn!("failed to register listener for {}: {}", name, e),
            }
        }

        while let Some((sig, name)) = rx.recv().await {
            debug!("forwarding {} to process group {}", name, target);
            if signal::kill(target, sig).is_err() {
                break;
            }
        }
    })
}
