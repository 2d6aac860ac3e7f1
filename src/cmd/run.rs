use crate::{
    config::{self, Materialized, StateLayout},
    error::BootError,
    process::Supervisor,
    shim::ReadinessShim,
    token,
};
use std::net::SocketAddr;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::RunArgs;

/// The bootstrap sequence: resolve the token, materialize the configuration
/// document, stand up the readiness shim, then hand the port to the target
/// service and supervise it until exit.
pub async fn run(args: RunArgs) -> Result<std::process::ExitCode, BootError> {
    args.logger.init()?;
    info!(
        "starting warmgate v{} boot sequence",
        env!("CARGO_PKG_VERSION")
    );
    debug!("effective config: {:#?}", args);

    let layout = StateLayout::new(&args.state_dir).with_config_path(args.config_path.clone());

    let token = token::resolve(args.env.gateway_token.as_ref(), &layout.token_path())?;

    let document = config::build_document(&args.env, &token, args.host, args.port);
    let outcome = config::materialize(&layout, &document)?;

    let exports = args.env.exports(&token);

    if outcome == Materialized::Written {
        if let Some(hook) = &args.migrate_cmd {
            config::run_migration(hook, &exports).await;
        }
    }

    // The shim is best-effort: losing the port race is benign and any other
    // bind failure downgrades to running without warm-up masking.
    let (release_tx, release_rx) = watch::channel(false);
    let shim_addr = SocketAddr::new(args.host, args.port);
    match ReadinessShim::bind(
        shim_addr,
        args.probe_interval.into(),
        args.warmup_max.into(),
    )
    .await
    {
        Ok(Some(shim)) => {
            tokio::spawn(shim.serve(release_rx));
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "readiness shim unavailable; continuing without it"),
    }

    let supervisor = Supervisor::new(
        args.cmd.clone(),
        exports,
        args.host,
        args.port,
        args.warmup_delay,
        release_tx,
    );
    let status = supervisor.run().await?;

    Ok(propagate(status))
}

/// Map the child's exit status onto our own: its code verbatim, or the
/// conventional 128+N when it died to a signal.
fn propagate(status: ExitStatus) -> std::process::ExitCode {
    if let Some(code) = status.code() {
        std::process::ExitCode::from(code as u8)
    } else if let Some(signal) = status.signal() {
        std::process::ExitCode::from((128 + signal) as u8)
    } else {
        std::process::ExitCode::from(u8::from(sysexits::ExitCode::Unavailable))
    }
}
