use super::HealthArgs;
use crate::shim::HEALTH_PATH;
use std::time::Duration;
use sysexits::ExitCode;

/// Probe the health endpoint on loopback, for container `HEALTHCHECK`
/// directives. Works identically against the shim and the real gateway.
pub async fn healthcheck(args: HealthArgs) -> std::process::ExitCode {
    let url = format!("http://127.0.0.1:{}{}", args.port, HEALTH_PATH);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()
    {
        Ok(client) => client,
        Err(_) => return exit(ExitCode::Software),
    };

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => exit(ExitCode::Ok),
        Ok(_) | Err(_) => exit(ExitCode::Unavailable),
    }
}

fn exit(code: ExitCode) -> std::process::ExitCode {
    std::process::ExitCode::from(u8::from(code))
}
