use clap::Parser;
use warmgate::cmd;
use warmgate::cmd::{Cli, Command};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => match cmd::run(args).await {
            Ok(code) => code,
            Err(e) => e.report(),
        },
        Command::Healthcheck(args) => cmd::healthcheck(args).await,
    }
}
