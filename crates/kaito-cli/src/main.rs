//! kubectl-kaito binary entrypoint.
//!
//! Installed on `PATH` as `kubectl-kaito`, so kubectl exposes it as
//! `kubectl kaito`.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kaito_cli::cli::{Cli, Commands};
use kaito_cli::cluster::KubeClusterClient;
use kaito_cli::commands::{ChatCommand, GetEndpointCommand, StatusCommand, VersionCommand};
use kaito_cli::endpoint::NetworkProbe;
use kaito_cli::inference::InferenceClient;
use kaito_cli::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose))),
        )
        .with_writer(io::stderr)
        .init();

    // Everything runs one step at a time, a single thread is enough.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

const fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = cli.kube_settings();
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Chat(args) => {
            let cmd = ChatCommand::new(args);
            let params = cmd.validate()?;
            let cluster = KubeClusterClient::connect(&settings).await?;
            let backend = InferenceClient::new()?;
            let mut stderr = io::stderr().lock();
            cmd.execute(
                &cluster,
                NetworkProbe::new()?,
                &backend,
                params,
                io::stdin().lock(),
                &mut stdout,
                &mut stderr,
            )
            .await?;
        }
        Commands::GetEndpoint(args) => {
            let cmd = GetEndpointCommand::new(args);
            cmd.validate()?;
            let cluster = KubeClusterClient::connect(&settings).await?;
            cmd.execute(&cluster, NetworkProbe::new()?, &mut stdout)
                .await?;
        }
        Commands::Status(args) => {
            let cmd = StatusCommand::new(args);
            cmd.validate()?;
            let cluster = KubeClusterClient::connect(&settings).await?;
            cmd.execute(&cluster, &mut stdout, chrono::Utc::now())
                .await?;
        }
        Commands::Version(args) => {
            VersionCommand::new(&args).execute(&mut stdout)?;
        }
    }

    Ok(())
}
