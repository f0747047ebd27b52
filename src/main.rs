//! cloud-ha command line.
//!
//! ```text
//! cloud-ha --config ha.json check [--group fw-east]
//! cloud-ha --config ha.json failover --route-state routes.json --group fw-east --action down
//! ```
//!
//! `failover` reads routing state from the `--route-state` snapshot file
//! and writes it back afterwards.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use cloud_ha::config::{FileConfigSource, Verbosity};
use cloud_ha::health::AvailabilityEngine;
use cloud_ha::observability::logging::init_logging;
use cloud_ha::routing::InMemoryRouteBackend;
use cloud_ha::FailoverController;

#[derive(Parser)]
#[command(name = "cloud-ha")]
#[command(about = "Probe device groups and fail cloud routes over to their standby", long_about = None)]
struct Cli {
    /// Configuration document (JSON or TOML)
    #[arg(short, long, global = true, default_value = "cloud-ha.json")]
    config: PathBuf,

    /// error, info or trace (also 0, 1, 10)
    #[arg(short, long, global = true)]
    verbosity: Option<Verbosity>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the groups that are currently down
    Check {
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Move a group's traffic to its healthy or sick targets
    Failover {
        #[arg(short, long, default_value = "")]
        group: String,

        /// up or down
        #[arg(short, long, default_value = "")]
        action: String,

        /// Routing state snapshot to read and update
        #[arg(short, long, required = true)]
        route_state: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = FileConfigSource::new().fetch_path(&cli.config).await?;

    init_logging(&config.observability, cli.verbosity)?;
    tracing::info!(
        config = %cli.config.display(),
        groups = config.groups.len(),
        "Configuration loaded"
    );

    let engine = AvailabilityEngine::with_network_prober(config.probe.clone())?;

    match cli.command {
        Commands::Check { group } => {
            let down = engine.check_availability(&config, group.as_deref()).await?;
            println!("{}", serde_json::to_string(&down)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Failover {
            group,
            action,
            route_state,
        } => {
            let backend = InMemoryRouteBackend::load(&route_state)?;
            let controller = FailoverController::new(engine, Arc::new(backend.clone()));

            let response = controller.handle(&action, &group, &config).await;

            backend.save(&route_state)?;
            println!("{}", serde_json::to_string_pretty(&response)?);

            if response.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_failover_requires_route_state() {
        let err = Cli::try_parse_from(["cloud-ha", "failover", "--group", "east", "--action", "down"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "cloud-ha",
            "--config",
            "ha.toml",
            "failover",
            "--group",
            "east",
            "--action",
            "down",
            "--route-state",
            "routes.json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("ha.toml"));
        match cli.command {
            Commands::Failover { route_state, .. } => {
                assert_eq!(route_state, PathBuf::from("routes.json"))
            }
            Commands::Check { .. } => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_check_needs_no_route_state() {
        let cli = Cli::try_parse_from(["cloud-ha", "check", "--verbosity", "10"]).unwrap();
        assert_eq!(cli.verbosity, Some(Verbosity::Trace));
        assert!(matches!(cli.command, Commands::Check { group: None }));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_config_path_is_not_lossy() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b"ha-\xff.json".to_vec());
        let cli = Cli::try_parse_from([
            OsString::from("cloud-ha"),
            OsString::from("--config"),
            raw.clone(),
            OsString::from("check"),
        ])
        .unwrap();
        assert_eq!(cli.config.as_os_str(), raw.as_os_str());
    }
}
