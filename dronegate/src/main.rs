mod config;
mod logging;

use clap::{Args, Parser};
use config::{Config, ConfigError, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "dronegate", about = "Drone telemetry gateway")]
enum CliCommand {
    /// Serve the gateway API
    Gateway(ConfigArgs),
    /// Load and validate a config file, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_file: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(#[from] gateway::config::ValidationError),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Gateway(#[from] gateway::GatewayError),
}

fn main() {
    let cli = CliCommand::parse();

    if let Err(e) = cli_main(cli) {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn cli_main(cli: CliCommand) -> Result<(), CliError> {
    match cli {
        CliCommand::Gateway(args) => {
            let config = Config::from_file(&args.config_file)?;
            config.gateway.validate()?;

            let _sentry = logging::init(&config.common.logging);
            if let Some(metrics) = &config.common.metrics {
                init_statsd(metrics)?;
            }

            tracing::info!("Starting drone gateway");
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            rt.block_on(gateway::run(config.gateway))?;
            Ok(())
        }
        CliCommand::CheckConfig(args) => {
            let config = Config::from_file(&args.config_file)?;
            config.gateway.validate()?;
            println!("{}: ok", args.config_file.display());
            Ok(())
        }
    }
}

fn init_statsd(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(config.prefix.as_str()))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;
    shared::metrics_defs::describe_all(gateway::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "StatsD metrics enabled"
    );
    Ok(())
}
