//! Troubleshooting Engine Server - long-running HTTP service.
//!
//! Usage:
//!   troubleshooting-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>      Path to configuration file (json/toml/yaml)
//!   --host <HOST>        API server host (overrides config)
//!   --port <PORT>        API server port (overrides config)
//!   --log-file <PATH>    Log file path (default: stderr)

use std::fs::File;
use std::path::PathBuf;

use diy_troubleshooting_engine::api::{start_server, AppState};
use diy_troubleshooting_engine::config::AppConfig;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug)]
struct CliConfig {
    config_path: PathBuf,
    host: Option<String>,
    port: Option<u16>,
    log_file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self { config_path: PathBuf::from("config.toml"), host: None, port: None, log_file: None }
    }
}

fn parse_args() -> CliConfig {
    let mut config = CliConfig::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(path) = args.next() {
                    config.config_path = PathBuf::from(path);
                }
            }
            "--host" => config.host = args.next(),
            "--port" => {
                if let Some(port) = args.next() {
                    if let Ok(p) = port.parse() {
                        config.port = Some(p);
                    }
                }
            }
            "--log-file" => {
                if let Some(path) = args.next() {
                    config.log_file = Some(PathBuf::from(path));
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
    }

    config
}

fn print_help() {
    println!("Troubleshooting Engine Server");
    println!();
    println!("USAGE:");
    println!("    troubleshooting-server [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <PATH>      Path to configuration file (default: config.toml)");
    println!("    --host <HOST>        API server host (overrides config)");
    println!("    --port <PORT>        API server port (overrides config)");
    println!("    --log-file <PATH>    Log file path (default: stderr)");
    println!("    --help, -h           Print this help message");
}

fn setup_logging(log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,diy_troubleshooting_engine=debug"));

    if let Some(log_path) = log_file {
        let file = File::create(log_path)?;
        tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(file)).init();
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
    }

    Ok(())
}

async fn run(cli: CliConfig) -> anyhow::Result<()> {
    info!("loading configuration from {:?}", cli.config_path);

    let base = if cli.config_path.exists() {
        AppConfig::from_file(&cli.config_path)?
    } else {
        info!("config file not found, using defaults");
        AppConfig::default()
    };

    let mut app_config = AppConfig::from_env(base)?;
    if let Some(host) = &cli.host {
        let port = app_config
            .server
            .bind_address
            .rsplit_once(':')
            .map(|(_, p)| p.to_string())
            .unwrap_or_else(|| "8080".to_string());
        app_config.server.bind_address = format!("{host}:{port}");
    }
    if let Some(port) = cli.port {
        let host = app_config
            .server
            .bind_address
            .rsplit_once(':')
            .map(|(h, _)| h.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        app_config.server.bind_address = format!("{host}:{port}");
    }

    info!("initializing workflow store, session store, and LLM provider...");
    let state = AppState::new(app_config.clone()).await?;

    let (host, port) = app_config
        .server
        .bind_address
        .rsplit_once(':')
        .map(|(h, p)| (h.to_string(), p.parse().unwrap_or(8080)))
        .unwrap_or(("0.0.0.0".to_string(), 8080));

    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received");
        tx.send(()).ok();
    });

    tokio::select! {
        result = start_server(state, &host, port) => {
            if let Err(e) = result {
                error!("server error: {e}");
                return Err(e.into());
            }
        }
        _ = &mut rx => {
            info!("graceful shutdown initiated");
        }
    }

    info!("troubleshooting engine server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_args();
    setup_logging(cli.log_file.clone())?;

    info!("Troubleshooting Engine Server v{}", diy_troubleshooting_engine::VERSION);

    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cli_config_falls_back_to_config_toml() {
        let config = CliConfig::default();
        assert_eq!(config.config_path, PathBuf::from("config.toml"));
        assert!(config.host.is_none());
        assert!(config.port.is_none());
    }
}
