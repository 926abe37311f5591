//! dtncli
//!
//! Interactive shell for DTN-as-a-Service and Janus controllers. Run with
//! no command lines for the interactive prompt, or pass `-c <line>` one or
//! more times to run shell lines and exit.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dtncli::output::{print_info, print_success};
use dtncli::shell::{Shell, StdinConfirm};
use janus_client::{ApiService, Client};
use janus_core::config::{self, ClientConfig};

#[derive(Parser)]
#[command(name = "dtncli")]
#[command(author, version, about = "Interactive shell for DTN-as-a-Service and Janus controllers")]
struct Cli {
    /// Controller URL [default: http://localhost:5000]
    url: Option<String>,

    /// Basic-auth user [default: admin]
    user: Option<String>,

    /// Basic-auth password [default: admin]
    password: Option<String>,

    /// Path to configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Controller API to address
    #[arg(long, value_name = "dtnaas|janus")]
    service: Option<ApiService>,

    /// Verify the controller's TLS certificate
    #[arg(long)]
    verify_tls: bool,

    /// Timeout for GET requests
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Run a shell line and exit (repeatable, runs in order)
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    commands: Vec<String>,

    /// Write the effective connection settings to the config file
    #[arg(long)]
    save_config: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = resolve_config(&cli)?;

    if cli.save_config {
        let path = cli.config.clone().unwrap_or_else(config::default_config_path);
        config::save_config(&path, &config)
            .with_context(|| format!("Failed to save config to {:?}", path))?;
        print_success(&format!("Saved config to {}", path.display()));
    }

    if !cli.quiet {
        print_info(&banner(&config));
    }

    let client = Client::new(&config).context("Failed to create controller client")?;
    let mut shell = Shell::new(client);

    if cli.commands.is_empty() {
        shell.run_interactive().await?;
    } else {
        shell.run_batch(&cli.commands, &mut StdinConfirm).await;
    }

    Ok(())
}

/// Merge defaults, config file, flags and positionals, in rising precedence
fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config: ClientConfig = match &cli.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                config::load_config(&default_path).unwrap_or_else(|e| {
                    tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                    ClientConfig::default()
                })
            } else {
                ClientConfig::default()
            }
        }
    };

    if let Some(service) = cli.service {
        config.service = service;
    }
    if cli.verify_tls {
        config.verify_tls = true;
    }
    if let Some(secs) = cli.timeout {
        config.timeout = Some(Duration::from_secs(secs));
    }
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(user) = &cli.user {
        config.user = user.clone();
    }
    if let Some(password) = &cli.password {
        config.password = password.clone();
    }

    Ok(config)
}

/// Startup banner; any password but the stock default is masked
fn banner(config: &ClientConfig) -> String {
    let password = if config.has_default_password() {
        config.password.as_str()
    } else {
        "*****"
    };
    format!(
        "Server: {}\nUser  : {}\nPasswd: {}\n",
        config.url, config.user, password
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use janus_core::config::DEFAULT_PASSWORD;

    #[test]
    fn test_banner_masks_password() {
        let mut config = ClientConfig::default();
        assert_eq!(
            banner(&config),
            "Server: http://localhost:5000\nUser  : admin\nPasswd: admin\n"
        );

        config.password = "s3cret".into();
        assert!(banner(&config).ends_with("Passwd: *****\n"));
    }

    #[test]
    fn test_positionals_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "url = \"http://file:5000\"\nuser = \"fileuser\"\nservice = \"janus\"\ntimeout = 7\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "dtncli",
            "--config",
            path.to_str().unwrap(),
            "http://cli:5000",
        ]);
        let config = resolve_config(&cli).unwrap();

        assert_eq!(config.url, "http://cli:5000");
        assert_eq!(config.user, "fileuser");
        assert_eq!(config.password, DEFAULT_PASSWORD);
        assert_eq!(config.service, ApiService::Janus);
        assert_eq!(config.timeout, Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "service = \"janus\"\n").unwrap();

        let cli = Cli::parse_from([
            "dtncli",
            "--config",
            path.to_str().unwrap(),
            "--service",
            "dtnaas",
            "--verify-tls",
        ]);
        let config = resolve_config(&cli).unwrap();

        assert_eq!(config.service, ApiService::Dtnaas);
        assert!(config.verify_tls);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "dtncli",
            "--config",
            dir.path().join("nope.toml").to_str().unwrap(),
        ]);
        assert!(resolve_config(&cli).is_err());
    }
}
