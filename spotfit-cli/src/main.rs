//! Spotfit CLI - headless host for the localization microscopy plugin

use anyhow::{Context, Result};
use clap::{Arg, Command};
use spotfit_core::{Config, Host};
use spotfit_localization::{metadata, LocalizationPlugin};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};

/// CLI arguments structure
#[derive(Debug, Clone)]
pub struct Args {
    pub config_file: Option<PathBuf>,
    pub select: Vec<String>,
    pub run_argument: Option<String>,
    pub dev_mode: bool,
    pub list_plugins: bool,
    pub validate_config: bool,
    pub exit_after_select: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse() -> Self {
        let matches = Command::new("spotfit")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Headless host for the Gaussian spot-fitting menu plugin")
            .long_about(
                "Loads the localization microscopy plugin the way an imaging host \
                would, invokes its menu entry on request and keeps the analysis \
                window alive until the host shuts down (Ctrl+C or SIGTERM).",
            )
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .help("Path to configuration file (JSON format)")
                    .long_help(
                        "Path to a JSON configuration file with plugin settings, the log \
                        level and the shutdown timeout. Defaults to \
                        <config dir>/spotfit/config.json when that file exists.",
                    )
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("select")
                    .short('s')
                    .long("select")
                    .help("Select a menu entry by name (repeatable)")
                    .action(clap::ArgAction::Append)
                    .value_parser(clap::value_parser!(String)),
            )
            .arg(
                Arg::new("run")
                    .short('r')
                    .long("run")
                    .help("Run the localization plugin directly with an argument")
                    .value_parser(clap::value_parser!(String)),
            )
            .arg(
                Arg::new("dev-mode")
                    .long("dev-mode")
                    .help("Enable debug logging with targets and line numbers")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("list-plugins")
                    .long("list-plugins")
                    .help("List menu entries and exit")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("validate-config")
                    .long("validate-config")
                    .help("Validate the configuration and exit")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("exit-after-select")
                    .long("exit-after-select")
                    .help("Shut down right after the requested selections instead of waiting")
                    .action(clap::ArgAction::SetTrue),
            )
            .after_help(
                "EXAMPLES:\n    \
                spotfit --list-plugins\n    \
                spotfit --select \"Localization Microscopy\"\n    \
                spotfit --config config.json --run movie.tif --exit-after-select\n    \
                spotfit --validate-config --config config.json",
            )
            .get_matches();

        Self {
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            select: matches
                .get_many::<String>("select")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            run_argument: matches.get_one::<String>("run").cloned(),
            dev_mode: matches.get_flag("dev-mode"),
            list_plugins: matches.get_flag("list-plugins"),
            validate_config: matches.get_flag("validate-config"),
            exit_after_select: matches.get_flag("exit-after-select"),
        }
    }

    /// Explicit `--config`, else the default location if it exists
    pub fn config_path(&self) -> Option<PathBuf> {
        resolve_config_path(self.config_file.as_deref(), dirs::config_dir().as_deref())
    }

    /// Load configuration and apply `SPOTFIT_*` environment overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match self.config_path() {
            Some(path) => Config::from_file(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Config::new(),
        };

        config
            .apply_environment_overrides(&Config::environment_overrides())
            .context("Invalid SPOTFIT_* environment override")?;
        config.validate().context("Configuration is invalid")?;

        Ok(config)
    }
}

fn resolve_config_path(explicit: Option<&Path>, config_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    config_dir
        .map(|dir| dir.join("spotfit").join("config.json"))
        .filter(|path| path.exists())
}

fn init_logging(config: &Config, dev_mode: bool) {
    let log_level = if dev_mode {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(dev_mode)
        .with_line_number(dev_mode)
        .with_file(dev_mode);

    if dev_mode {
        subscriber.with_ansi(true).pretty().init();
        info!("Development mode enabled");
    } else {
        subscriber.with_ansi(true).init();
    }
}

async fn build_host(config: Config) -> Result<Host> {
    let mut host = Host::new(config).context("Failed to create host")?;
    host.register_plugin(Arc::new(LocalizationPlugin::headless()))
        .await
        .context("Failed to register the localization plugin")?;
    Ok(host)
}

async fn list_plugins(config: Config) -> Result<()> {
    let mut host = build_host(config).await?;

    let entries = host.menu_entries();
    if entries.is_empty() {
        println!("No plugins enabled.");
    }
    for entry in entries {
        println!("{} > {}", entry.sub_menu, entry.name);
        if let Some(tooltip) = entry.tooltip {
            println!("    {}", tooltip);
        }
        if let Some(info) = host.plugin_registry().get_plugin_info(&entry.name) {
            println!("    v{}  {}", info.version, info.copyright);
        }
    }

    host.shutdown("listing complete").await?;
    Ok(())
}

async fn run_host(args: &Args, config: Config) -> Result<()> {
    let mut host = build_host(config).await?;

    for name in &args.select {
        host.select_menu_item(name)
            .await
            .with_context(|| format!("Selecting menu item '{}' failed", name))?;
    }

    if let Some(argument) = &args.run_argument {
        host.run_command(metadata::MENU_NAME, argument)
            .await
            .context("Running the localization plugin failed")?;
    }

    if args.exit_after_select {
        host.shutdown("selections complete").await?;
    } else {
        println!("Host ready. Press Ctrl+C to stop.");
        host.run_until_shutdown().await?;
    }

    info!("spotfit shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    };

    if args.validate_config {
        println!("Configuration is valid.");
        return Ok(());
    }

    init_logging(&config, args.dev_mode);

    if args.list_plugins {
        return list_plugins(config).await;
    }

    if let Err(e) = run_host(&args, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
