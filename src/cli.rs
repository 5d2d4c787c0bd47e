use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ArgAction;
use reqtrace::{
    Config, RestClient,
    domain::{DEFAULT_CONFIG_FILE, PASSWORD_ENV},
    pipeline,
};
use tracing::instrument;

/// Fetch the requirement hierarchy and its test cases and render the HTML
/// traceability report.
#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the configuration file [default: ./reqtrace.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = load_config(self.config.as_deref())?;
        let mut client = RestClient::from_config(&config)?;

        let report = pipeline::run(&mut client, &config, !self.quiet)
            .with_context(|| format!("no report for '{}'", config.sf_keyword))?;

        println!("{report}");
        if !report.is_clean() {
            tracing::warn!("the report is incomplete, see the log above");
        }
        Ok(())
    }

    /// Installs the log subscriber on stderr. Stdout is reserved for the summary.
    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let filter = tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(log_level(verbosity).into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// The most detailed level logged for a count of `-v` flags.
const fn log_level(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Loads the configuration from `path`, or from the default file if it
/// exists, or falls back to the defaults. The password may be overridden
/// from the environment.
#[instrument]
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let mut config = match path {
        Some(path) => Config::load(path).map_err(anyhow::Error::msg)?,
        None if default_path.is_file() => {
            Config::load(default_path).map_err(anyhow::Error::msg)?
        }
        None => {
            tracing::info!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            Config::default()
        }
    };
    config.override_password(std::env::var(PASSWORD_ENV).ok());
    Ok(config)
}
