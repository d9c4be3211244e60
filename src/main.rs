mod child;
mod config;
mod cycle;
mod debounce;
mod error;
mod signals;
mod supervisor;
mod target;
mod watcher;

use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use child::CommandSpec;
use config::RerunConfig;
use error::SetupError;
use supervisor::{Mode, Supervisor};
use target::WatchTarget;

const DEFAULT_TARGET: &str = ".";
const DEFAULT_CONFIG: &str = "rerun.toml";

/// Watch a path and re-run a command whenever it changes. At most one
/// instance of the command runs at a time; bursts of changes collapse into
/// a single run.
#[derive(Parser, Debug)]
#[command(name = "rerun", version, about)]
pub struct Cli {
    /// Path (or name on $PATH) to monitor for changes
    #[arg(short, long, default_value = DEFAULT_TARGET)]
    target: String,

    /// Keep the command running and restart it when the target changes,
    /// rather than invoking it once per change
    #[arg(short, long)]
    restart: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra logging (ignored events, cycle outcomes)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Command to run, with its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.restart {
            Mode::Restart
        } else {
            Mode::Invoke
        }
    }

    /// The raw target to resolve. In restart mode an unspecified target means
    /// "the command itself".
    fn raw_target(&self) -> Result<&str, SetupError> {
        if self.restart && self.target == DEFAULT_TARGET {
            return self
                .command
                .first()
                .map(String::as_str)
                .ok_or(SetupError::EmptyCommand {
                    reason: "restart mode needs a command",
                });
        }
        Ok(&self.target)
    }

    fn command_spec(&self, config: &RerunConfig) -> Result<CommandSpec, SetupError> {
        let words = if self.command.is_empty() && !self.restart {
            config.invoke.default_command.clone()
        } else {
            self.command.clone()
        };
        let reason = if self.restart {
            "restart mode needs a command"
        } else {
            "invoke.default_command is empty"
        };
        CommandSpec::from_words(words).ok_or(SetupError::EmptyCommand { reason })
    }

    fn log_filter(&self, config: &RerunConfig) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
        let directive = if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            config.log.filter.as_str()
        };
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config comes first since it carries the log filter; errors are
    // reported once the subscriber is up.
    let config = match &cli.config {
        Some(path) => RerunConfig::load(path, true),
        None => RerunConfig::load(std::path::Path::new(DEFAULT_CONFIG), false),
    };
    let filter = match &config {
        Ok(config) => cli.log_filter(config),
        Err(_) => cli.log_filter(&RerunConfig::default()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
    tracing::debug!(?cli, "parsed CLI arguments");

    let result = match config {
        Ok(config) => run(&cli, config).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

/// Resolve everything that can fail at setup, then hand off to the
/// supervisor until it returns.
async fn run(cli: &Cli, config: RerunConfig) -> Result<(), SetupError> {
    let mode = cli.mode();
    let spec = cli.command_spec(&config)?;
    let target = WatchTarget::resolve(cli.raw_target()?)?;
    tracing::info!(
        path = %target.path().display(),
        file = target.is_file(),
        ?mode,
        command = %spec,
        "monitoring"
    );

    let (_watch, events) = watcher::watch(target.watch_root())?;
    let shutdown = CancellationToken::new();
    signals::shutdown_on_signal(shutdown.clone());

    Supervisor::new(mode, spec, target).run(events, shutdown).await;
    Ok(())
}
