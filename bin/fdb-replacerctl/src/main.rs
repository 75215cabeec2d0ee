//! ---
//! fdbr_section: "05-networking-external-interfaces"
//! fdbr_subsection: "binary"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Control CLI for operators running replacement passes."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use fdb_replacer_common::config::{LoadedReplacerConfig, ReplacerConfig};
use fdb_replacer_logging as logging;

mod decide;
mod snapshot;
mod validate;
mod watch;

/// Locations inspected when `--config` is not given and `FDB_REPLACER_CONFIG` is unset.
const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["fdb-replacer.toml", "/etc/fdb-replacer/config.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Automatic failure replacement control utility",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run one replacement pass against a status snapshot")]
    Decide(decide::DecideCommand),
    #[command(about = "Load and validate a configuration file")]
    Validate(validate::ValidateCommand),
    #[command(about = "Re-run replacement passes on an interval until interrupted")]
    Watch(watch::WatchCommand),
}

/// Load configuration from an explicit path or the default candidates.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<LoadedReplacerConfig> {
    match explicit {
        Some(path) => Ok(LoadedReplacerConfig {
            config: ReplacerConfig::from_path(path)?,
            source: path.to_path_buf(),
        }),
        None => {
            let candidates: Vec<PathBuf> =
                DEFAULT_CONFIG_CANDIDATES.iter().map(PathBuf::from).collect();
            ReplacerConfig::load_with_source(&candidates)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("fdb-replacerctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = cli.command else {
        anyhow::bail!("no command given; see --help");
    };
    match command {
        Commands::Decide(cmd) => {
            logging::init();
            cmd.execute()?
        }
        Commands::Validate(cmd) => {
            logging::init();
            cmd.execute()?
        }
        // Installs its own subscriber from the loaded logging configuration.
        Commands::Watch(cmd) => cmd.execute()?,
    }
    Ok(())
}
