//! Command-line interface handling for the pathwarden daemon.
//!
//! Flags given here override the matching settings of the configuration file.

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the mount root of remote hosts
    pub mount_root: Option<PathBuf>,
    /// Run a single sweep and exit instead of starting the monitor
    pub once: bool,
    /// Restrict a `--once` run to one tenant
    pub tenant: Option<u64>,
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    fn command() -> Command {
        Command::new("pathwarden")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Keeps game server log paths resolved and repaired")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("pathwarden.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("mount-root")
                    .short('m')
                    .long("mount-root")
                    .value_name("DIR")
                    .help("Directory under which every server host is mounted"),
            )
            .arg(
                Arg::new("once")
                    .long("once")
                    .help("Run one repair sweep and exit")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("tenant")
                    .short('t')
                    .long("tenant")
                    .value_name("ID")
                    .help("Only repair this tenant's servers (with --once)")
                    .requires("once")
                    .value_parser(value_parser!(u64)),
            )
    }

    fn from_matches(matches: clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("pathwarden.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            mount_root: matches.get_one::<String>("mount-root").map(PathBuf::from),
            once: matches.get_flag("once"),
            tenant: matches.get_one::<u64>("tenant").copied(),
        }
    }
}
