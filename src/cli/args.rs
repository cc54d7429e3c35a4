//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use crate::http::Method;
use clap_complete::Shell;
use std::path::PathBuf;

/// swcache - offline cache controller
///
/// Pre-warms a versioned static cache, serves requests network-first with
/// cache and app-shell fallbacks, and purges stale cache generations.
#[derive(Parser, Debug)]
#[command(name = "swcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SWCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the configured version: pre-cache the static assets
    Install(InstallArgs),

    /// Activate the installed version: purge stale buckets, claim clients
    Activate,

    /// Fetch a URL through the controller
    Fetch(FetchArgs),

    /// Post a control message to the controller
    Message(MessageArgs),

    /// Inspect cache buckets
    Buckets(BucketsArgs),

    /// Show how the controller would treat a URL
    Check(CheckArgs),

    /// Show controller state and cache health
    Status,

    /// Unregister the worker and delete every bucket
    Reset(ResetArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Stop after install; do not activate
    #[arg(long)]
    pub no_activate: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a path resolved against worker.origin
    pub target: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
    pub method: Method,

    /// Accept header (use text/html to simulate a navigation)
    #[arg(long)]
    pub accept: Option<String>,

    /// Additional request headers (Name: value)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Simulate a device with no connectivity
    #[arg(long)]
    pub offline: bool,

    /// What to print
    #[arg(short, long, default_value = "summary")]
    pub format: FetchFormat,
}

/// Output of the fetch command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchFormat {
    /// Status line, source and headers
    Summary,
    /// Response body only
    Body,
    /// JSON description of the outcome
    Json,
}

/// Arguments for the message command
#[derive(Parser, Debug)]
pub struct MessageArgs {
    #[command(subcommand)]
    pub action: MessageAction,
}

/// Control messages
#[derive(Subcommand, Debug)]
pub enum MessageAction {
    /// Delete every bucket and take over immediately
    ForceUpdate {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Ask the controller for its cache version
    GetVersion,

    /// Post an arbitrary JSON message
    Raw {
        /// JSON value, e.g. '"GET_VERSION"' or '{"type":"FORCE_UPDATE"}'
        data: String,
    },
}

/// Arguments for the buckets command
#[derive(Parser, Debug)]
pub struct BucketsArgs {
    #[command(subcommand)]
    pub action: BucketsAction,
}

/// Bucket subcommands
#[derive(Subcommand, Debug)]
pub enum BucketsAction {
    /// List all buckets
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List the entries of one bucket
    Show {
        /// Bucket name
        bucket: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Absolute URL, or a path resolved against worker.origin
    pub target: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
    pub method: Method,
}

/// Arguments for the reset command
#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., worker.version)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::parse(s).ok_or_else(|| format!("unsupported method '{s}'"))
}

/// Parse a header in `Name: value` format
fn parse_header(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find(':')
        .ok_or_else(|| format!("invalid header format: no ':' found in '{s}'"))?;
    let name = s[..pos].trim();
    if name.is_empty() {
        return Err(format!("invalid header format: empty name in '{s}'"));
    }
    Ok((name.to_string(), s[pos + 1..].trim().to_string()))
}
