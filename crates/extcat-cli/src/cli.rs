use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers (`Name: value`)
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Build every enabled catalog
    #[clap(name = "sync", visible_alias = "S")]
    Sync,

    /// Build the SQLite catalog
    Sqlite,

    /// Build the DuckDB catalog
    Duckdb,

    /// Show the remaining GitHub API quota
    #[clap(name = "rate-limit")]
    RateLimit,

    /// Print the effective configuration
    Config,

    /// Generate a default configuration file
    #[clap(name = "defconfig")]
    DefConfig,
}
