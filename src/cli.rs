use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Move photos and videos into YYYY/MM/DD folders by the date they were taken.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Folder to take media from: `root`, `id:<folder id>` or a top-level folder name
    #[arg(long)]
    pub source: Option<String>,
    /// Folder to build the date hierarchy in (same forms as --source)
    #[arg(long)]
    pub target: Option<String>,
    /// Config file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory standing in for the drive; overrides `store.root`
    #[arg(long, value_name = "DIR")]
    pub store_root: Option<PathBuf>,
    /// Report what would happen without creating folders or moving files
    #[arg(long)]
    pub dry_run: bool,
    /// More output (repeat for even more)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
    /// Only report errors
    #[arg(short, long)]
    pub quiet: bool,
}
impl Cli {
    /// Log filter used when `RUST_LOG` isn't set.
    pub fn log_directive(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
