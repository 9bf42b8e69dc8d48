use crate::state::DEFAULT_TOP_N;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_SOURCES: [&str; 5] = [
    "assets/data/members.xlsx",
    "assets/data/members.xls",
    "assets/data/members.csv",
    "members.xlsx",
    "members.csv",
];

/// Membership dashboard: load a member sheet, filter it, and render the
/// aggregate views.
#[derive(Debug, Clone, Parser)]
#[command(name = "member_dashboard", version)]
pub struct Config {
    /// Candidate source files, probed in order (first readable one wins).
    #[arg(long = "source", env = "DASHBOARD_SOURCES", value_delimiter = ',')]
    pub sources: Vec<PathBuf>,

    /// Load this file directly instead of probing the candidates.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Rows shown in the unit table.
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Entries shown in the profession and qualification rankings.
    /// Defaults to the table's top-N.
    #[arg(long)]
    pub ranking_top_n: Option<usize>,

    /// Directory for exported reports.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Locale name used for number formatting.
    #[arg(long, default_value = "en")]
    pub locale: String,

    /// Load, render and export once, then exit without the menu.
    #[arg(long)]
    pub batch: bool,

    /// Log level (error, warn, info, debug, trace). Overrides RUST_LOG.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Config {
    /// The candidate list, falling back to the built-in locations.
    pub fn candidates(&self) -> Vec<PathBuf> {
        if self.sources.is_empty() {
            DEFAULT_SOURCES.iter().map(PathBuf::from).collect()
        } else {
            self.sources.clone()
        }
    }

    pub fn ranking_top_n(&self) -> usize {
        self.ranking_top_n.unwrap_or(self.top_n)
    }
}
