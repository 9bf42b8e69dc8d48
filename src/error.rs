use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong at a load or export boundary.
///
/// Bad individual cells never end up here: they degrade to empty / "Unknown"
/// values inside the cleaning and aggregation code.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// None of the candidate source locations could be read.
    #[error("source not found (tried: {})", tried.join(", "))]
    SourceNotFound { tried: Vec<String> },

    /// The sheet decoded to zero data rows.
    #[error("no rows found in {source_name}")]
    EmptySheet { source_name: String },

    /// A user-selected local file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container itself (CSV stream, workbook archive) is malformed.
    #[error("could not decode {source_name}: {message}")]
    Decode { source_name: String, message: String },

    #[error("write error for {}: {message}", path.display())]
    Output { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, DashboardError>;
