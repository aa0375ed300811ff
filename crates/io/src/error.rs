use std::path::PathBuf;

use stepgrid_engine::StepError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{} has no header row", path.display())]
    NoHeader { path: PathBuf },

    /// Data that doesn't form a valid dataframe (duplicate headers, ...)
    #[error("{0}")]
    Data(#[from] StepError),

    #[error("invalid analysis file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("analysis format version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
