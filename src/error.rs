use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BucketError {
    #[error("No slab available for given size: {size} bytes")]
    TooLarge { size: u64, largest: u64 },
    #[error("Invalid bucket table: {0}")]
    InvalidTable(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Malformed catalog line {line_no}: {line:?}")]
    Malformed { line_no: usize, line: String },
}

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Failed to execute {} (install pahole or pass --pahole)", .bin.display())]
    Launch {
        bin: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pahole exited with {status} for {object}: {stderr}")]
    Failed {
        object: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("Failed to read layout of {object}")]
    Read {
        object: String,
        #[source]
        source: std::io::Error,
    },
}

impl InspectError {
    /// Launch failures mean every object will fail the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InspectError::Launch { .. })
    }
}
