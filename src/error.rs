use std::{io, path::PathBuf, process::ExitStatus};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("failed to write {}: {source}", path.display())]
    ConfigWrite { path: PathBuf, source: io::Error },
    #[error("failed to launch {program}: {source}")]
    CommandLaunch { program: String, source: io::Error },
    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },
    #[error("incorrect range provided: {0}")]
    InvalidRange(#[from] RangeError),
    #[error("concurrency limit must be at least 1")]
    InvalidConcurrency,
    #[error("failed to write status output: {0}")]
    Output(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RangeError {
    #[error("range is required")]
    Empty,
    #[error("expected <start>-<end>")]
    MissingSeparator,
    #[error("`{0}` is not a sub-interface number")]
    InvalidBound(String),
    #[error("start {start} is greater than end {end}")]
    Descending { start: u32, end: u32 },
}
