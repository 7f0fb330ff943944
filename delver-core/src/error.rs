use delver_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a scan before the first probe.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Wordlist is empty")]
    EmptyWordlist,

    #[error("Output directory {} is not usable: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Scanner(#[from] ScanError),
}
