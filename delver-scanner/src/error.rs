use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid proxy '{uri}': {reason}")]
    InvalidProxy { uri: String, reason: String },

    #[error("Too many redirects ({hops}) starting from {url}")]
    TooManyRedirects { url: String, hops: usize },
}

pub type Result<T> = std::result::Result<T, ScanError>;
