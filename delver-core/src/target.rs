// Target normalization and output folder naming

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Normalized scan origin: http(s) scheme, non-empty host, no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    origin: String,
}

impl ScanTarget {
    /// Parse user input, assuming `https://` when no scheme is given.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("Target URL is required".to_string());
        }

        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| format!("Target URL '{}' appears invalid: {}", raw, e))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!(
                "Only http and https schemes are supported (got '{}')",
                url.scheme()
            ));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(format!("Target URL '{}' has no host", raw));
        }

        Ok(Self {
            origin: with_scheme.trim_end_matches('/').to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.origin
    }

    /// The host (and port, when explicit) of the target.
    pub fn authority(&self) -> String {
        match Url::parse(&self.origin) {
            Ok(url) => {
                let host = url.host_str().unwrap_or_default();
                match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                }
            }
            Err(_) => self.origin.clone(),
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin)
    }
}

/// Folder name for a target: `.` and `:` become `_`, other punctuation `-`.
pub fn sanitize_folder_name(target: &ScanTarget) -> String {
    let sanitized: String = target
        .authority()
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => c,
            '.' | ':' => '_',
            _ => '-',
        })
        .collect();

    let trimmed = sanitized.trim_matches(|c| c == '-' || c == '_');
    if trimmed.is_empty() {
        "target".to_string()
    } else {
        trimmed.to_string()
    }
}
