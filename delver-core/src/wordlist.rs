use std::fs;
use std::path::Path;
use tracing::info;

/// Load a wordlist from file, skipping blank lines and `#` comments.
pub fn load_wordlist(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Wordlist not found at {}: {}", path.display(), e))?;

    let words = parse_wordlist(&content);
    if words.is_empty() {
        return Err(format!(
            "Wordlist {} is empty or contains only comments",
            path.display()
        ));
    }

    info!("Loaded {} words from {}", words.len(), path.display());
    Ok(words)
}

pub fn parse_wordlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .map(String::from)
        .collect()
}
