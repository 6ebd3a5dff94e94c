//! Env file handling for project-level overrides.
//!
//! The project keeps credentials and naming overrides in a `.env` file at its
//! root. Lines are `KEY=VALUE`; blank lines, `#` comments and lines without `=`
//! are ignored. Keys and values are trimmed.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::warn;

use crate::error::Result;

/// Parse env file text into ordered `(key, value)` pairs
pub fn parse_env_file(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Load an env file; a missing file yields no entries
pub fn load_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_env_file(&text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => {
            warn!(path = %path.display(), "Failed to read env file: {}", e);
            Err(e.into())
        }
    }
}
