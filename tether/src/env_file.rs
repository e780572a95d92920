//! `.env` file loading.
//!
//! Parsed values are returned as a map and never written into the process environment.
//!
//! ```rust
//! use tether::parse_env_file;
//!
//! let vars = parse_env_file("# local\nexport ANTHROPIC_API_KEY='sk-ant-test'\nTETHER_MAX_TURNS=4\n");
//! assert_eq!(vars.get("ANTHROPIC_API_KEY").map(String::as_str), Some("sk-ant-test"));
//! assert_eq!(vars.get("TETHER_MAX_TURNS").map(String::as_str), Some("4"));
//! ```

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;

use crate::ClientError;

pub type EnvMap = BTreeMap<String, String>;

/// Accepts `KEY=VALUE`, an optional `export ` prefix, `#` comments, and quoted values.
/// Lines without `=` or with an empty key are skipped. Later keys win.
pub fn parse_env_file(contents: &str) -> EnvMap {
    let mut vars = EnvMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        vars.insert(key.to_string(), unquote(value.trim()));
    }

    vars
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }

    // Unquoted values may carry a trailing comment.
    match value.find(" #") {
        Some(index) => value[..index].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Reads and parses `path`; a missing file yields an empty map.
pub fn load_env_file(path: &Path) -> Result<EnvMap, ClientError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::debug!(path = %path.display(), "loaded env file");
            Ok(parse_env_file(&contents))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(EnvMap::new()),
        Err(err) => Err(ClientError::config(format!(
            "failed to read env file '{}': {err}",
            path.display()
        ))),
    }
}

/// Snapshot of the process environment. Entries whose name or value is not
/// valid UTF-8 are skipped; none of the settings this client reads can use them.
pub fn process_env() -> EnvMap {
    collect_env(std::env::vars_os())
}

fn collect_env<I>(vars: I) -> EnvMap
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                tracing::debug!(%key, "skipping environment variable with a non-UTF-8 value");
                None
            }
            (Err(_), _) => None,
        })
        .collect()
}
