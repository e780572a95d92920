//! Client configuration: defaults, then `.env` values, then the process environment, then flags.
//!
//! ```rust
//! use tether::{CliArgs, ClientConfig, EnvMap};
//!
//! let cli = CliArgs {
//!     server_script: "weather.py".into(),
//!     model: None,
//!     max_tokens: None,
//!     max_turns: Some(4),
//!     tool_timeout: None,
//!     env_file: ".env".into(),
//!     log_level: None,
//! };
//! let mut process = EnvMap::new();
//! process.insert("ANTHROPIC_API_KEY".to_string(), "sk-ant-test".to_string());
//!
//! let config = ClientConfig::resolve(&cli, &EnvMap::new(), &process).expect("config should resolve");
//! assert_eq!(config.model, "claude-sonnet-4-20250514");
//! assert_eq!(config.max_turns, 4);
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tchat::{ChatOptions, ChatPolicy, DEFAULT_MAX_TOKENS, DEFAULT_MAX_TURNS};
use tprovider::{ANTHROPIC_BASE_URL, DEFAULT_ANTHROPIC_MODEL, SecretString};
use tsession::{Interpreters, SessionConfig};

use crate::{CliArgs, ClientError, EnvMap};

pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_MODEL: &str = "TETHER_MODEL";
pub const ENV_MAX_TOKENS: &str = "TETHER_MAX_TOKENS";
pub const ENV_MAX_TURNS: &str = "TETHER_MAX_TURNS";
pub const ENV_HANDSHAKE_TIMEOUT: &str = "TETHER_HANDSHAKE_TIMEOUT_SECS";
pub const ENV_TOOL_TIMEOUT: &str = "TETHER_TOOL_TIMEOUT_SECS";
pub const ENV_PYTHON: &str = "TETHER_PYTHON";
pub const ENV_NODE: &str = "TETHER_NODE";

const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

#[derive(Debug)]
pub struct ClientConfig {
    pub server_script: PathBuf,
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Zero means unbounded.
    pub max_turns: u32,
    pub handshake_timeout: Duration,
    pub tool_timeout: Duration,
    pub interpreters: Interpreters,
}

/// Process environment first, `.env` values second.
struct Layers<'a> {
    file: &'a EnvMap,
    process: &'a EnvMap,
}

impl Layers<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.process
            .get(key)
            .or_else(|| self.file.get(key))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ClientError> {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| ClientError::config(format!("{key} has an invalid value '{raw}'")))
            })
            .transpose()
    }
}

impl ClientConfig {
    pub fn resolve(cli: &CliArgs, file: &EnvMap, process: &EnvMap) -> Result<Self, ClientError> {
        let layers = Layers { file, process };

        let api_key = layers.get(ENV_API_KEY).ok_or_else(|| {
            ClientError::config(format!(
                "{ENV_API_KEY} is not set; export it or add it to {}",
                cli.env_file.display()
            ))
        })?;

        let model = cli
            .model
            .clone()
            .or_else(|| layers.get(ENV_MODEL).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());

        let max_tokens = match cli.max_tokens {
            Some(value) => value,
            None => layers
                .parsed::<u32>(ENV_MAX_TOKENS)?
                .unwrap_or(DEFAULT_MAX_TOKENS),
        };
        if max_tokens == 0 {
            return Err(ClientError::config("max tokens must be greater than zero"));
        }

        let max_turns = match cli.max_turns {
            Some(value) => value,
            None => layers
                .parsed::<u32>(ENV_MAX_TURNS)?
                .unwrap_or(DEFAULT_MAX_TURNS),
        };

        let handshake_secs = layers
            .parsed::<u64>(ENV_HANDSHAKE_TIMEOUT)?
            .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS);
        let tool_secs = match cli.tool_timeout {
            Some(value) => value,
            None => layers
                .parsed::<u64>(ENV_TOOL_TIMEOUT)?
                .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
        };
        if handshake_secs == 0 || tool_secs == 0 {
            return Err(ClientError::config("timeouts must be at least one second"));
        }

        let mut interpreters = Interpreters::default();
        if let Some(python) = layers.get(ENV_PYTHON) {
            interpreters = interpreters.with_python(python);
        }
        if let Some(node) = layers.get(ENV_NODE) {
            interpreters = interpreters.with_node(node);
        }

        Ok(Self {
            server_script: cli.server_script.clone(),
            api_key: SecretString::new(api_key),
            base_url: api_base_url(layers.get(ENV_BASE_URL).unwrap_or(ANTHROPIC_BASE_URL)),
            model,
            max_tokens,
            max_turns,
            handshake_timeout: Duration::from_secs(handshake_secs),
            tool_timeout: Duration::from_secs(tool_secs),
            interpreters,
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_client_info("tether", env!("CARGO_PKG_VERSION"))
            .with_interpreters(self.interpreters.clone())
            .with_handshake_timeout(self.handshake_timeout)
            .with_call_timeout(self.tool_timeout)
    }

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions::new(self.model.clone()).with_max_tokens(self.max_tokens)
    }

    pub fn chat_policy(&self) -> ChatPolicy {
        ChatPolicy::default().with_max_turns(self.max_turns)
    }
}

/// `ANTHROPIC_BASE_URL` names the API host as the official SDKs read it;
/// the transport wants the versioned root that `messages` hangs off.
fn api_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> CliArgs {
        CliArgs {
            server_script: PathBuf::from("servers/weather.py"),
            model: None,
            max_tokens: None,
            max_turns: None,
            tool_timeout: None,
            env_file: PathBuf::from(".env"),
            log_level: None,
        }
    }

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = ClientConfig::resolve(&cli(), &env(&[(ENV_API_KEY, "sk-file")]), &EnvMap::new())
            .expect("config should resolve");

        assert_eq!(config.api_key.expose(), "sk-file");
        assert_eq!(config.model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.max_turns, DEFAULT_MAX_TURNS);
        assert_eq!(config.handshake_timeout, Duration::from_secs(30));
        assert_eq!(config.tool_timeout, Duration::from_secs(120));
        assert_eq!(config.interpreters, Interpreters::default());
        assert_eq!(config.base_url, ANTHROPIC_BASE_URL);
    }

    #[test]
    fn process_environment_beats_env_file_and_flags_beat_both() {
        let file = env(&[
            (ENV_API_KEY, "sk-file"),
            (ENV_MODEL, "model-from-file"),
            (ENV_MAX_TURNS, "3"),
            (ENV_PYTHON, "python3"),
        ]);
        let process = env(&[
            (ENV_API_KEY, "sk-process"),
            (ENV_MODEL, "model-from-env"),
            (ENV_MAX_TURNS, "5"),
            (ENV_BASE_URL, "http://127.0.0.1:9999/v1/"),
        ]);
        let mut args = cli();
        args.max_turns = Some(0);

        let config = ClientConfig::resolve(&args, &file, &process).expect("config should resolve");

        assert_eq!(config.api_key.expose(), "sk-process");
        assert_eq!(config.model, "model-from-env");
        assert_eq!(config.max_turns, 0);
        assert_eq!(config.chat_policy().max_turns, None);
        assert_eq!(config.interpreters.python, "python3");
        assert_eq!(config.base_url, "http://127.0.0.1:9999/v1");
    }

    #[test]
    fn sdk_style_base_urls_gain_the_api_version() {
        for (raw, expected) in [
            ("https://api.anthropic.com", "https://api.anthropic.com/v1"),
            ("https://gateway.internal/anthropic/", "https://gateway.internal/anthropic/v1"),
            ("http://127.0.0.1:9999/v1/", "http://127.0.0.1:9999/v1"),
        ] {
            let process = env(&[(ENV_API_KEY, "sk"), (ENV_BASE_URL, raw)]);
            let config = ClientConfig::resolve(&cli(), &EnvMap::new(), &process).expect("config");
            assert_eq!(config.base_url, expected, "{raw}");
        }
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let error = ClientConfig::resolve(&cli(), &env(&[(ENV_API_KEY, "  ")]), &EnvMap::new())
            .expect_err("blank key should fail");
        assert_eq!(error.kind, crate::ClientErrorKind::Config);
        assert!(error.message.contains(ENV_API_KEY));
    }

    #[test]
    fn malformed_numbers_name_their_variable() {
        let process = env(&[(ENV_API_KEY, "sk"), (ENV_TOOL_TIMEOUT, "soon")]);
        let error = ClientConfig::resolve(&cli(), &EnvMap::new(), &process)
            .expect_err("non-numeric timeout should fail");
        assert!(error.message.contains(ENV_TOOL_TIMEOUT));

        let process = env(&[(ENV_API_KEY, "sk"), (ENV_MAX_TOKENS, "0")]);
        assert!(ClientConfig::resolve(&cli(), &EnvMap::new(), &process).is_err());
    }

    #[test]
    fn session_config_carries_timeouts_and_interpreters() {
        let process = env(&[(ENV_API_KEY, "sk"), (ENV_NODE, "/opt/node/bin/node")]);
        let mut args = cli();
        args.tool_timeout = Some(45);

        let config = ClientConfig::resolve(&args, &EnvMap::new(), &process).expect("config");
        let session = config.session_config();
        assert_eq!(session.call_timeout, Duration::from_secs(45));
        assert_eq!(session.interpreters.node, "/opt/node/bin/node");
        assert_eq!(session.client_name, "tether");
    }
}
