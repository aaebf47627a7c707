//! Application configuration: built-in defaults, then `POLLVIEW_*`
//! environment variables, then command-line flags.
//!
//! A bad environment value falls back to the default and is reported as a
//! warning once logging is up. A bad flag is an error.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use log::LevelFilter;
use pollview_engine::EngineSettings;
use url::Url;

use crate::cli::GlobalArgs;

pub const ENV_API_BASE_URL: &str = "POLLVIEW_API_BASE_URL";
pub const ENV_WS_URL: &str = "POLLVIEW_WS_URL";
pub const ENV_STATE_DIR: &str = "POLLVIEW_STATE_DIR";
pub const ENV_LOG: &str = "POLLVIEW_LOG";
pub const ENV_HANDSHAKE_TIMEOUT_MS: &str = "POLLVIEW_HANDSHAKE_TIMEOUT_MS";

const DEFAULT_STATE_DIR: &str = ".pollview";
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base_url: Url,
    /// `None` derives the broker endpoint from `api_base_url`.
    pub ws_url: Option<Url>,
    pub state_dir: PathBuf,
    pub log_level: LevelFilter,
    pub handshake_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: EngineSettings::default().api.base_url,
            ws_url: None,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            log_level: LevelFilter::Info,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Layers `env` and `flags` over the defaults. Returns the config plus
    /// warnings about ignored environment values.
    pub fn resolve(
        flags: &GlobalArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<(Self, Vec<String>)> {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        let mut ignore = |key: &str, raw: &str, err: String| {
            warnings.push(format!("ignoring {key}={raw}: {err}"));
        };

        if let Some(raw) = env_value(&env, ENV_API_BASE_URL) {
            match parse_url(&raw) {
                Ok(url) => config.api_base_url = url,
                Err(err) => ignore(ENV_API_BASE_URL, &raw, err),
            }
        }
        if let Some(raw) = env_value(&env, ENV_WS_URL) {
            match parse_url(&raw) {
                Ok(url) => config.ws_url = Some(url),
                Err(err) => ignore(ENV_WS_URL, &raw, err),
            }
        }
        if let Some(raw) = env_value(&env, ENV_STATE_DIR) {
            config.state_dir = PathBuf::from(raw);
        }
        if let Some(raw) = env_value(&env, ENV_LOG) {
            match parse_level(&raw) {
                Ok(level) => config.log_level = level,
                Err(err) => ignore(ENV_LOG, &raw, err),
            }
        }
        if let Some(raw) = env_value(&env, ENV_HANDSHAKE_TIMEOUT_MS) {
            match raw.parse::<u64>().ok().filter(|ms| *ms > 0) {
                Some(millis) => config.handshake_timeout = Duration::from_millis(millis),
                None => ignore(
                    ENV_HANDSHAKE_TIMEOUT_MS,
                    &raw,
                    "expected a positive number of milliseconds".to_string(),
                ),
            }
        }

        if let Some(raw) = &flags.api_base_url {
            config.api_base_url = parse_url(raw)
                .map_err(|err| anyhow!(err))
                .context("invalid --api-base-url")?;
        }
        if let Some(raw) = &flags.ws_url {
            config.ws_url = Some(
                parse_url(raw)
                    .map_err(|err| anyhow!(err))
                    .context("invalid --ws-url")?,
            );
        }
        if let Some(dir) = &flags.state_dir {
            config.state_dir = dir.clone();
        }
        if let Some(raw) = &flags.log_level {
            config.log_level = parse_level(raw)
                .map_err(|err| anyhow!(err))
                .context("invalid --log-level")?;
        }

        Ok((config, warnings))
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::for_api_base(self.api_base_url.clone());
        if let Some(ws_url) = &self.ws_url {
            settings.channel.ws_url = ws_url.clone();
        }
        settings.channel.handshake_timeout = self.handshake_timeout;
        settings
    }
}

fn env_value(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|err| err.to_string())?;
    if url.cannot_be_a_base() {
        return Err(format!("'{raw}' cannot be used as a base URL"));
    }
    Ok(url)
}

fn parse_level(raw: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(raw).map_err(|_| {
        format!("unknown log level '{raw}' (expected off, error, warn, info, debug or trace)")
    })
}
