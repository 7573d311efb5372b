//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development: in-process SQLite, a throwaway signing key and the
//! canned content generator.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use brainflow_assist::{AssistConfig, FallbackPolicy};
use brainflow_shared::constants::{
    ACCESS_TOKEN_MINUTES, DEFAULT_HTTP_PORT, REFRESH_TOKEN_DAYS, SIGNING_SEED_SIZE,
};

/// Which [`brainflow_store::DocumentStore`] implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Memory => "memory",
        })
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8000`
    pub http_addr: SocketAddr,

    /// Env: `STORE_BACKEND` (`sqlite` | `memory`)
    /// Default: `sqlite`
    pub store_backend: StoreBackend,

    /// SQLite file. `None` uses the platform data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// Ed25519 seed for session tokens (hex-encoded, 64 chars).
    /// Env: `TOKEN_SIGNING_KEY`
    /// Default: none, a random key per process.
    pub token_signing_key: Option<[u8; SIGNING_SEED_SIZE]>,

    /// Env: `ACCESS_TOKEN_EXPIRE_MINUTES`
    pub access_token_minutes: i64,

    /// Env: `REFRESH_TOKEN_EXPIRE_DAYS`
    pub refresh_token_days: i64,

    /// Allowed browser origins. `*` allows any.
    /// Env: `CORS_ORIGINS` (comma separated)
    pub cors_origins: Vec<String>,

    // -- Content generation --

    /// Env: `OPENAI_API_KEY`
    pub openai_api_key: Option<String>,

    /// Env: `OPENAI_BASE_URL`
    pub openai_base_url: String,

    /// Env: `LLM_MODEL`
    pub llm_model: String,

    /// Env: `TRANSCRIPTION_MODEL`
    pub transcription_model: String,

    /// Env: `ASSIST_TIMEOUT_SECS`
    pub assist_timeout: Duration,

    /// Env: `ASSIST_FALLBACK` (`canned` | `fail`)
    pub assist_fallback: FallbackPolicy,

    // -- Rate limiting --

    /// Sustained requests per second per client.
    /// Env: `RATE_LIMIT_PER_SEC`
    pub rate_limit_per_sec: f64,

    /// Env: `RATE_LIMIT_BURST`
    pub rate_limit_burst: f64,

    /// Largest accepted request body (25 MiB, room for audio uploads).
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let assist = AssistConfig::default();
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            store_backend: StoreBackend::Sqlite,
            database_path: None,
            token_signing_key: None,
            access_token_minutes: ACCESS_TOKEN_MINUTES,
            refresh_token_days: REFRESH_TOKEN_DAYS,
            cors_origins: default_cors_origins(),
            openai_api_key: None,
            openai_base_url: assist.base_url,
            llm_model: assist.chat_model,
            transcription_model: assist.transcription_model,
            assist_timeout: assist.timeout,
            assist_fallback: assist.fallback,
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 30.0,
            max_body_size: 25 * 1024 * 1024,
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    let mut origins = vec!["http://localhost:3000".to_string()];
    origins.extend((5173..=5177).map(|port| format!("http://localhost:{port}")));
    origins.extend(
        [3000, 5173, 5176]
            .iter()
            .map(|port| format!("http://127.0.0.1:{port}")),
    );
    origins
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |present: bool| if present { "set" } else { "unset" };
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("store_backend", &self.store_backend)
            .field("database_path", &self.database_path)
            .field("token_signing_key", &set(self.token_signing_key.is_some()))
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .field("cors_origins", &self.cors_origins)
            .field("openai_api_key", &set(self.openai_api_key.is_some()))
            .field("openai_base_url", &self.openai_base_url)
            .field("llm_model", &self.llm_model)
            .field("transcription_model", &self.transcription_model)
            .field("assist_timeout", &self.assist_timeout)
            .field("assist_fallback", &self.assist_fallback)
            .field("rate_limit_per_sec", &self.rate_limit_per_sec)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            parse_into(&mut config.http_addr, "HTTP_ADDR", &addr);
        }

        if let Some(backend) = var("STORE_BACKEND") {
            parse_into(&mut config.store_backend, "STORE_BACKEND", &backend);
        }

        if let Some(path) = var("DATABASE_PATH").filter(|p| !p.trim().is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(hex_key) = var("TOKEN_SIGNING_KEY").filter(|k| !k.is_empty()) {
            match parse_hex_seed(&hex_key) {
                Ok(seed) => config.token_signing_key = Some(seed),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid TOKEN_SIGNING_KEY, using a random key"
                    );
                }
            }
        }

        if let Some(val) = var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            parse_positive(&mut config.access_token_minutes, "ACCESS_TOKEN_EXPIRE_MINUTES", &val);
        }

        if let Some(val) = var("REFRESH_TOKEN_EXPIRE_DAYS") {
            parse_positive(&mut config.refresh_token_days, "REFRESH_TOKEN_EXPIRE_DAYS", &val);
        }

        if let Some(val) = var("CORS_ORIGINS") {
            let origins: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            if origins.is_empty() {
                tracing::warn!("Empty CORS_ORIGINS, using default");
            } else {
                config.cors_origins = origins;
            }
        }

        // -- Content generation --

        if let Some(key) = var("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            config.openai_api_key = Some(key);
        }

        if let Some(url) = var("OPENAI_BASE_URL").filter(|u| !u.is_empty()) {
            config.openai_base_url = url;
        }

        if let Some(model) = var("LLM_MODEL").filter(|m| !m.is_empty()) {
            config.llm_model = model;
        }

        if let Some(model) = var("TRANSCRIPTION_MODEL").filter(|m| !m.is_empty()) {
            config.transcription_model = model;
        }

        if let Some(val) = var("ASSIST_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.assist_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid ASSIST_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = var("ASSIST_FALLBACK") {
            parse_into(&mut config.assist_fallback, "ASSIST_FALLBACK", &val);
        }

        // -- Rate limiting --

        if let Some(val) = var("RATE_LIMIT_PER_SEC") {
            parse_positive(&mut config.rate_limit_per_sec, "RATE_LIMIT_PER_SEC", &val);
        }

        if let Some(val) = var("RATE_LIMIT_BURST") {
            parse_positive(&mut config.rate_limit_burst, "RATE_LIMIT_BURST", &val);
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }

    pub fn assist_config(&self) -> AssistConfig {
        AssistConfig {
            api_key: self.openai_api_key.clone(),
            base_url: self.openai_base_url.clone(),
            chat_model: self.llm_model.clone(),
            transcription_model: self.transcription_model.clone(),
            timeout: self.assist_timeout,
            fallback: self.assist_fallback,
        }
    }
}

fn parse_into<T>(slot: &mut T, name: &str, raw: &str)
where
    T: FromStr,
{
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(value = %raw, "Invalid {name}, using default"),
    }
}

fn parse_positive<T>(slot: &mut T, name: &str, raw: &str)
where
    T: FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => *slot = value,
        _ => tracing::warn!(value = %raw, "Invalid {name}, using default"),
    }
}

/// Parse a 64-character hex string into a signing seed.
fn parse_hex_seed(raw: &str) -> Result<[u8; SIGNING_SEED_SIZE], String> {
    let raw = raw.trim();
    if raw.len() != SIGNING_SEED_SIZE * 2 {
        return Err(format!(
            "expected {} hex chars, got {}",
            SIGNING_SEED_SIZE * 2,
            raw.len()
        ));
    }
    let bytes = hex::decode(raw).map_err(|e| format!("invalid hex: {e}"))?;
    let mut seed = [0u8; SIGNING_SEED_SIZE];
    seed.copy_from_slice(&bytes);
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8000).into());
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.assist_fallback, FallbackPolicy::Canned);
        assert!(config.token_signing_key.is_none());
        assert!(config
            .cors_origins
            .contains(&"http://localhost:5177".to_string()));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("STORE_BACKEND", "Memory"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("ASSIST_FALLBACK", "fail"),
            ("ASSIST_TIMEOUT_SECS", "5"),
            ("RATE_LIMIT_BURST", "3"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.assist_fallback, FallbackPolicy::Fail);
        assert_eq!(config.assist_timeout, Duration::from_secs(5));
        assert_eq!(config.rate_limit_burst, 3.0);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = load(&[
            ("HTTP_ADDR", "not an address"),
            ("STORE_BACKEND", "postgres"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "-5"),
            ("ASSIST_TIMEOUT_SECS", "0"),
            ("TOKEN_SIGNING_KEY", "abcd"),
        ]);
        let defaults = ServerConfig::default();
        assert_eq!(config.http_addr, defaults.http_addr);
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.access_token_minutes, ACCESS_TOKEN_MINUTES);
        assert_eq!(config.assist_timeout, defaults.assist_timeout);
        assert!(config.token_signing_key.is_none());
    }

    #[test]
    fn test_parse_hex_seed() {
        let seed = parse_hex_seed(&"ab".repeat(32)).unwrap();
        assert_eq!(seed, [0xab; 32]);
        assert!(parse_hex_seed(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-secret"),
            ("TOKEN_SIGNING_KEY", "01".repeat(32).as_str()),
        ]);
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("openai_api_key: \"set\""));
        assert!(printed.contains("token_signing_key: \"set\""));
    }

    #[test]
    fn test_assist_config() {
        let config = load(&[("OPENAI_API_KEY", "k"), ("LLM_MODEL", "local-model")]);
        let assist = config.assist_config();
        assert_eq!(assist.api_key.as_deref(), Some("k"));
        assert_eq!(assist.chat_model, "local-model");
    }
}
