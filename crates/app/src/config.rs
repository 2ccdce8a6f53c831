use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use spiral_core::spiral::config::{
    DEFAULT_AUTO_EXPAND_DEPTH, DEFAULT_MAX_CONTENT_LEN, DEFAULT_MAX_LEVEL,
};
use spiral_core::spiral::SpiralConfig;
use spiral_infra::BackendKind;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub backend: BackendKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub rest_url: Option<String>,
    pub rest_api_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub request_timeout: Duration,
    pub spiral: SpiralConfig,
    pub cors_allow_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidSocket(String),
    #[error("invalid integer for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let http_addr_raw = env.string("SPIRAL_HTTP_ADDR", "127.0.0.1:8080");
        let http_addr = http_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidSocket(http_addr_raw.clone()))?;

        let backend_raw = env.string("SPIRAL_BACKEND", "memory");
        let backend = backend_raw
            .parse::<BackendKind>()
            .map_err(|err| ConfigError::InvalidValue("SPIRAL_BACKEND", err.0))?;

        let database_url = env.optional("SPIRAL_DATABASE_URL");
        let rest_url = env.optional("SPIRAL_REST_URL");
        let rest_api_key = env.optional("SPIRAL_REST_API_KEY");
        match backend {
            BackendKind::Postgres if database_url.is_none() => {
                return Err(ConfigError::InvalidValue(
                    "SPIRAL_DATABASE_URL",
                    "required by the postgres backend".to_string(),
                ));
            }
            BackendKind::Rest if rest_url.is_none() || rest_api_key.is_none() => {
                return Err(ConfigError::InvalidValue(
                    "SPIRAL_REST_URL",
                    "the rest backend needs SPIRAL_REST_URL and SPIRAL_REST_API_KEY".to_string(),
                ));
            }
            _ => {}
        }

        let max_content_len = env.number("SPIRAL_MAX_CONTENT_LEN", DEFAULT_MAX_CONTENT_LEN)?;
        if max_content_len == 0 {
            return Err(ConfigError::InvalidValue(
                "SPIRAL_MAX_CONTENT_LEN",
                "must be positive".to_string(),
            ));
        }
        let spiral = SpiralConfig {
            max_level: env.number("SPIRAL_MAX_LEVEL", DEFAULT_MAX_LEVEL)?,
            auto_expand_depth: env.number("SPIRAL_AUTO_EXPAND_DEPTH", DEFAULT_AUTO_EXPAND_DEPTH)?,
            max_content_len,
        };

        Ok(Self {
            http_addr,
            backend,
            database_url,
            db_max_connections: env.number("SPIRAL_DB_MAX_CONNECTIONS", 5)?,
            rest_url,
            rest_api_key,
            jwt_secret: env.optional("SPIRAL_JWT_SECRET"),
            request_timeout: Duration::from_secs(env.number("SPIRAL_REQUEST_TIMEOUT_SECS", 15)?),
            spiral,
            cors_allow_origins: env
                .string("SPIRAL_CORS_ALLOW_ORIGINS", "")
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &'static str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn optional(&self, key: &'static str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn number<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber(key, raw)),
        }
    }
}

/// Reads `.env` from the working directory, if any. Variables already set in
/// the environment win.
pub fn load_dotenv() -> Result<(), std::io::Error> {
    let path = Path::new(".env");
    if !path.is_file() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(path)?;
    for (key, value) in parse_dotenv(&contents) {
        if std::env::var_os(&key).is_none() {
            // Safety: runs in main before the runtime spawns any task.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
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
        if key.is_empty() || key.contains(char::is_whitespace) {
            continue;
        }
        pairs.push((key.to_string(), dotenv_value(value.trim())));
    }
    pairs
}

fn dotenv_value(raw: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return if quote == '"' {
                inner
                    .replace("\\n", "\n")
                    .replace("\\t", "\t")
                    .replace("\\\"", "\"")
            } else {
                inner.to_string()
            };
        }
    }
    // Unquoted values may carry a trailing ` # comment`.
    match raw.find(" #") {
        Some(at) => raw[..at].trim_end().to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use spiral_infra::BackendKind;

    use super::{parse_dotenv, AppConfig, ConfigError};

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_serve_the_memory_backend() {
        let config = config(&[]).unwrap();
        assert_eq!(config.http_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.spiral.max_level, 5);
        assert_eq!(config.spiral.auto_expand_depth, 3);
        assert_eq!(config.spiral.max_content_len, 2000);
        assert!(config.jwt_secret.is_none());
        assert!(config.cors_allow_origins.is_empty());
    }

    #[test]
    fn spiral_knobs_and_origins_are_read() {
        let config = config(&[
            ("SPIRAL_MAX_LEVEL", "2"),
            ("SPIRAL_AUTO_EXPAND_DEPTH", "1"),
            ("SPIRAL_CORS_ALLOW_ORIGINS", "https://cafe.example, ,https://beta.cafe.example"),
            ("SPIRAL_JWT_SECRET", "  "),
        ])
        .unwrap();
        assert_eq!(config.spiral.max_level, 2);
        assert_eq!(config.spiral.auto_expand_depth, 1);
        assert_eq!(
            config.cors_allow_origins,
            vec!["https://cafe.example", "https://beta.cafe.example"]
        );
        assert!(config.jwt_secret.is_none());
    }

    #[test]
    fn remote_backends_need_their_settings() {
        assert!(matches!(
            config(&[("SPIRAL_BACKEND", "postgres")]),
            Err(ConfigError::InvalidValue("SPIRAL_DATABASE_URL", _))
        ));
        assert!(config(&[("SPIRAL_BACKEND", "rest"), ("SPIRAL_REST_URL", "https://x")]).is_err());
        let rest = config(&[
            ("SPIRAL_BACKEND", "rest"),
            ("SPIRAL_REST_URL", "https://cafe.example/rest/v1"),
            ("SPIRAL_REST_API_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(rest.backend, BackendKind::Rest);
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = config(&[("SPIRAL_MAX_LEVEL", "deep")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber("SPIRAL_MAX_LEVEL", _)));
        assert!(config(&[("SPIRAL_MAX_CONTENT_LEN", "0")]).is_err());
        assert!(config(&[("SPIRAL_BACKEND", "sqlite")]).is_err());
    }

    #[test]
    fn dotenv_handles_quotes_exports_and_comments() {
        let pairs = parse_dotenv(
            "# local settings\n\
             export SPIRAL_BACKEND=memory # dev only\n\
             SPIRAL_JWT_SECRET=\"two\\nlines\"\n\
             SPIRAL_REST_API_KEY='a # b'\n\
             not a pair\n\
             =orphan\n",
        );
        assert_eq!(
            pairs,
            vec![
                ("SPIRAL_BACKEND".to_string(), "memory".to_string()),
                ("SPIRAL_JWT_SECRET".to_string(), "two\nlines".to_string()),
                ("SPIRAL_REST_API_KEY".to_string(), "a # b".to_string()),
            ]
        );
    }
}
