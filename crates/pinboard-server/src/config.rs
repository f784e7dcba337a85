use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that must not be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Server settings, read from `PINBOARD_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub storage_dir: PathBuf,
    pub public_url: String,
    pub url_ttl: Duration,
    pub aggregate_timeout: Duration,
    /// `None` keeps permission cache entries until invalidated.
    pub permission_ttl: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("PINBOARD_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() {
            bail!("PINBOARD_JWT_SECRET must be set");
        }
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PINBOARD_JWT_SECRET is a placeholder value; set a real secret");
        }

        let permission_ttl_secs: u64 = parse_or(&get, "PINBOARD_PERMISSION_TTL_SECS", 0)?;

        Ok(Self {
            host: get("PINBOARD_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "PINBOARD_PORT", 3000)?,
            db_path: get("PINBOARD_DB_PATH")
                .unwrap_or_else(|| "pinboard.db".into())
                .into(),
            jwt_secret,
            storage_dir: get("PINBOARD_STORAGE_DIR")
                .unwrap_or_else(|| "./object-storage".into())
                .into(),
            public_url: get("PINBOARD_PUBLIC_URL")
                .unwrap_or_else(|| "http://localhost:3000".into()),
            url_ttl: Duration::from_secs(parse_or(&get, "PINBOARD_URL_TTL_SECS", 3600)?),
            aggregate_timeout: Duration::from_millis(parse_or(
                &get,
                "PINBOARD_AGGREGATE_TIMEOUT_MS",
                5000,
            )?),
            permission_ttl: (permission_ttl_secs > 0)
                .then(|| Duration::from_secs(permission_ttl_secs)),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("PINBOARD_JWT_SECRET", "a-real-secret")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.db_path, PathBuf::from("pinboard.db"));
        assert_eq!(config.url_ttl, Duration::from_secs(3600));
        assert_eq!(config.aggregate_timeout, Duration::from_millis(5000));
        assert_eq!(config.permission_ttl, None);
        assert_eq!(config.addr().unwrap().port(), 3000);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("PINBOARD_JWT_SECRET", "a-real-secret"),
            ("PINBOARD_PORT", "8080"),
            ("PINBOARD_AGGREGATE_TIMEOUT_MS", "250"),
            ("PINBOARD_PERMISSION_TTL_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.aggregate_timeout, Duration::from_millis(250));
        assert_eq!(config.permission_ttl, Some(Duration::from_secs(60)));
    }

    #[test]
    fn missing_or_placeholder_secrets_are_rejected() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("PINBOARD_JWT_SECRET", "dev-secret-change-me")])).is_err());
    }

    #[test]
    fn bad_numbers_are_errors() {
        let err = Config::from_lookup(lookup(&[
            ("PINBOARD_JWT_SECRET", "a-real-secret"),
            ("PINBOARD_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PINBOARD_PORT"));
    }
}
