use std::env;
use std::net::{IpAddr, SocketAddr};

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    pub token_ttl_seconds: u64,
    /// Empty means CORS is not enabled.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = match lookup("HOST").and_then(|value| normalize_optional(&value)) {
            Some(value) => value
                .parse()
                .with_context(|| format!("HOST '{value}' is not an IP address"))?,
            None => defaults.host,
        };

        let port = parse_or(&lookup, "PORT", defaults.port)?;

        let token_ttl_seconds = parse_or(&lookup, "TOKEN_TTL_SECONDS", defaults.token_ttl_seconds)?;
        if token_ttl_seconds == 0 {
            return Err(anyhow!("TOKEN_TTL_SECONDS must be greater than zero"));
        }

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|value| parse_list(&value))
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            token_ttl_seconds,
            cors_allowed_origins,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).and_then(|value| normalize_optional(&value)) {
        Some(value) => value
            .parse()
            .with_context(|| format!("Failed to parse {key} '{value}'")),
        None => Ok(default),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
