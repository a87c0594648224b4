use std::env;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use anyhow::Context;

pub const MEMORY_URL: &str = "memory://";

/// Longest accepted session lifetime, one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Postgres connection string, or `memory://` for a throwaway store.
    pub database_url: String,
    pub admin_username: String,
    pub admin_password: String,
    pub session_ttl_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            database_url: "postgres://localhost/dapodik".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            session_ttl_hours: 48,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            host: try_load("SISWA_HOST", defaults.host)?,
            port: try_load("SISWA_PORT", defaults.port)?,
            database_url: try_load("DATABASE_URL", defaults.database_url)?,
            admin_username: try_load("SISWA_ADMIN_USERNAME", defaults.admin_username)?,
            admin_password: load_secret("SISWA_ADMIN_PASSWORD", defaults.admin_password),
            session_ttl_hours: try_load("SISWA_SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
        };
        config.session_ttl()?;
        Ok(config)
    }

    /// Session lifetime, rejected unless it lies in `1..=MAX_SESSION_TTL_HOURS`.
    pub fn session_ttl(&self) -> anyhow::Result<chrono::Duration> {
        let hours = self.session_ttl_hours;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
            anyhow::bail!(
                "SISWA_SESSION_TTL_HOURS must be between 1 and {}, got {}",
                MAX_SESSION_TTL_HOURS,
                hours
            );
        }
        Ok(chrono::Duration::hours(hours))
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with(MEMORY_URL)
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value `{}`", key, raw)),
        Err(_) => {
            log::info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}

fn load_secret(key: &str, default: String) -> String {
    env::var(key).unwrap_or_else(|_| {
        log::warn!("{} not set, using the built-in default", key);
        default
    })
}
