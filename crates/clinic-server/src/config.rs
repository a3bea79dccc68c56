use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Placeholder JWT secrets that should never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("CLINIC_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("CLINIC_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CLINIC_PORT is not a valid port: {:?}", raw))?,
            None => 8000,
        };
        let db_path = lookup("CLINIC_DB_PATH")
            .unwrap_or_else(|| "clinic.db".into())
            .into();
        let jwt_secret = lookup("CLINIC_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SECRET.into());

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}
