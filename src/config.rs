use std::net::SocketAddr;

use anyhow::{bail, Context};
use figment::providers::Env;
use figment::Figment;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "BOOKING_";

/// Runtime configuration, read from `BOOKING_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Postgres URL. Without one the server keeps everything in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// HMAC secret for signing tokens. There is no default.
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration_ms")]
    pub jwt_expiration_ms: u64,
    /// Administrator account created at startup. Registration never grants
    /// admin rights, so this is the only way to get one.
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_max_connections() -> u32 {
    5
}

fn default_jwt_expiration_ms() -> u64 {
    86_400_000
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_figment(Figment::new().merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment
            .extract()
            .context("could not read configuration")?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("{}JWT_SECRET must not be empty", ENV_PREFIX)
        }
        if self.jwt_expiration_ms == 0 {
            bail!("{}JWT_EXPIRATION_MS must be positive", ENV_PREFIX)
        }
        Ok(())
    }
}
