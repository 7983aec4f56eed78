use std::time::Duration;

use envconfig::Envconfig;
use santa_core::{default_log_level, Strategy};

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Envconfig)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3000")]
    pub port: u16,

    #[envconfig(default = "santa.sqlite3")]
    pub database_path: String,

    #[envconfig(default = "admin")]
    pub admin_name: String,

    // Empty disables admin bootstrap.
    #[envconfig(default = "")]
    pub admin_password_hash: String,

    #[envconfig(default = "false")]
    pub require_group_code: bool,

    #[envconfig(default = "shuffle")]
    pub derangement_strategy: String,

    #[envconfig(default = "100")]
    pub max_shuffle_attempts: u32,

    #[envconfig(default = "86400")]
    pub session_ttl_secs: u64,

    #[envconfig(default = "12")]
    pub bcrypt_cost: u32,

    #[envconfig(default = "*")]
    pub cors_allowed_origin: String,

    #[envconfig(default = "")]
    pub log_level: String,

    #[envconfig(default = "")]
    pub log_dir: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown DERANGEMENT_STRATEGY `{0}`; expected shuffle|rotation|legacy")]
    UnknownStrategy(String),
    #[error("BCRYPT_COST must be within 4..=31, got {0}")]
    BcryptCostOutOfRange(u32),
    #[error("MAX_SHUFFLE_ATTEMPTS must be at least 1")]
    ZeroShuffleAttempts,
}

/// Runtime knobs shared by every request handler.
#[derive(Debug, Clone)]
pub struct Settings {
    pub strategy: Strategy,
    pub session_ttl: Duration,
    pub bcrypt_cost: u32,
    pub require_group_code: bool,
    pub cors_allowed_origin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            session_ttl: santa_core::DEFAULT_SESSION_TTL,
            bcrypt_cost: 12,
            require_group_code: false,
            cors_allowed_origin: "*".to_owned(),
        }
    }
}

impl Config {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn log_level(&self) -> &str {
        if self.log_level.trim().is_empty() {
            default_log_level()
        } else {
            self.log_level.as_str()
        }
    }

    pub fn log_dir(&self) -> Option<&str> {
        Some(self.log_dir.as_str()).filter(|dir| !dir.trim().is_empty())
    }

    pub fn admin_password_hash(&self) -> Option<&str> {
        Some(self.admin_password_hash.as_str()).filter(|hash| !hash.trim().is_empty())
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        if self.max_shuffle_attempts == 0 {
            return Err(ConfigError::ZeroShuffleAttempts);
        }
        let strategy = Strategy::parse(&self.derangement_strategy, self.max_shuffle_attempts)
            .ok_or_else(|| ConfigError::UnknownStrategy(self.derangement_strategy.clone()))?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::BcryptCostOutOfRange(self.bcrypt_cost));
        }

        Ok(Settings {
            strategy,
            session_ttl: Duration::from_secs(self.session_ttl_secs),
            bcrypt_cost: self.bcrypt_cost,
            require_group_code: self.require_group_code,
            cors_allowed_origin: self.cors_allowed_origin.clone(),
        })
    }
}
