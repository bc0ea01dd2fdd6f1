//! Runtime settings, from command-line flags or the environment.

use std::time::Duration;

use clap::{ArgAction, Parser, builder::BoolishValueParser};

use super::{
    client_resolution::{DEFAULT_CLIENT_CACHE_CAPACITY, DEFAULT_CLIENT_CACHE_TTL},
    period::{DEFAULT_HORIZON_MONTHS, MAX_HORIZON_MONTHS},
    skill_cache::DEFAULT_SKILL_CACHE_TTL,
};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://practice.db";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

/// Flags take precedence over their environment variables
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "server", about = "Practice demand and capacity forecasting API")]
pub struct ForecastConfig {
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    #[arg(long, env = "SKILL_CACHE_TTL_SECS", default_value_t = DEFAULT_SKILL_CACHE_TTL.as_secs())]
    pub skill_cache_ttl_secs: u64,

    #[arg(long, env = "CLIENT_CACHE_TTL_SECS", default_value_t = DEFAULT_CLIENT_CACHE_TTL.as_secs())]
    pub client_cache_ttl_secs: u64,

    #[arg(long, env = "CLIENT_CACHE_CAPACITY", default_value_t = DEFAULT_CLIENT_CACHE_CAPACITY)]
    pub client_cache_capacity: u64,

    /// Months forecast when a request gives no `end`
    #[arg(
        long,
        env = "FORECAST_HORIZON_MONTHS",
        default_value_t = DEFAULT_HORIZON_MONTHS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HORIZON_MONTHS))
    )]
    pub horizon_months: u32,

    #[arg(
        long,
        env = "INCLUDE_INACTIVE_TASKS",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub include_inactive_tasks: bool,

    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            skill_cache_ttl_secs: DEFAULT_SKILL_CACHE_TTL.as_secs(),
            client_cache_ttl_secs: DEFAULT_CLIENT_CACHE_TTL.as_secs(),
            client_cache_capacity: DEFAULT_CLIENT_CACHE_CAPACITY,
            horizon_months: DEFAULT_HORIZON_MONTHS,
            include_inactive_tasks: false,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ForecastConfig {
    pub fn skill_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.skill_cache_ttl_secs)
    }

    pub fn client_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.client_cache_ttl_secs)
    }
}
