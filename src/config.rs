use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub ttl: TtlPolicy,
}

/// Cache expiry per reporting view. Broad summary views tolerate more
/// staleness than the frequently polled live view, trading freshness for
/// store load. Tunables, not correctness requirements.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    pub summary_secs: u64,
    pub live_secs: u64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "8080"),
            database_url: try_load("DATABASE_URL", "postgres://localhost/tallyboard"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            ttl: TtlPolicy {
                summary_secs: try_load("SUMMARY_TTL_SECS", "60"),
                live_secs: try_load("LIVE_TTL_SECS", "10"),
            },
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
