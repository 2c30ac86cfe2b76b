use std::{str::FromStr, time::Duration};

use anyhow::Context;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub max_connections: u32,
    pub query_timeout: Option<Duration>,
    pub referral: ReferralConfig,
}

impl Config {
    pub fn init() -> anyhow::Result<Config> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;
        let app_url = std::env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let query_timeout = std::env::var("QUERY_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis);

        Ok(Config {
            database_url,
            app_url,
            jwt_secret,
            port: env_or("PORT", 8000),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            query_timeout,
            referral: ReferralConfig::from_env(),
        })
    }
}

/// Reward and cap settings of the referral programme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferralConfig {
    pub referrer_bonus_days: i32,
    pub referred_bonus_days: i32,
    pub max_referrals_per_user: i64,
    pub credit_validity_days: i64,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            referrer_bonus_days: 7,
            referred_bonus_days: 7,
            max_referrals_per_user: 50,
            credit_validity_days: 365,
        }
    }
}

impl ReferralConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing, unparseable or non-positive
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            referrer_bonus_days: positive(&lookup, "REFERRAL_REFERRER_BONUS_DAYS", defaults.referrer_bonus_days),
            referred_bonus_days: positive(&lookup, "REFERRAL_REFERRED_BONUS_DAYS", defaults.referred_bonus_days),
            max_referrals_per_user: positive(&lookup, "REFERRAL_MAX_PER_USER", defaults.max_referrals_per_user),
            credit_validity_days: positive(&lookup, "PREMIUM_CREDIT_VALIDITY_DAYS", defaults.credit_validity_days),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn positive<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default + Copy,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            tracing::warn!("Ignoring invalid value {:?} for {}, using default", raw, key);
            default
        }
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
    fn defaults_apply_when_nothing_is_set() {
        assert_eq!(ReferralConfig::from_lookup(lookup(&[])), ReferralConfig::default());
    }

    #[test]
    fn overrides_are_read() {
        let config = ReferralConfig::from_lookup(lookup(&[
            ("REFERRAL_REFERRER_BONUS_DAYS", "14"),
            ("REFERRAL_MAX_PER_USER", "5"),
        ]));

        assert_eq!(config.referrer_bonus_days, 14);
        assert_eq!(config.referred_bonus_days, 7);
        assert_eq!(config.max_referrals_per_user, 5);
        assert_eq!(config.credit_validity_days, 365);
    }

    #[test]
    fn garbage_and_non_positive_values_fall_back() {
        let config = ReferralConfig::from_lookup(lookup(&[
            ("REFERRAL_REFERRED_BONUS_DAYS", "a week"),
            ("PREMIUM_CREDIT_VALIDITY_DAYS", "0"),
            ("REFERRAL_MAX_PER_USER", "-3"),
        ]));

        assert_eq!(config, ReferralConfig::default());
    }
}
