use eyre::{eyre, Result, WrapErr};
use secrecy::SecretString;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.india.delta.exchange";

pub struct Config {
    pub exchange: ExchangeConfig,
    pub strategy: StrategyConfig,
    pub server_port: u16,
}

pub struct ExchangeConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

// Credentials must never reach the logs.
impl fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("exchange", &self.exchange)
            .field("strategy", &self.strategy)
            .field("server_port", &self.server_port)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Underlying asset queried for the options chain.
    pub underlying: String,
    /// Index symbol used as the spot reference.
    pub spot_index_symbol: String,
    /// Stop trigger as a multiple of the premium collected on each leg.
    pub stop_loss_multiplier: f64,
    /// Lots per leg.
    pub order_size: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            underlying: "BTC".to_string(),
            spot_index_symbol: ".DEXBTUSD".to_string(),
            stop_loss_multiplier: 1.25,
            order_size: 1,
        }
    }
}

impl ExchangeConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: SecretString::from(api_key.into()),
            api_secret: SecretString::from(api_secret.into()),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `load` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, "DELTA_API_KEY")?;
        let api_secret = required(&lookup, "DELTA_API_SECRET")?;
        let base_url = lookup("DELTA_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let server_port: u16 = match lookup("SERVER_PORT").or_else(|| lookup("PORT")) {
            Some(v) => v.parse().wrap_err_with(|| format!("invalid SERVER_PORT: {}", v))?,
            None => 10000,
        };

        let defaults = StrategyConfig::default();
        let stop_loss_multiplier = match lookup("STOP_LOSS_MULTIPLIER") {
            Some(v) => v
                .parse::<f64>()
                .wrap_err_with(|| format!("invalid STOP_LOSS_MULTIPLIER: {}", v))?,
            None => defaults.stop_loss_multiplier,
        };
        if stop_loss_multiplier <= 1.0 {
            return Err(eyre!(
                "STOP_LOSS_MULTIPLIER must be greater than 1.0, got {}",
                stop_loss_multiplier
            ));
        }
        let order_size = match lookup("ORDER_SIZE") {
            Some(v) => v.parse::<u32>().wrap_err_with(|| format!("invalid ORDER_SIZE: {}", v))?,
            None => defaults.order_size,
        };

        Ok(Config {
            exchange: ExchangeConfig::new(base_url, api_key, api_secret),
            strategy: StrategyConfig {
                stop_loss_multiplier,
                order_size,
                ..defaults
            },
            server_port,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| eyre!("{} not set", key))
}
