//! Application configuration.
//!
//! Values come from built-in defaults, then `$CONFIG_DIR/bargain/config.toml`,
//! then `BARGAIN_`-prefixed environment variables using `__` between
//! sections (`BARGAIN_PRODUCT__BASE_PRICE=9500`).

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration as StdDuration,
};

use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    models::Price,
    negotiation::{NegotiationSettings, Product},
    timer::{TimerSettings, DEFAULT_EXPIRING_THRESHOLD_SECS},
};

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = "bargain";

const ENV_PREFIX: &str = "BARGAIN";

const MAX_OFFER_WINDOW_SECS: u64 = 24 * 60 * 60;
const MAX_HOLD_MINUTES: u64 = 24 * 60;
const MAX_SESSION_MINUTES: u64 = 24 * 60;

const DEFAULT_CONFIG: &str = r#"# Bargain configuration.
# Every key is optional; environment variables such as
# BARGAIN_PRODUCT__BASE_PRICE override this file.

[product]
name = "Grand Hyatt Mumbai · Deluxe King"
base_price = 12500
currency_symbol = "₹"
# Length of the search session shown next to the negotiation.
session_minutes = 20

[negotiation]
total_rounds = 2
offer_window_secs = 30
hold_minutes = 15
suggestion_step = 10
# Suggestions never go below this share of the listed price.
suggestion_floor_percent = 70

[timer]
expiring_threshold_secs = 180
tick_millis = 1000

[backend]
response_delay_millis = 1800
# seed = 42
"#;

/// Product section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    /// Display name.
    pub name: String,
    /// Listed price in whole units.
    pub base_price: u64,
    /// Currency symbol used for display only.
    pub currency_symbol: String,
    /// Search session length in minutes; `0` disables the session timer.
    pub session_minutes: u64,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: "Grand Hyatt Mumbai · Deluxe King".to_string(),
            base_price: 12_500,
            currency_symbol: "₹".to_string(),
            session_minutes: 20,
        }
    }
}

/// Negotiation section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Rounds offered per negotiation.
    pub total_rounds: u32,
    /// Seconds a counter-offer stays open.
    pub offer_window_secs: u64,
    /// Minutes an accepted price is held.
    pub hold_minutes: u64,
    /// Rounding step for suggestions.
    pub suggestion_step: u64,
    /// Lowest suggestion as a percentage of the listed price.
    pub suggestion_floor_percent: u64,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            total_rounds: 2,
            offer_window_secs: 30,
            hold_minutes: 15,
            suggestion_step: 10,
            suggestion_floor_percent: 70,
        }
    }
}

/// Countdown section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Seconds at or below which a countdown is expiring soon.
    pub expiring_threshold_secs: u64,
    /// Tick period in milliseconds.
    pub tick_millis: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            expiring_threshold_secs: DEFAULT_EXPIRING_THRESHOLD_SECS,
            tick_millis: 1_000,
        }
    }
}

/// Simulated supplier section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Artificial delay before a counter-offer arrives.
    pub response_delay_millis: u64,
    /// Fixed RNG seed for reproducible counter-offers.
    pub seed: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            response_delay_millis: 1_800,
            seed: None,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Item being bargained for.
    pub product: ProductConfig,
    /// Round and offer settings.
    pub negotiation: NegotiationConfig,
    /// Countdown settings.
    pub timer: TimerConfig,
    /// Supplier simulation settings.
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Load from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from an explicit file (which may be missing) plus environment
    /// overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        config.validate()?;
        info!(path = %path.display(), product = %config.product.name, "configuration loaded");
        Ok(config)
    }

    /// Reject values the negotiation cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.product.base_price == 0 {
            bail!("product.base_price must be greater than zero");
        }
        if self.negotiation.total_rounds == 0 {
            bail!("negotiation.total_rounds must be at least 1");
        }
        if self.negotiation.offer_window_secs == 0 {
            bail!("negotiation.offer_window_secs must be at least 1");
        }
        if self.negotiation.offer_window_secs > MAX_OFFER_WINDOW_SECS {
            bail!("negotiation.offer_window_secs must not exceed {MAX_OFFER_WINDOW_SECS}");
        }
        if self.negotiation.hold_minutes > MAX_HOLD_MINUTES {
            bail!("negotiation.hold_minutes must not exceed {MAX_HOLD_MINUTES}");
        }
        if self.product.session_minutes > MAX_SESSION_MINUTES {
            bail!("product.session_minutes must not exceed {MAX_SESSION_MINUTES}");
        }
        if self.negotiation.suggestion_floor_percent > 100 {
            bail!("negotiation.suggestion_floor_percent must not exceed 100");
        }
        if self.timer.tick_millis == 0 {
            bail!("timer.tick_millis must be greater than zero");
        }
        Ok(())
    }

    /// Product described by the `[product]` section.
    pub fn product(&self) -> Result<Product> {
        let base_price = Price::new(self.product.base_price)
            .context("product.base_price must be greater than zero")?;
        Ok(Product {
            name: self.product.name.clone(),
            base_price,
            currency_symbol: self.product.currency_symbol.clone(),
        })
    }

    /// Lowest price worth suggesting.
    pub fn suggestion_floor(&self) -> Option<Price> {
        let percent = self.negotiation.suggestion_floor_percent.min(100);
        Price::new(self.product.base_price.saturating_mul(percent) / 100)
    }

    /// Search session length, `None` when disabled.
    pub fn session_length(&self) -> Option<Duration> {
        match self.product.session_minutes {
            0 => None,
            minutes => Some(Duration::minutes(minutes as i64)),
        }
    }

    /// Settings for [`crate::negotiation::Negotiation`].
    pub fn negotiation_settings(&self) -> NegotiationSettings {
        NegotiationSettings {
            total_rounds: self.negotiation.total_rounds,
            offer_window: Duration::seconds(self.negotiation.offer_window_secs as i64),
            hold_duration: Duration::minutes(self.negotiation.hold_minutes as i64),
            suggestion_step: self.negotiation.suggestion_step,
        }
    }

    /// Settings for countdown tasks.
    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            expiring_threshold_secs: self.timer.expiring_threshold_secs,
            tick: StdDuration::from_millis(self.timer.tick_millis),
        }
    }

    /// Simulated supplier latency.
    pub fn response_delay(&self) -> StdDuration {
        StdDuration::from_millis(self.backend.response_delay_millis)
    }
}

/// `$CONFIG_DIR/bargain/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join("config.toml")
}

/// Write the commented default config if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(default_config_path())
}

fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}
