//! Configuration loading and representation.
//!
//! Defaults are overlaid with `DESTORE_*` environment variables. Each service
//! receives only its own section.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use destore_core::Money;
use destore_finance::DecisionPolicy;
use destore_notifications::{Channel, RecipientSettings};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceConfig {
    pub auto_approve_threshold: Decimal,
    pub approval_rate: f64,
    pub interest_rate: Decimal,
    pub default_term_months: u32,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub decision_timeout_ms: u64,
    /// Fixed seed for reproducible decisions; entropy when unset.
    pub rng_seed: Option<u64>,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            auto_approve_threshold: Decimal::from(1000),
            approval_rate: 0.7,
            interest_rate: Decimal::new(59, 1),
            default_term_months: 12,
            min_latency_ms: 500,
            max_latency_ms: 1500,
            decision_timeout_ms: 5000,
            rng_seed: None,
        }
    }
}

impl FinanceConfig {
    pub fn policy(&self) -> DecisionPolicy {
        DecisionPolicy {
            auto_approve_threshold: Money::new(self.auto_approve_threshold),
            approval_rate: self.approval_rate,
            interest_rate: self.interest_rate,
            default_term_months: self.default_term_months,
            min_latency: Duration::from_millis(self.min_latency_ms),
            max_latency: Duration::from_millis(self.max_latency_ms),
        }
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_latency_ms(mut self, min: u64, max: u64) -> Self {
        self.min_latency_ms = min;
        self.max_latency_ms = max;
        self
    }

    pub fn with_decision_timeout_ms(mut self, timeout: u64) -> Self {
        self.decision_timeout_ms = timeout;
        self
    }

    pub fn with_approval_rate(mut self, rate: f64) -> Self {
        self.approval_rate = rate;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoyaltyConfig {
    pub points_per_pound: u32,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self { points_per_pound: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub default_low_stock_threshold: u32,
    pub default_reorder_quantity: u32,
    pub sweep_interval_secs: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            default_low_stock_threshold: 10,
            default_reorder_quantity: 50,
            sweep_interval_secs: 300,
        }
    }
}

impl InventoryConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub promotion_sweep_interval_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            promotion_sweep_interval_secs: 60,
        }
    }
}

impl PricingConfig {
    pub fn promotion_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.promotion_sweep_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub recipient: String,
    pub email_domain: String,
    pub low_stock_channel: Channel,
    pub finance_channel: Channel,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        let recipients = RecipientSettings::default();
        Self {
            recipient: recipients.recipient,
            email_domain: recipients.email_domain,
            low_stock_channel: Channel::Console,
            finance_channel: Channel::Console,
        }
    }
}

impl NotificationConfig {
    pub fn recipients(&self) -> RecipientSettings {
        RecipientSettings {
            recipient: self.recipient.clone(),
            email_domain: self.email_domain.clone(),
        }
    }

    /// Channels that must have a sender at startup.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = vec![self.low_stock_channel, self.finance_channel];
        channels.sort();
        channels.dedup();
        channels
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when unset.
    pub log_filter: Option<String>,
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: None,
            json: true,
        }
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestoreConfig {
    pub finance: FinanceConfig,
    pub loyalty: LoyaltyConfig,
    pub inventory: InventoryConfig,
    pub pricing: PricingConfig,
    pub notifications: NotificationConfig,
    pub observability: ObservabilityConfig,
}

impl DestoreConfig {
    /// Defaults overlaid with `DESTORE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, then validated.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        let f = &mut cfg.finance;
        overlay(&lookup, "DESTORE_FINANCE_AUTO_APPROVE_THRESHOLD", &mut f.auto_approve_threshold)?;
        overlay(&lookup, "DESTORE_FINANCE_APPROVAL_RATE", &mut f.approval_rate)?;
        overlay(&lookup, "DESTORE_FINANCE_INTEREST_RATE", &mut f.interest_rate)?;
        overlay(&lookup, "DESTORE_FINANCE_DEFAULT_TERM_MONTHS", &mut f.default_term_months)?;
        overlay(&lookup, "DESTORE_FINANCE_MIN_LATENCY_MS", &mut f.min_latency_ms)?;
        overlay(&lookup, "DESTORE_FINANCE_MAX_LATENCY_MS", &mut f.max_latency_ms)?;
        overlay(&lookup, "DESTORE_FINANCE_DECISION_TIMEOUT_MS", &mut f.decision_timeout_ms)?;
        if let Some(seed) = parse::<u64>(&lookup, "DESTORE_FINANCE_RNG_SEED")? {
            f.rng_seed = Some(seed);
        }

        overlay(&lookup, "DESTORE_LOYALTY_POINTS_PER_POUND", &mut cfg.loyalty.points_per_pound)?;

        let i = &mut cfg.inventory;
        overlay(&lookup, "DESTORE_INVENTORY_LOW_STOCK_THRESHOLD", &mut i.default_low_stock_threshold)?;
        overlay(&lookup, "DESTORE_INVENTORY_REORDER_QUANTITY", &mut i.default_reorder_quantity)?;
        overlay(&lookup, "DESTORE_INVENTORY_SWEEP_INTERVAL_SECS", &mut i.sweep_interval_secs)?;

        overlay(
            &lookup,
            "DESTORE_PRICING_PROMOTION_SWEEP_INTERVAL_SECS",
            &mut cfg.pricing.promotion_sweep_interval_secs,
        )?;

        let n = &mut cfg.notifications;
        overlay(&lookup, "DESTORE_NOTIFICATIONS_RECIPIENT", &mut n.recipient)?;
        overlay(&lookup, "DESTORE_NOTIFICATIONS_EMAIL_DOMAIN", &mut n.email_domain)?;
        overlay(&lookup, "DESTORE_NOTIFICATIONS_LOW_STOCK_CHANNEL", &mut n.low_stock_channel)?;
        overlay(&lookup, "DESTORE_NOTIFICATIONS_FINANCE_CHANNEL", &mut n.finance_channel)?;

        if let Some(filter) = lookup("DESTORE_LOG_FILTER") {
            cfg.observability.log_filter = Some(filter);
        }
        overlay(&lookup, "DESTORE_LOG_JSON", &mut cfg.observability.json)?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.finance;
        if !(0.0..=1.0).contains(&f.approval_rate) {
            return Err(ConfigError::Validation(format!(
                "finance.approval_rate must be within [0, 1], got {}",
                f.approval_rate
            )));
        }
        if f.auto_approve_threshold.is_sign_negative() {
            return Err(ConfigError::Validation(
                "finance.auto_approve_threshold cannot be negative".to_string(),
            ));
        }
        if f.interest_rate.is_sign_negative() {
            return Err(ConfigError::Validation("finance.interest_rate cannot be negative".to_string()));
        }
        if f.default_term_months == 0 {
            return Err(ConfigError::Validation(
                "finance.default_term_months must be positive".to_string(),
            ));
        }
        if f.min_latency_ms > f.max_latency_ms {
            return Err(ConfigError::Validation(format!(
                "finance.min_latency_ms ({}) exceeds max_latency_ms ({})",
                f.min_latency_ms, f.max_latency_ms
            )));
        }
        if f.decision_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "finance.decision_timeout_ms must be positive".to_string(),
            ));
        }
        if self.inventory.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "inventory.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if self.pricing.promotion_sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "pricing.promotion_sweep_interval_secs must be positive".to_string(),
            ));
        }
        if self.notifications.email_domain.trim().is_empty() {
            return Err(ConfigError::Validation(
                "notifications.email_domain cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn overlay<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    if let Some(value) = parse(lookup, key)? {
        *target = value;
    }
    Ok(())
}
