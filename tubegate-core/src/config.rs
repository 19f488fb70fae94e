//! Governor configuration.
//!
//! Every knob has a serde default so a partial JSON file works. Environment
//! variables are applied on top of whatever was loaded from disk.

use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::CoreError;
use crate::models::TierBinding;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of every environment variable read by [`GovernorConfig::apply_env`].
pub const ENV_PREFIX: &str = "TUBEGATE_";

/// Legacy switch for the fallback tier. Anything other than `false` enables it.
pub const FALLBACK_ENV: &str = "ENABLE_GEMINI_FALLBACK";

/// Resource class shared by every YouTube Data API endpoint.
pub const YOUTUBE_RESOURCE_CLASS: &str = "youtube-data-api";

/// File name of the generative-model ledger inside the data directory.
pub const MODEL_LEDGER_FILE: &str = "gemini-usage.json";

/// File name of the persisted credential list inside the data directory.
pub const CREDENTIALS_FILE: &str = "api-keys.json";

/// Directory holding one ledger partition per YouTube credential.
pub const KEY_LEDGER_DIR: &str = "key-usage";

const MAX_OFFSET_MINUTES: i32 = 24 * 60;

// ============================================================================
// Day Boundary
// ============================================================================

/// Time of day at which daily budgets reset, in a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBoundary {
    /// Hour of the reset (0-23).
    pub hour: u32,
    /// Minute of the reset (0-59).
    pub minute: u32,
    /// Reference offset from UTC, in minutes.
    pub utc_offset_minutes: i32,
}

impl DayBoundary {
    /// Creates a boundary.
    pub fn new(hour: u32, minute: u32, utc_offset_minutes: i32) -> Self {
        Self {
            hour,
            minute,
            utc_offset_minutes,
        }
    }

    /// The reference offset. Out-of-range offsets fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// The reset time of day. Out-of-range values clamp to midnight.
    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for DayBoundary {
    /// 16:00 at UTC+9, which is midnight Pacific time during daylight saving.
    fn default() -> Self {
        Self::new(16, 0, 540)
    }
}

// ============================================================================
// Governor Config
// ============================================================================

/// Configuration for the quota governor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Whether a quota error on the primary tier falls through to the fallback tier.
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    /// Primary tier model endpoint.
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    /// Fallback tier model endpoint.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    /// Ledger class charged for primary tier calls.
    #[serde(default = "default_primary_class")]
    pub primary_resource_class: String,
    /// Ledger class charged for fallback tier calls.
    #[serde(default = "default_fallback_class")]
    pub fallback_resource_class: String,
    /// Reset hour.
    #[serde(default = "default_boundary_hour")]
    pub day_boundary_hour: u32,
    /// Reset minute.
    #[serde(default)]
    pub day_boundary_minute: u32,
    /// Reference offset from UTC, in minutes.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
    /// Days of history kept on disk.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Daily budget per resource class.
    #[serde(default = "default_budgets")]
    pub budgets: BTreeMap<String, u64>,
    /// Where ledgers and credentials are stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_primary_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_fallback_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_primary_class() -> String {
    "pro".to_string()
}

fn default_fallback_class() -> String {
    "flash".to_string()
}

fn default_boundary_hour() -> u32 {
    16
}

fn default_utc_offset() -> i32 {
    540
}

fn default_retention_days() -> u32 {
    7
}

fn default_budgets() -> BTreeMap<String, u64> {
    BTreeMap::from([
        ("pro".to_string(), 50),
        ("flash".to_string(), 250),
        ("flash-lite".to_string(), 1000),
        (YOUTUBE_RESOURCE_CLASS.to_string(), 8000),
    ])
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            enable_fallback: true,
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            primary_resource_class: default_primary_class(),
            fallback_resource_class: default_fallback_class(),
            day_boundary_hour: default_boundary_hour(),
            day_boundary_minute: 0,
            utc_offset_minutes: default_utc_offset(),
            retention_days: default_retention_days(),
            budgets: default_budgets(),
            data_dir: None,
        }
    }
}

impl GovernorConfig {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_data_dir().join("config.json")
    }

    /// Returns the default data directory (`<config dir>/tubegate`).
    pub fn default_data_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubegate")
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overlays environment-style settings read through `lookup`.
    ///
    /// Recognised names: `ENABLE_GEMINI_FALLBACK`, and with the `TUBEGATE_`
    /// prefix `ENABLE_FALLBACK`, `PRIMARY_MODEL`, `FALLBACK_MODEL`,
    /// `PRIMARY_CLASS`, `FALLBACK_CLASS`, `DAY_BOUNDARY_HOUR`,
    /// `DAY_BOUNDARY_MINUTE`, `UTC_OFFSET_MINUTES`, `RETENTION_DAYS`,
    /// `BUDGETS` (`class=n,class=n`) and `DATA_DIR`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = lookup(FALLBACK_ENV) {
            self.enable_fallback = value.trim() != "false";
        }
        if let Some(value) = var("ENABLE_FALLBACK") {
            self.enable_fallback = value.trim() != "false";
        }
        if let Some(value) = var("PRIMARY_MODEL") {
            self.primary_model = value;
        }
        if let Some(value) = var("FALLBACK_MODEL") {
            self.fallback_model = value;
        }
        if let Some(value) = var("PRIMARY_CLASS") {
            self.primary_resource_class = value;
        }
        if let Some(value) = var("FALLBACK_CLASS") {
            self.fallback_resource_class = value;
        }
        if let Some(value) = var("DAY_BOUNDARY_HOUR") {
            self.day_boundary_hour = parse_number("DAY_BOUNDARY_HOUR", &value)?;
        }
        if let Some(value) = var("DAY_BOUNDARY_MINUTE") {
            self.day_boundary_minute = parse_number("DAY_BOUNDARY_MINUTE", &value)?;
        }
        if let Some(value) = var("UTC_OFFSET_MINUTES") {
            self.utc_offset_minutes = parse_number("UTC_OFFSET_MINUTES", &value)?;
        }
        if let Some(value) = var("RETENTION_DAYS") {
            self.retention_days = parse_number("RETENTION_DAYS", &value)?;
        }
        if let Some(value) = var("BUDGETS") {
            self.budgets.extend(parse_budgets(&value)?);
        }
        if let Some(value) = var("DATA_DIR") {
            self.data_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.day_boundary_hour > 23 {
            return Err(CoreError::InvalidConfig(format!(
                "day_boundary_hour must be 0-23, got {}",
                self.day_boundary_hour
            )));
        }
        if self.day_boundary_minute > 59 {
            return Err(CoreError::InvalidConfig(format!(
                "day_boundary_minute must be 0-59, got {}",
                self.day_boundary_minute
            )));
        }
        if self.utc_offset_minutes.abs() >= MAX_OFFSET_MINUTES {
            return Err(CoreError::InvalidConfig(format!(
                "utc_offset_minutes must be within one day, got {}",
                self.utc_offset_minutes
            )));
        }
        if self.retention_days == 0 {
            return Err(CoreError::InvalidConfig(
                "retention_days must be at least 1".to_string(),
            ));
        }
        if self.primary_resource_class == self.fallback_resource_class {
            return Err(CoreError::InvalidConfig(format!(
                "primary and fallback tiers share resource class '{}'",
                self.primary_resource_class
            )));
        }
        Ok(())
    }

    /// The reset boundary.
    pub fn day_boundary(&self) -> DayBoundary {
        DayBoundary::new(
            self.day_boundary_hour,
            self.day_boundary_minute,
            self.utc_offset_minutes,
        )
    }

    /// Budget for a class; 0 for classes without one.
    pub fn budget(&self, class: &str) -> u64 {
        self.budgets.get(class).copied().unwrap_or(0)
    }

    /// Primary, then fallback.
    pub fn preference(&self) -> Vec<String> {
        vec![
            self.primary_resource_class.clone(),
            self.fallback_resource_class.clone(),
        ]
    }

    /// Binding of the primary tier.
    pub fn primary_binding(&self) -> TierBinding {
        TierBinding::new(&self.primary_model, &self.primary_resource_class)
    }

    /// Binding of the fallback tier.
    pub fn fallback_binding(&self) -> TierBinding {
        TierBinding::new(&self.fallback_model, &self.fallback_resource_class)
    }

    /// The configured data directory, or the default one.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Self::default_data_dir)
    }

    /// Path of the generative-model ledger.
    pub fn model_ledger_path(&self) -> PathBuf {
        self.data_dir().join(MODEL_LEDGER_FILE)
    }

    /// Path of the persisted credential list.
    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir().join(CREDENTIALS_FILE)
    }

    /// Directory holding per-credential ledger partitions.
    pub fn key_ledger_dir(&self) -> PathBuf {
        self.data_dir().join(KEY_LEDGER_DIR)
    }

    /// Budgets that apply to the generative-model ledger.
    pub fn model_budgets(&self) -> BTreeMap<String, u64> {
        self.budgets
            .iter()
            .filter(|(class, _)| class.as_str() != YOUTUBE_RESOURCE_CLASS)
            .map(|(class, budget)| (class.clone(), *budget))
            .collect()
    }

    /// Budgets that apply to each YouTube credential partition.
    pub fn youtube_budgets(&self) -> BTreeMap<String, u64> {
        BTreeMap::from([(
            YOUTUBE_RESOURCE_CLASS.to_string(),
            self.budget(YOUTUBE_RESOURCE_CLASS),
        )])
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, CoreError> {
    value.trim().parse().map_err(|_| {
        CoreError::InvalidConfig(format!("{ENV_PREFIX}{name}: not a number: {value}"))
    })
}

/// Parses `class=n,class=n`.
pub fn parse_budgets(value: &str) -> Result<BTreeMap<String, u64>, CoreError> {
    let mut budgets = BTreeMap::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (class, amount) = entry.split_once('=').ok_or_else(|| {
            CoreError::InvalidConfig(format!("budget entry '{entry}' is not class=n"))
        })?;
        let class = class.trim();
        if class.is_empty() {
            return Err(CoreError::InvalidConfig(format!(
                "budget entry '{entry}' has no class"
            )));
        }
        budgets.insert(class.to_string(), parse_number("BUDGETS", amount)?);
    }
    Ok(budgets)
}

// ============================================================================
// Tests
// ============================================================================
