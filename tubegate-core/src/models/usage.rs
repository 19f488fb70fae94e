//! Usage-related types.
//!
//! This module contains types related to quota tracking:
//! - [`UsageCounters`] - Counters for one resource class on one day
//! - [`DayUsage`] - All counters for one day string
//! - [`UsageStats`] - Consolidated snapshot for dashboards
//! - [`Health`] - Health report derived from the counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Usage at or above this percentage of a budget degrades health.
pub const DEGRADED_THRESHOLD_PERCENT: u64 = 90;

// ============================================================================
// Counters
// ============================================================================

/// Counters for a single resource class within one day string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounters {
    /// Budget units consumed by successful calls.
    #[serde(default)]
    pub used: u64,
    /// Number of failed calls.
    #[serde(default)]
    pub errors: u64,
    /// When these counters last changed.
    pub last_updated: DateTime<Utc>,
}

impl UsageCounters {
    /// Creates zeroed counters stamped with `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            used: 0,
            errors: 0,
            last_updated: now,
        }
    }
}

/// Resource-class counters for one day string.
pub type DayUsage = BTreeMap<String, UsageCounters>;

// ============================================================================
// Stats
// ============================================================================

/// Usage figures for one resource class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    /// Units used today.
    pub used: u64,
    /// Daily budget.
    pub quota: u64,
    /// Units left today, never negative.
    pub remaining: u64,
    /// Failed calls today.
    pub errors: u64,
    /// `used / quota` as a rounded percentage (0 when quota is 0).
    pub percentage: u64,
}

impl ClassStats {
    /// Builds stats from raw figures.
    pub fn new(used: u64, quota: u64, errors: u64) -> Self {
        Self {
            used,
            quota,
            remaining: quota.saturating_sub(used),
            errors,
            percentage: percentage(used, quota),
        }
    }

    /// Returns true if usage is at or past the degraded threshold.
    pub fn is_degraded(&self) -> bool {
        self.quota > 0 && self.percentage >= DEGRADED_THRESHOLD_PERCENT
    }
}

/// Rounded `used / quota` percentage.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentage(used: u64, quota: u64) -> u64 {
    if quota == 0 {
        return 0;
    }
    ((used as f64 / quota as f64) * 100.0).round() as u64
}

/// Consolidated usage snapshot for one ledger.
///
/// This is what dashboards poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// The day string these figures belong to.
    pub date: String,
    /// Per-class figures.
    pub classes: BTreeMap<String, ClassStats>,
    /// Totals across all classes.
    pub total: ClassStats,
    /// Most recent update across all classes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

// ============================================================================
// Health
// ============================================================================

/// Overall health of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Every class is under the degraded threshold.
    Healthy,
    /// At least one class is at or past the degraded threshold.
    Degraded,
    /// No class has budget left.
    Exhausted,
}

impl HealthStatus {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Degraded => "Degraded",
            Self::Exhausted => "Exhausted",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// Overall status.
    pub status: HealthStatus,
    /// One warning per degraded class, plus one if everything is exhausted.
    pub warnings: Vec<String>,
    /// Class that `recommend` would return.
    pub recommended: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_stats_remaining_floors_at_zero() {
        let stats = ClassStats::new(12, 10, 0);
        assert_eq!(stats.remaining, 0);
        assert_eq!(stats.percentage, 120);
    }

    #[test]
    fn test_percentage_zero_quota() {
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
    }

    #[test]
    fn test_degraded_threshold() {
        assert!(!ClassStats::new(89, 100, 0).is_degraded());
        assert!(ClassStats::new(90, 100, 0).is_degraded());
        assert!(!ClassStats::new(0, 0, 0).is_degraded());
    }

    #[test]
    fn test_counters_wire_names() {
        let counters = UsageCounters::new(Utc::now());
        let json = serde_json::to_value(&counters).unwrap();
        assert!(json.get("lastUpdated").is_some());
        assert_eq!(json["used"], 0);
    }
}
