//! The usage ledger.
//!
//! A ledger counts budget units per resource class for the current quota day
//! and answers the questions callers ask before spending: how much is left,
//! which class to use, and whether anything is left at all.
//!
//! Every mutation writes the whole history back to disk while still holding
//! the ledger lock, so concurrent increments never interleave their writes.
//! Write failures are logged and the ledger carries on in memory.

use chrono::{DateTime, Days, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use tubegate_core::{
    CallError, ClassStats, Clock, DayBoundary, DayUsage, EndpointCatalog, ErrorKind,
    GovernorConfig, Health, HealthStatus, UsageCounters, UsageStats, YOUTUBE_RESOURCE_CLASS,
    classify_error,
};

use crate::day::{day_date, day_string, parse_day};
use crate::persistence::{load_json_if_exists, save_json};

/// Day string → counters for that day.
pub type LedgerHistory = BTreeMap<String, DayUsage>;

/// Warning attached to an exhausted health report.
pub const EXHAUSTED_WARNING: &str = "all resource classes exhausted";

// ============================================================================
// Ledger Config
// ============================================================================

/// Everything a ledger needs to know besides the clock.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Daily budget per resource class.
    pub budgets: BTreeMap<String, u64>,
    /// Classes tried first by [`UsageLedger::recommend`].
    pub preference: Vec<String>,
    /// When the quota day rolls over.
    pub boundary: DayBoundary,
    /// Days of history kept on disk.
    pub retention_days: u32,
    /// Endpoint costs used by [`UsageLedger::track`].
    pub catalog: EndpointCatalog,
    /// Backing file; `None` keeps the ledger in memory.
    pub path: Option<PathBuf>,
}

impl LedgerConfig {
    /// A memory-only ledger config with default boundary and retention.
    pub fn new(budgets: BTreeMap<String, u64>) -> Self {
        Self {
            budgets,
            preference: Vec::new(),
            boundary: DayBoundary::default(),
            retention_days: 7,
            catalog: EndpointCatalog::empty(),
            path: None,
        }
    }

    /// The generative-model ledger described by `config`.
    pub fn for_models(config: &GovernorConfig) -> Self {
        let mut models = vec![
            (config.primary_model.as_str(), config.primary_resource_class.as_str()),
            (config.fallback_model.as_str(), config.fallback_resource_class.as_str()),
        ];
        if config.budgets.contains_key("flash-lite") {
            models.push(("gemini-2.5-flash-lite", "flash-lite"));
        }

        Self {
            budgets: config.model_budgets(),
            preference: config.preference(),
            boundary: config.day_boundary(),
            retention_days: config.retention_days,
            catalog: EndpointCatalog::gemini(models),
            path: Some(config.model_ledger_path()),
        }
    }

    /// A YouTube Data API partition described by `config`, stored at `path`.
    pub fn for_youtube(config: &GovernorConfig, path: Option<PathBuf>) -> Self {
        Self {
            budgets: config.youtube_budgets(),
            preference: vec![YOUTUBE_RESOURCE_CLASS.to_string()],
            boundary: config.day_boundary(),
            retention_days: config.retention_days,
            catalog: EndpointCatalog::youtube(YOUTUBE_RESOURCE_CLASS),
            path,
        }
    }

    /// Sets the backing file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the preferred classes.
    pub fn with_preference<I, S>(mut self, preference: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preference = preference.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the day boundary.
    pub fn with_boundary(mut self, boundary: DayBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Sets the retention window.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Sets the endpoint catalog.
    pub fn with_catalog(mut self, catalog: EndpointCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Preferred classes first, then the remaining budgeted classes by name.
    fn recommendation_order(&self) -> Vec<&str> {
        let mut order: Vec<&str> = Vec::with_capacity(self.budgets.len() + self.preference.len());
        for class in self.preference.iter().map(String::as_str) {
            if !order.contains(&class) {
                order.push(class);
            }
        }
        for class in self.budgets.keys().map(String::as_str) {
            if !order.contains(&class) {
                order.push(class);
            }
        }
        order
    }

    fn budget(&self, class: &str) -> u64 {
        self.budgets.get(class).copied().unwrap_or(0)
    }
}

// ============================================================================
// Usage Ledger
// ============================================================================

/// Daily per-class usage counters with budgets.
pub struct UsageLedger {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    history: Mutex<LedgerHistory>,
}

impl std::fmt::Debug for UsageLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageLedger")
            .field("budgets", &self.config.budgets)
            .field("path", &self.config.path)
            .finish_non_exhaustive()
    }
}

impl UsageLedger {
    /// Opens a ledger, loading its history from `config.path` if present.
    ///
    /// A missing file starts empty. A corrupt file is logged and also starts
    /// empty; it will be overwritten on the first save.
    pub async fn open(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        let history = match &config.path {
            Some(path) => load_history(path).await,
            None => LedgerHistory::new(),
        };
        Self {
            config,
            clock,
            history: Mutex::new(history),
        }
    }

    /// Creates a ledger that never touches the filesystem.
    pub fn in_memory(mut config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        config.path = None;
        Self {
            config,
            clock,
            history: Mutex::new(LedgerHistory::new()),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The ledger's configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.config.path.as_deref()
    }

    /// Budget for `class`; 0 if it has none.
    pub fn budget(&self, class: &str) -> u64 {
        self.config.budget(class)
    }

    /// The current day string.
    pub fn today(&self) -> String {
        day_string(self.clock.now(), &self.config.boundary)
    }

    /// Returns true if `err` is a quota error.
    pub fn is_quota_error(err: &CallError) -> bool {
        classify_error(err) == ErrorKind::QuotaExceeded
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Counts one call: a successful call uses one unit, a failed one adds an error.
    pub async fn increment(&self, class: &str, success: bool) {
        self.record(class, 1, success).await;
    }

    /// Counts a call costing `units`.
    ///
    /// Success adds `units` to `used`; failure adds one to `errors` whatever
    /// the cost. The history is saved before this returns.
    #[instrument(skip(self))]
    pub async fn record(&self, class: &str, units: u64, success: bool) {
        let now = self.clock.now();
        let today = day_string(now, &self.config.boundary);

        let mut history = self.history.lock().await;
        let counters = history
            .entry(today)
            .or_default()
            .entry(class.to_string())
            .or_insert_with(|| UsageCounters::new(now));

        if success {
            counters.used = counters.used.saturating_add(units);
        } else {
            counters.errors = counters.errors.saturating_add(1);
        }
        counters.last_updated = now;

        debug!(
            used = counters.used,
            errors = counters.errors,
            budget = self.config.budget(class),
            "Recorded usage"
        );

        self.save_locked(&mut history, now).await;
    }

    /// Counts a call to a catalogued endpoint at its configured cost.
    ///
    /// Returns false without recording anything if the endpoint is unknown or
    /// disabled.
    pub async fn track(&self, endpoint: &str, success: bool) -> bool {
        let Some(entry) = self.config.catalog.get(endpoint) else {
            warn!(endpoint, "Untracked endpoint, usage not recorded");
            return false;
        };
        if !entry.enabled {
            info!(endpoint, "Endpoint disabled, usage not recorded");
            return false;
        }
        let (class, cost) = (entry.resource_class.clone(), entry.cost);
        self.record(&class, cost, success).await;
        true
    }

    /// Zeroes today's counters.
    pub async fn reset_today(&self) {
        let now = self.clock.now();
        let today = day_string(now, &self.config.boundary);

        let mut history = self.history.lock().await;
        if let Some(day) = history.get_mut(&today) {
            for counters in day.values_mut() {
                counters.used = 0;
                counters.errors = 0;
                counters.last_updated = now;
            }
        }
        info!(day = %today, "Reset today's usage");
        self.save_locked(&mut history, now).await;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Today's counters for every class that has been touched.
    pub async fn today_usage(&self) -> DayUsage {
        let today = self.today();
        self.history
            .lock()
            .await
            .get(&today)
            .cloned()
            .unwrap_or_default()
    }

    /// The full in-memory history.
    pub async fn history(&self) -> LedgerHistory {
        self.history.lock().await.clone()
    }

    /// Units left today for `class`, never negative.
    pub async fn remaining(&self, class: &str) -> u64 {
        let used = self.used_today(class).await;
        self.config.budget(class).saturating_sub(used)
    }

    /// Returns true once today's usage has reached the budget.
    ///
    /// A class without a budget is always exceeded.
    pub async fn is_exceeded(&self, class: &str) -> bool {
        self.used_today(class).await >= self.config.budget(class)
    }

    /// The first class in preference order with budget left today.
    pub async fn recommend(&self) -> Option<String> {
        let usage = self.today_usage().await;
        self.recommend_from(&usage)
    }

    /// Consolidated stats for today.
    pub async fn usage_stats(&self) -> UsageStats {
        let date = self.today();
        let usage = self.today_usage().await;
        self.stats_from(date, &usage)
    }

    /// Health derived from today's usage.
    pub async fn health(&self) -> Health {
        let usage = self.today_usage().await;
        let stats = self.stats_from(self.today(), &usage);
        let recommended = self.recommend_from(&usage);

        let mut warnings: Vec<String> = stats
            .classes
            .iter()
            .filter(|(_, s)| s.is_degraded())
            .map(|(class, s)| {
                format!("{class}: {}/{} used ({}%)", s.used, s.quota, s.percentage)
            })
            .collect();

        let status = if recommended.is_none() {
            warnings.push(EXHAUSTED_WARNING.to_string());
            HealthStatus::Exhausted
        } else if warnings.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        Health {
            status,
            warnings,
            recommended,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn used_today(&self, class: &str) -> u64 {
        let today = self.today();
        self.history
            .lock()
            .await
            .get(&today)
            .and_then(|day| day.get(class))
            .map_or(0, |c| c.used)
    }

    fn recommend_from(&self, usage: &DayUsage) -> Option<String> {
        self.config
            .recommendation_order()
            .into_iter()
            .find(|class| {
                let used = usage.get(*class).map_or(0, |c| c.used);
                self.config.budget(class) > used
            })
            .map(str::to_string)
    }

    fn stats_from(&self, date: String, usage: &DayUsage) -> UsageStats {
        let mut classes = BTreeMap::new();
        for class in self.config.budgets.keys().chain(usage.keys()) {
            if classes.contains_key(class) {
                continue;
            }
            let (used, errors) = usage.get(class).map_or((0, 0), |c| (c.used, c.errors));
            classes.insert(
                class.clone(),
                ClassStats::new(used, self.config.budget(class), errors),
            );
        }

        let (used, quota, errors) = classes.values().fold((0u64, 0u64, 0u64), |acc, s| {
            (acc.0 + s.used, acc.1 + s.quota, acc.2 + s.errors)
        });

        UsageStats {
            date,
            classes,
            total: ClassStats::new(used, quota, errors),
            last_updated: usage.values().map(|c| c.last_updated).max(),
        }
    }

    /// Prunes and writes the history. Must be called with the lock held.
    async fn save_locked(&self, history: &mut LedgerHistory, now: DateTime<Utc>) {
        prune(history, now, &self.config.boundary, self.config.retention_days);

        let Some(path) = &self.config.path else {
            return;
        };
        if let Err(e) = save_json(path, &*history).await {
            error!(path = %path.display(), error = %e, "Failed to save usage ledger");
        }
    }
}

/// Drops days older than `today - retention_days`.
fn prune(history: &mut LedgerHistory, now: DateTime<Utc>, boundary: &DayBoundary, retention_days: u32) {
    let today = day_date(now, boundary);
    let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(retention_days))) else {
        return;
    };
    let before = history.len();
    history.retain(|day, _| parse_day(day).is_some_and(|date| date >= cutoff));
    let dropped = before - history.len();
    if dropped > 0 {
        debug!(dropped, %cutoff, "Pruned old usage days");
    }
}

async fn load_history(path: &Path) -> LedgerHistory {
    match load_json_if_exists::<LedgerHistory>(path).await {
        Ok(Some(history)) => {
            debug!(path = %path.display(), days = history.len(), "Loaded usage ledger");
            history
        }
        Ok(None) => {
            debug!(path = %path.display(), "No usage ledger yet, starting empty");
            LedgerHistory::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable usage ledger, starting empty");
            LedgerHistory::new()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
