//! Text output formatting with progress bars and colors.

use tubegate_core::{ClassStats, ErrorReport, GovernorConfig, Health, HealthStatus, UsageStats};
use tubegate_fetch::{
    AttemptStatus, CredentialUsage, PoolStats, Recommendation, ResolveAttempt, ResolvedChannel,
    TierResponse,
};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    // ========================================================================
    // Usage
    // ========================================================================

    /// Formats a usage snapshot, one bar per resource class.
    pub fn format_usage(&self, title: &str, stats: &UsageStats) -> String {
        let mut lines = Vec::new();
        lines.push(format!("{} {}", self.bold(title), self.dim(&format!("({})", stats.date))));

        if stats.classes.is_empty() {
            lines.push(self.dim("  No budgets configured"));
        }
        for (class, class_stats) in &stats.classes {
            lines.push(self.format_class(class, class_stats));
        }
        if stats.classes.len() > 1 {
            lines.push(self.format_class("total", &stats.total));
        }

        lines.join("\n")
    }

    /// Formats one resource class line.
    pub fn format_class(&self, class: &str, stats: &ClassStats) -> String {
        let remaining_pct = 100.0 - percent_f64(stats.percentage);
        let bar = self.progress_bar(remaining_pct);
        let counts = format!("{}/{} used", stats.used, stats.quota);
        let left = self.color_for_percent(remaining_pct, &format!("{} left", stats.remaining));

        let mut line = format!("  {:<18} {} {:<14} {}", class, bar, counts, left);
        if stats.errors > 0 {
            line.push_str(&format!(
                " {}",
                self.yellow(&format!("({} error{})", stats.errors, plural(stats.errors)))
            ));
        }
        line
    }

    /// Formats pool counts followed by one line per key.
    pub fn format_keys(&self, stats: &PoolStats, keys: &[CredentialUsage]) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "{} {}",
            self.bold("YouTube keys"),
            self.dim(&format!(
                "({} total, {} active, {} inactive, {} exhausted)",
                stats.total, stats.active, stats.inactive, stats.exhausted
            ))
        ));

        if keys.is_empty() {
            lines.push(self.dim("  No keys configured; run `tubegate keys add <key>`"));
        }
        for key in keys {
            lines.push(self.format_key_header(key));
            lines.push(format!("  {}", self.format_class("", &key.usage.total).trim_start()));
        }

        lines.join("\n")
    }

    /// Formats a key list without usage bars.
    pub fn format_key_list(&self, keys: &[CredentialUsage]) -> String {
        if keys.is_empty() {
            return self.dim("No keys configured");
        }
        keys.iter()
            .map(|key| self.format_key_header(key))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_key_header(&self, key: &CredentialUsage) -> String {
        let marker = if key.current { self.cyan("*") } else { " ".to_string() };
        let state = match (&key.deactivated_on, key.active) {
            (Some(day), false) => self.red(&format!("parked since {day}")),
            (None, false) => self.red("inactive"),
            _ => self.green("active"),
        };
        format!(
            "{} {:<14} {:<16} {:<14} {} {}",
            marker,
            key.id,
            key.name,
            key.key,
            self.dim(&key.source.to_string()),
            state
        )
    }

    // ========================================================================
    // Health & Recommendation
    // ========================================================================

    /// Formats a health report.
    pub fn format_health(&self, title: &str, health: &Health) -> String {
        let status = match health.status {
            HealthStatus::Healthy => self.green(health.status.label()),
            HealthStatus::Degraded => self.yellow(health.status.label()),
            HealthStatus::Exhausted => self.red(health.status.label()),
        };

        let mut lines = vec![format!("{:<14} {}", self.bold(title), status)];
        for warning in &health.warnings {
            lines.push(format!("  {} {}", self.yellow("!"), warning));
        }
        if let Some(class) = &health.recommended {
            lines.push(format!("  Recommended: {}", self.cyan(class)));
        }
        lines.join("\n")
    }

    /// Formats a recommendation.
    pub fn format_recommendation(&self, recommendation: Option<&Recommendation>) -> String {
        let Some(rec) = recommendation else {
            return self.red("No budget left on any tier; wait for the daily reset");
        };
        match (&rec.tier, &rec.model) {
            (Some(tier), Some(model)) => format!(
                "Use {} ({}, class {})",
                self.bold(tier.as_str()),
                self.cyan(model),
                rec.resource_class
            ),
            _ => format!("Use class {}", self.bold(&rec.resource_class)),
        }
    }

    // ========================================================================
    // Resolution & Generation
    // ========================================================================

    /// Formats a resolved channel.
    pub fn format_channel(&self, resolved: &ResolvedChannel, units_spent: u64) -> String {
        let channel = &resolved.channel;
        let mut lines = vec![format!("{} {}", self.bold(&channel.title), self.dim(&channel.id))];
        if let Some(handle) = &channel.handle {
            lines.push(format!("Handle:      {}", self.cyan(handle)));
        }
        if let Some(subs) = channel.subscriber_count {
            lines.push(format!("Subscribers: {}", format_number(subs)));
        }
        if let Some(videos) = channel.video_count {
            lines.push(format!("Videos:      {}", format_number(videos)));
        }
        lines.push(self.dim(&format!(
            "Resolved via {} ({} unit{})",
            resolved.strategy_id,
            units_spent,
            plural(units_spent)
        )));
        lines.join("\n")
    }

    /// Formats one resolver attempt.
    pub fn format_attempt(&self, attempt: &ResolveAttempt) -> String {
        let status = match attempt.status {
            AttemptStatus::Hit => self.green("hit"),
            AttemptStatus::Miss => self.dim("miss"),
            AttemptStatus::Error => self.red("error"),
        };
        let mut line = format!(
            "  {:<10} {:<5} cost {:<4} {}",
            attempt.strategy_id,
            status,
            attempt.cost,
            attempt.credential_id.as_deref().unwrap_or("-")
        );
        if let Some(error) = &attempt.error {
            line.push_str(&format!(" {}", self.red(error)));
        }
        line
    }

    /// One-line note on which tier answered.
    pub fn format_tier_banner(&self, response: &TierResponse) -> String {
        let mut note = format!("{} ({})", response.tier.as_str(), response.model);
        if response.fallback_used {
            note.push_str(", primary quota exhausted");
        }
        if response.forced {
            note.push_str(", forced");
        }
        self.dim(&format!("[{note} in {} ms]", response.duration.as_millis()))
    }

    // ========================================================================
    // Config & Errors
    // ========================================================================

    /// Formats the effective configuration.
    pub fn format_config(&self, config: &GovernorConfig) -> String {
        let boundary = config.day_boundary();
        let mut lines = vec![self.bold("TubeGate Configuration"), "─".repeat(40)];
        lines.push(format!(
            "Primary:   {} (class {})",
            config.primary_model, config.primary_resource_class
        ));
        lines.push(format!(
            "Fallback:  {} (class {}){}",
            config.fallback_model,
            config.fallback_resource_class,
            if config.enable_fallback { "" } else { " [disabled]" }
        ));
        lines.push(format!(
            "Day reset: {:02}:{:02} UTC{:+03}:{:02}",
            boundary.hour,
            boundary.minute,
            boundary.utc_offset_minutes / 60,
            (boundary.utc_offset_minutes % 60).abs()
        ));
        lines.push(format!("Retention: {} days", config.retention_days));
        lines.push("Budgets:".to_string());
        for (class, budget) in &config.budgets {
            lines.push(format!("  {class:<18} {budget}"));
        }
        lines.push(format!("Data dir:  {}", config.data_dir().display()));
        lines.join("\n")
    }

    /// Formats a structured error.
    pub fn format_error(&self, report: &ErrorReport) -> String {
        format!(
            "{} {}: {}\n  {}",
            self.red("Error"),
            self.dim(report.kind.as_str()),
            report.message,
            report.suggestion
        )
    }

    // ========================================================================
    // Bars
    // ========================================================================

    /// Formats a progress bar.
    pub fn progress_bar(&self, percent_remaining: f64) -> String {
        let fraction = (percent_remaining / 100.0).clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let filled = (fraction * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_percent(percent_remaining, &bar)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent_f64(percent: u64) -> f64 {
    percent.min(100) as f64
}

fn plural(n: u64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Compact number: 1.2K, 3.4M.
#[allow(clippy::cast_precision_loss)]
pub fn format_number(n: u64) -> String {
    let n = n as f64;
    if n >= 1_000_000.0 {
        format!("{:.1}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.1}K", n / 1_000.0)
    } else {
        format!("{n:.0}")
    }
}
