//! CLI output formatting tests.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::{TextFormatter, format_number};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tubegate_core::{
        ClassStats, ErrorKind, ErrorReport, GovernorConfig, Health, HealthStatus, ModelTier,
        UsageStats,
    };
    use tubegate_fetch::{
        AttemptStatus, Channel, Recommendation, ResolveAttempt, ResolvedChannel, TierResponse,
    };

    #[test]
    fn test_progress_bar_boundary_values() {
        let formatter = TextFormatter::new(false);

        let test_cases = vec![
            (0.0, "░░░░░░░░░░"),
            (10.0, "█░░░░░░░░░"),
            (50.0, "█████░░░░░"),
            (100.0, "██████████"),
            (-5.0, "░░░░░░░░░░"),
        ];

        for (percent, expected) in test_cases {
            assert_eq!(formatter.progress_bar(percent), expected, "Failed for {percent}%");
        }
    }

    #[test]
    fn test_progress_bar_with_colors() {
        let formatter = TextFormatter::new(true);
        assert!(formatter.progress_bar(10.0).contains("\x1b[31m"), "Should be red for <20%");
        assert!(formatter.progress_bar(30.0).contains("\x1b[33m"), "Should be yellow for <50%");
        assert!(formatter.progress_bar(80.0).contains("\x1b[32m"), "Should be green otherwise");
    }

    #[test]
    fn test_format_usage_lists_classes() {
        let formatter = TextFormatter::new(false);
        let stats = UsageStats {
            date: "2025-06-01".to_string(),
            classes: BTreeMap::from([
                ("flash".to_string(), ClassStats::new(25, 250, 0)),
                ("pro".to_string(), ClassStats::new(45, 50, 2)),
            ]),
            total: ClassStats::new(70, 300, 2),
            last_updated: None,
        };

        let output = formatter.format_usage("Model tiers", &stats);
        assert!(output.contains("Model tiers (2025-06-01)"));
        assert!(output.contains("45/50 used"));
        assert!(output.contains("5 left"));
        assert!(output.contains("(2 errors)"));
        assert!(output.contains("total"));
    }

    #[test]
    fn test_format_health_with_warnings() {
        let formatter = TextFormatter::new(false);
        let health = Health {
            status: HealthStatus::Degraded,
            warnings: vec!["pro: 45/50 used (90%)".to_string()],
            recommended: Some("pro".to_string()),
        };

        let output = formatter.format_health("Model tiers", &health);
        assert!(output.contains("Degraded"));
        assert!(output.contains("! pro: 45/50 used (90%)"));
        assert!(output.contains("Recommended: pro"));
    }

    #[test]
    fn test_format_recommendation() {
        let formatter = TextFormatter::new(false);
        let rec = Recommendation {
            resource_class: "flash".to_string(),
            tier: Some(ModelTier::Fallback),
            model: Some("gemini-2.5-flash".to_string()),
        };
        assert_eq!(
            formatter.format_recommendation(Some(&rec)),
            "Use fallback (gemini-2.5-flash, class flash)"
        );
        assert!(formatter.format_recommendation(None).contains("No budget left"));
    }

    #[test]
    fn test_format_channel() {
        let formatter = TextFormatter::new(false);
        let mut channel = Channel::new("UC_x5XG1OV2P6uZZ5FSM9Ttw", "Google for Developers");
        channel.subscriber_count = Some(2_460_000);
        let resolved = ResolvedChannel {
            channel,
            strategy_id: "handle".to_string(),
            identifier: "@GoogleDevelopers".to_string(),
        };

        let output = formatter.format_channel(&resolved, 1);
        assert!(output.starts_with("Google for Developers UC_x5XG1OV2P6uZZ5FSM9Ttw"));
        assert!(output.contains("Subscribers: 2.5M"));
        assert!(output.contains("Resolved via handle (1 unit)"));
    }

    #[test]
    fn test_format_attempt_error() {
        let formatter = TextFormatter::new(false);
        let attempt = ResolveAttempt {
            strategy_id: "search".to_string(),
            credential_id: Some("key-1234abcd".to_string()),
            cost: 0,
            status: AttemptStatus::Error,
            error: Some("HTTP 403: quotaExceeded".to_string()),
            duration: Duration::from_millis(5),
        };
        let output = formatter.format_attempt(&attempt);
        assert!(output.contains("search"));
        assert!(output.contains("key-1234abcd"));
        assert!(output.contains("HTTP 403: quotaExceeded"));
    }

    #[test]
    fn test_format_tier_banner() {
        let formatter = TextFormatter::new(false);
        let response = TierResponse {
            output: "ok".to_string(),
            tier: ModelTier::Fallback,
            model: "gemini-2.5-flash".to_string(),
            fallback_used: true,
            forced: false,
            duration: Duration::from_millis(120),
        };
        assert_eq!(
            formatter.format_tier_banner(&response),
            "[fallback (gemini-2.5-flash), primary quota exhausted in 120 ms]"
        );
    }

    #[test]
    fn test_format_config_shows_boundary() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_config(&GovernorConfig::default());
        assert!(output.contains("Day reset: 16:00 UTC+09:00"));
        assert!(output.contains("youtube-data-api"));
    }

    #[test]
    fn test_format_error() {
        let formatter = TextFormatter::new(false);
        let report = ErrorReport::new(ErrorKind::NoCredentialAvailable, "no key");
        let output = formatter.format_error(&report);
        assert!(output.starts_with("Error no_credential_available: no key"));
        assert!(output.contains("add a key"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_500), "1.5K");
        assert_eq!(format_number(2_460_000), "2.5M");
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use tubegate_core::{ErrorKind, ErrorReport};

    #[test]
    fn test_compact_and_pretty() {
        let report = ErrorReport::new(ErrorKind::QuotaExceeded, "quota");

        let compact = JsonFormatter::new(false).format(&report).unwrap();
        assert!(!compact.contains('\n'));
        assert!(compact.contains(r#""type":"quota_exceeded""#));

        let pretty = JsonFormatter::new(true).format(&report).unwrap();
        assert!(pretty.contains('\n'));
    }
}
