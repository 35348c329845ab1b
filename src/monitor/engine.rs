use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use crate::config::{MonitorConfig, NotifierKind};

use super::notifier::{IncidentNotifier, LogNotifier, NoopNotifier};
use super::rules;
use super::types::{
    ClassificationResult, Incident, ParsedPayload, ThresholdTable, TransactionSummary,
};

/// Classifies transaction windows against a fixed threshold table.
/// Holds no mutable state; share it behind an `Arc`.
pub struct RateClassifier {
    thresholds: ThresholdTable,
    notifier: Arc<dyn IncidentNotifier>,
}

impl RateClassifier {
    pub fn new(thresholds: ThresholdTable, notifier: Arc<dyn IncidentNotifier>) -> Self {
        Self {
            thresholds,
            notifier,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        let notifier: Arc<dyn IncidentNotifier> = match config.notifier.kind {
            NotifierKind::Log => Arc::new(LogNotifier),
            NotifierKind::None => Arc::new(NoopNotifier),
        };
        Self::new(config.thresholds, notifier)
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Classify one window. Rules run in a fixed order (failed, denied,
    /// reversed) so the alert list is deterministic.
    pub fn classify(&self, summary: &TransactionSummary) -> ClassificationResult {
        if summary.total_transactions == 0 {
            return ClassificationResult::low_volume();
        }

        let mut violations = Vec::new();

        // Rule 1: failed rate
        if let Some(violation) = rules::check_failed_rate(summary, &self.thresholds) {
            violations.push(violation);
        }

        // Rule 2: denied rate
        if let Some(violation) = rules::check_denied_rate(summary, &self.thresholds) {
            violations.push(violation);
        }

        // Rule 3: reversed rate
        if let Some(violation) = rules::check_reversed_rate(summary, &self.thresholds) {
            violations.push(violation);
        }

        if violations.is_empty() {
            return ClassificationResult::normal();
        }

        let result = ClassificationResult::incident(&violations);

        let incident = Incident {
            summary: *summary,
            violations,
            detected_at: Utc::now(),
        };
        self.deliver(&incident);

        result
    }

    /// Deliver an incident without letting an error or a panic in the
    /// notifier reach the caller.
    fn deliver(&self, incident: &Incident) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.notifier.notify(incident))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Incident notification failed, result unaffected");
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(%reason, "Incident notifier panicked, result unaffected");
            }
        }
    }

    /// Validate a raw JSON payload and classify it. Validation failures map
    /// to the `ERROR` result instead of propagating.
    pub fn classify_payload(&self, payload: &JsonValue) -> ClassificationResult {
        match TransactionSummary::from_json(payload) {
            Ok(ParsedPayload::ZeroVolume) => ClassificationResult::low_volume(),
            Ok(ParsedPayload::Summary(summary)) => self.classify(&summary),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected transaction payload");
                ClassificationResult::invalid_data()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::types::{Status, LOW_VOLUME, NORMAL_OPERATION, P0_INCIDENT_TRIGGERED};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        incidents: Mutex<Vec<Incident>>,
    }

    impl IncidentNotifier for RecordingNotifier {
        fn notify(&self, incident: &Incident) -> eyre::Result<()> {
            self.incidents.lock().unwrap().push(incident.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl IncidentNotifier for FailingNotifier {
        fn notify(&self, _incident: &Incident) -> eyre::Result<()> {
            Err(eyre::eyre!("pager unreachable"))
        }
    }

    struct PanickingNotifier;

    impl IncidentNotifier for PanickingNotifier {
        fn notify(&self, _incident: &Incident) -> eyre::Result<()> {
            panic!("pager client crashed");
        }
    }

    fn classifier() -> RateClassifier {
        RateClassifier::new(ThresholdTable::default(), Arc::new(NoopNotifier))
    }

    fn summary(total: u64, failed: u64, denied: u64, reversed: u64) -> TransactionSummary {
        TransactionSummary {
            total_transactions: total,
            failed_count: failed,
            denied_count: denied,
            reversed_count: reversed,
        }
    }

    #[test]
    fn test_high_failure_alert() {
        let result = classifier().classify(&summary(100, 5, 0, 0));
        assert_eq!(result.status, Status::Alert);
        assert_eq!(result.recommendation, P0_INCIDENT_TRIGGERED);
        assert_eq!(
            result.alerts,
            vec!["HIGH_FAILURE: Rate (5.00%) exceeded threshold (3.00%).".to_string()]
        );
    }

    #[test]
    fn test_within_thresholds_is_ok() {
        let result = classifier().classify(&summary(100, 1, 2, 0));
        assert_eq!(result.status, Status::Ok);
        assert_eq!(result.recommendation, NORMAL_OPERATION);
        assert!(result.alerts.is_empty());
    }

    #[test]
    fn test_zero_volume() {
        let result = classifier().classify(&summary(0, 0, 0, 0));
        assert_eq!(result, ClassificationResult::low_volume());
        assert_eq!(result.recommendation, LOW_VOLUME);
    }

    #[test]
    fn test_non_numeric_field_is_error() {
        let result = classifier().classify_payload(&json!({
            "total_transactions": 100,
            "failed_count": "x",
            "denied_count": 0,
            "reversed_count": 0,
        }));
        assert_eq!(result, ClassificationResult::invalid_data());
    }

    #[test]
    fn test_integral_float_counts_are_classified() {
        let result = classifier().classify_payload(&json!({
            "total_transactions": 100.0,
            "failed_count": 5.0,
            "denied_count": 0,
            "reversed_count": 0,
        }));
        assert_eq!(result.status, Status::Alert);
        assert_eq!(
            result.alerts,
            vec!["HIGH_FAILURE: Rate (5.00%) exceeded threshold (3.00%).".to_string()]
        );

        let result = classifier().classify_payload(&json!({
            "total_transactions": 100,
            "failed_count": 10.5,
            "denied_count": 0,
            "reversed_count": 0,
        }));
        assert_eq!(result, ClassificationResult::invalid_data());
    }

    #[test]
    fn test_missing_field_is_error() {
        let result = classifier().classify_payload(&json!({
            "total_transactions": 100,
            "failed_count": 1,
            "denied_count": 0,
        }));
        assert_eq!(result.status, Status::Error);
        assert_eq!(result.alerts, vec!["Input data is malformed.".to_string()]);
    }

    #[test]
    fn test_all_three_alerts_in_order() {
        let result = classifier().classify(&summary(1000, 40, 90, 10));
        assert_eq!(result.status, Status::Alert);
        assert_eq!(
            result.alerts,
            vec![
                "HIGH_FAILURE: Rate (4.00%) exceeded threshold (3.00%).".to_string(),
                "HIGH_DENIAL: Rate (9.00%) exceeded threshold (8.00%).".to_string(),
                "HIGH_REVERSED: Rate (1.00%) exceeded threshold (0.80%).".to_string(),
            ]
        );
    }

    #[test]
    fn test_failure_precedes_other_alerts() {
        let result = classifier().classify(&summary(200, 20, 40, 0));
        assert_eq!(result.alerts.len(), 2);
        assert!(result.alerts[0].starts_with("HIGH_FAILURE"));
        assert!(result.alerts[1].starts_with("HIGH_DENIAL"));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let classifier = classifier();
        let input = summary(1000, 40, 90, 10);
        assert_eq!(classifier.classify(&input), classifier.classify(&input));
    }

    #[test]
    fn test_payload_zero_total_is_low_volume() {
        let result = classifier().classify_payload(&json!({
            "total_transactions": 0,
            "failed_count": 0,
            "denied_count": 0,
            "reversed_count": 0,
        }));
        assert_eq!(result, ClassificationResult::low_volume());
    }

    #[test]
    fn test_notifier_called_only_on_alert() {
        let notifier = Arc::new(RecordingNotifier::default());
        let classifier = RateClassifier::new(ThresholdTable::default(), notifier.clone());

        classifier.classify(&summary(100, 1, 2, 0));
        classifier.classify(&summary(0, 0, 0, 0));
        classifier.classify_payload(&json!({"total_transactions": "x"}));
        assert!(notifier.incidents.lock().unwrap().is_empty());

        classifier.classify(&summary(1000, 40, 90, 10));
        let incidents = notifier.incidents.lock().unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].violations.len(), 3);
        assert_eq!(incidents[0].summary.total_transactions, 1000);
    }

    #[test]
    fn test_failing_notifier_does_not_change_result() {
        let failing = RateClassifier::new(ThresholdTable::default(), Arc::new(FailingNotifier));
        let input = summary(100, 5, 0, 0);
        assert_eq!(failing.classify(&input), classifier().classify(&input));
    }

    #[test]
    fn test_panicking_notifier_does_not_change_result() {
        let panicking =
            RateClassifier::new(ThresholdTable::default(), Arc::new(PanickingNotifier));
        let input = summary(100, 5, 0, 0);
        let result = panicking.classify(&input);
        assert_eq!(result, classifier().classify(&input));
        assert_eq!(result.status, Status::Alert);

        // The classifier stays usable after a notifier panic
        let payload = json!({
            "total_transactions": 1000,
            "failed_count": 40,
            "denied_count": 90,
            "reversed_count": 10,
        });
        assert_eq!(panicking.classify_payload(&payload).alerts.len(), 3);
    }

    #[test]
    fn test_from_config_uses_configured_thresholds() {
        let mut config = MonitorConfig::default();
        config.thresholds.failed_rate_threshold = 0.5;
        let classifier = RateClassifier::from_config(&config);
        assert_eq!(classifier.thresholds().failed_rate_threshold, 0.5);
        assert_eq!(
            classifier.classify(&summary(100, 5, 0, 0)).status,
            Status::Ok
        );
    }
}
