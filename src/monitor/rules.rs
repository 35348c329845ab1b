use super::types::{RateMetric, RateViolation, ThresholdTable, TransactionSummary};

/// Fraction of the window's transactions that fell into `metric`.
/// Callers must rule out a zero total first.
pub fn rate(summary: &TransactionSummary, metric: RateMetric) -> f64 {
    metric.count(summary) as f64 / summary.total_transactions as f64
}

/// Check one metric. A rate equal to its threshold does not alert.
pub fn check_rate(
    summary: &TransactionSummary,
    metric: RateMetric,
    thresholds: &ThresholdTable,
) -> Option<RateViolation> {
    let rate = rate(summary, metric);
    let threshold = thresholds.for_metric(metric);

    if rate > threshold {
        return Some(RateViolation {
            metric,
            rate,
            threshold,
        });
    }

    None
}

pub fn check_failed_rate(
    summary: &TransactionSummary,
    thresholds: &ThresholdTable,
) -> Option<RateViolation> {
    check_rate(summary, RateMetric::Failed, thresholds)
}

pub fn check_denied_rate(
    summary: &TransactionSummary,
    thresholds: &ThresholdTable,
) -> Option<RateViolation> {
    check_rate(summary, RateMetric::Denied, thresholds)
}

pub fn check_reversed_rate(
    summary: &TransactionSummary,
    thresholds: &ThresholdTable,
) -> Option<RateViolation> {
    check_rate(summary, RateMetric::Reversed, thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total: u64, failed: u64, denied: u64, reversed: u64) -> TransactionSummary {
        TransactionSummary {
            total_transactions: total,
            failed_count: failed,
            denied_count: denied,
            reversed_count: reversed,
        }
    }

    #[test]
    fn test_rate_at_threshold_does_not_alert() {
        let thresholds = ThresholdTable::default();
        assert!(check_failed_rate(&summary(100, 3, 0, 0), &thresholds).is_none());
        assert!(check_denied_rate(&summary(100, 0, 8, 0), &thresholds).is_none());
        assert!(check_reversed_rate(&summary(1000, 0, 0, 8), &thresholds).is_none());
    }

    #[test]
    fn test_rate_above_threshold_alerts() {
        let thresholds = ThresholdTable::default();
        let violation = check_failed_rate(&summary(100, 5, 0, 0), &thresholds).unwrap();
        assert_eq!(violation.metric, RateMetric::Failed);
        assert!((violation.rate - 0.05).abs() < 1e-12);
        assert_eq!(violation.threshold, 0.03);

        assert!(check_denied_rate(&summary(100, 0, 9, 0), &thresholds).is_some());
        assert!(check_reversed_rate(&summary(1000, 0, 0, 9), &thresholds).is_some());
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = ThresholdTable {
            failed_rate_threshold: 0.10,
            ..ThresholdTable::default()
        };
        assert!(check_failed_rate(&summary(100, 5, 0, 0), &thresholds).is_none());
        assert!(check_failed_rate(&summary(100, 11, 0, 0), &thresholds).is_some());
    }

    #[test]
    fn test_counts_above_total_still_compute() {
        let thresholds = ThresholdTable::default();
        let violation = check_failed_rate(&summary(10, 20, 0, 0), &thresholds).unwrap();
        assert_eq!(violation.rate, 2.0);
    }
}
