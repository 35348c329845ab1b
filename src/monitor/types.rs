use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Recommendation returned when the window saw no transactions.
pub const LOW_VOLUME: &str = "LOW_VOLUME";
/// Recommendation returned when at least one rate crossed its threshold.
pub const P0_INCIDENT_TRIGGERED: &str = "P0_INCIDENT_TRIGGERED";
/// Recommendation returned for payloads that fail validation.
pub const INVALID_DATA: &str = "INVALID_DATA";
/// Recommendation returned when every rate is within its threshold.
pub const NORMAL_OPERATION: &str = "System is operating within normal parameters.";
/// The single alert message attached to an `ERROR` result.
pub const MALFORMED_INPUT_ALERT: &str = "Input data is malformed.";

/// Aggregate counters for one monitoring window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionSummary {
    pub total_transactions: u64,
    pub failed_count: u64,
    pub denied_count: u64,
    pub reversed_count: u64,
}

/// Why a raw payload could not be turned into a [`TransactionSummary`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SummaryError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` is not a non-negative integer")]
    NotACount(&'static str),
}

/// Result of validating a raw payload. A zero total short-circuits before the
/// remaining counters are inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPayload {
    ZeroVolume,
    Summary(TransactionSummary),
}

impl TransactionSummary {
    /// Validate a JSON payload. Missing fields are rejected rather than
    /// defaulted to zero.
    pub fn from_json(payload: &JsonValue) -> Result<ParsedPayload, SummaryError> {
        let object = payload.as_object().ok_or(SummaryError::NotAnObject)?;

        let field = |name: &'static str| -> Result<u64, SummaryError> {
            let value = object.get(name).ok_or(SummaryError::MissingField(name))?;
            as_count(value).ok_or(SummaryError::NotACount(name))
        };

        let total_transactions = field("total_transactions")?;
        if total_transactions == 0 {
            return Ok(ParsedPayload::ZeroVolume);
        }

        Ok(ParsedPayload::Summary(Self {
            total_transactions,
            failed_count: field("failed_count")?,
            denied_count: field("denied_count")?,
            reversed_count: field("reversed_count")?,
        }))
    }
}

/// A non-negative integral JSON number. Integral floats such as `100.0`
/// are accepted; fractional or negative values are not.
fn as_count(value: &JsonValue) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    let float = value.as_f64()?;
    if float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64 {
        Some(float as u64)
    } else {
        None
    }
}

/// The metrics a summary is checked against, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateMetric {
    Failed,
    Denied,
    Reversed,
}

impl RateMetric {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Failed => "HIGH_FAILURE",
            Self::Denied => "HIGH_DENIAL",
            Self::Reversed => "HIGH_REVERSED",
        }
    }

    /// The counter this metric divides by the window total.
    pub fn count(&self, summary: &TransactionSummary) -> u64 {
        match self {
            Self::Failed => summary.failed_count,
            Self::Denied => summary.denied_count,
            Self::Reversed => summary.reversed_count,
        }
    }
}

/// Rate thresholds, each a fraction of total transactions.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThresholdTable {
    #[serde(default = "default_failed_rate")]
    pub failed_rate_threshold: f64,
    #[serde(default = "default_denied_rate")]
    pub denied_rate_threshold: f64,
    #[serde(default = "default_reversed_rate")]
    pub reversed_rate_threshold: f64,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            failed_rate_threshold: default_failed_rate(),
            denied_rate_threshold: default_denied_rate(),
            reversed_rate_threshold: default_reversed_rate(),
        }
    }
}

fn default_failed_rate() -> f64 {
    0.03
}

fn default_denied_rate() -> f64 {
    0.08
}

fn default_reversed_rate() -> f64 {
    0.008
}

impl ThresholdTable {
    pub fn for_metric(&self, metric: RateMetric) -> f64 {
        match metric {
            RateMetric::Failed => self.failed_rate_threshold,
            RateMetric::Denied => self.denied_rate_threshold,
            RateMetric::Reversed => self.reversed_rate_threshold,
        }
    }
}

/// A single rate that exceeded its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateViolation {
    pub metric: RateMetric,
    pub rate: f64,
    pub threshold: f64,
}

impl RateViolation {
    /// Human-readable alert line, rates rendered as percentages.
    pub fn message(&self) -> String {
        format!(
            "{}: Rate ({:.2}%) exceeded threshold ({:.2}%).",
            self.metric.label(),
            self.rate * 100.0,
            self.threshold * 100.0
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Alert,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Alert => "ALERT",
            Self::Error => "ERROR",
        }
    }
}

/// Outcome of classifying one summary. Serializes to the wire response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub status: Status,
    pub recommendation: String,
    pub alerts: Vec<String>,
}

impl ClassificationResult {
    pub fn low_volume() -> Self {
        Self {
            status: Status::Ok,
            recommendation: LOW_VOLUME.to_string(),
            alerts: Vec::new(),
        }
    }

    pub fn normal() -> Self {
        Self {
            status: Status::Ok,
            recommendation: NORMAL_OPERATION.to_string(),
            alerts: Vec::new(),
        }
    }

    pub fn invalid_data() -> Self {
        Self {
            status: Status::Error,
            recommendation: INVALID_DATA.to_string(),
            alerts: vec![MALFORMED_INPUT_ALERT.to_string()],
        }
    }

    pub fn incident(violations: &[RateViolation]) -> Self {
        Self {
            status: Status::Alert,
            recommendation: P0_INCIDENT_TRIGGERED.to_string(),
            alerts: violations.iter().map(RateViolation::message).collect(),
        }
    }
}

/// What the incident notifier receives when a window is classified `ALERT`.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub summary: TransactionSummary,
    pub violations: Vec<RateViolation>,
    pub detected_at: DateTime<Utc>,
}
