use serde::Deserialize;
use std::path::Path;

use crate::monitor::types::ThresholdTable;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

// ============================================================
// Monitor Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub thresholds: ThresholdTable,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Log,
    None,
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            host: default_api_host(),
        }
    }
}

fn default_api_port() -> u16 {
    5000
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

// ============================================================
// Analysis Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_primary_csv")]
    pub primary_csv: String,
    #[serde(default = "default_secondary_csv")]
    pub secondary_csv: String,
    #[serde(default = "default_primary_top_n")]
    pub primary_top_n: usize,
    #[serde(default = "default_secondary_top_n")]
    pub secondary_top_n: usize,
    #[serde(default = "default_chart_path")]
    pub chart_path: String,
    #[serde(default = "default_chart_title")]
    pub chart_title: String,
    #[serde(default = "default_highlights")]
    pub highlights: Vec<HighlightConfig>,
    #[serde(default)]
    pub failure_rate: FailureRateChartConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            primary_csv: default_primary_csv(),
            secondary_csv: default_secondary_csv(),
            primary_top_n: default_primary_top_n(),
            secondary_top_n: default_secondary_top_n(),
            chart_path: default_chart_path(),
            chart_title: default_chart_title(),
            highlights: default_highlights(),
            failure_rate: FailureRateChartConfig::default(),
        }
    }
}

fn default_primary_csv() -> String {
    "checkout_1.csv".to_string()
}

fn default_secondary_csv() -> String {
    "checkout_2.csv".to_string()
}

fn default_primary_top_n() -> usize {
    3
}

fn default_secondary_top_n() -> usize {
    5
}

fn default_chart_path() -> String {
    "sales_anomaly_chart.svg".to_string()
}

fn default_chart_title() -> String {
    "POS Sales by Hour: Today vs. Historical Baselines".to_string()
}

/// Hourly failure rate against the alert threshold. Rates come from
/// `failures_csv` (`time,total_transactions,failed_count`) when set, otherwise
/// from a proxy derived from the secondary checkout's sales volume.
#[derive(Debug, Deserialize, Clone)]
pub struct FailureRateChartConfig {
    pub failures_csv: Option<String>,
    #[serde(default = "default_baseline_failure_rate")]
    pub baseline_failure_rate: f64,
    #[serde(default = "default_failure_chart_path")]
    pub chart_path: String,
    #[serde(default = "default_failure_chart_title")]
    pub chart_title: String,
    #[serde(default = "default_failure_highlights")]
    pub highlights: Vec<HighlightConfig>,
}

impl Default for FailureRateChartConfig {
    fn default() -> Self {
        Self {
            failures_csv: None,
            baseline_failure_rate: default_baseline_failure_rate(),
            chart_path: default_failure_chart_path(),
            chart_title: default_failure_chart_title(),
            highlights: default_failure_highlights(),
        }
    }
}

fn default_baseline_failure_rate() -> f64 {
    0.02
}

fn default_failure_chart_path() -> String {
    "realtime_monitoring_chart.svg".to_string()
}

fn default_failure_chart_title() -> String {
    "Real-Time Alerting: Failure Rate vs. Alert Threshold".to_string()
}

fn default_failure_highlights() -> Vec<HighlightConfig> {
    vec![HighlightConfig {
        start: "08h".to_string(),
        end: "10h".to_string(),
        label: "Failure Rate Anomaly".to_string(),
        color: default_highlight_color(),
        opacity: default_highlight_opacity(),
    }]
}

/// A shaded range of hours on a chart.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HighlightConfig {
    pub start: String,
    pub end: String,
    pub label: String,
    #[serde(default = "default_highlight_color")]
    pub color: String,
    #[serde(default = "default_highlight_opacity")]
    pub opacity: f64,
}

fn default_highlight_color() -> String {
    "yellow".to_string()
}

fn default_highlight_opacity() -> f64 {
    0.3
}

fn default_highlights() -> Vec<HighlightConfig> {
    vec![
        HighlightConfig {
            start: "07h".to_string(),
            end: "10h".to_string(),
            label: "Morning Anomaly Region".to_string(),
            color: "yellow".to_string(),
            opacity: 0.3,
        },
        HighlightConfig {
            start: "14h".to_string(),
            end: "18h".to_string(),
            label: "Afternoon Anomaly Region".to_string(),
            color: "orange".to_string(),
            opacity: 0.2,
        },
    ]
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &str) -> eyre::Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::info!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> eyre::Result<()> {
        let t = &self.monitor.thresholds;
        for (name, value) in [
            ("failed_rate_threshold", t.failed_rate_threshold),
            ("denied_rate_threshold", t.denied_rate_threshold),
            ("reversed_rate_threshold", t.reversed_rate_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(eyre::eyre!(
                    "Threshold '{}' must be a rate in (0, 1], got {}",
                    name,
                    value
                ));
            }
        }
        let failure_rate = &self.analysis.failure_rate;
        if !(0.0..=1.0).contains(&failure_rate.baseline_failure_rate) {
            return Err(eyre::eyre!(
                "Baseline failure rate must be within [0, 1], got {}",
                failure_rate.baseline_failure_rate
            ));
        }
        for highlight in self
            .analysis
            .highlights
            .iter()
            .chain(&failure_rate.highlights)
        {
            if !(0.0..=1.0).contains(&highlight.opacity) {
                return Err(eyre::eyre!(
                    "Highlight '{}' opacity must be within [0, 1], got {}",
                    highlight.label,
                    highlight.opacity
                ));
            }
        }
        Ok(())
    }
}
