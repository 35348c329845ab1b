pub mod chart;
pub mod checkout;
pub mod failures;

use crate::config::AnalysisConfig;
use crate::monitor::types::ThresholdTable;

use checkout::{largest_drops, load_hourly_sales, report_drops, sort_by_hour};
use failures::{failure_rate_proxy, load_hourly_failures};

/// Offline report over the two checkout snapshots: rank the largest drops
/// against the weekly average in each, chart the primary snapshot's sales,
/// then chart the hourly failure rate against the failed-rate threshold.
pub fn run(config: &AnalysisConfig, thresholds: &ThresholdTable) -> eyre::Result<()> {
    let mut primary = load_hourly_sales(&config.primary_csv)?;
    sort_by_hour(&mut primary)?;
    report_drops(
        "Primary checkout: largest drops vs. weekly average",
        &largest_drops(&primary, config.primary_top_n),
    );

    let mut secondary = load_hourly_sales(&config.secondary_csv)?;
    report_drops(
        "Secondary checkout: largest drops vs. weekly average",
        &largest_drops(&secondary, config.secondary_top_n),
    );

    let sales_chart =
        chart::render_sales_chart(&primary, &config.highlights, &config.chart_title)?;
    chart::write_chart(&config.chart_path, &sales_chart)?;

    let failure_rate = &config.failure_rate;
    let points = match &failure_rate.failures_csv {
        Some(path) => load_hourly_failures(path)?,
        None => {
            sort_by_hour(&mut secondary)?;
            tracing::info!(
                baseline = failure_rate.baseline_failure_rate,
                "No failures CSV configured, deriving failure rate from secondary checkout volume"
            );
            failure_rate_proxy(&secondary, failure_rate.baseline_failure_rate)
        }
    };
    let threshold = thresholds.failed_rate_threshold;
    let above = points.iter().filter(|p| p.failure_rate > threshold).count();
    tracing::info!(
        hours = points.len(),
        above_threshold = above,
        threshold,
        "Failure rate compared against alert threshold"
    );

    let failure_chart = chart::render_failure_rate_chart(
        &points,
        threshold,
        &failure_rate.highlights,
        &failure_rate.chart_title,
    )?;
    chart::write_chart(&failure_rate.chart_path, &failure_chart)
}
