use serde::Deserialize;
use std::io::Read;

use super::checkout::HourlySales;

/// Failure rate observed in one hour, as a fraction of transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRatePoint {
    pub time: String,
    pub failure_rate: f64,
}

#[derive(Debug, Deserialize)]
struct HourlyFailures {
    time: String,
    total_transactions: u64,
    failed_count: u64,
}

/// Parse `time,total_transactions,failed_count` rows. An hour with no
/// transactions has a rate of zero.
pub fn parse_hourly_failures<R: Read>(reader: R) -> eyre::Result<Vec<FailureRatePoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points = Vec::new();
    for result in reader.deserialize() {
        let row: HourlyFailures =
            result.map_err(|e| eyre::eyre!("Failed to parse failure row: {}", e))?;
        let failure_rate = if row.total_transactions == 0 {
            0.0
        } else {
            row.failed_count as f64 / row.total_transactions as f64
        };
        points.push(FailureRatePoint {
            time: row.time,
            failure_rate,
        });
    }
    Ok(points)
}

pub fn load_hourly_failures(path: &str) -> eyre::Result<Vec<FailureRatePoint>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("Failed to open failures CSV '{}': {}", path, e))?;
    let points = parse_hourly_failures(file)
        .map_err(|e| eyre::eyre!("Failed to load failures CSV '{}': {}", path, e))?;
    tracing::info!(path, hours = points.len(), "Loaded failures CSV");
    Ok(points)
}

/// Stand-in failure rate when no failure counts are available: the baseline
/// rate scaled by a tenth of each hour's sales z-score.
pub fn failure_rate_proxy(rows: &[HourlySales], baseline: f64) -> Vec<FailureRatePoint> {
    let n = rows.len() as f64;
    let mean = rows.iter().map(|row| row.today).sum::<f64>() / n;
    // Sample standard deviation
    let std_dev = if rows.len() > 1 {
        let variance = rows
            .iter()
            .map(|row| (row.today - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    rows.iter()
        .map(|row| {
            let z = if std_dev > 0.0 {
                (row.today - mean) / std_dev
            } else {
                0.0
            };
            FailureRatePoint {
                time: row.time.clone(),
                failure_rate: (baseline * (1.0 + z * 0.1)).max(0.0),
            }
        })
        .collect()
}
