use serde::Deserialize;
use std::io::Read;

/// One hour of POS sales counters from a checkout CSV snapshot.
/// Columns other than these (e.g. `same_day_last_week`) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HourlySales {
    pub time: String,
    pub today: f64,
    pub yesterday: f64,
    pub avg_last_week: f64,
    #[serde(skip)]
    pub deviation_vs_avg_week: f64,
}

impl HourlySales {
    pub fn new(time: &str, today: f64, yesterday: f64, avg_last_week: f64) -> Self {
        Self {
            time: time.to_string(),
            today,
            yesterday,
            avg_last_week,
            deviation_vs_avg_week: today - avg_last_week,
        }
    }

    /// Hour of day parsed from labels like `"08h"`.
    pub fn hour(&self) -> eyre::Result<u32> {
        self.time
            .trim()
            .trim_end_matches('h')
            .parse::<u32>()
            .map_err(|e| eyre::eyre!("Invalid hour label '{}': {}", self.time, e))
    }
}

/// Parse checkout rows from any reader and derive each row's deviation.
pub fn parse_hourly_sales<R: Read>(reader: R) -> eyre::Result<Vec<HourlySales>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let mut row: HourlySales =
            result.map_err(|e| eyre::eyre!("Failed to parse checkout row: {}", e))?;
        row.deviation_vs_avg_week = row.today - row.avg_last_week;
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_hourly_sales(path: &str) -> eyre::Result<Vec<HourlySales>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("Failed to open checkout CSV '{}': {}", path, e))?;
    let rows = parse_hourly_sales(file)
        .map_err(|e| eyre::eyre!("Failed to load checkout CSV '{}': {}", path, e))?;
    tracing::info!(path, rows = rows.len(), "Loaded checkout CSV");
    Ok(rows)
}

/// Order rows chronologically by hour label.
pub fn sort_by_hour(rows: &mut [HourlySales]) -> eyre::Result<()> {
    let mut keyed = rows
        .iter()
        .map(|row| row.hour().map(|hour| (hour, row.clone())))
        .collect::<eyre::Result<Vec<_>>>()?;
    keyed.sort_by_key(|(hour, _)| *hour);
    for (slot, (_, row)) in rows.iter_mut().zip(keyed) {
        *slot = row;
    }
    Ok(())
}

/// The `n` rows furthest below the weekly average, largest drop first.
/// Ties keep their input order.
pub fn largest_drops(rows: &[HourlySales], n: usize) -> Vec<HourlySales> {
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| a.deviation_vs_avg_week.total_cmp(&b.deviation_vs_avg_week));
    ranked.truncate(n);
    ranked
}

/// Log a ranked drop table.
pub fn report_drops(heading: &str, drops: &[HourlySales]) {
    tracing::info!(count = drops.len(), "{}", heading);
    for row in drops {
        tracing::info!(
            time = %row.time,
            today = row.today,
            avg_last_week = row.avg_last_week,
            deviation_vs_avg_week = row.deviation_vs_avg_week,
            "Sales drop"
        );
    }
}
