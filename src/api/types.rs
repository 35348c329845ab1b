use serde::Serialize;

use crate::monitor::types::ThresholdTable;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub thresholds: ThresholdTable,
}
