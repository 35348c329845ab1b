use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::monitor::types::ClassificationResult;

use super::types::*;
use super::AppState;

// ============================================================
// Health
// ============================================================

pub async fn status_check() -> &'static str {
    "The transaction monitoring server is OK!"
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        thresholds: *state.classifier.thresholds(),
    })
}

// ============================================================
// Monitoring
// ============================================================

/// Classify one window of transaction counters. Every classifier outcome,
/// `ERROR` included, is a 200; only an unparseable body is a 400.
pub async fn monitor_txn(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<ClassificationResult>) {
    let payload: JsonValue = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "Request body is not valid JSON");
            return (
                StatusCode::BAD_REQUEST,
                Json(ClassificationResult::invalid_data()),
            );
        }
    };

    let result = state.classifier.classify_payload(&payload);
    tracing::info!(
        status = result.status.as_str(),
        alerts = result.alerts.len(),
        "Transaction window classified"
    );
    (StatusCode::OK, Json(result))
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use crate::monitor::engine::RateClassifier;
    use crate::monitor::notifier::NoopNotifier;
    use crate::monitor::types::ThresholdTable;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let classifier = RateClassifier::new(ThresholdTable::default(), Arc::new(NoopNotifier));
        router(Arc::new(classifier))
    }

    async fn post_monitor(body: impl Into<Body>) -> (StatusCode, Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/monitor_txn")
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_monitor_txn_alert() {
        let (status, body) = post_monitor(
            json!({
                "total_transactions": 100,
                "failed_count": 5,
                "denied_count": 0,
                "reversed_count": 0,
            })
            .to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "ALERT",
                "recommendation": "P0_INCIDENT_TRIGGERED",
                "alerts": ["HIGH_FAILURE: Rate (5.00%) exceeded threshold (3.00%)."],
            })
        );
    }

    #[tokio::test]
    async fn test_monitor_txn_malformed_field() {
        let (status, body) = post_monitor(
            json!({
                "total_transactions": 100,
                "failed_count": "x",
                "denied_count": 0,
                "reversed_count": 0,
            })
            .to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ERROR");
        assert_eq!(body["recommendation"], "INVALID_DATA");
    }

    #[tokio::test]
    async fn test_monitor_txn_invalid_json() {
        let (status, body) = post_monitor("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["recommendation"], "INVALID_DATA");
        assert_eq!(body["alerts"], json!(["Input data is malformed."]));
    }

    #[tokio::test]
    async fn test_health_reports_thresholds() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["thresholds"]["failed_rate_threshold"], 0.03);
    }
}
