use super::types::Incident;

/// Side channel invoked when a window is classified `ALERT`.
///
/// Delivery is best-effort: the classifier logs a returned error and moves on.
/// A paging or chat integration would implement this trait.
pub trait IncidentNotifier: Send + Sync {
    fn notify(&self, incident: &Incident) -> eyre::Result<()>;
}

/// Reports incidents as `warn` log events.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl IncidentNotifier for LogNotifier {
    fn notify(&self, incident: &Incident) -> eyre::Result<()> {
        let alerts: Vec<String> = incident.violations.iter().map(|v| v.message()).collect();
        tracing::warn!(
            total_transactions = incident.summary.total_transactions,
            violations = incident.violations.len(),
            detected_at = %incident.detected_at,
            ?alerts,
            "ALERT INCIDENT TRIGGERED"
        );
        Ok(())
    }
}

/// Drops every incident.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl IncidentNotifier for NoopNotifier {
    fn notify(&self, _incident: &Incident) -> eyre::Result<()> {
        Ok(())
    }
}
