use crate::database::models::Stage;

/// Outbound signal that a trial stage wants provisioning. Fire-and-forget:
/// implementations must not block the request and cannot fail it.
pub trait Notifier: Send + Sync {
    fn notify_provisioning_requested(&self, stage: &Stage);
}

/// Records the request in the service log for the provisioning team to pick up
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_provisioning_requested(&self, stage: &Stage) {
        tracing::info!(
            feature_id = stage.feature_id,
            stage_id = stage.id,
            stage_type = stage.stage_type,
            "Origin trial provisioning requested{}",
            stage
                .ot_display_name
                .as_deref()
                .map(|name| format!(" for {}", name))
                .unwrap_or_default()
        );
    }
}
