//! Activate command - purge stale buckets and claim clients

use crate::audit::{events, AuditLog};
use crate::config::Config;
use crate::error::SwResult;
use crate::runtime::{create_runtime, NetworkMode};
use crate::ui::{self, UiContext};

/// Execute the activate command
pub async fn execute(config: &Config) -> SwResult<()> {
    let ctx = UiContext::detect();
    let runtime = create_runtime(config, NetworkMode::Offline)?;
    let controller = &runtime.controller;

    let report = match controller.on_activate().await {
        Ok(report) => report,
        Err(e) => {
            if e.is_retryable() {
                ui::step_warn(&ctx, "Clients were claimed, but stale buckets remain");
            }
            return Err(e);
        }
    };

    if report.purged.is_empty() {
        ui::step_info(&ctx, "No stale buckets");
    }
    for bucket in &report.purged {
        ui::step_ok(&ctx, &format!("Purged {}", bucket));
    }

    AuditLog::new(config)
        .log(events::ACTIVATED, &serde_json::to_value(&report)?)
        .await;

    ui::outro_success(&ctx, &format!("{} is active", report.version));
    Ok(())
}
