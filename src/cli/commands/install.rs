//! Install command - pre-cache the static manifest, then activate

use crate::audit::{events, AuditLog};
use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::SwResult;
use crate::runtime::{create_runtime, NetworkMode};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> SwResult<()> {
    let ctx = UiContext::detect();
    let runtime = create_runtime(config, NetworkMode::Online)?;
    let controller = &runtime.controller;
    let audit = AuditLog::new(config);

    ui::intro(&ctx, &format!("Installing {}", controller.version()));

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Fetching {} static assets from {}",
        controller.static_assets().len(),
        controller.scope()
    ));

    let report = match controller.on_install().await {
        Ok(report) => {
            spinner.stop(&format!("Cached {} assets in {}", report.assets.len(), report.bucket));
            report
        }
        Err(e) => {
            spinner.stop_error("Install failed, nothing was cached");
            return Err(e);
        }
    };

    for asset in &report.assets {
        ui::step_ok(&ctx, asset);
    }
    audit
        .log(events::INSTALLED, &serde_json::to_value(&report)?)
        .await;

    if args.no_activate {
        ui::outro_success(
            &ctx,
            &format!("{} installed. Run `swcache activate` to take over", report.version),
        );
        return Ok(());
    }

    // skip_waiting was called, so activation follows immediately
    let activated = controller.on_activate().await?;
    for bucket in &activated.purged {
        ui::step_info(&ctx, &format!("Purged {}", bucket));
    }
    audit
        .log(events::ACTIVATED, &serde_json::to_value(&activated)?)
        .await;

    ui::outro_success(&ctx, &format!("{} is active", activated.version));
    Ok(())
}
