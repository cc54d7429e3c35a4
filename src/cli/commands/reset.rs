//! Reset command - unregister the worker and wipe every bucket
//!
//! The offline-to-clean-slate path a page uses when it forces a full
//! resync: drop the registration and delete all caches regardless of
//! version. The next `swcache install` starts cold.

use crate::audit::{events, AuditLog};
use crate::cli::args::ResetArgs;
use crate::config::Config;
use crate::error::{SwError, SwResult};
use crate::runtime::{create_runtime, NetworkMode};
use crate::store::CacheStore;
use crate::ui::{self, UiContext};
use futures_util::future::join_all;

/// Execute the reset command
pub async fn execute(args: ResetArgs, config: &Config) -> SwResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let runtime = create_runtime(config, NetworkMode::Offline)?;

    if !ui::confirm(&ctx, "Unregister the worker and delete every cache bucket?", false).await? {
        ui::step_warn_hint(&ctx, "Reset not confirmed", "Pass --yes to skip the prompt");
        return Ok(());
    }

    let unregistered = runtime.host.clear().await?;

    let store = runtime.store.as_ref();
    let names = store.keys().await?;
    let results = join_all(names.iter().map(|name| store.delete(name))).await;

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(_) => deleted.push(name),
            Err(e) => {
                ui::step_error_detail(&ctx, &format!("Could not delete {}", name), &e.to_string());
                failed.push(name);
            }
        }
    }

    AuditLog::new(config)
        .log(
            events::RESET,
            &serde_json::json!({
                "unregistered": unregistered,
                "deleted": deleted,
                "failed": failed,
            }),
        )
        .await;

    if !failed.is_empty() {
        return Err(SwError::Storage {
            bucket: failed.join(", "),
            reason: "bucket could not be deleted".to_string(),
        });
    }

    if unregistered {
        ui::step_ok(&ctx, "Worker unregistered");
    }
    ui::step_ok(&ctx, &format!("Deleted {} bucket(s)", deleted.len()));
    ui::outro_success(&ctx, "Reset complete. Run `swcache install` to start over");
    Ok(())
}
