//! Message command - post a control message and wait for the reply

use crate::audit::{events, AuditLog};
use crate::cli::args::{MessageAction, MessageArgs};
use crate::config::Config;
use crate::controller::{messages, reply_channel, ControlReply, MessageOutcome};
use crate::error::{SwError, SwResult};
use crate::runtime::{create_runtime, NetworkMode};
use crate::ui::{self, UiContext};
use serde_json::Value;

/// Execute the message command
pub async fn execute(args: MessageArgs, config: &Config) -> SwResult<()> {
    let ctx = UiContext::detect();

    let data = match args.action {
        MessageAction::ForceUpdate { yes } => {
            let ctx = ctx.clone().with_auto_yes(yes);
            let confirmed =
                ui::confirm(&ctx, "Delete every cache bucket, including the active ones?", false)
                    .await?;
            if !confirmed {
                ui::step_warn_hint(&ctx, "Force update not confirmed", "Pass --yes to skip the prompt");
                return Ok(());
            }
            Value::String(messages::FORCE_UPDATE.to_string())
        }
        MessageAction::GetVersion => Value::String(messages::GET_VERSION.to_string()),
        MessageAction::Raw { data } => serde_json::from_str(&data)
            .map_err(|e| SwError::User(format!("Message is not valid JSON: {}", e)))?,
    };

    post(&ctx, config, &data).await
}

async fn post(ctx: &UiContext, config: &Config, data: &Value) -> SwResult<()> {
    let runtime = create_runtime(config, NetworkMode::Offline)?;
    let (port, reply) = reply_channel();

    let outcome = runtime.controller.on_message(data, Some(port)).await?;

    if let MessageOutcome::ForceUpdated { deleted } = &outcome {
        AuditLog::new(config)
            .log(
                events::FORCE_UPDATE,
                &serde_json::json!({
                    "version": runtime.controller.version().as_str(),
                    "deleted": deleted,
                }),
            )
            .await;
        for bucket in deleted {
            ui::step_ok(ctx, &format!("Deleted {}", bucket));
        }
    }

    match reply.await {
        Ok(ControlReply::Version { version }) => println!("{}", version),
        Ok(reply @ ControlReply::Status { .. }) => println!("{}", serde_json::to_string(&reply)?),
        Err(_) => ui::remark(ctx, "Message ignored, no reply"),
    }

    Ok(())
}
