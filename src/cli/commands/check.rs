//! Check command - explain how a request would be handled

use crate::cli::args::CheckArgs;
use crate::config::Config;
use crate::error::SwResult;
use crate::http::Request;
use crate::policy::BucketKind;
use crate::runtime::{create_runtime, NetworkMode};
use crate::ui::{self, UiContext};

/// Execute the check command
pub fn execute(args: CheckArgs, config: &Config) -> SwResult<()> {
    let ctx = UiContext::detect();
    let runtime = create_runtime(config, NetworkMode::Offline)?;
    let controller = &runtime.controller;

    let request = Request::new(args.method, controller.resolve(&args.target)?);
    ui::key_value(&ctx, "request", &format!("{} {}", request.method, request.url));

    if let Some((index, rule)) = controller.bypass().first_match(request.url.as_str()) {
        ui::key_value_status(
            &ctx,
            "passthrough",
            &format!("matched bypass rule #{} {}", index + 1, rule),
            false,
        );
        return Ok(());
    }

    match controller.passthrough_reason(&request) {
        Some(reason) => ui::key_value_status(&ctx, "passthrough", &reason.to_string(), false),
        None => ui::key_value_status(
            &ctx,
            "intercepted",
            &format!(
                "network-first, 200 responses cached in {}",
                controller.version().bucket(BucketKind::Dynamic)
            ),
            true,
        ),
    }

    Ok(())
}
