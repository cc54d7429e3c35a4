//! Fetch command - send one request through the controller

use crate::cli::args::{FetchArgs, FetchFormat};
use crate::config::Config;
use crate::controller::FetchOutcome;
use crate::error::{SwError, SwResult};
use crate::http::{Request, Response};
use crate::runtime::{create_runtime, NetworkMode, Runtime};
use console::style;
use std::io::Write;
use tracing::debug;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> SwResult<()> {
    let runtime = create_runtime(config, NetworkMode::from_offline_flag(args.offline))?;
    let request = build_request(&runtime, &args)?;

    warn_if_uncontrolled(&runtime).await;

    let served = serve(&runtime, &request).await;
    // Background cache writes must land before the process exits
    runtime.controller.flush().await;
    let (response, via) = served?;

    match args.format {
        FetchFormat::Summary => print_summary(&request, &response, &via),
        FetchFormat::Body => std::io::stdout()
            .write_all(&response.body)
            .map_err(|e| SwError::io("writing response body", e))?,
        FetchFormat::Json => print_json(&request, &response, &via)?,
    }

    Ok(())
}

fn build_request(runtime: &Runtime, args: &FetchArgs) -> SwResult<Request> {
    let url = runtime.controller.resolve(&args.target)?;
    let mut request = Request::new(args.method, url);
    for (name, value) in &args.headers {
        request.headers.append(name.as_str(), value.as_str());
    }
    if let Some(accept) = &args.accept {
        request.headers.set("Accept", accept.as_str());
    }
    Ok(request)
}

/// Run the interceptor; passthrough requests go straight to the network
async fn serve(runtime: &Runtime, request: &Request) -> SwResult<(Response, String)> {
    match runtime.controller.on_fetch(request).await? {
        FetchOutcome::Respond { response, source } => Ok((response, source.to_string())),
        FetchOutcome::Passthrough(reason) => {
            debug!("Native fetch for {}: {}", request.url, reason);
            let response = runtime.network.fetch(request).await?;
            Ok((response, format!("passthrough ({})", reason)))
        }
    }
}

async fn warn_if_uncontrolled(runtime: &Runtime) {
    let version = runtime.controller.version();
    match runtime.host.load().await {
        Ok(Some(record)) if record.is_active_for(version) => {}
        Ok(_) => eprintln!(
            "{} {} is not the active controller yet. Run: swcache install",
            style("!").yellow(),
            version
        ),
        Err(e) => debug!("Could not read worker record: {}", e),
    }
}

fn print_summary(request: &Request, response: &Response, via: &str) {
    println!(
        "{} {} {}",
        status_style(response.status),
        request.method,
        response.url
    );
    println!("{} {}", style("via").dim(), via);
    println!("{} {}", style("type").dim(), response.kind);
    for (name, value) in response.headers.iter() {
        println!("{}: {}", style(name).dim(), value);
    }
    println!("{} {} bytes", style("body").dim(), response.body.len());
}

fn print_json(request: &Request, response: &Response, via: &str) -> SwResult<()> {
    let headers: serde_json::Map<String, serde_json::Value> = response
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();

    let out = serde_json::json!({
        "method": request.method.as_str(),
        "url": response.url.as_str(),
        "status": response.status,
        "via": via,
        "type": response.kind.to_string(),
        "headers": headers,
        "body_bytes": response.body.len(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn status_style(status: u16) -> console::StyledObject<u16> {
    match status {
        200..=299 => style(status).green(),
        300..=399 => style(status).cyan(),
        _ => style(status).red(),
    }
}
