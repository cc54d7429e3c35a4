//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::controller::parse_scope;
use crate::error::{SwError, SwResult};
use crate::policy::CacheVersion;
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Keys accepted by `config set`
const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.audit_log",
    "worker.version",
    "worker.origin",
    "worker.static_assets",
    "worker.shell_document",
    "worker.same_origin_only",
    "store.path",
    "network.timeout_secs",
    "network.user_agent",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> SwResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> SwResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> SwResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;

    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> SwResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    apply(&mut config, key, value)?;

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply a dot-separated key to a config, validating the value
fn apply(config: &mut Config, key: &str, value: &str) -> SwResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => {
            if value != "text" && value != "json" {
                return Err(SwError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )));
            }
            config.general.log_format = value.to_string();
        }
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,

        ["worker", "version"] => {
            config.worker.version = CacheVersion::new(value)?.to_string();
        }
        ["worker", "origin"] => {
            parse_scope(value)?;
            config.worker.origin = value.to_string();
        }
        ["worker", "static_assets"] => {
            config.worker.static_assets = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        ["worker", "shell_document"] => config.worker.shell_document = value.to_string(),
        ["worker", "same_origin_only"] => config.worker.same_origin_only = parse_bool(value)?,

        ["store", "path"] => config.store.path = Some(PathBuf::from(value)),

        ["network", "timeout_secs"] => config.network.timeout_secs = parse_u64(value)?,
        ["network", "user_agent"] => config.network.user_agent = value.to_string(),

        _ => {
            let ctx = UiContext::detect();
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for key in VALID_KEYS {
                eprintln!("  {}", key);
            }
            ui::remark(&ctx, "Bypass rules are edited in the [bypass] table of the config file");
            return Err(SwError::User(format!("Unknown config key: {}", key)));
        }
    }

    Ok(())
}

fn parse_bool(value: &str) -> SwResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(SwError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> SwResult<u64> {
    value
        .parse()
        .map_err(|_| SwError::User(format!("Invalid number: {}", value)))
}
