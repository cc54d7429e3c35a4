//! Status command - controller state and cache health

use crate::config::{Config, ConfigManager};
use crate::error::SwResult;
use crate::host::WorkerPhase;
use crate::policy::{partition_buckets, BucketKind};
use crate::runtime::{create_runtime, NetworkMode, Runtime};
use crate::store::{CacheStore, RequestKey};
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// Execute the status command
pub async fn execute(config: &Config) -> SwResult<()> {
    println!("{}", style("swcache Status").bold().cyan());
    println!();

    let runtime = create_runtime(config, NetworkMode::Offline)?;
    let controller = &runtime.controller;

    println!("{}", style("Controller:").bold());
    println!("  {} Version: {}", CHECK, controller.version());
    println!("  {} Origin: {}", CHECK, controller.scope());
    println!(
        "  {} Store: {}",
        CHECK,
        ConfigManager::store_path(config).display()
    );
    println!("  {} Bypass rules: {}", CHECK, controller.bypass().len());

    let mut all_ok = check_worker(&runtime).await;
    all_ok &= check_buckets(&runtime).await?;

    println!();
    if all_ok {
        println!("{}", style("Controller is installed and active").green().bold());
    } else {
        println!(
            "{}",
            style("Some checks failed - see above for details").yellow().bold()
        );
    }

    Ok(())
}

async fn check_worker(runtime: &Runtime) -> bool {
    println!();
    println!("{}", style("Worker:").bold());

    let version = runtime.controller.version();
    match runtime.host.load().await {
        Ok(Some(record)) if record.version == version.as_str() => {
            let ok = record.phase == WorkerPhase::Activated;
            let mark = if ok { &CHECK } else { &WARN };
            println!("  {} Phase: {} ({})", mark, record.phase, record.id);
            println!(
                "  {} Installed: {}",
                CHECK,
                record.installed_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if let Some(at) = record.activated_at {
                println!("  {} Activated: {}", CHECK, at.format("%Y-%m-%d %H:%M:%S UTC"));
            } else {
                println!("    Run: swcache activate");
            }
            ok
        }
        Ok(Some(record)) => {
            println!(
                "  {} Recorded worker is {} ({}), configured version is {}",
                WARN, record.version, record.phase, version
            );
            println!("    Run: swcache install");
            false
        }
        Ok(None) => {
            println!("  {} {}", CROSS, style("Not installed").red());
            println!("    Run: swcache install");
            false
        }
        Err(e) => {
            println!("  {} Unreadable worker record: {}", CROSS, e);
            false
        }
    }
}

async fn check_buckets(runtime: &Runtime) -> SwResult<bool> {
    println!();
    println!("{}", style("Buckets:").bold());

    let controller = &runtime.controller;
    let store = runtime.store.as_ref();
    let version = controller.version();
    let mut ok = true;

    let static_bucket = version.bucket(BucketKind::Static);
    let mut missing = 0;
    for url in controller.static_assets() {
        if store.get(&static_bucket, &RequestKey::get(url.as_str())).await?.is_none() {
            missing += 1;
        }
    }
    let total = controller.static_assets().len();
    if missing == 0 {
        println!("  {} {}: {} of {} assets", CHECK, static_bucket, total, total);
    } else {
        println!(
            "  {} {}: {} of {} assets",
            CROSS,
            static_bucket,
            total - missing,
            total
        );
        ok = false;
    }

    let dynamic_bucket = version.bucket(BucketKind::Dynamic);
    let dynamic = store.entries(&dynamic_bucket).await?.len();
    println!("  {} {}: {} entries", CHECK, dynamic_bucket, dynamic);

    let (_, stale) = partition_buckets(version, store.keys().await?);
    if stale.is_empty() {
        println!("  {} No stale buckets", CHECK);
    } else {
        println!("  {} Stale: {}", WARN, stale.join(", "));
        println!("    Run: swcache activate");
        ok = false;
    }

    Ok(ok)
}
