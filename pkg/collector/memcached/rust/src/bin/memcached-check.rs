// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::dbg_macro)]

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::{self, MissedTickBehavior};

use dd_memcached_check::config::{self, Global};
use dd_memcached_check::sink::Console;
use dd_memcached_check::{MemcachedCheck, Registry};

/// Collects memcached stats and prints the filtered records.
#[derive(Parser, Debug)]
#[command(name = "memcached-check", version)]
struct Args {
    /// Check configuration file
    #[arg(short, long, default_value = "conf.yaml")]
    config: PathBuf,

    /// Directory of configuration files, read instead of --config
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Seconds between collection cycles
    #[arg(short, long, default_value_t = 10)]
    interval: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn load_globals(args: &Args) -> Result<Vec<(String, Global)>> {
    match &args.config_dir {
        Some(dir) => config::load_config_dir(dir),
        None => {
            let global = config::load_config(&args.config)?;
            Ok(vec![(args.config.display().to_string(), global)])
        }
    }
}

/// `DD_LOG_LEVEL` wins over the verbose settings.
fn log_level(verbose: bool) -> log::Level {
    if let Ok(level) = env::var("DD_LOG_LEVEL")
        && let Ok(level) = log::Level::from_str(level.trim())
    {
        return level;
    }
    if verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let globals = load_globals(&args).context("loading memcached configuration")?;

    let verbose = args.verbose || globals.iter().any(|(_, g)| g.verbose());
    simple_logger::init_with_level(log_level(verbose))?;
    info!(
        "memcached-check starting (version {})",
        env!("CARGO_PKG_VERSION")
    );

    let mut builder = Registry::builder();
    builder.verbose(verbose);
    for (name, global) in &globals {
        let added = builder.configure_global(global);
        info!("{name}: {added} instance(s) configured");
    }
    let registry = Arc::new(builder.build());
    if registry.is_empty() {
        bail!("no valid memcached instance configured");
    }

    let sink = Console {};
    let check = MemcachedCheck::new(&sink, registry);

    if args.once {
        let summary = check.run().await;
        if summary.instances_failed > 0 {
            warn!("{} instance(s) could not be collected", summary.instances_failed);
        }
        return Ok(());
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut ticker = time::interval(Duration::from_secs(args.interval.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
                break;
            }
            _ = ticker.tick() => {
                check.run().await;
            }
        }
    }

    info!("memcached-check shutting down");
    Ok(())
}
