//! tierconf inspector
//!
//! Resolves a layered configuration the way a program using the library
//! would, and prints keys, values or change events.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::path::Path;
use tierconf::cli::{Cli, Command};
use tierconf::logging::{self, LogTarget};
use tierconf::{ConfigFormat, Store, WatchState};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let target: LogTarget = cli.log.parse()?;
    logging::init(&target, cli.verbose)?;

    let store = Store::new(cli.options()).context("failed to load configuration")?;
    if let Some(path) = store.config_file_used() {
        info!("Using config file: {}", path.display());
    }

    match cli.command {
        Command::Get { ref key, layer } => match store.lookup(key) {
            Some(resolved) if layer => println!("{} ({})", resolved.value, resolved.layer),
            Some(resolved) => println!("{}", resolved.value),
            None => bail!("{key} is not set"),
        },
        Command::Keys => {
            for key in store.all_keys() {
                println!("{key}");
            }
        }
        Command::Dump { ref format } => {
            let format = ConfigFormat::from_str(format)
                .ok_or_else(|| anyhow!("unknown format \"{format}\""))?;
            print!("{}", format.serialize(Path::new("<stdout>"), &store.all_settings())?);
        }
        Command::Write { ref path, force } => {
            if force {
                store.write_config_as(path)?;
            } else {
                store.safe_write_config_as(path)?;
            }
        }
        Command::Watch => watch(&store).await?,
    }

    Ok(())
}

/// Print change events until Ctrl-C.
async fn watch(store: &Store) -> Result<()> {
    let WatchState::Watching { path } = store.watch_state() else {
        bail!("no config file is being watched");
    };
    eprintln!("Watching {} (Ctrl-C to stop)", path.display());

    let mut events = store.subscribe();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("{event}"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped change events"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let panicked = store.wait_for_callbacks();
    if panicked > 0 {
        warn!(panicked, "Change callbacks panicked");
    }
    Ok(())
}
