//! The `tagyard recent` command: list recently used dataset folders.

use clap::Args;

use tagyard_core::{Config, DatasetStore};

use super::open_store;

/// Arguments for the `recent` command.
#[derive(Args, Debug)]
pub struct RecentArgs {
    /// Maximum number of folders to list
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

/// Execute the recent command.
pub fn execute(args: RecentArgs, config: Config) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let folders = store.recent_folders()?;

    if folders.is_empty() {
        println!("No datasets processed yet.");
        return Ok(());
    }

    for folder in folders.iter().take(args.limit) {
        println!("{folder}");
    }
    Ok(())
}
