//! The `tagyard settings` command: view and change per-dataset settings.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use tagyard_core::{Config, DatasetSettings, DatasetStore};

use super::{folder_key, open_store};

/// Settings keys accepted by `settings set`.
const KNOWN_KEYS: &[&str] = &[
    "model",
    "general_threshold",
    "general_mcut",
    "character_threshold",
    "character_mcut",
    "replace_underscores",
    "trim_general_tag_dupes",
    "escape_brackets",
    "overwrite_captions",
    "prefix_tags",
    "keep_tags",
    "ban_tags",
    "map_tags",
];

/// Arguments for the `settings` command.
#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

/// Subcommands for dataset settings.
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Show the effective settings for a dataset folder
    Show {
        /// Dataset folder
        folder: PathBuf,
    },

    /// Set one setting for a dataset folder
    Set {
        /// Dataset folder
        folder: PathBuf,

        /// Setting key (see `settings show` for the list)
        key: String,

        /// New value
        value: String,
    },
}

/// Execute the settings command.
pub fn execute(args: SettingsArgs, config: Config) -> anyhow::Result<()> {
    let store = open_store(&config)?;

    match args.command {
        SettingsCommand::Show { folder } => {
            let key = folder_key(&folder);
            let settings = DatasetSettings::load(&store, &key, &config.dataset_defaults())?;

            println!("Settings for {key}");
            println!("  model                   = {}", settings.model);
            println!("  general_threshold       = {}", settings.general_threshold);
            println!("  general_mcut            = {}", settings.general_mcut);
            println!("  character_threshold     = {}", settings.character_threshold);
            println!("  character_mcut          = {}", settings.character_mcut);
            println!("  replace_underscores     = {}", settings.replace_underscores);
            println!("  trim_general_tag_dupes  = {}", settings.trim_general_tag_dupes);
            println!("  escape_brackets         = {}", settings.escape_brackets);
            println!("  overwrite_captions      = {}", settings.overwrite_captions);
            println!("  prefix_tags             = {:?}", settings.prefix_tags);
            println!("  keep_tags               = {:?}", settings.keep_tags);
            println!("  ban_tags                = {:?}", settings.ban_tags);
            println!("  map_tags                = {:?}", settings.map_tags);
        }

        SettingsCommand::Set { folder, key, value } => {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                anyhow::bail!(
                    "Unknown setting {key:?}. Known keys: {}",
                    KNOWN_KEYS.join(", ")
                );
            }
            let folder = folder_key(&folder);
            store.set_setting(&folder, &key, &value)?;
            println!("Set {key} = {value:?} for {folder}");
        }
    }

    Ok(())
}
