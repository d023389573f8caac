//! The `tagyard edit` command: record, show, and reset manual caption edits.
//!
//! A manual edit is stored as the pair (auto caption the operator saw,
//! caption they saved). On later runs the difference between the two is
//! replayed onto the fresh auto caption, so manual work survives threshold
//! and model changes.

use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use tagyard_core::pipeline::{sidecar_path, write_caption};
use tagyard_core::{
    process_prediction, Caption, Config, ContentHash, DatasetSettings, DatasetStore,
    PredictionCache, SqliteStore,
};

use super::{folder_key, open_store};

/// Arguments for the `edit` command.
#[derive(Args, Debug)]
pub struct EditArgs {
    #[command(subcommand)]
    pub command: EditCommand,
}

/// Subcommands for manual edits.
#[derive(Subcommand, Debug)]
pub enum EditCommand {
    /// Record an edited caption for an image and write its sidecar
    Set {
        /// Image file the caption belongs to
        image: PathBuf,

        /// The edited caption text
        caption: String,
    },

    /// Show the stored edit for an image
    Show {
        /// Image file to inspect
        image: PathBuf,
    },

    /// Remove the stored edit for an image
    Reset {
        /// Image file to reset
        image: PathBuf,
    },
}

/// Execute the edit command.
pub fn execute(args: EditArgs, config: Config) -> anyhow::Result<()> {
    let store = open_store(&config)?;

    match args.command {
        EditCommand::Set { image, caption } => set_edit(&store, &config, &image, &caption),
        EditCommand::Show { image } => show_edit(&store, &image),
        EditCommand::Reset { image } => reset_edit(&store, &image),
    }
}

fn locate(image: &Path) -> anyhow::Result<(String, ContentHash)> {
    anyhow::ensure!(image.is_file(), "{} is not a file", image.display());
    let folder = image.parent().map(|p| p.to_path_buf()).unwrap_or_default();
    let key = folder_key(&folder);
    let hash = ContentHash::of_file(image)?;
    Ok((key, hash))
}

fn set_edit(
    store: &SqliteStore,
    config: &Config,
    image: &Path,
    caption: &str,
) -> anyhow::Result<()> {
    let (key, hash) = locate(image)?;
    let settings = DatasetSettings::load(store, &key, &config.dataset_defaults())?;

    // The "previous" side of the edit is the auto caption as it stands
    // right now: cached prediction if available, else the current sidecar.
    let previous = auto_caption(store, &settings, &hash)?
        .or_else(|| {
            std::fs::read_to_string(sidecar_path(image))
                .ok()
                .map(|text| Caption::parse(&text))
        })
        .unwrap_or_default();

    let edited = Caption::parse(caption);
    store.set_edit(&key, &hash, &previous.to_string(), &edited.to_string())?;
    write_caption(image, &edited.to_string(), true)?;

    println!("Recorded edit for {}", image.display());
    println!("  previous: {}", previous);
    println!("  edited:   {}", edited);
    Ok(())
}

/// The transformed auto caption from the cached prediction, if one exists.
fn auto_caption(
    store: &SqliteStore,
    settings: &DatasetSettings,
    hash: &ContentHash,
) -> anyhow::Result<Option<Caption>> {
    let cache = PredictionCache::new(store, settings.model.clone());
    let Some(prediction) = cache.get(hash)? else {
        return Ok(None);
    };
    let output = process_prediction(
        &prediction,
        settings.general_options(),
        settings.character_options(),
        &settings.tag_rules(),
    );
    Ok(Some(output.caption))
}

fn show_edit(store: &SqliteStore, image: &Path) -> anyhow::Result<()> {
    let (key, hash) = locate(image)?;
    match store.get_edit(&key, &hash)? {
        Some(edit) => {
            println!("Edit for {}", image.display());
            println!("  previous: {}", edit.previous);
            println!("  edited:   {}", edit.edited);
        }
        None => println!("No edit recorded for {}", image.display()),
    }
    Ok(())
}

fn reset_edit(store: &SqliteStore, image: &Path) -> anyhow::Result<()> {
    let (key, hash) = locate(image)?;
    store.clear_edit(&key, &hash)?;
    println!("Cleared edit for {}", image.display());
    Ok(())
}
