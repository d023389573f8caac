//! The `tagyard predict` command: tag a single image and print the result.

use clap::Args;
use std::path::PathBuf;

use tagyard_core::{
    process_prediction, Config, ContentHash, DatasetSettings, PredictionCache, TaggerSession,
};

use super::{folder_key, open_store};

/// Arguments for the `predict` command.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to predict tags for
    #[arg(required = true)]
    pub image: PathBuf,

    /// Model identity to tag with (defaults to the folder's setting)
    #[arg(long)]
    pub model: Option<String>,

    /// Ignore the cache and re-run inference
    #[arg(long)]
    pub no_cache: bool,

    /// How many scored tags to print per category
    #[arg(long, default_value = "15")]
    pub top: usize,
}

/// Execute the predict command.
///
/// The image's parent folder determines the settings (thresholds, rules)
/// used for the printout, exactly as a batch run over that folder would.
pub fn execute(args: PredictArgs, config: Config) -> anyhow::Result<()> {
    if !args.image.is_file() {
        anyhow::bail!("{} is not a file", args.image.display());
    }
    let folder = args
        .image
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let key = folder_key(&folder);

    let store = open_store(&config)?;
    let mut settings = DatasetSettings::load(&store, &key, &config.dataset_defaults())?;
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }

    let hash = ContentHash::of_file(&args.image)?;
    let cache = PredictionCache::new(&store, settings.model.clone());

    let cached = if args.no_cache { None } else { cache.get(&hash)? };
    let (prediction, from_cache) = match cached {
        Some(prediction) => (prediction, true),
        None => {
            let image = image::open(&args.image)
                .map_err(|e| anyhow::anyhow!("cannot decode {}: {e}", args.image.display()))?;
            let mut session = TaggerSession::new();
            session.ensure_loaded(&settings.model, &config.model_dir())?;
            let prediction = session.predict(&image)?;
            cache.put(&hash, &key, &prediction)?;
            (prediction, false)
        }
    };

    let output = process_prediction(
        &prediction,
        settings.general_options(),
        settings.character_options(),
        &settings.tag_rules(),
    );

    println!("{}", output.caption);

    eprintln!();
    eprintln!("  Model:  {}", settings.model);
    eprintln!("  Hash:   {}", hash);
    eprintln!("  Source: {}", if from_cache { "cache" } else { "inference" });

    print_scores("Rating", &output.rating, usize::MAX);
    print_scores("General", &output.general, args.top);
    print_scores("Character", &output.character, args.top);

    Ok(())
}

fn print_scores(title: &str, scores: &tagyard_core::ScoreMap, limit: usize) {
    if scores.is_empty() {
        return;
    }
    let mut sorted: Vec<(&String, &f32)> = scores.iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    eprintln!("\n  {title}:");
    for (tag, score) in sorted.into_iter().take(limit) {
        eprintln!("    {:<30} {:>5.1}%", tag, score * 100.0);
    }
}
