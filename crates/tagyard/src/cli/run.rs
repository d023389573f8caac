//! The `tagyard run` command: batch-tag a dataset folder.

use clap::Args;
use std::path::PathBuf;

use tagyard_core::{BatchReport, BatchRunner, Config, DatasetSettings, TaggerSession};

use super::{folder_key, open_store};

/// Arguments for the `run` command.
///
/// Flags default to the folder's stored settings (or config defaults for a
/// new folder); any flag given here overrides and is stored back, so the
/// next run repeats it without flags.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Dataset folder to process
    #[arg(required = true)]
    pub folder: PathBuf,

    /// Model identity to tag with
    #[arg(long)]
    pub model: Option<String>,

    /// Confidence threshold for general tags (0.0 - 1.0)
    #[arg(long)]
    pub general_threshold: Option<f32>,

    /// Use adaptive (MCut) thresholding for general tags
    #[arg(long)]
    pub general_mcut: bool,

    /// Confidence threshold for character tags (0.0 - 1.0)
    #[arg(long)]
    pub character_threshold: Option<f32>,

    /// Use adaptive (MCut) thresholding for character tags
    #[arg(long)]
    pub character_mcut: bool,

    /// Overwrite existing caption sidecars
    #[arg(long)]
    pub overwrite: bool,

    /// Comma-separated tags to emit before the BREAK separator
    #[arg(long)]
    pub prefix_tags: Option<String>,

    /// Comma-separated tags exempt from banning
    #[arg(long)]
    pub keep_tags: Option<String>,

    /// Comma-separated tags to drop from output
    #[arg(long)]
    pub ban_tags: Option<String>,

    /// File of map rules, one `sources : targets` per line
    #[arg(long)]
    pub map_tags_file: Option<PathBuf>,

    /// Keep underscores in tags instead of replacing them with spaces
    #[arg(long)]
    pub keep_underscores: bool,

    /// Keep general tags even when duplicated among character tags
    #[arg(long)]
    pub keep_dupes: bool,

    /// Escape parentheses in tags for prompt consumers
    #[arg(long)]
    pub escape_brackets: bool,

    /// How many of the most frequent tags to print in the summary
    #[arg(long, default_value = "10")]
    pub top_tags: usize,
}

/// Execute the run command.
pub fn execute(args: RunArgs, config: Config) -> anyhow::Result<()> {
    if !args.folder.is_dir() {
        anyhow::bail!("{} is not a directory", args.folder.display());
    }
    let folder = args
        .folder
        .canonicalize()
        .unwrap_or_else(|_| args.folder.clone());
    let key = folder_key(&folder);

    let store = open_store(&config)?;
    let mut settings = DatasetSettings::load(&store, &key, &config.dataset_defaults())?;
    apply_overrides(&mut settings, &args)?;
    settings.save(&store, &key)?;

    let mut session = TaggerSession::new();
    let model_dir = config.model_dir();
    let mut runner = BatchRunner::new(&store, &mut session, &model_dir);

    let pb = create_progress_bar();
    let report = runner.run(&folder, &settings, |progress| {
        pb.set_length(progress.total as u64);
        pb.set_position(progress.index as u64);
        if let Some(name) = progress.path.file_name() {
            pb.set_message(name.to_string_lossy().to_string());
        }
        true
    })?;
    pb.finish_and_clear();

    print_summary(&report, args.top_tags);
    Ok(())
}

/// Fold command-line flags into the stored settings.
fn apply_overrides(settings: &mut DatasetSettings, args: &RunArgs) -> anyhow::Result<()> {
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }
    if let Some(t) = args.general_threshold {
        anyhow::ensure!((0.0..=1.0).contains(&t), "--general-threshold must be in 0.0..=1.0");
        settings.general_threshold = t;
    }
    if let Some(t) = args.character_threshold {
        anyhow::ensure!((0.0..=1.0).contains(&t), "--character-threshold must be in 0.0..=1.0");
        settings.character_threshold = t;
    }
    if args.general_mcut {
        settings.general_mcut = true;
    }
    if args.character_mcut {
        settings.character_mcut = true;
    }
    if args.overwrite {
        settings.overwrite_captions = true;
    }
    if args.keep_underscores {
        settings.replace_underscores = false;
    }
    if args.keep_dupes {
        settings.trim_general_tag_dupes = false;
    }
    if args.escape_brackets {
        settings.escape_brackets = true;
    }
    if let Some(prefix) = &args.prefix_tags {
        settings.prefix_tags = prefix.clone();
    }
    if let Some(keep) = &args.keep_tags {
        settings.keep_tags = keep.clone();
    }
    if let Some(ban) = &args.ban_tags {
        settings.ban_tags = ban.clone();
    }
    if let Some(path) = &args.map_tags_file {
        settings.map_tags = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    }
    Ok(())
}

/// Create a progress bar for the batch run.
fn create_progress_bar() -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary after the batch run.
fn print_summary(report: &BatchReport, top_tags: usize) {
    let succeeded = report.succeeded();
    let rate = if report.elapsed_seconds > 0.0 {
        succeeded as f64 / report.elapsed_seconds
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", succeeded);
    if report.failed > 0 {
        eprintln!("    Failed:       {:>8}", report.failed);
    }
    eprintln!("    Cache hits:   {:>8}", report.cache_hits);
    eprintln!("    Sidecars:     {:>8}", report.sidecars_written);
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", report.elapsed_seconds);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");

    if !report.rating_average.is_empty() {
        eprintln!("\n  Rating (average):");
        for (bucket, avg) in &report.rating_average {
            eprintln!("    {:<20} {:>5.1}%", bucket, avg * 100.0);
        }
    }

    print_top_tags("Top general tags", &report.general_frequency, top_tags);
    print_top_tags("Top character tags", &report.character_frequency, top_tags);
}

fn print_top_tags(
    title: &str,
    frequency: &std::collections::BTreeMap<String, f64>,
    limit: usize,
) {
    if frequency.is_empty() || limit == 0 {
        return;
    }
    let mut sorted: Vec<(&String, &f64)> = frequency.iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    eprintln!("\n  {title}:");
    for (tag, freq) in sorted.into_iter().take(limit) {
        eprintln!("    {:<30} {:>5.1}%", tag, freq * 100.0);
    }
}
