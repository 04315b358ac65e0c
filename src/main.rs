use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

use track_reconcile::config::MergeConfig;
use track_reconcile::dataset::read_records;
use track_reconcile::output::write_merged;
use track_reconcile::progress::{create_progress_bar, create_spinner, format_duration, set_log_only};
use track_reconcile::safety::validate_output_paths;
use track_reconcile::{MatchProfile, Reconciler};

#[derive(Parser)]
#[command(name = "track-reconcile")]
#[command(about = "Merge a verified base track collection with a freshly classified incoming collection")]
struct Args {
    /// Base collection (.csv or .json) holding verified values
    base: PathBuf,

    /// Incoming collection (.csv or .json)
    incoming: PathBuf,

    /// Merged output (.csv or .sqlite3)
    output: PathBuf,

    /// Report path (defaults to <output>.report.json)
    #[arg(long)]
    report: Option<PathBuf>,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// conservative, balanced or aggressive
    #[arg(long)]
    profile: Option<String>,

    #[arg(long)]
    artist_weight: Option<f64>,

    #[arg(long)]
    title_weight: Option<f64>,

    /// Override the profile's combined threshold
    #[arg(long)]
    combined_threshold: Option<f64>,

    #[arg(long)]
    low_confidence_margin: Option<f64>,

    #[arg(long)]
    sample_limit: Option<usize>,

    /// Shard the fuzzy candidate scan across threads
    #[arg(long)]
    parallel: bool,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars (tail-friendly output)
    #[arg(long)]
    log_only: bool,
}

fn build_config(args: &Args) -> Result<MergeConfig> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MergeConfig::default(),
    };
    if let Some(profile) = &args.profile {
        config.profile = profile.parse::<MatchProfile>()?;
    }
    if let Some(w) = args.artist_weight {
        config.artist_weight = w;
    }
    if let Some(w) = args.title_weight {
        config.title_weight = w;
    }
    if args.combined_threshold.is_some() {
        config.combined_threshold = args.combined_threshold;
    }
    if let Some(margin) = args.low_confidence_margin {
        config.low_confidence_margin = margin;
    }
    if let Some(limit) = args.sample_limit {
        config.sample_limit = limit;
    }
    config.parallel |= args.parallel;
    Ok(config)
}

fn default_report_path(output: &Path) -> PathBuf {
    output.with_extension("report.json")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    // Fail fast: configuration problems stop the run before any data is read.
    let config = build_config(&args)?;
    let reconciler = Reconciler::new(config).context("Invalid configuration")?;
    let thresholds = reconciler.thresholds();
    tracing::info!(
        profile = %reconciler.config().profile,
        artist = thresholds.artist,
        title = thresholds.title,
        combined = thresholds.combined,
        "using thresholds"
    );

    let report_path = args.report.clone().unwrap_or_else(|| default_report_path(&args.output));
    validate_output_paths(&[&args.output, &report_path], &[&args.base, &args.incoming])?;

    let start = Instant::now();

    let spinner = create_spinner("Phase 1: Loading datasets");
    let base = read_records(&args.base)
        .with_context(|| format!("Failed to read base collection {}", args.base.display()))?;
    let incoming = read_records(&args.incoming)
        .with_context(|| format!("Failed to read incoming collection {}", args.incoming.display()))?;
    spinner.finish_with_message(format!(
        "Phase 1: Loaded {} base and {} incoming records",
        base.len(),
        incoming.len()
    ));

    let pb = create_progress_bar(base.len() as u64, "Phase 2: Matching");
    let result = reconciler.run_with_progress(&base, &incoming, &pb);
    result.report.log_summary();

    let pb = create_progress_bar(result.merged.len() as u64, "Phase 3: Writing output");
    write_merged(&args.output, &result.merged, &pb)
        .with_context(|| format!("Failed to write merged output {}", args.output.display()))?;
    pb.finish_with_message(format!("Phase 3: Wrote {} records", result.merged.len()));

    result
        .report
        .write_to_file(&report_path)
        .with_context(|| format!("Failed to write report {}", report_path.display()))?;

    let summary = &result.report.summary;
    println!("\n{:=<60}", "");
    println!("Reconciliation complete!");
    println!("  Base records:       {}", summary.total_base);
    println!("  Exact (code):       {}", summary.exact);
    println!("  Fuzzy:              {}", summary.fuzzy);
    println!("  Unmatched base:     {}", summary.unmatched_base);
    println!("  Unclaimed incoming: {}", summary.unmatched_incoming);
    println!("  Low confidence:     {}", result.report.low_confidence.count);
    println!("  Output: {}", args.output.display());
    println!("  Report: {}", report_path.display());
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
