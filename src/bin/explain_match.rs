//! Score one base/incoming pair and show what each profile would decide.
//! Usage: cargo run --release --bin explain-match -- "<artist>" "<title>" "<artist>" "<title>"

use anyhow::{Context, Result};
use clap::Parser;

use track_reconcile::scoring::{score_prepared, PreparedName};
use track_reconcile::{MatchProfile, MergeConfig};

#[derive(Parser)]
#[command(name = "explain-match")]
#[command(about = "Explain how a single pair of records scores against every match profile")]
struct Args {
    base_artist: String,
    base_title: String,
    incoming_artist: String,
    incoming_title: String,

    #[arg(long, default_value = "0.4")]
    artist_weight: f64,

    #[arg(long, default_value = "0.6")]
    title_weight: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = MergeConfig {
        artist_weight: args.artist_weight,
        title_weight: args.title_weight,
        ..MergeConfig::default()
    };
    config.validate().context("Invalid weights")?;

    let base = PreparedName::new(&args.base_artist, &args.base_title);
    let incoming = PreparedName::new(&args.incoming_artist, &args.incoming_title);
    let scores = score_prepared(&base, &incoming, config.weights());

    println!("Base:     {:?} / {:?}", base.artists, base.title);
    println!("Incoming: {:?} / {:?}", incoming.artists, incoming.title);
    println!();
    println!("  artist:   {:.4}", scores.artist_score);
    println!("  title:    {:.4}", scores.title_score);
    println!(
        "  combined: {:.4}  ({} * artist + {} * title)",
        scores.combined_score, args.artist_weight, args.title_weight
    );
    println!();

    for profile in MatchProfile::ALL {
        let t = profile.thresholds();
        let verdict = if t.accepts(scores.artist_score, scores.title_score, scores.combined_score) {
            "MATCH"
        } else {
            "reject"
        };
        println!(
            "  {:<13} artist>={:.2} title>={:.2} combined>={:.2}  {}",
            profile.name(),
            t.artist,
            t.title,
            t.combined,
            verdict
        );
    }

    Ok(())
}
