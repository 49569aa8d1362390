use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::core::types::ContentHash;
use crate::matching::engine::{LodMatcher, MatchRecord, MatcherConfig, VertexGroupRemap};
use crate::matching::scoring::{ScoreResolution, VoxelOverlapScorer};
use crate::model::provider::ModelDirectory;

#[derive(Args)]
pub struct MatchArgs {
    /// Directory of the full-detail reference model
    pub full_dir: PathBuf,

    /// Directory of the LOD model
    pub lod_dir: PathBuf,

    /// Fine-stage voxel size, in model units
    #[arg(long, default_value = "0.05")]
    pub voxel_size: f32,

    /// Fine-stage vertex sample count
    #[arg(long, default_value = "2048")]
    pub sample_size: usize,

    /// Prefilter voxel size, in model units
    #[arg(long, default_value = "0.25")]
    pub prefilter_voxel_size: f32,

    /// Prefilter vertex sample count
    #[arg(long, default_value = "256")]
    pub prefilter_sample_size: usize,

    /// Number of prefiltered candidates rescored at fine resolution
    #[arg(long, default_value = "8")]
    pub prefilter_candidates: usize,

    /// Candidate shortlist size for the vertex-group solver
    #[arg(long, default_value = "4")]
    pub group_candidates: usize,

    /// Weight of voxel overlap versus extent in the similarity score (0-1)
    #[arg(long, default_value = "0.8")]
    pub sensitivity: f32,

    /// Skip the dedicated hash-resolution pass
    #[arg(long)]
    pub no_hash_matching: bool,
}

/// JSON report handed to downstream tooling.
#[derive(Serialize)]
struct MatchReport<'a> {
    created_at: String,
    matches: &'a BTreeMap<ContentHash, MatchRecord>,
    vertex_group_remaps: &'a BTreeMap<ContentHash, VertexGroupRemap>,
}

/// Execute the match subcommand
///
/// # Errors
///
/// Returns an error if either model cannot be loaded or the matching run
/// fails with an integrity error.
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = MatcherConfig {
        fine: ScoreResolution {
            voxel_size: args.voxel_size,
            sample_count: args.sample_size,
        },
        prefilter: ScoreResolution {
            voxel_size: args.prefilter_voxel_size,
            sample_count: args.prefilter_sample_size,
        },
        prefilter_candidates: args.prefilter_candidates,
        group_candidates: args.group_candidates,
        hash_matching: !args.no_hash_matching,
    };

    let full = ModelDirectory::new(&args.full_dir);
    let lod = ModelDirectory::new(&args.lod_dir);

    let mut matcher = LodMatcher::new(&full, config)
        .with_lod_source(&lod)
        .with_scorer(VoxelOverlapScorer::new(args.sensitivity));

    let started = Instant::now();
    matcher.run()?;

    if verbose {
        eprintln!(
            "Matched {} components ({} vertex-group remaps) in {:.3}s",
            matcher.matches().len(),
            matcher.group_remaps().len(),
            started.elapsed().as_secs_f64()
        );
    }

    match format {
        OutputFormat::Text => print_text(&matcher),
        OutputFormat::Json => {
            let report = MatchReport {
                created_at: chrono::Utc::now().to_rfc3339(),
                matches: matcher.matches(),
                vertex_group_remaps: matcher.group_remaps(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn print_text(matcher: &LodMatcher<'_>) {
    if matcher.matches().is_empty() {
        println!("No components matched.");
        return;
    }

    println!("Matches:");
    for (hash, record) in matcher.matches() {
        println!(
            "  {hash} -> {} ({}) similarity={:.2} [{}]",
            record.lod_name, record.lod_hash, record.similarity, record.method
        );
    }

    if matcher.group_remaps().is_empty() {
        println!("All matched pairs reuse the full skeleton.");
    } else {
        println!("Vertex-group remaps:");
        for (hash, remap) in matcher.group_remaps() {
            println!(
                "  {hash}: {} of {} groups remapped",
                remap.remapped_count(),
                remap.mapping.len()
            );
        }
    }
}
