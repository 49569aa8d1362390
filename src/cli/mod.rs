//! Command-line interface for lod-matcher.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **match**: match a LOD model's components against a full-detail model
//! - **inspect**: list a model directory's components, optionally verifying
//!   buffer fingerprints against the descriptor
//!
//! ## Usage
//!
//! ```text
//! # Match a LOD dump against the full-detail dump
//! lod-matcher match dumps/full dumps/lod
//!
//! # JSON output for scripting
//! lod-matcher match dumps/full dumps/lod --format json
//!
//! # Looser prefilter with more survivors
//! lod-matcher match dumps/full dumps/lod --prefilter-candidates 16
//!
//! # Check a dump directory against its descriptor
//! lod-matcher inspect dumps/full --verify
//! ```

use clap::{Parser, Subcommand};

pub mod inspect;
pub mod match_cmd;

#[derive(Parser)]
#[command(name = "lod-matcher")]
#[command(version)]
#[command(about = "Match LOD mesh components against a full-detail reference model")]
#[command(
    long_about = "lod-matcher pairs the mesh components of a low-detail model with the \
components of its full-detail reference, so per-vertex metadata (bone bindings, material \
assignments) can be transferred between them.\n\nComponents sharing a content hash pair \
immediately; everything else goes through a coarse-to-fine geometric similarity search \
plus a vertex-group correspondence solver."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match LOD components against the full model
    Match(match_cmd::MatchArgs),

    /// Inspect a model directory's descriptor and buffers
    Inspect(inspect::InspectArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
