use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::model::descriptor::ModelDescriptor;
use crate::utils::validation::{compute_buffer_fingerprint, normalize_content_hash};

#[derive(Args)]
pub struct InspectArgs {
    /// Model directory holding Metadata.json and component buffers
    pub dir: PathBuf,

    /// Recompute buffer fingerprints and compare with recorded hashes
    #[arg(long)]
    pub verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Verification {
    Ok,
    Mismatch,
    /// Recorded hash is not an md5 fingerprint, nothing to compare against
    Unverifiable,
    MissingBuffer,
}

#[derive(Serialize)]
struct InspectEntry {
    name: String,
    hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<Verification>,
}

/// Execute the inspect subcommand
///
/// # Errors
///
/// Returns an error if the descriptor cannot be read or parsed.
pub fn run(args: InspectArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let descriptor = ModelDescriptor::load(&args.dir)?;
    let table = descriptor.component_table();

    if verbose {
        eprintln!(
            "Descriptor lists {} components in {}",
            table.len(),
            args.dir.display()
        );
    }

    let entries: Vec<InspectEntry> = table
        .iter()
        .map(|component| {
            let verification = args
                .verify
                .then(|| verify_component(&args.dir, &component.name, component.hash.as_str()));
            InspectEntry {
                name: component.name.clone(),
                hash: component.hash.to_string(),
                verification,
            }
        })
        .collect();

    match format {
        OutputFormat::Text => {
            for entry in &entries {
                match entry.verification {
                    Some(status) => {
                        println!("{}  {}  {:?}", entry.name, entry.hash, status);
                    }
                    None => println!("{}  {}", entry.name, entry.hash),
                }
            }
            if args.verify {
                let mismatches = entries
                    .iter()
                    .filter(|e| e.verification == Some(Verification::Mismatch))
                    .count();
                if mismatches > 0 {
                    anyhow::bail!("{mismatches} component buffer(s) do not match the descriptor");
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }

    Ok(())
}

fn verify_component(dir: &std::path::Path, name: &str, recorded: &str) -> Verification {
    // Only md5-sized hashes can be cross-checked against the fingerprint
    let Some(recorded) = normalize_content_hash(recorded).filter(|h| h.len() == 32) else {
        return Verification::Unverifiable;
    };
    let Ok(bytes) = std::fs::read(dir.join(format!("{name}.vb"))) else {
        return Verification::MissingBuffer;
    };
    if compute_buffer_fingerprint(&bytes) == recorded {
        Verification::Ok
    } else {
        Verification::Mismatch
    }
}
