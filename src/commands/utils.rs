use crate::output::read_dump;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate a stack dump JSON file
pub fn validate_dump_file(file_path: &Path) -> Result<()> {
    println!("Validating stack dump: {}", file_path.display());

    let dump = read_dump(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    if dump.version != SCHEMA_VERSION {
        anyhow::bail!(
            "Unsupported dump version {} (expected {})",
            dump.version,
            SCHEMA_VERSION
        );
    }

    let counted: u64 = dump
        .processes
        .iter()
        .flat_map(|process| process.stacks.iter())
        .map(|stack| stack.count)
        .sum();
    if counted != dump.total_samples {
        anyhow::bail!(
            "total_samples is {} but stacks add up to {}",
            dump.total_samples,
            counted
        );
    }

    let stacks: usize = dump.processes.iter().map(|p| p.stacks.len()).sum();

    println!("✓ Valid stack dump JSON");
    println!("  Version: {}", dump.version);
    println!("  Generated: {}", dump.generated_at);
    println!("  Processes: {}", dump.processes.len());
    println!("  Stacks: {}", stacks);
    println!("  Samples: {}", dump.total_samples);

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("Live Stacks v{}", env!("CARGO_PKG_VERSION"));
    println!("Dump Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Aggregates live call-stack samples per process and reports the hottest stacks.");
}
