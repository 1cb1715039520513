//! JSON dump output writer.
//!
//! A dump is the full `all_by_process` view of one report, with process names
//! and resolved frames attached, written to disk for later inspection.

use crate::aggregator::ProcessStack;
use crate::symbols::SymbolResolver;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Top-level dump structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDump {
    /// Schema version for compatibility checking
    pub version: String,

    /// Timestamp when the dump was generated
    pub generated_at: String,

    /// Sum of every stack count in the dump
    pub total_samples: u64,

    /// One entry per process, ordered by process id
    pub processes: Vec<ProcessDump>,
}

/// Stacks of one process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDump {
    pub process_id: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,

    /// Stacks ordered by count descending, then by addresses
    pub stacks: Vec<DumpStack>,
}

/// One stack with its resolved frames
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpStack {
    /// Raw addresses, leaf first
    pub addresses: Vec<u64>,

    /// Resolved frame names, same order as `addresses`
    pub frames: Vec<String>,

    pub count: u64,
}

/// Build a dump from an `all_by_process` result
///
/// **Public** - used by the report command before `write_dump`
pub fn build_dump(
    by_process: HashMap<i32, Vec<ProcessStack>>,
    resolver: &dyn SymbolResolver,
) -> StackDump {
    let mut processes: Vec<ProcessDump> = by_process
        .into_iter()
        .map(|(process_id, stacks)| {
            let mut stacks: Vec<DumpStack> = stacks
                .into_iter()
                .map(|stack| DumpStack {
                    frames: resolver.resolve(process_id, &stack.addresses),
                    addresses: stack.addresses,
                    count: stack.count,
                })
                .collect();
            stacks.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.addresses.cmp(&b.addresses))
            });

            ProcessDump {
                process_id,
                process_name: resolver.process_name(process_id),
                stacks,
            }
        })
        .collect();
    processes.sort_by_key(|process| process.process_id);

    let total_samples = processes
        .iter()
        .flat_map(|process| process.stacks.iter())
        .map(|stack| stack.count)
        .sum();

    StackDump {
        version: SCHEMA_VERSION.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        total_samples,
        processes,
    }
}

/// Write a dump to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `dump` - Dump to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_dump(dump: &StackDump, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing stack dump to: {}", output_path.display());

    validate_output_path(output_path)?;
    create_parent_dirs(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, dump).map_err(OutputError::SerializationFailed)?;

    info!(
        "Stack dump written ({} processes, {} samples)",
        dump.processes.len(),
        dump.total_samples
    );

    Ok(())
}

/// Read a dump from a JSON file
///
/// **Public** - used by the validate command and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_dump(input_path: impl AsRef<Path>) -> Result<StackDump, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading stack dump from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let dump: StackDump =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Stack dump loaded: version {}, {} processes",
        dump.version,
        dump.processes.len()
    );

    Ok(dump)
}

/// Reject empty paths and directories
pub(crate) fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

pub(crate) fn create_parent_dirs(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
