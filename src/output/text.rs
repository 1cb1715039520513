//! Text renderings of aggregated stacks.
//!
//! Two layouts are supported:
//! - Ranked report: hottest stacks first, one indented line per frame
//! - Folded stacks: "process;root;...;leaf count", the flame graph input format
//!
//! Example folded line: "nginx;main;handle_request;read 42"
//! This means: 42 samples of nginx were in read, called from handle_request,
//! called from main.

use crate::aggregator::{AggregatedStack, ProcessStack};
use crate::symbols::SymbolResolver;
use crate::utils::config::UNKNOWN_PROCESS_NAME;
use log::debug;
use std::collections::HashMap;

/// Render the ranked report body
///
/// **Public** - used by the report command for the default output
///
/// # Arguments
/// * `stacks` - Result of `AggregationTable::top_stacks`, already ordered
/// * `resolver` - Symbol backend for frames and process names
///
/// # Returns
/// One block per stack: a count line followed by the frames, leaf first
pub fn render_ranked(stacks: &[AggregatedStack], resolver: &dyn SymbolResolver) -> String {
    let mut out = String::new();

    for stack in stacks {
        let pid = stack.process_id;
        let name = process_label(resolver, pid);
        out.push_str(&format!("  {:>10} [{} {}]\n", stack.count, name, pid));

        for frame in resolver.resolve(pid, &stack.addresses) {
            out.push_str(&format!("    {}\n", frame));
        }
    }

    out
}

/// Render every stack as a folded line
///
/// **Public** - used for `--folded` output and flame graph input
///
/// # Arguments
/// * `dump` - Result of `AggregationTable::all_by_process`
/// * `resolver` - Symbol backend for frames and process names
/// * `min_count` - Stacks below this count are left out
///
/// # Returns
/// Folded lines sorted by process id, then by text, so repeated renders of
/// the same data are identical
pub fn render_folded(
    dump: &HashMap<i32, Vec<ProcessStack>>,
    resolver: &dyn SymbolResolver,
    min_count: u64,
) -> Vec<String> {
    let mut pids: Vec<i32> = dump.keys().copied().collect();
    pids.sort_unstable();

    let mut lines = Vec::new();
    for pid in pids {
        let name = sanitize_frame(&process_label(resolver, pid));

        let mut process_lines: Vec<String> = dump[&pid]
            .iter()
            .filter(|stack| stack.count >= min_count)
            .map(|stack| folded_line(&name, pid, stack, resolver))
            .collect();
        process_lines.sort_unstable();

        lines.extend(process_lines);
    }

    debug!("Rendered {} folded lines", lines.len());
    lines
}

/// Build one folded line; addresses are leaf first, folded frames root first
fn folded_line(
    process_name: &str,
    pid: i32,
    stack: &ProcessStack,
    resolver: &dyn SymbolResolver,
) -> String {
    let mut line = process_name.to_string();
    for frame in resolver.resolve(pid, &stack.addresses).iter().rev() {
        line.push(';');
        line.push_str(&sanitize_frame(frame));
    }
    line.push_str(&format!(" {}", stack.count));
    line
}

/// Frame names must not contain the folded separator
fn sanitize_frame(frame: &str) -> String {
    frame.replace(';', ":")
}

fn process_label(resolver: &dyn SymbolResolver, pid: i32) -> String {
    resolver
        .process_name(pid)
        .unwrap_or_else(|| UNKNOWN_PROCESS_NAME.to_string())
}
