//! Output writers for aggregated stacks.
//!
//! This module handles rendering and writing data in various formats:
//! - Ranked and folded text
//! - JSON dumps
//! - SVG flame graphs

pub mod json;
pub mod svg;
pub mod text;

// Re-export main functions
pub use json::{build_dump, read_dump, write_dump, DumpStack, ProcessDump, StackDump};
pub use svg::{render_flamegraph, write_svg, FlamegraphConfig};
pub use text::{render_folded, render_ranked};
