//! Capture boundary: samples, sources, and upstream filters.
//!
//! This module handles:
//! - The `Sample` type handed to the aggregation table
//! - Reading recorded sample streams
//! - Process and kernel-frame filtering before `record`

pub mod filter;
pub mod sample;
pub mod source;

// Re-export main types
pub use filter::{is_kernel_address, ProcessFilter, SampleFilter};
pub use sample::{parse_sample_line, Sample};
pub use source::{MemorySource, ReplaySource, SampleSource};
