//! Concurrent aggregation of sampled call stacks.
//!
//! This module is the core of the tool:
//! - `StackKey` gives an address sequence value identity
//! - `ProcessCounter` counts distinct stacks for one process
//! - `AggregationTable` maps process ids to counters and answers queries

pub mod process_counter;
pub mod stack_key;
pub mod table;

// Re-export main types
pub use process_counter::ProcessCounter;
pub use stack_key::StackKey;
pub use table::{AggregatedStack, AggregationTable, ProcessStack};
