//! Live Stacks
//!
//! In-memory aggregation core of a live call-stack sampling tool.
//!
//! Many producer threads feed sampled stacks into an
//! [`AggregationTable`](aggregator::AggregationTable); a periodic reporter
//! asks it for the hottest stacks or a full per-process dump, then resets it.
//!
//! ## Getting Started
//!
//! ```
//! use live_stacks::aggregator::AggregationTable;
//!
//! let table = AggregationTable::new();
//! table.record(100, &[0xA, 0xB]);
//! table.record(100, &[0xA, 0xB]);
//!
//! let top = table.top_stacks(10, 1);
//! assert_eq!(top[0].count, 2);
//! ```
//!
//! Most users run the CLI on a recorded sample stream:
//!
//! ```bash
//! live-stacks report --input samples.txt --top 5
//! ```

pub mod aggregator;
pub mod capture;
pub mod commands;
pub mod output;
pub mod symbols;
pub mod utils;
