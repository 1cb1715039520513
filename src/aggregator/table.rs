//! Cross-process aggregation table.
//!
//! The table is the single surface the rest of the tool talks to:
//! - Producers call [`AggregationTable::record`] once per sample
//! - The reporter calls [`AggregationTable::top_stacks`] or
//!   [`AggregationTable::all_by_process`], then [`AggregationTable::reset`]
//!
//! The live data sits in a *generation*: a concurrent `pid -> counter` map.
//! Reset swaps in an empty generation instead of deleting entries, so a
//! cleared table is never observed half-empty. A record that grabbed the old
//! generation just before the swap writes into it and is discarded with it.

use super::process_counter::ProcessCounter;
use super::stack_key::StackKey;
use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Generation = DashMap<i32, Arc<ProcessCounter>>;

/// One ranked stack returned by `top_stacks`
///
/// **Public** - consumed by the reporting loop and output writers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedStack {
    /// Process that owns the stack
    pub process_id: i32,

    /// Addresses in sampled order (leaf first for most capture sources)
    pub addresses: Vec<u64>,

    /// Number of samples seen since the last reset
    pub count: u64,
}

/// One stack inside a per-process dump
///
/// **Public** - values of the `all_by_process` map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStack {
    pub addresses: Vec<u64>,
    pub count: u64,
}

/// Concurrent `pid -> stack counts` table
///
/// **Public** - main entry point of the aggregation core
///
/// Safe to share across threads behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct AggregationTable {
    generation: RwLock<Arc<Generation>>,
}

impl Default for AggregationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationTable {
    pub fn new() -> Self {
        Self {
            generation: RwLock::new(Arc::new(Generation::new())),
        }
    }

    /// Count one sampled stack for `process_id`
    ///
    /// **Public** - producer entry point, called concurrently
    ///
    /// The per-process counter is created through `DashMap::entry`, so racing
    /// first samples for a pid agree on a single counter and no loser is ever
    /// built.
    pub fn record(&self, process_id: i32, addresses: &[u64]) {
        let generation = self.current();

        let counter = match generation.get(&process_id) {
            Some(counter) => Arc::clone(counter.value()),
            None => {
                let entry = generation
                    .entry(process_id)
                    .or_insert_with(|| Arc::new(ProcessCounter::new(process_id)));
                Arc::clone(entry.value())
            }
        };

        counter.increment(StackKey::new(addresses));
    }

    /// Highest-count stacks across every process
    ///
    /// **Public** - ranked reporting query
    ///
    /// # Arguments
    /// * `limit` - Maximum number of stacks to return
    /// * `min_count` - Stacks below this count are skipped
    ///
    /// # Returns
    /// Stacks sorted by count descending. Equal counts are ordered by process
    /// id, then by address sequence, both ascending.
    pub fn top_stacks(&self, limit: usize, min_count: u64) -> Vec<AggregatedStack> {
        if limit == 0 {
            return Vec::new();
        }

        let counters = self.counters();
        let mut stacks: Vec<AggregatedStack> = counters
            .iter()
            .flat_map(|counter| {
                let process_id = counter.process_id();
                counter
                    .iter()
                    .filter(move |(_, count)| *count >= min_count)
                    .map(move |(key, count)| AggregatedStack {
                        process_id,
                        addresses: key.into_addresses(),
                        count,
                    })
            })
            .collect();

        let candidates = stacks.len();

        stacks.sort_unstable_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.process_id.cmp(&b.process_id))
                .then_with(|| a.addresses.cmp(&b.addresses))
        });
        stacks.truncate(limit);

        debug!(
            "Top stacks: {} of {} candidates (limit {}, min count {})",
            stacks.len(),
            candidates,
            limit,
            min_count
        );

        stacks
    }

    /// Every tracked stack grouped by process
    ///
    /// **Public** - full dump for folded output and JSON export
    pub fn all_by_process(&self) -> HashMap<i32, Vec<ProcessStack>> {
        self.counters()
            .iter()
            .map(|counter| {
                let stacks = counter
                    .iter()
                    .map(|(key, count)| ProcessStack {
                        addresses: key.into_addresses(),
                        count,
                    })
                    .collect();
                (counter.process_id(), stacks)
            })
            .collect()
    }

    /// Drop every counter at once
    ///
    /// **Public** - called by the reporter after each report
    ///
    /// Only waits for producers that are in the middle of cloning the
    /// generation handle.
    pub fn reset(&self) {
        let fresh = Arc::new(Generation::new());
        let previous = {
            let mut guard = match self.generation.write() {
                Ok(guard) => guard,
                Err(err) => err.into_inner(),
            };
            std::mem::replace(&mut *guard, fresh)
        };

        debug!("Reset aggregation table ({} processes dropped)", previous.len());
    }

    /// Number of processes with at least one sample
    pub fn process_count(&self) -> usize {
        self.current().len()
    }

    /// Number of distinct `(pid, stack)` entries
    pub fn stack_count(&self) -> usize {
        self.counters().iter().map(|counter| counter.len()).sum()
    }

    /// Sum of every count in the table
    pub fn total_samples(&self) -> u64 {
        self.counters()
            .iter()
            .map(|counter| counter.iter().map(|(_, count)| count).sum::<u64>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    fn current(&self) -> Arc<Generation> {
        let guard = match self.generation.read() {
            Ok(guard) => guard,
            Err(err) => err.into_inner(),
        };
        Arc::clone(&guard)
    }

    /// Detach the counters from the generation map so the map's shard locks
    /// are not held while the counters are walked.
    fn counters(&self) -> Vec<Arc<ProcessCounter>> {
        self.current()
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
