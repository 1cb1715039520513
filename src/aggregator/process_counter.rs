//! Per-process stack occurrence counts.

use super::stack_key::StackKey;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Concurrent `StackKey -> count` map for a single process
///
/// **Public** - owned by `AggregationTable`, one per process id
#[derive(Debug)]
pub struct ProcessCounter {
    process_id: i32,
    stacks: DashMap<StackKey, AtomicU64>,
}

impl ProcessCounter {
    /// Create an empty counter for `process_id`
    pub fn new(process_id: i32) -> Self {
        Self {
            process_id,
            stacks: DashMap::new(),
        }
    }

    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    /// Count one more occurrence of `key`
    ///
    /// **Public** - called on the record hot path from many threads
    ///
    /// Existing stacks only take a shard read lock. A new stack goes through
    /// `entry`, so concurrent first sightings of the same stack collapse into
    /// one entry and every caller's increment lands on it.
    pub fn increment(&self, key: StackKey) {
        if let Some(count) = self.stacks.get(&key) {
            count.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.stacks
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Current count for `key`, zero when never seen
    pub fn count(&self, key: &StackKey) -> u64 {
        self.stacks
            .get(key)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Walk every `(stack, count)` pair
    ///
    /// **Public** - used by table queries
    ///
    /// Each pair is read atomically, but the walk as a whole is not a
    /// snapshot: increments racing with it may or may not be seen.
    ///
    /// The walk holds one shard read lock at a time. Increments of stacks
    /// already present never wait on it; inserting a new stack into the shard
    /// being walked waits until that shard is done.
    pub fn iter(&self) -> impl Iterator<Item = (StackKey, u64)> + '_ {
        self.stacks
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
    }

    /// Number of distinct stacks
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_increment_creates_entry() {
        let counter = ProcessCounter::new(7);
        counter.increment(StackKey::new(&[1, 2, 3]));

        assert_eq!(counter.process_id(), 7);
        assert_eq!(counter.len(), 1);
        assert_eq!(counter.count(&StackKey::new(&[1, 2, 3])), 1);
    }

    #[test]
    fn test_repeat_increments_accumulate() {
        let counter = ProcessCounter::new(1);
        counter.increment(StackKey::new(&[1, 2, 3]));
        counter.increment(StackKey::new(&[1, 2, 3]));
        counter.increment(StackKey::new(&[3, 2, 1]));

        assert_eq!(counter.len(), 2);
        assert_eq!(counter.count(&StackKey::new(&[1, 2, 3])), 2);
        assert_eq!(counter.count(&StackKey::new(&[3, 2, 1])), 1);
        assert_eq!(counter.count(&StackKey::new(&[9])), 0);
    }

    #[test]
    fn test_iter_is_restartable() {
        let counter = ProcessCounter::new(1);
        counter.increment(StackKey::new(&[1]));
        counter.increment(StackKey::new(&[2]));

        let first: u64 = counter.iter().map(|(_, count)| count).sum();
        let second: u64 = counter.iter().map(|(_, count)| count).sum();

        assert_eq!(first, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_known_stacks_increment_during_walk() {
        let counter = Arc::new(ProcessCounter::new(1));
        for address in 0..64u64 {
            counter.increment(StackKey::new(&[address]));
        }

        // Park a walk partway so it holds a shard read lock
        let mut walk = counter.iter();
        assert!(walk.next().is_some());

        let writer = {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..10 {
                    for address in 0..64u64 {
                        counter.increment(StackKey::new(&[address]));
                    }
                }
            })
        };
        writer.join().unwrap();
        drop(walk);

        for address in 0..64u64 {
            assert_eq!(counter.count(&StackKey::new(&[address])), 11);
        }
    }

    #[test]
    fn test_concurrent_first_sightings_share_one_entry() {
        let counter = Arc::new(ProcessCounter::new(1));
        let threads = 8;
        let per_thread = 1_000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        counter.increment(StackKey::new(&[0xDEAD, 0xBEEF]));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.len(), 1);
        assert_eq!(
            counter.count(&StackKey::new(&[0xDEAD, 0xBEEF])),
            threads * per_thread
        );
    }
}
