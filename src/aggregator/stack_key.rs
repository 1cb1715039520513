//! Value identity for one sampled call stack.
//!
//! A stack is an ordered sequence of opaque 64-bit addresses. Two keys are the
//! same stack when they hold the same addresses in the same order, so
//! `[1, 2, 3]` and `[3, 2, 1]` are distinct identities.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Multiplier used when folding addresses into the stack hash
const HASH_MULTIPLIER: u64 = 37;

/// Immutable, owned address sequence used as a map key
///
/// **Public** - produced by `AggregationTable::record`, read back by queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackKey {
    addresses: Box<[u64]>,
}

impl StackKey {
    /// Build a key from an address sequence
    ///
    /// **Public** - constructor
    ///
    /// The addresses are copied, so later changes to the caller's buffer never
    /// reach the key. An empty slice is a valid zero-frame stack.
    pub fn new(addresses: &[u64]) -> Self {
        Self {
            addresses: addresses.into(),
        }
    }

    /// Addresses in the order they were sampled
    pub fn addresses(&self) -> &[u64] {
        &self.addresses
    }

    /// Give back the owned addresses
    pub fn into_addresses(self) -> Vec<u64> {
        self.addresses.into_vec()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Structural hash over the length and every address, in order
    ///
    /// **Public** - exposed so callers can bucket keys without a `Hasher`
    pub fn stack_hash(&self) -> u64 {
        self.addresses
            .iter()
            .fold(self.addresses.len() as u64, |h, &address| {
                h.wrapping_mul(HASH_MULTIPLIER).wrapping_add(address)
            })
    }
}

impl From<Vec<u64>> for StackKey {
    fn from(addresses: Vec<u64>) -> Self {
        Self {
            addresses: addresses.into_boxed_slice(),
        }
    }
}

impl Hash for StackKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.stack_hash());
    }
}

impl PartialOrd for StackKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StackKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.addresses.cmp(&other.addresses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equal_sequences_are_equal() {
        let a = StackKey::new(&[1, 2, 3]);
        let b = StackKey::new(&[1, 2, 3]);

        assert_eq!(a, b);
        assert_eq!(a.stack_hash(), b.stack_hash());
    }

    #[test]
    fn test_order_matters() {
        let a = StackKey::new(&[1, 2, 3]);
        let b = StackKey::new(&[3, 2, 1]);

        assert_ne!(a, b);
        assert_ne!(a.stack_hash(), b.stack_hash());
    }

    #[test]
    fn test_length_matters() {
        let a = StackKey::new(&[0]);
        let b = StackKey::new(&[0, 0]);

        assert_ne!(a, b);
        assert_ne!(a.stack_hash(), b.stack_hash());
    }

    #[test]
    fn test_hash_reference_values() {
        assert_eq!(StackKey::new(&[]).stack_hash(), 0);
        // h = 2; h = 2*37 + 10 = 84; h = 84*37 + 11 = 3119
        assert_eq!(StackKey::new(&[0xA, 0xB]).stack_hash(), 3119);
    }

    #[test]
    fn test_hash_wraps_instead_of_overflowing() {
        let key = StackKey::new(&[u64::MAX, u64::MAX, u64::MAX]);
        let _ = key.stack_hash();
    }

    #[test]
    fn test_key_owns_its_copy() {
        let mut buffer = vec![0x10, 0x20];
        let key = StackKey::new(&buffer);
        buffer[0] = 0xFF;

        assert_eq!(key.addresses(), &[0x10, 0x20]);
    }

    #[test]
    fn test_empty_stack_is_valid() {
        let key = StackKey::new(&[]);
        assert!(key.is_empty());
        assert_eq!(key.len(), 0);
    }

    #[test]
    fn test_lexicographic_order() {
        let mut keys = vec![
            StackKey::new(&[0xA, 0xC]),
            StackKey::new(&[0xA]),
            StackKey::new(&[0xA, 0xB]),
            StackKey::new(&[]),
        ];
        keys.sort();

        let sorted: Vec<&[u64]> = keys.iter().map(|k| k.addresses()).collect();
        assert_eq!(sorted, vec![&[][..], &[0xA][..], &[0xA, 0xB][..], &[0xA, 0xC][..]]);
    }

    #[test]
    fn test_usable_as_set_key() {
        let mut set = HashSet::new();
        set.insert(StackKey::new(&[1, 2]));
        set.insert(StackKey::from(vec![1, 2]));
        set.insert(StackKey::new(&[2, 1]));

        assert_eq!(set.len(), 2);
    }
}
