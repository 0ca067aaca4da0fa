use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a transaction. Pages record the id of the transaction that
/// last dirtied them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn{}", self.0)
    }
}

/// Hands out increasing transaction ids, starting at 1. Thread-safe.
#[derive(Debug)]
pub struct TransactionIdGenerator {
    next_id: AtomicU64,
}

impl TransactionIdGenerator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> TransactionId {
        TransactionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TransactionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_display() {
        assert_eq!(TransactionId::new(123).to_string(), "Txn123");
    }

    #[test]
    fn test_generator_sequence() {
        let generator = TransactionIdGenerator::new();
        let ids: Vec<u64> = (0..3).map(|_| generator.next().value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_generator_unique_across_threads() {
        let generator = Arc::new(TransactionIdGenerator::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || (0..100).map(|_| generator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
