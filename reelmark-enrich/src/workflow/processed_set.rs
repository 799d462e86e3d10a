//! Bounded identity set of processed elements

use std::collections::{HashSet, VecDeque};

use crate::page::ElementToken;

pub const DEFAULT_PROCESSED_CAPACITY: usize = 10_000;

/// Tokens of elements that already went through Collect
///
/// At capacity the oldest token is evicted, so an element that has been on
/// the page for a very long time could be enriched again.
#[derive(Debug)]
pub struct ProcessedSet {
    seen: HashSet<ElementToken>,
    order: VecDeque<ElementToken>,
    capacity: usize,
}

impl ProcessedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a token; returns false if it was already present
    pub fn insert(&mut self, token: ElementToken) -> bool {
        if !self.seen.insert(token) {
            return false;
        }

        self.order.push_back(token);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, token: &ElementToken) -> bool {
        self.seen.contains(token)
    }

    /// Forget a token so the element is enriched again
    pub fn remove(&mut self, token: &ElementToken) -> bool {
        if self.seen.remove(token) {
            self.order.retain(|t| t != token);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for ProcessedSet {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_once() {
        let mut set = ProcessedSet::default();
        let token = ElementToken::new();

        assert!(set.insert(token));
        assert!(!set.insert(token));
        assert!(set.contains(&token));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut set = ProcessedSet::new(2);
        let (a, b, c) = (ElementToken::new(), ElementToken::new(), ElementToken::new());

        set.insert(a);
        set.insert(b);
        set.insert(c);

        assert!(!set.contains(&a));
        assert!(set.contains(&b));
        assert!(set.contains(&c));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut set = ProcessedSet::default();
        let (a, b) = (ElementToken::new(), ElementToken::new());
        set.insert(a);
        set.insert(b);

        assert!(set.remove(&a));
        assert!(!set.remove(&a));
        assert!(set.insert(a));

        set.clear();
        assert!(set.is_empty());
    }
}
