//! Wait-for-all barrier used by join edges.
//!
//! A join edge `[a, b, c] -> d` owns one barrier over `{a, b, c}`. Each completed source
//! marks itself seen; once all are seen the barrier fires and `d` is scheduled. Firing
//! resets the barrier, so in a cyclic graph the join can fire again on the next round.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct JoinBarrier<T>
where
    T: Clone + Debug + Hash + Eq,
{
    names: HashSet<T>,
    seen: HashSet<T>,
}

impl<T> JoinBarrier<T>
where
    T: Clone + Debug + Hash + Eq,
{
    pub fn from_names<I: IntoIterator<Item = T>>(names: I) -> Self {
        Self {
            names: names.into_iter().collect(),
            seen: HashSet::new(),
        }
    }

    /// Marks `name` as seen. Returns false for names the barrier does not wait on
    /// and for names already seen this round.
    pub fn mark_seen(&mut self, name: &T) -> bool {
        if !self.names.contains(name) {
            return false;
        }
        self.seen.insert(name.clone())
    }

    pub fn is_available(&self) -> bool {
        self.seen == self.names
    }

    pub fn pending_names(&self) -> HashSet<T> {
        self.names.difference(&self.seen).cloned().collect()
    }

    pub fn expected_names(&self) -> &HashSet<T> {
        &self.names
    }

    /// Resets the barrier if it was available; returns whether it fired.
    pub fn consume(&mut self) -> bool {
        if self.is_available() {
            self.seen.clear();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Barrier is not available until all names are seen.
    #[test]
    fn fires_after_all_sources() {
        let mut barrier = JoinBarrier::from_names(["french", "spanish"]);
        assert!(!barrier.is_available());
        assert!(barrier.mark_seen(&"french"));
        assert!(!barrier.consume());
        assert_eq!(barrier.pending_names().len(), 1);
        assert!(barrier.mark_seen(&"spanish"));
        assert!(barrier.consume());
        assert!(!barrier.is_available());
    }

    #[test]
    fn ignores_duplicates_and_strangers() {
        let mut barrier = JoinBarrier::from_names(["a"]);
        assert!(!barrier.mark_seen(&"z"));
        assert!(barrier.mark_seen(&"a"));
        assert!(!barrier.mark_seen(&"a"));
        assert_eq!(barrier.expected_names().len(), 1);
    }
}
