//! How node outputs are merged into graph state.
//!
//! Every node returns an `S`. The updater decides what of it lands in the run's state:
//! [`ReplaceUpdater`] takes the node's value wholesale, [`FieldBasedUpdater`] lets each
//! field pick its own rule. With a field-based updater, nodes return partial states:
//! `S::default()` plus the fields they changed. Accumulating fields (lists that parallel
//! branches all contribute to) carry only the new items and use [`append`]; scalar
//! fields use [`merge_if_set`] so an untouched (default) value leaves the state alone.
//!
//! ```rust,ignore
//! use skein::channels::{append, merge_if_set, FieldBasedUpdater};
//!
//! #[derive(Clone, Debug, Default)]
//! struct State { sections: Vec<String>, report: String }
//!
//! let updater = FieldBasedUpdater::new(|current: &mut State, update: &State| {
//!     append(&mut current.sections, &update.sections);
//!     merge_if_set(&mut current.report, &update.report);
//! });
//! ```

use std::fmt::Debug;
use std::sync::Arc;

/// Merges a node's output into the current state.
///
/// Called once per completed task, in scheduling order, after each superstep.
pub trait StateUpdater<S>: Send + Sync + Debug
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn apply_update(&self, current: &mut S, update: &S);
}

/// Replaces the whole state with the node's output. Last writer wins.
#[derive(Debug, Clone, Default)]
pub struct ReplaceUpdater;

impl<S> StateUpdater<S> for ReplaceUpdater
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn apply_update(&self, current: &mut S, update: &S) {
        *current = update.clone();
    }
}

/// Field-by-field merge driven by a closure.
pub struct FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    updater_fn: F,
    _marker: std::marker::PhantomData<fn(S)>,
}

impl<S, F> Debug for FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBasedUpdater")
            .field("updater_fn", &"<function>")
            .finish()
    }
}

impl<S, F> FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    pub fn new(updater_fn: F) -> Self {
        Self {
            updater_fn,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<S, F> StateUpdater<S> for FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    fn apply_update(&self, current: &mut S, update: &S) {
        (self.updater_fn)(current, update);
    }
}

pub type BoxedStateUpdater<S> = Arc<dyn StateUpdater<S>>;

pub fn boxed_updater<S, U>(updater: U) -> BoxedStateUpdater<S>
where
    S: Clone + Send + Sync + Debug + 'static,
    U: StateUpdater<S> + 'static,
{
    Arc::new(updater)
}

/// Reducer for accumulating lists: concatenates the update's items.
///
/// Concatenation is associative, so the union of parallel contributions does not
/// depend on which branch finished first.
pub fn append<T: Clone>(current: &mut Vec<T>, update: &[T]) {
    current.extend(update.iter().cloned());
}

/// Reducer for optional scalars: overwrites only when the update carries a value.
pub fn merge_if_set<T: Clone + Default + PartialEq>(current: &mut T, update: &T) {
    if *update != T::default() {
        *current = update.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Default)]
    struct TestState {
        messages: Vec<String>,
        count: i32,
        report: String,
    }

    #[test]
    fn replace_updater_replaces_state() {
        let mut current = TestState {
            messages: vec!["old".into()],
            count: 10,
            ..Default::default()
        };
        let update = TestState {
            messages: vec!["new".into()],
            count: 20,
            ..Default::default()
        };
        ReplaceUpdater.apply_update(&mut current, &update);
        assert_eq!(current, update);
    }

    /// **Scenario**: A field-based updater appends lists and overwrites scalars.
    #[test]
    fn field_based_updater_mixes_rules() {
        let updater: BoxedStateUpdater<TestState> =
            boxed_updater(FieldBasedUpdater::new(|c: &mut TestState, u: &TestState| {
                append(&mut c.messages, &u.messages);
                c.count += u.count;
                merge_if_set(&mut c.report, &u.report);
            }));
        let mut current = TestState {
            messages: vec!["a".into()],
            count: 1,
            report: "draft".into(),
        };
        updater.apply_update(
            &mut current,
            &TestState {
                messages: vec!["b".into()],
                count: 2,
                report: String::new(),
            },
        );
        assert_eq!(current.messages, vec!["a", "b"]);
        assert_eq!(current.count, 3);
        assert_eq!(current.report, "draft");
    }

    /// **Scenario**: Partial updates from parallel branches merge to the same union in
    /// either order.
    #[test]
    fn append_is_order_insensitive_as_a_set() {
        let mut one = vec!["x".to_string()];
        append(&mut one, &["a".to_string()]);
        append(&mut one, &["b".to_string()]);
        let mut two = vec!["x".to_string()];
        append(&mut two, &["b".to_string()]);
        append(&mut two, &["a".to_string()]);
        one.sort();
        two.sort();
        assert_eq!(one, two);
    }

    #[test]
    fn merge_if_set_ignores_default() {
        let mut n = 3;
        merge_if_set(&mut n, &0);
        assert_eq!(n, 3);
        merge_if_set(&mut n, &5);
        assert_eq!(n, 5);
    }
}
