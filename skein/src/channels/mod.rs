//! State channels: merge rules for node outputs and the join-edge barrier.

mod join_barrier;
mod updater;

pub use join_barrier::JoinBarrier;
pub use updater::{
    append, boxed_updater, merge_if_set, BoxedStateUpdater, FieldBasedUpdater, ReplaceUpdater,
    StateUpdater,
};
