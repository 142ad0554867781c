//! Heap and garbage-collector introspection.

use std::collections::HashMap;

/// Introspection hooks exposed by a runtime.
pub trait Instrumentation {
    /// JSON summary of the collections requested so far.
    fn get_recorded_gc_stats(&self) -> String;

    /// Snapshot of named heap counters.
    ///
    /// `include_expensive` asks for counters that require walking the heap;
    /// implementations may ignore it.
    fn get_heap_info(&self, include_expensive: bool) -> HashMap<String, i64>;

    /// Runs a full collection now. `cause` is recorded for diagnostics.
    fn collect_garbage(&self, cause: &str);
}
