//! Heap counters and explicit collection for one engine runtime.

use std::cell::RefCell;
use std::collections::HashMap;

use host_api::Instrumentation;
use log::debug;
use serde::Serialize;

use crate::sys::{qjs, JSRuntime};

#[derive(Debug, Default, Serialize)]
struct GcStats {
    collections: u64,
    last_cause: Option<String>,
}

/// [`Instrumentation`] backed by the engine's memory-usage report.
pub struct QuickJsInstrumentation {
    rt: *mut JSRuntime,
    gc: RefCell<GcStats>,
}

impl QuickJsInstrumentation {
    pub(crate) fn new(rt: *mut JSRuntime) -> Self {
        Self {
            rt,
            gc: RefCell::new(GcStats::default()),
        }
    }
}

impl Instrumentation for QuickJsInstrumentation {
    fn get_recorded_gc_stats(&self) -> String {
        serde_json::to_string(&*self.gc.borrow()).unwrap_or_else(|_| "{}".to_string())
    }

    fn get_heap_info(&self, _include_expensive: bool) -> HashMap<String, i64> {
        let mut usage: qjs::JSMemoryUsage = unsafe { std::mem::zeroed() };
        unsafe { qjs::JS_ComputeMemoryUsage(self.rt, &mut usage) };

        [
            ("malloc_size", usage.malloc_size),
            ("memory_used_size", usage.memory_used_size),
            ("malloc_count", usage.malloc_count),
            ("memory_used_count", usage.memory_used_count),
            ("atom_size", usage.atom_size),
            ("str_size", usage.str_size),
            ("obj_size", usage.obj_size),
            ("prop_size", usage.prop_size),
            ("shape_size", usage.shape_size),
            ("js_func_size", usage.js_func_size),
            ("js_func_code_size", usage.js_func_code_size),
            ("js_func_pc2line_size", usage.js_func_pc2line_size),
            ("c_func_count", usage.c_func_count),
            ("array_count", usage.array_count),
            ("fast_array_count", usage.fast_array_count),
            ("fast_array_elements", usage.fast_array_elements),
            ("binary_object_size", usage.binary_object_size),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value as i64))
        .collect()
    }

    fn collect_garbage(&self, cause: &str) {
        debug!("collecting garbage: {}", cause);
        unsafe { qjs::JS_RunGC(self.rt) };
        let mut gc = self.gc.borrow_mut();
        gc.collections += 1;
        gc.last_cause = Some(cause.to_string());
    }
}
