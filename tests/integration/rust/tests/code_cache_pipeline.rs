//! Bytecode cache across runtimes and configurations

use std::sync::Arc;

use host_api::Runtime;
use integration_tests::run;
use quickjs_runtime::{CodeCache, QuickJsRuntime, RuntimeConfig};

#[test]
fn test_cache_persists_across_runtime_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig::default().with_code_cache_dir(dir.path().to_path_buf());
    let source = "function square(x) { return x * x; } square(12)";

    {
        let rt = QuickJsRuntime::new(config.clone()).unwrap();
        assert_eq!(run(rt.as_runtime(), source, "app/square.js").unwrap().as_number(), Some(144.0));
        let stats = rt.code_cache().unwrap().stats();
        assert_eq!((stats.misses, stats.writes), (1, 1));
    }

    let rt = QuickJsRuntime::new(config).unwrap();
    assert_eq!(run(rt.as_runtime(), source, "app/square.js").unwrap().as_number(), Some(144.0));
    let stats = rt.code_cache().unwrap().stats();
    assert_eq!((stats.hits, stats.writes), (1, 0));
}

#[test]
fn test_cached_functions_stay_callable() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(CodeCache::new(dir.path()));
    let lib = "function twice(s) { return s + s; }";
    for _ in 0..2 {
        let rt = QuickJsRuntime::with_code_cache(RuntimeConfig::default(), cache.clone()).unwrap();
        run(rt.as_runtime(), lib, "lib.js").unwrap();
        let out = run(rt.as_runtime(), "twice('ab')", "use.js").unwrap();
        assert_eq!(out.as_utf8(rt.as_runtime()).unwrap().as_deref(), Some("abab"));
    }
    assert_eq!(cache.stats().hits, 2);
}

#[test]
fn test_config_from_json_drives_cache_location() {
    let dir = tempfile::tempdir().unwrap();
    let json = serde_json::json!({
        "code_cache_dir": dir.path(),
        "runtime_info": "integration",
    })
    .to_string();
    let config = RuntimeConfig::from_json(&json).unwrap();
    let rt = QuickJsRuntime::new(config).unwrap();
    assert_eq!(rt.description(), "integration");

    run(rt.as_runtime(), "0", "from-json.js").unwrap();
    assert!(dir.path().join("from-json.js").exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = RuntimeConfig::from_json("{ \"max_stack_size\": \"big\" }").unwrap_err();
    assert!(matches!(err, host_api::JsiError::Config(_)));
}

#[test]
fn test_removed_entry_is_recompiled() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(CodeCache::new(dir.path()));
    let rt = QuickJsRuntime::with_code_cache(RuntimeConfig::default(), cache.clone()).unwrap();
    run(rt.as_runtime(), "1", "gone.js").unwrap();
    cache.remove("gone.js").unwrap();
    run(rt.as_runtime(), "1", "gone.js").unwrap();
    assert_eq!(cache.stats().misses, 2);
    assert_eq!(cache.stats().writes, 2);
}
