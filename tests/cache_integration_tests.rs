//! Integration Tests for the cache contract
//!
//! Every scenario runs against the embedded backend. The networked backend
//! runs the same scenarios when `CACHETTE_TEST_REDIS_URL` points at a Redis
//! server; otherwise those tests return early.

use std::collections::BTreeMap;
use std::thread::sleep;
use std::time::Duration;

use cachette::config::NetworkedConfig;
use cachette::store::{EmbeddedCache, NetworkedCache};
use cachette::{Cache, CacheError, CacheExt, Value};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// == Helper Functions ==

fn embedded_cache() -> (TempDir, EmbeddedCache) {
    let dir = TempDir::new().unwrap();
    let cache = EmbeddedCache::open(dir.path().join("cache")).unwrap();
    (dir, cache)
}

/// Opens a Redis-backed cache under a namespace private to `test_name`.
fn networked_cache(test_name: &str) -> Option<NetworkedCache> {
    let url = std::env::var("CACHETTE_TEST_REDIS_URL").ok()?;
    let config = NetworkedConfig {
        url: Some(url),
        prefix: format!("cachette-test-{}-{}", test_name, std::process::id()),
        max_active: 4,
        ..NetworkedConfig::default()
    };
    let cache = NetworkedCache::connect(&config).unwrap();
    cache.empty().unwrap();
    Some(cache)
}

fn run_on_all_backends(test_name: &str, scenario: fn(&dyn Cache)) {
    let (_dir, embedded) = embedded_cache();
    scenario(&embedded);

    match networked_cache(test_name) {
        Some(networked) => {
            scenario(&networked);
            networked.empty().unwrap();
        }
        None => eprintln!("CACHETTE_TEST_REDIS_URL not set; skipping networked run of {}", test_name),
    }
}

fn sample_page() -> Value {
    let mut meta = BTreeMap::new();
    meta.insert("draft".to_string(), Value::Bool(false));
    meta.insert("views".to_string(), Value::UInt(1024));
    meta.insert("score".to_string(), Value::Float(4.75));
    meta.insert("owner".to_string(), Value::Nil);

    let mut page = BTreeMap::new();
    page.insert("title".to_string(), Value::from("Home"));
    page.insert("offset".to_string(), Value::Int(-3));
    page.insert(
        "tags".to_string(),
        Value::List(vec![Value::from("a"), Value::from("b")]),
    );
    page.insert("meta".to_string(), Value::Map(meta));
    page.insert("etag".to_string(), Value::Bytes(vec![0, 159, 255]));
    Value::Map(page)
}

// == Scenarios ==

fn scenario_has(cache: &dyn Cache) {
    cache.forget("test").unwrap();
    assert!(!cache.has("test").unwrap(), "test found in cache but it should not be there");

    cache.set("test", Value::from("hello world"), None).unwrap();
    assert!(cache.has("test").unwrap(), "test not found in cache but it should be there");

    cache.forget("test").unwrap();
}

fn scenario_get(cache: &dyn Cache) {
    cache.set("test", Value::from("hello world"), None).unwrap();
    assert_eq!(cache.get("test").unwrap(), Value::from("hello world"));

    assert!(matches!(cache.get("absent"), Err(CacheError::NotFound(_))));
}

fn scenario_round_trip_shapes(cache: &dyn Cache) {
    let values = vec![
        ("nil", Value::Nil),
        ("bool", Value::Bool(true)),
        ("int", Value::Int(i64::MIN)),
        ("uint", Value::UInt(u64::MAX)),
        ("float", Value::Float(-0.125)),
        ("string", Value::from("ünïcødé")),
        ("empty", Value::from("")),
        ("page", sample_page()),
    ];

    for (key, value) in &values {
        cache.set(key, value.clone(), None).unwrap();
    }
    for (key, value) in &values {
        assert_eq!(&cache.get(key).unwrap(), value, "round trip of '{}'", key);
    }
}

fn scenario_overwrite(cache: &dyn Cache) {
    cache.set("key", Value::Int(1), None).unwrap();
    cache.set("key", Value::from("two"), None).unwrap();
    assert_eq!(cache.get("key").unwrap(), Value::from("two"));
}

fn scenario_forget(cache: &dyn Cache) {
    cache.set("one", Value::from("two"), None).unwrap();

    cache.forget("one").unwrap();
    assert!(!cache.has("one").unwrap(), "one found in cache but it should not be there");

    // Forgetting an absent key is not an error.
    cache.forget("one").unwrap();
    cache.forget("never-set").unwrap();
}

fn scenario_empty(cache: &dyn Cache) {
    for key in ["one", "two", "nested:three"] {
        cache.set(key, Value::from(key), None).unwrap();
    }

    cache.empty().unwrap();

    for key in ["one", "two", "nested:three"] {
        assert!(!cache.has(key).unwrap(), "{} found in cache but it should not be there", key);
    }
}

fn scenario_empty_by_match(cache: &dyn Cache) {
    cache.set("one", Value::from("two"), None).unwrap();
    cache.set("three", Value::from("four"), None).unwrap();

    cache.empty_by_match("o").unwrap();

    assert!(!cache.has("one").unwrap(), "one found in cache but it should not be there");
    assert!(cache.has("three").unwrap(), "three not found in cache but it should be there");
    assert_eq!(cache.get("three").unwrap(), Value::from("four"));
}

fn scenario_glob_characters_match_literally(cache: &dyn Cache) {
    cache.set("a*1", Value::Int(1), None).unwrap();
    cache.set("ab", Value::Int(2), None).unwrap();

    cache.empty_by_match("a*").unwrap();

    assert!(!cache.has("a*1").unwrap());
    assert!(cache.has("ab").unwrap());
}

fn scenario_ttl_expiry(cache: &dyn Cache) {
    cache.set("short", Value::from("lived"), Some(1)).unwrap();
    cache.set("long", Value::from("lived"), Some(3600)).unwrap();
    assert!(cache.has("short").unwrap());

    sleep(Duration::from_millis(1500));

    assert!(!cache.has("short").unwrap());
    assert!(matches!(cache.get("short"), Err(CacheError::NotFound(_))));
    assert!(cache.has("long").unwrap());
}

fn scenario_zero_ttl(cache: &dyn Cache) {
    cache.set("key", Value::Int(1), None).unwrap();
    cache.set("key", Value::Int(2), Some(0)).unwrap();
    assert!(!cache.has("key").unwrap());
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct RenderedPage {
    path: String,
    status: u16,
    headers: Vec<(String, String)>,
}

fn scenario_json_helpers(cache: &dyn Cache) {
    let page = RenderedPage {
        path: "/about".to_string(),
        status: 200,
        headers: vec![("content-type".to_string(), "text/html".to_string())],
    };

    cache.set_json("page:/about", &page, Some(60)).unwrap();
    let loaded: RenderedPage = cache.get_json("page:/about").unwrap();
    assert_eq!(loaded, page);
}

// == Tests ==

#[test]
fn test_has() {
    run_on_all_backends("has", scenario_has);
}

#[test]
fn test_get() {
    run_on_all_backends("get", scenario_get);
}

#[test]
fn test_round_trip_shapes() {
    run_on_all_backends("shapes", scenario_round_trip_shapes);
}

#[test]
fn test_overwrite() {
    run_on_all_backends("overwrite", scenario_overwrite);
}

#[test]
fn test_forget() {
    run_on_all_backends("forget", scenario_forget);
}

#[test]
fn test_empty() {
    run_on_all_backends("empty", scenario_empty);
}

#[test]
fn test_empty_by_match() {
    run_on_all_backends("match", scenario_empty_by_match);
}

#[test]
fn test_glob_characters_match_literally() {
    run_on_all_backends("glob", scenario_glob_characters_match_literally);
}

#[test]
fn test_ttl_expiry() {
    run_on_all_backends("ttl", scenario_ttl_expiry);
}

#[test]
fn test_zero_ttl() {
    run_on_all_backends("zero-ttl", scenario_zero_ttl);
}

#[test]
fn test_json_helpers() {
    run_on_all_backends("json", scenario_json_helpers);
}

#[test]
fn test_shared_across_threads() {
    let (_dir, cache) = embedded_cache();
    let cache = std::sync::Arc::new(cache);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("t{}:{}", t, i);
                    cache.set(&key, Value::Int(i), None).unwrap();
                    assert_eq!(cache.get(&key).unwrap(), Value::Int(i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    cache.empty_by_match("t3:").unwrap();
    assert!(!cache.has("t3:50").unwrap());
    assert!(cache.has("t4:50").unwrap());
}

#[test]
fn test_networked_empty_stays_in_namespace() {
    let (Some(mine), Some(theirs)) = (networked_cache("ns-mine"), networked_cache("ns-theirs"))
    else {
        eprintln!("CACHETTE_TEST_REDIS_URL not set; skipping");
        return;
    };

    mine.set("shared", Value::Int(1), None).unwrap();
    theirs.set("shared", Value::Int(2), None).unwrap();

    mine.empty().unwrap();

    assert!(!mine.has("shared").unwrap());
    assert_eq!(theirs.get("shared").unwrap(), Value::Int(2));
    theirs.empty().unwrap();
}

/// One step of the shared call sequence used by the equivalence test.
fn apply_step(cache: &dyn Cache, step: usize) {
    match step {
        0 => {
            for key in ["one", "only", "three", "tree"] {
                cache.set(key, Value::from(key), None).unwrap();
            }
        }
        1 => cache.forget("three").unwrap(),
        2 => cache.empty_by_match("on").unwrap(),
        3 => cache.set("one", sample_page(), Some(3600)).unwrap(),
        4 => cache.set("tree", Value::Int(7), Some(0)).unwrap(),
        _ => cache.empty().unwrap(),
    }
}

fn observe(cache: &dyn Cache) -> Vec<(bool, Option<Value>)> {
    ["one", "only", "three", "tree"]
        .iter()
        .map(|key| (cache.has(key).unwrap(), cache.get(key).ok()))
        .collect()
}

#[test]
fn test_backends_observe_identical_results() {
    let Some(networked) = networked_cache("equivalence") else {
        eprintln!("CACHETTE_TEST_REDIS_URL not set; skipping");
        return;
    };
    let (_dir, embedded) = embedded_cache();

    for step in 0..=5 {
        apply_step(&embedded, step);
        apply_step(&networked, step);
        assert_eq!(
            observe(&embedded),
            observe(&networked),
            "backends diverged after step {}",
            step
        );
    }
    networked.empty().unwrap();
}
