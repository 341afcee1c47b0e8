//! Cache round trips, staleness and the read-through policy.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use winfetch::Result;
use winfetch::app::fetch_facts;
use winfetch::cache::FactsCache;
use winfetch::platform::SystemProbe;
use winfetch::system::{FactKey, FactValue, FactsCollector, SystemFacts};

fn sample_facts() -> SystemFacts {
    let mut values = BTreeMap::new();
    values.insert(FactKey::Os, FactValue::Known("Windows 11 Pro (10.0.22631) [64-bit]".to_string()));
    values.insert(FactKey::Cpu, FactValue::Known("Ryzen 7 @ 3.80GHz (8C/16T)".to_string()));
    values.insert(FactKey::Gpu, FactValue::Unknown);
    SystemFacts::new(values, Utc::now())
}

#[derive(Clone, Default)]
struct CountingProbe {
    calls: Arc<AtomicUsize>,
}

impl SystemProbe for CountingProbe {
    fn os(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("TestOS".to_string())
    }

    fn memory(&self) -> Result<String> {
        Ok("1.00 GiB / 2.00 GiB (50%)".to_string())
    }

    fn gpu(&self) -> Result<String> {
        Ok("Test GPU".to_string())
    }
}

#[test]
fn write_then_read_returns_the_same_snapshot() {
    let dir = TempDir::new().unwrap();
    let cache = FactsCache::new(dir.path().join("sysinfo.json"));
    let facts = sample_facts();

    cache.write(&facts).unwrap();
    let read = cache.read(Duration::from_secs(3600)).unwrap();
    assert_eq!(read, facts);
}

#[test]
fn zero_max_age_is_always_stale() {
    let dir = TempDir::new().unwrap();
    let cache = FactsCache::new(dir.path().join("sysinfo.json"));
    cache.write(&sample_facts()).unwrap();

    std::thread::sleep(Duration::from_millis(20));
    assert!(cache.read(Duration::ZERO).is_none());
    assert!(cache.read(Duration::from_secs(60)).is_some());
}

#[test]
fn old_snapshot_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = FactsCache::new(dir.path().join("sysinfo.json"));
    let old = SystemFacts::new(BTreeMap::new(), Utc::now() - chrono::Duration::seconds(600));
    cache.write(&old).unwrap();

    assert!(cache.read(Duration::from_secs(300)).is_none());
    assert!(cache.read(Duration::from_secs(900)).is_some());
}

#[test]
fn rewrite_replaces_previous_content() {
    let dir = TempDir::new().unwrap();
    let cache = FactsCache::new(dir.path().join("sysinfo.json"));
    cache.write(&SystemFacts::new(BTreeMap::new(), Utc::now())).unwrap();
    let facts = sample_facts();
    cache.write(&facts).unwrap();

    assert_eq!(cache.read(Duration::from_secs(60)).unwrap(), facts);
    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1, "temporary files must not be left behind");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_cache_collects_then_serves_from_disk() {
    let dir = TempDir::new().unwrap();
    let cache = FactsCache::new(dir.path().join("sysinfo.json"));
    let probe = CountingProbe::default();
    let calls = Arc::clone(&probe.calls);
    let collector = FactsCollector::new(probe);

    assert!(cache.read(Duration::from_secs(60)).is_none());

    let first = fetch_facts(&collector, &cache, Duration::from_secs(60), false).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for key in FactKey::ALL {
        let value = first.get(key);
        assert!(matches!(value, FactValue::Known(_) | FactValue::Unknown));
    }
    assert_eq!(first.display(FactKey::Os), "TestOS");
    assert_eq!(first.get(FactKey::Font), &FactValue::Unknown);

    let second = fetch_facts(&collector, &cache, Duration::from_secs(60), false).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second, first);
}

#[tokio::test(flavor = "multi_thread")]
async fn no_cache_skips_the_read_but_still_writes() {
    let dir = TempDir::new().unwrap();
    let cache = FactsCache::new(dir.path().join("sysinfo.json"));
    cache.write(&sample_facts()).unwrap();

    let probe = CountingProbe::default();
    let calls = Arc::clone(&probe.calls);
    let collector = FactsCollector::new(probe);

    let fresh = fetch_facts(&collector, &cache, Duration::from_secs(3600), true).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fresh.display(FactKey::Os), "TestOS");
    assert_eq!(cache.read(Duration::from_secs(3600)).unwrap(), fresh);
}

#[tokio::test(flavor = "multi_thread")]
async fn cached_unknown_gpu_is_collected_again() {
    let dir = TempDir::new().unwrap();
    let cache = FactsCache::new(dir.path().join("sysinfo.json"));
    cache.write(&sample_facts()).unwrap();

    let probe = CountingProbe::default();
    let calls = Arc::clone(&probe.calls);
    let collector = FactsCollector::new(probe);

    let facts = fetch_facts(&collector, &cache, Duration::from_secs(3600), false).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(facts.display(FactKey::Gpu), "Test GPU");
    assert_eq!(cache.read(Duration::from_secs(3600)).unwrap(), facts);
}

#[tokio::test(flavor = "multi_thread")]
async fn unwritable_cache_still_returns_facts() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x").unwrap();
    // parent is a regular file, so the directory cannot be created
    let cache = FactsCache::new(blocker.join("sysinfo.json"));
    assert!(cache.write(&sample_facts()).is_err());

    let collector = FactsCollector::new(CountingProbe::default());
    let facts = fetch_facts(&collector, &cache, Duration::from_secs(60), false).await;
    assert_eq!(facts.display(FactKey::Memory), "1.00 GiB / 2.00 GiB (50%)");
}
