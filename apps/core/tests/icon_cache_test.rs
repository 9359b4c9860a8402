use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use appshelf_core::icon_cache::{
    rgba_len, IconCache, IconData, IconResolver, NoIcons, ICON_CACHE_CAPACITY,
};

struct CountingResolver {
    calls: AtomicUsize,
}

impl IconResolver for CountingResolver {
    fn resolve(&self, id: &str) -> Option<IconData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if id.starts_with("missing") {
            return None;
        }
        Some(IconData::placeholder(2, 2, 10, 20, 30))
    }
}

fn counting() -> Arc<CountingResolver> {
    Arc::new(CountingResolver {
        calls: AtomicUsize::new(0),
    })
}

#[test]
fn hits_do_not_resolve_again() {
    let resolver = counting();
    let cache = IconCache::new(resolver.clone());

    let first = cache.get("org.example.camera").unwrap();
    let second = cache.get("org.example.camera").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.pixels.len(), 16);
}

#[test]
fn unresolved_ids_are_not_cached() {
    let resolver = counting();
    let cache = IconCache::new(resolver.clone());

    assert!(cache.get("missing.app").is_none());
    assert!(cache.get("missing.app").is_none());

    assert!(cache.is_empty());
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn inserting_past_capacity_clears_the_cache() {
    let cache = IconCache::new(counting());

    for i in 0..ICON_CACHE_CAPACITY {
        cache.get(&format!("org.example.app{i}")).unwrap();
    }
    assert_eq!(cache.len(), ICON_CACHE_CAPACITY);

    cache.get("org.example.app0").unwrap();
    assert_eq!(cache.len(), ICON_CACHE_CAPACITY);

    cache.get("org.example.overflow").unwrap();
    assert_eq!(cache.len(), 1);
    assert!(cache.contains("org.example.overflow"));
    assert!(!cache.contains("org.example.app0"));
}

#[test]
fn closures_and_no_icons_resolve() {
    let cache = IconCache::with_capacity(
        Arc::new(|id: &str| (id == "a").then(|| IconData::placeholder(1, 1, 0, 0, 0))),
        4,
    );
    assert!(cache.get("a").is_some());
    assert!(cache.get("b").is_none());

    let empty = IconCache::new(Arc::new(NoIcons));
    assert!(empty.get("a").is_none());

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
#[cfg(target_pointer_width = "64")]
fn rgba_len_does_not_wrap_for_large_icons() {
    assert_eq!(rgba_len(2, 3), Some(24));
    assert_eq!(rgba_len(65_536, 65_536), Some(17_179_869_184));
    assert_eq!(rgba_len(u32::MAX, u32::MAX), None);
}
