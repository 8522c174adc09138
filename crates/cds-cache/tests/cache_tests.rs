use cds_cache::{CacheKey, EntityCache};
use cds_model::ProjectKey;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Put(String, u32),
    Load(String, u32),
    Rekey(String, String),
    Evict(String),
    Mark(String),
}

fn key(name: &str) -> CacheKey {
    CacheKey::new(ProjectKey::new("proj").unwrap(), name)
}

fn name() -> impl Strategy<Value = String> {
    prop_oneof![Just("a"), Just("b"), Just("c")].prop_map(str::to_string)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (name(), any::<u32>()).prop_map(|(n, v)| Op::Put(n, v)),
        (name(), any::<u32>()).prop_map(|(n, v)| Op::Load(n, v)),
        (name(), name()).prop_map(|(a, b)| Op::Rekey(a, b)),
        name().prop_map(Op::Evict),
        name().prop_map(Op::Mark),
    ]
}

fn apply(cache: &EntityCache<u32>, op: &Op) {
    match op {
        Op::Put(n, v) => {
            cache.put(key(n), *v);
        }
        Op::Load(n, v) => {
            cache.load(key(n), *v);
        }
        Op::Rekey(from, to) => {
            let value = cache.get(&key(from)).map_or(0, |v| *v);
            cache.rekey(&key(from), key(to), value);
        }
        Op::Evict(n) => {
            cache.evict(&key(n));
        }
        Op::Mark(n) => {
            cache.mark_external(&key(n));
        }
    }
}

#[test]
fn rename_leaves_single_entry() {
    let cache = EntityCache::new();
    cache.load(key("a"), 1u32);
    cache.rekey(&key("a"), key("b"), 1);

    assert!(!cache.contains(&key("a")));
    assert!(cache.contains(&key("b")));
    assert_eq!(cache.len(), 1);
}

#[test]
fn rekey_onto_same_key_keeps_entry() {
    let cache = EntityCache::new();
    cache.load(key("a"), 1u32);
    cache.rekey(&key("a"), key("a"), 2);
    assert_eq!(cache.get(&key("a")).as_deref(), Some(&2));
}

proptest! {
    #[test]
    fn prop_snapshot_never_changes(
        before in prop::collection::vec(op(), 0..12),
        after in prop::collection::vec(op(), 0..12),
    ) {
        let cache = EntityCache::new();
        for op in &before {
            apply(&cache, op);
        }
        let snap = cache.snapshot();
        let frozen: Vec<(CacheKey, u32, bool)> = snap
            .iter()
            .map(|(k, v)| (k.clone(), **v, snap.is_external(k)))
            .collect();

        for op in &after {
            apply(&cache, op);
        }

        let again: Vec<(CacheKey, u32, bool)> = snap
            .iter()
            .map(|(k, v)| (k.clone(), **v, snap.is_external(k)))
            .collect();
        prop_assert_eq!(frozen, again);
    }

    #[test]
    fn prop_load_always_clears_flag(ops in prop::collection::vec(op(), 0..16), v in any::<u32>()) {
        let cache = EntityCache::new();
        for op in &ops {
            apply(&cache, op);
        }
        cache.load(key("a"), v);
        prop_assert!(!cache.is_external(&key("a")));
        prop_assert_eq!(cache.get(&key("a")).map(|x| *x), Some(v));
    }
}
