// ==============================================
// EVICTOR BEHAVIOUR TESTS (integration)
// ==============================================
mod common;

use std::sync::Arc;

use common::{evictor, state_of, FakeStore};
use proptest::prelude::*;
use servant_evictor::prelude::*;

fn id(s: &str) -> Identity {
    Identity::new(s)
}

/// Locates and immediately finishes, returning the servant's state.
fn touch(ev: &common::TestEvictor, identity: &str) -> Option<String> {
    let identity = id(identity);
    let located = ev.locate(&identity).expect("store healthy")?;
    let state = state_of(&located);
    ev.finished(&identity, located.cookie);
    Some(state)
}

mod lru_order {
    use super::*;

    #[test]
    fn least_recently_used_is_evicted() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a"), ("B", "b"), ("C", "c")]));
        let ev = evictor(2, &store);

        touch(&ev, "A");
        touch(&ev, "B");
        touch(&ev, "A");
        touch(&ev, "C");

        assert!(ev.contains("A"));
        assert!(!ev.contains("B"));
        assert!(ev.contains("C"));
        assert_eq!(ev.resident_identities(), vec![id("C"), id("A")]);
        assert_eq!(store.fetches(), 3);
    }

    #[test]
    fn hit_moves_entry_to_most_recent() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a"), ("B", "b"), ("C", "c")]));
        let ev = evictor(3, &store);
        for name in ["A", "B", "C"] {
            touch(&ev, name);
        }
        assert_eq!(ev.resident_identities(), vec![id("C"), id("B"), id("A")]);

        touch(&ev, "A");
        assert_eq!(ev.resident_identities(), vec![id("A"), id("C"), id("B")]);
        assert_eq!(store.fetches(), 3);
    }

    #[test]
    fn evicted_identity_is_fetched_again() {
        let store = Arc::new(FakeStore::with_records(&[("alice", "S1"), ("bob", "S2")]));
        let ev = evictor(1, &store);

        assert_eq!(touch(&ev, "alice").as_deref(), Some("S1"));
        assert_eq!(touch(&ev, "bob").as_deref(), Some("S2"));
        assert!(!ev.contains("alice"));
        assert_eq!(touch(&ev, "alice").as_deref(), Some("S1"));

        assert_eq!(store.fetches(), 3);
        assert_eq!(ev.len(), 1);
        ev.check_invariants().unwrap();
    }
}

mod misses_and_failures {
    use super::*;

    #[test]
    fn not_found_is_none_and_evicts_nothing() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a")]));
        let ev = evictor(1, &store);
        touch(&ev, "A");

        assert!(ev.locate(&id("ghost")).unwrap().is_none());
        assert!(ev.contains("A"));
        assert_eq!(ev.len(), 1);
    }

    #[test]
    fn store_failure_is_reported_and_not_cached() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a")]));
        let ev = evictor(4, &store);

        store.set_failing(true);
        let err = ev.locate(&id("A")).unwrap_err();
        assert_eq!(err.identity(), &id("A"));
        assert!(ev.is_empty());

        store.set_failing(false);
        assert_eq!(touch(&ev, "A").as_deref(), Some("a"));
        assert_eq!(store.fetches(), 2);
    }

    #[test]
    fn failure_does_not_evict_resident_entries() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a"), ("B", "b")]));
        let ev = evictor(1, &store);
        touch(&ev, "A");

        store.set_failing(true);
        assert!(ev.locate(&id("B")).is_err());
        assert!(ev.contains("A"));
    }
}

mod invalidation {
    use super::*;

    #[test]
    fn invalidate_is_idempotent() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a")]));
        let ev = evictor(2, &store);
        touch(&ev, "A");

        assert!(ev.invalidate(&id("A")));
        assert!(!ev.invalidate(&id("A")));
        assert!(!ev.invalidate(&id("never-seen")));
        assert!(ev.is_empty());
        ev.check_invariants().unwrap();
    }

    #[test]
    fn destroyed_object_is_not_resurrected() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a")]));
        let ev = evictor(2, &store);
        touch(&ev, "A");

        store.remove("A");
        ev.invalidate(&id("A"));
        assert!(ev.locate(&id("A")).unwrap().is_none());
    }

    #[test]
    fn finished_after_invalidate_is_a_no_op() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a")]));
        let ev = evictor(2, &store);
        let a = id("A");

        let old = ev.locate(&a).unwrap().unwrap();
        ev.invalidate(&a);
        let fresh = ev.locate(&a).unwrap().unwrap();
        assert_ne!(old.cookie, fresh.cookie);

        assert_eq!(ev.finished(&a, old.cookie), Release::Unknown);
        assert_eq!(ev.pin_count("A"), Some(1));
        assert_eq!(ev.finished(&a, fresh.cookie), Release::Unpinned);
    }
}

mod pinning {
    use super::*;

    #[test]
    fn pinned_entry_is_not_evicted() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a"), ("B", "b")]));
        let ev = evictor(1, &store);
        let (a, b) = (id("A"), id("B"));

        let held_a = ev.locate(&a).unwrap().unwrap();
        let held_b = ev.locate(&b).unwrap().unwrap();

        assert!(ev.contains("A"));
        assert_eq!(ev.len(), 1);
        assert_eq!(ev.detached_len(), 1);
        assert_eq!(state_of(&held_b), "b");

        assert_eq!(ev.finished(&b, held_b.cookie), Release::Dropped);
        assert_eq!(ev.finished(&a, held_a.cookie), Release::Unpinned);
        assert_eq!(ev.detached_len(), 0);
        ev.check_invariants().unwrap();
    }

    #[test]
    fn detached_entry_is_promoted_when_room_appears() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a"), ("B", "b")]));
        let ev = evictor(1, &store);
        let (a, b) = (id("A"), id("B"));

        let held_a = ev.locate(&a).unwrap().unwrap();
        let held_b = ev.locate(&b).unwrap().unwrap();
        ev.invalidate(&a);

        assert_eq!(ev.finished(&b, held_b.cookie), Release::Promoted);
        assert_eq!(ev.resident_identities(), vec![b.clone()]);
        assert_eq!(ev.finished(&a, held_a.cookie), Release::Unknown);
    }

    #[test]
    fn concurrent_holders_share_detached_servant() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a"), ("B", "b")]));
        let ev = evictor(1, &store);
        let (a, b) = (id("A"), id("B"));

        let held_a = ev.locate(&a).unwrap().unwrap();
        let first = ev.locate(&b).unwrap().unwrap();
        let second = ev.locate(&b).unwrap().unwrap();

        assert!(Arc::ptr_eq(&first.servant, &second.servant));
        assert_eq!(ev.pin_count("B"), Some(2));
        assert_eq!(store.fetches(), 2);

        assert_eq!(ev.finished(&b, first.cookie), Release::Pinned);
        assert_eq!(ev.finished(&b, second.cookie), Release::Dropped);
        ev.finished(&a, held_a.cookie);
    }
}

mod zero_capacity {
    use super::*;

    #[test]
    fn nothing_is_retained() {
        let store = Arc::new(FakeStore::with_records(&[("A", "a")]));
        let ev = evictor(0, &store);

        for _ in 0..3 {
            assert_eq!(touch(&ev, "A").as_deref(), Some("a"));
            assert_eq!(ev.len(), 0);
            assert_eq!(ev.detached_len(), 0);
        }
        assert_eq!(store.fetches(), 3);
    }
}

#[derive(Debug, Clone)]
enum Op {
    Touch(u8),
    Hold(u8),
    ReleaseOldest,
    Invalidate(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..8).prop_map(Op::Touch),
        2 => (0u8..8).prop_map(Op::Hold),
        2 => Just(Op::ReleaseOldest),
        1 => (0u8..8).prop_map(Op::Invalidate),
    ]
}

proptest! {
    #[test]
    fn resident_count_never_exceeds_capacity(
        capacity in 0usize..4,
        ops in prop::collection::vec(op_strategy(), 1..120),
    ) {
        let records: Vec<(String, String)> = (0..6)
            .map(|i| (format!("k{}", i), format!("v{}", i)))
            .collect();
        let refs: Vec<(&str, &str)> = records
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let store = Arc::new(FakeStore::with_records(&refs));
        let ev = evictor(capacity, &store);
        let mut held: Vec<(Identity, Cookie)> = Vec::new();

        for op in ops {
            match op {
                Op::Touch(k) => {
                    let name = format!("k{}", k);
                    let state = touch(&ev, &name);
                    prop_assert_eq!(state.is_some(), k < 6);
                },
                Op::Hold(k) => {
                    let identity = id(&format!("k{}", k));
                    if let Some(located) = ev.locate(&identity).unwrap() {
                        held.push((identity, located.cookie));
                    }
                },
                Op::ReleaseOldest => {
                    if !held.is_empty() {
                        let (identity, cookie) = held.remove(0);
                        ev.finished(&identity, cookie);
                    }
                },
                Op::Invalidate(k) => {
                    ev.invalidate(&id(&format!("k{}", k)));
                },
            }
            prop_assert!(ev.len() <= capacity);
            prop_assert!(ev.check_invariants().is_ok());
        }

        for (identity, cookie) in held.drain(..) {
            ev.finished(&identity, cookie);
        }
        prop_assert_eq!(ev.detached_len(), 0);
        prop_assert!(ev.len() <= capacity);
    }
}
