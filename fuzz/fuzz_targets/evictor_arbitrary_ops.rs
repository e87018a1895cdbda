#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use servant_evictor::prelude::*;

struct Unit;

impl Servant for Unit {
    fn dispatch(&self, _: &Current, _: &[u8]) -> Result<Vec<u8>, UserException> {
        Ok(Vec::new())
    }
}

fn unit(_: &Identity, _: u8) -> ServantHandle {
    Arc::new(Unit)
}

// Arbitrary locate / hold / finished / invalidate / store-mutation sequences.
// The first byte picks the capacity; identities come from a 16-name universe
// of which the store initially knows the even ones.
fuzz_target!(|data: &[u8]| {
    let Some((&cap, ops)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(cap % 6);
    let store = MemoryStore::from_records((0u8..16).step_by(2).map(|i| (format!("o{}", i), i)));
    let evictor = Evictor::new(capacity, store, unit as fn(&Identity, u8) -> ServantHandle);
    let mut held: Vec<(Identity, Cookie)> = Vec::new();

    for chunk in ops.chunks_exact(2) {
        let identity = Identity::new(format!("o{}", chunk[1] % 16));
        match chunk[0] % 6 {
            0 | 1 => {
                if let Some(located) = evictor.locate(&identity).unwrap() {
                    evictor.finished(&identity, located.cookie);
                }
            }
            2 => {
                if let Some(located) = evictor.locate(&identity).unwrap() {
                    held.push((identity, located.cookie));
                }
            }
            3 => {
                if !held.is_empty() {
                    let (identity, cookie) = held.swap_remove(usize::from(chunk[1]) % held.len());
                    evictor.finished(&identity, cookie);
                }
            }
            4 => {
                evictor.invalidate(&identity);
            }
            _ => {
                if evictor.store().remove(identity.as_str()).is_none() {
                    evictor.store().put(identity.clone(), chunk[1]);
                }
                evictor.invalidate(&identity);
            }
        }

        assert!(evictor.len() <= capacity);
        evictor.check_invariants().unwrap();
    }

    for (identity, cookie) in held {
        evictor.finished(&identity, cookie);
    }
    assert_eq!(evictor.detached_len(), 0);
    evictor.check_invariants().unwrap();
});
