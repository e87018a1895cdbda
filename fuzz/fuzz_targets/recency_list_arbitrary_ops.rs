#![no_main]

use std::collections::VecDeque;

use libfuzzer_sys::fuzz_target;
use servant_evictor::ds::{NodeId, RecencyList};

// Arbitrary push_front / move_to_front / remove / pop_back sequences,
// checked against a VecDeque model ordered most to least recent.
fuzz_target!(|data: &[u8]| {
    let mut list: RecencyList<u32> = RecencyList::new();
    let mut model: VecDeque<(NodeId, u32)> = VecDeque::new();

    for chunk in data.chunks_exact(2) {
        let op = chunk[0] % 5;
        let arg = u32::from(chunk[1]);

        match op {
            0 | 1 => {
                let id = list.push_front(arg);
                model.push_front((id, arg));
            }
            2 => {
                if model.is_empty() {
                    continue;
                }
                let at = arg as usize % model.len();
                let entry = model.remove(at).unwrap();
                assert!(list.move_to_front(entry.0));
                model.push_front(entry);
            }
            3 => {
                if model.is_empty() {
                    continue;
                }
                let at = arg as usize % model.len();
                let (id, value) = model.remove(at).unwrap();
                assert_eq!(list.remove(id), Some(value));
            }
            _ => {
                let expected = model.pop_back().map(|(_, value)| value);
                assert_eq!(list.pop_back(), expected);
            }
        }

        assert_eq!(list.len(), model.len());
        assert_eq!(list.front(), model.front().map(|(_, value)| value));
        assert_eq!(list.back(), model.back().map(|(_, value)| value));
    }

    let order: Vec<u32> = list.iter().copied().collect();
    let expected: Vec<u32> = model.iter().map(|(_, value)| *value).collect();
    assert_eq!(order, expected);

    let lru_first: Vec<u32> = list.iter_from_back().map(|(_, value)| *value).collect();
    let mut reversed = expected;
    reversed.reverse();
    assert_eq!(lru_first, reversed);
});
