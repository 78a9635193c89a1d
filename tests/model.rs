//! Model tests comparing the tables against `std::collections`.

#![cfg(feature = "std")]

use std::collections::HashMap as StdMap;
use std::collections::HashSet as StdSet;
use std::hash::BuildHasherDefault;

use probe_hash::HashMap;
use probe_hash::HashSet;
use probe_hash::HashTable;
use probe_hash::policy::SetPolicy;
use proptest::prelude::*;
use siphasher::sip::SipHasher;

type Sip = BuildHasherDefault<SipHasher>;

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u32),
    Remove(u16),
    Get(u16),
    Rehash(u16),
    Reserve(u8),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    // A narrow key space keeps hits, duplicates and tombstone reuse common.
    prop_oneof![
        8 => (0..512u16, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        6 => (0..512u16).prop_map(Op::Remove),
        4 => (0..512u16).prop_map(Op::Get),
        1 => (0..600u16).prop_map(Op::Rehash),
        1 => any::<u8>().prop_map(Op::Reserve),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn map_matches_std(ops in prop::collection::vec(op(), 0..400)) {
        let mut map: HashMap<u16, u32, Sip> = HashMap::default();
        let mut model = StdMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => prop_assert_eq!(map.insert(k, v), model.insert(k, v)),
                Op::Remove(k) => prop_assert_eq!(map.remove(&k), model.remove(&k)),
                Op::Get(k) => prop_assert_eq!(map.get(&k), model.get(&k)),
                Op::Rehash(_) => map.shrink_to_fit(),
                Op::Reserve(n) => {
                    map.reserve(n as usize);
                    prop_assert!(map.capacity() >= map.len() + n as usize);
                }
                Op::Clear => {
                    map.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(map.len(), model.len());
            prop_assert!(map.len() <= map.capacity());
        }

        let mut entries: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_unstable();
        let mut expected: Vec<_> = model.into_iter().collect();
        expected.sort_unstable();
        prop_assert_eq!(entries, expected);
    }

    #[test]
    fn set_matches_std(ops in prop::collection::vec(op(), 0..400)) {
        let mut set: HashSet<u16, Sip> = HashSet::default();
        let mut model = StdSet::new();

        for op in ops {
            match op {
                Op::Insert(k, _) => prop_assert_eq!(set.insert(k), model.insert(k)),
                Op::Remove(k) => prop_assert_eq!(set.remove(&k), model.remove(&k)),
                Op::Get(k) => prop_assert_eq!(set.contains(&k), model.contains(&k)),
                Op::Rehash(_) => set.shrink_to_fit(),
                Op::Reserve(n) => set.reserve(n as usize),
                Op::Clear => {
                    set.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(set.len(), model.len());
        }

        prop_assert_eq!(set.iter().count(), model.len());
        prop_assert!(set.iter().all(|k| model.contains(k)));
    }

    #[test]
    fn table_keeps_keys_unique(ops in prop::collection::vec(op(), 0..400)) {
        let mut table: HashTable<SetPolicy<u16>, Sip> = HashTable::default();
        let mut model = StdSet::new();

        for op in ops {
            match op {
                Op::Insert(k, _) => {
                    let (_, inserted) = table.insert(k);
                    prop_assert_eq!(inserted, model.insert(k));
                }
                Op::Remove(k) => {
                    let erased = table.erase(&k);
                    prop_assert_eq!(erased, usize::from(model.remove(&k)));
                    prop_assert_eq!(table.erase(&k), 0);
                }
                Op::Get(k) => prop_assert_eq!(table.count(&k), usize::from(model.contains(&k))),
                Op::Rehash(n) => {
                    let before = table.len();
                    table.rehash(n as usize);
                    prop_assert_eq!(table.len(), before);
                    prop_assert!(table.capacity() >= n as usize);
                }
                Op::Reserve(n) => table.reserve(table.len() + n as usize),
                Op::Clear => {
                    table.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(table.len(), model.len());
            if table.capacity() > 0 {
                prop_assert!(table.capacity().is_power_of_two());
                prop_assert!(table.load_factor() <= table.max_load_factor());
            }

            #[cfg(feature = "stats")]
            {
                let stats = table.debug_stats();
                prop_assert!(stats.populated + stats.tombstones <= stats.max_load, "{stats:#?}");
                if stats.capacity > 0 {
                    prop_assert!(stats.groups_with_empty > 0, "{stats:#?}");
                }
            }
        }

        let mut seen = StdSet::new();
        prop_assert!(table.iter().all(|k| seen.insert(*k)));
        prop_assert_eq!(seen, model);
    }
}
