//! Tables placed in a caller-supplied `allocator-api2` allocator.

use std::hash::BuildHasherDefault;

use bumpalo::Bump;
use probe_hash::HashTable;
use probe_hash::policy::DefaultKeyEqual;
use probe_hash::policy::MapPolicy;
use siphasher::sip::SipHasher;

type Sip = BuildHasherDefault<SipHasher>;
type BumpTable<'b> = HashTable<MapPolicy<u64, String>, Sip, DefaultKeyEqual, &'b Bump>;

#[test]
fn table_lives_in_bump_arena() {
    let bump = Bump::new();
    let mut table: BumpTable<'_> =
        HashTable::with_capacity_in(64, Sip::default(), DefaultKeyEqual, &bump);
    assert_eq!(table.capacity(), 64);
    assert!(std::ptr::eq(*table.allocator(), &bump));

    for k in 0..200u64 {
        assert!(table.insert((k, k.to_string())).1);
    }
    assert_eq!(table.len(), 200);
    assert!(table.capacity() >= 256);
    for k in 0..200u64 {
        assert_eq!(table.find(&k).map(|(_, v)| v.as_str()), Some(k.to_string().as_str()));
    }

    let copy = table.clone();
    assert!(std::ptr::eq(*copy.allocator(), &bump));

    table.reset();
    assert_eq!(table.capacity(), 0);
    assert_eq!(copy.len(), 200);
    assert!(copy.find(&199).is_some());
}

#[test]
fn fallible_construction_in_bump_arena() {
    let bump = Bump::new();
    let table = HashTable::<MapPolicy<u32, u32>, Sip, DefaultKeyEqual, &Bump>::try_with_capacity_in(
        1000,
        Sip::default(),
        DefaultKeyEqual,
        &bump,
    );
    let mut table = table.unwrap();
    assert_eq!(table.capacity(), 1024);
    table.find_or_insert(7).1 = 49;
    assert_eq!(table.find(&7), Some(&(7, 49)));
}
