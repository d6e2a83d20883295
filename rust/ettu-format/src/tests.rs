use crate::{
    Builder, Offset, Table, TableMut,
    codec::{Struct, read_scalar},
    options::{BuilderOptions, VerifierOptions},
    root_table,
    sorted::lookup_by_key,
    verifier::{Verifier, Verify},
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pair {
    a: u32,
    b: f32,
}

impl Struct for Pair {
    const SIZE: usize = 8;
    const ALIGN: usize = 4;

    fn read_from(bytes: &[u8]) -> Self {
        Pair {
            a: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            b: f32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        }
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.a.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.b.to_le_bytes());
    }
}

crate::struct_follow!(Pair);

/// `Item { 0: id u32, 1: name string, 2: weight u16 = 7 }`
struct Item;

impl<'a> Verify<'a> for Item {
    fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> crate::Result<()> {
        v.verify_scalar::<u32>(table, 0)?;
        v.verify_string(table, 1)?;
        v.verify_scalar::<u16>(table, 2)
    }
}

/// `Bag { 0: items [Item], 1: pairs [Pair], 2: blob [u8] }`
struct Bag;

impl<'a> Verify<'a> for Bag {
    fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> crate::Result<()> {
        v.verify_vector_of_tables::<Item>(table, 0)?;
        v.verify_vector_of_structs::<Pair>(table, 1)?;
        v.verify_byte_vector(table, 2)
    }
}

fn build_item(builder: &mut Builder, id: u32, weight: u16) -> Offset<()> {
    let name = builder.create_string(&format!("item-{id}"));
    builder.start_table(3);
    builder.add_scalar(0, id, 0);
    builder.add_offset(1, name);
    builder.add_scalar(2, weight, 7);
    builder.end_table()
}

fn build_bag(options: BuilderOptions, ids: &[u32]) -> Vec<u8> {
    let mut builder = Builder::with_options(options);
    let mut items = ids
        .iter()
        .map(|&id| build_item(&mut builder, id, (id % 3) as u16 + 6))
        .collect::<Vec<_>>();
    let items = builder.create_sorted_vector_of_tables(&mut items, 0, 0u32);
    let pairs =
        builder.create_vector_of_structs(&[Pair { a: 1, b: 0.5 }, Pair { a: 2, b: 1.5 }]);
    let blob = builder.create_byte_vector(b"\x00\x01\x02");
    builder.start_table(3);
    builder.add_offset(0, items);
    builder.add_offset(1, pairs);
    builder.add_offset(2, blob);
    let root = builder.end_table::<()>();
    builder.finish(root, Some(b"bag0"));
    builder.finished_data().to_vec()
}

fn verify_bag(buf: &[u8]) -> crate::Result<()> {
    Verifier::new(buf, VerifierOptions::default())
        .verify_root::<Bag>(Some(b"bag0"))
        .map(|_| ())
}

#[test]
fn test_bag_reads_back() {
    let buf = build_bag(BuilderOptions::default(), &[30, 10, 20]);
    verify_bag(&buf).unwrap();
    let root = root_table(&buf).unwrap();
    let items = root.get_vector::<Table>(0).unwrap().unwrap();
    let ids = items
        .iter()
        .map(|t| t.and_then(|t| t.get::<u32>(0, 0)))
        .collect::<crate::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(ids, vec![10, 20, 30]);
    let weights = items
        .iter()
        .map(|t| t.and_then(|t| t.get::<u16>(2, 7)))
        .collect::<crate::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(weights, vec![7, 8, 6]);
    assert_eq!(items.get(1).unwrap().get_str(1).unwrap(), Some("item-20"));

    let pairs = root.get_vector::<Pair>(1).unwrap().unwrap();
    assert_eq!(pairs.get(1).unwrap(), Pair { a: 2, b: 1.5 });
    assert_eq!(root.get_bytes(2).unwrap(), Some(&[0u8, 1, 2][..]));
}

#[test]
fn test_vtables_are_shared() {
    let ids = (0..100).collect::<Vec<u32>>();
    let mut builder = Builder::new();
    for &id in &ids {
        build_item(&mut builder, id + 1, 100);
    }
    let stats = builder.stats();
    assert_eq!(stats.tables, 100);
    assert_eq!(stats.vtables_written, 1);
    assert_eq!(stats.vtables_reused, 99);

    let shared = build_bag(BuilderOptions::default(), &ids);
    let unshared = build_bag(
        BuilderOptions {
            dedup_vtables: false,
            ..Default::default()
        },
        &ids,
    );
    verify_bag(&shared).unwrap();
    verify_bag(&unshared).unwrap();
    // Each unshared item carries its own vtable of at least 8 bytes.
    assert!(unshared.len() >= shared.len() + 90 * 8);

    // Items with identical shape point at the same vtable.
    let root = root_table(&shared).unwrap();
    let items = root.get_vector::<Table>(0).unwrap().unwrap();
    let first = items.get(1).unwrap().vtable().position();
    let fourth = items.get(4).unwrap().vtable().position();
    assert_eq!(first, fourth);
}

#[test]
fn test_forward_and_backward_compatibility() {
    // An older writer that only knew field 0.
    let mut builder = Builder::new();
    builder.start_table(1);
    builder.add_scalar(0, 5u32, 0);
    let root = builder.end_table::<()>();
    builder.finish(root, None);
    let old = builder.finished_data().to_vec();

    // A newer reader asks for fields the old vtable does not store.
    let table = root_table(&old).unwrap();
    assert_eq!(table.vtable().num_slots(), 1);
    assert_eq!(table.get::<u32>(0, 0).unwrap(), 5);
    assert_eq!(table.get::<u16>(2, 7).unwrap(), 7);
    assert_eq!(table.get_str(1).unwrap(), None);
    assert!(table.get_vector::<Table>(12).unwrap().is_none());

    // A newer writer with extra fields, read by an older reader of field 0.
    let mut builder = Builder::new();
    let extra = builder.create_string("unknown to old readers");
    builder.start_table(4);
    builder.add_scalar(0, 6u32, 0);
    builder.add_offset(3, extra);
    let root = builder.end_table::<()>();
    builder.finish(root, None);
    let new = builder.finished_data().to_vec();
    assert_eq!(root_table(&new).unwrap().get::<u32>(0, 0).unwrap(), 6);
}

#[test]
fn test_every_truncation_is_safe() {
    let buf = build_bag(BuilderOptions::default(), &[3, 1, 2]);
    for len in 0..buf.len() {
        let truncated = &buf[..len];
        // Only trailing padding may be cut without the verifier noticing.
        if len + 4 <= buf.len() {
            assert!(verify_bag(truncated).is_err(), "len {len}");
        }
        // Unverified reads must fail cleanly or succeed, never panic.
        if let Ok(root) = root_table(truncated) {
            if let Ok(Some(items)) = root.get_vector::<Table>(0) {
                for item in items.iter() {
                    let _ = item.and_then(|t| t.get_str(1).map(|_| ()));
                }
            }
        }
    }
}

#[test]
fn test_random_corruption_is_safe() {
    let buf = build_bag(BuilderOptions::default(), &[9, 4, 7, 1]);
    let mut rng = fastrand::Rng::with_seed(42);
    for _ in 0..5000 {
        let mut corrupted = buf.clone();
        for _ in 0..rng.usize(1..4) {
            let pos = rng.usize(..corrupted.len());
            corrupted[pos] = rng.u8(..);
        }
        let _ = verify_bag(&corrupted);
        if let Ok(root) = root_table(&corrupted) {
            if let Ok(Some(items)) = root.get_vector::<Table>(0) {
                let _ = lookup_by_key(&items, &4u32, |t| t.get(0, 0));
            }
        }
    }
}

#[test]
fn test_sorted_lookup_sizes() {
    let mut rng = fastrand::Rng::with_seed(1);
    for n in [0usize, 1, 2, 3, 17, 256, 1000, 10_000] {
        let mut keys = (0..n as u32).map(|k| k * 2 + 1).collect::<Vec<_>>();
        rng.shuffle(&mut keys);
        let buf = build_bag(BuilderOptions::default(), &keys);
        let root = root_table(&buf).unwrap();
        let items = root.get_vector::<Table>(0).unwrap().unwrap();
        assert_eq!(items.len(), n);
        let key_of = |t: &Table| t.get::<u32>(0, 0);
        if n > 0 {
            for key in [1, n as u32 * 2 - 1, (n as u32 / 2) * 2 + 1] {
                let found = lookup_by_key(&items, &key, key_of).unwrap().unwrap();
                assert_eq!(key_of(&found).unwrap(), key);
            }
            for _ in 0..50 {
                let key = rng.u32(..n as u32) * 2 + 1;
                assert!(lookup_by_key(&items, &key, key_of).unwrap().is_some());
            }
        }
        for key in [0u32, 2, n as u32 * 2, n as u32 * 2 + 1, u32::MAX] {
            assert!(
                lookup_by_key(&items, &key, key_of).unwrap().is_none(),
                "n {n} key {key}"
            );
        }
    }
}

#[test]
fn test_mutation_through_vector() {
    // Weights: 5 -> 8, 6 -> 6, 7 -> 7 (the default, so omitted).
    let mut buf = build_bag(BuilderOptions::default(), &[5, 6, 7]);
    let before = buf.clone();
    let mut root = TableMut::root(&mut buf).unwrap();
    let mut item = root.vector_table(0, 2).unwrap().unwrap();
    assert!(!item.set(2, 1u16).unwrap());
    let mut item = root.vector_table(0, 0).unwrap().unwrap();
    let weight_pos = item
        .as_table()
        .unwrap()
        .field_position(2, 2)
        .unwrap()
        .unwrap();
    assert!(item.set(2, 99u16).unwrap());
    assert!(root.vector_table(0, 3).is_err());

    let diff = before
        .iter()
        .zip(&buf)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    assert_eq!(diff, vec![weight_pos]);
    assert_eq!(read_scalar::<u16>(&buf, weight_pos).unwrap(), 99);
}

#[test]
fn test_buffer_shared_across_threads() {
    let buf = ettu_bytes::Bytes::from(build_bag(BuilderOptions::default(), &[1, 2, 3]));
    let handles = (0..4)
        .map(|_| {
            let buf = buf.clone();
            std::thread::spawn(move || {
                let root = root_table(&buf).unwrap();
                let items = root.get_vector::<Table>(0).unwrap().unwrap();
                lookup_by_key(&items, &2u32, |t| t.get(0, 0))
                    .unwrap()
                    .is_some()
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
