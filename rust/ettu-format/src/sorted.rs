//! Keyed lookup over vectors of tables sorted by a scalar key field.
//!
//! The builder orders such vectors ascending by key when it writes them
//! ([`Builder::create_sorted_vector_of_tables`](crate::Builder::create_sorted_vector_of_tables)).
//! Readers trust that order: a vector that was not written sorted yields
//! unspecified (but memory-safe) lookup results.

use std::cmp::Ordering;

use ettu_common::Result;

use crate::{
    codec::Scalar,
    vector::{Follow, Vector},
};

/// Binary search for the element whose key equals `key`.
///
/// `key_of` extracts the key from a candidate element, applying the field's
/// declared default when the key is absent. Each probe follows exactly one
/// offset.
pub fn lookup_by_key<'a, T, K, F>(vector: &Vector<'a, T>, key: &K, key_of: F) -> Result<Option<T>>
where
    T: Follow<'a>,
    K: Scalar,
    F: Fn(&T) -> Result<K>,
{
    let mut start = 0usize;
    let mut span = vector.len();
    while span != 0 {
        let middle = span / 2;
        let candidate = vector.get(start + middle)?;
        match key_of(&candidate)?.key_cmp(key) {
            Ordering::Equal => return Ok(Some(candidate)),
            Ordering::Less => {
                start += middle + 1;
                span -= middle + 1;
            }
            Ordering::Greater => span = middle,
        }
    }
    Ok(None)
}

/// Returns `true` if the keys of the vector's elements are non-decreasing.
///
/// Lookups never call this; it is for tools and tests that want to confirm
/// a buffer came from a conforming writer.
pub fn is_sorted_by_key<'a, T, K, F>(vector: &Vector<'a, T>, key_of: F) -> Result<bool>
where
    T: Follow<'a>,
    K: Scalar,
    F: Fn(&T) -> Result<K>,
{
    let mut prev: Option<K> = None;
    for item in vector.iter() {
        let key = key_of(&item?)?;
        if let Some(prev) = prev {
            if prev.key_cmp(&key) == Ordering::Greater {
                return Ok(false);
            }
        }
        prev = Some(key);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, Offset, Table, root_table};

    fn build_keyed(keys: &[u32]) -> Vec<u8> {
        let mut builder = Builder::new();
        let mut items = keys
            .iter()
            .map(|&key| {
                builder.start_table(1);
                builder.add_scalar(0, key, 0);
                builder.end_table::<()>()
            })
            .collect::<Vec<Offset<()>>>();
        let vector = builder.create_sorted_vector_of_tables(&mut items, 0, 0u32);
        builder.start_table(1);
        builder.add_offset(0, vector);
        let root = builder.end_table::<()>();
        builder.finish(root, None);
        builder.finished_data().to_vec()
    }

    fn key(table: &Table) -> Result<u32> {
        table.get(0, 0)
    }

    #[test]
    fn test_lookup_unordered_input() {
        let buf = build_keyed(&[42, 7, 19, 3, 100]);
        let vector = root_table(&buf)
            .unwrap()
            .get_vector::<Table>(0)
            .unwrap()
            .unwrap();
        assert!(is_sorted_by_key(&vector, key).unwrap());
        for k in [3, 7, 19, 42, 100] {
            let found = lookup_by_key(&vector, &k, key).unwrap().unwrap();
            assert_eq!(key(&found).unwrap(), k);
        }
        for k in [0, 4, 41, 101, u32::MAX] {
            assert!(lookup_by_key(&vector, &k, key).unwrap().is_none());
        }
    }

    #[test]
    fn test_absent_key_sorts_as_default() {
        // Key 0 equals the default, so it is not stored.
        let buf = build_keyed(&[5, 0, 2]);
        let vector = root_table(&buf)
            .unwrap()
            .get_vector::<Table>(0)
            .unwrap()
            .unwrap();
        let first = vector.get(0).unwrap();
        assert!(!first.is_present(0));
        assert!(lookup_by_key(&vector, &0, key).unwrap().is_some());
    }

    #[test]
    fn test_empty_vector() {
        let buf = build_keyed(&[]);
        let vector = root_table(&buf)
            .unwrap()
            .get_vector::<Table>(0)
            .unwrap()
            .unwrap();
        assert!(vector.is_empty());
        assert!(lookup_by_key(&vector, &1, key).unwrap().is_none());
    }
}
