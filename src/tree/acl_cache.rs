use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::snapshot::{ReadFrom, WriteTo};
use crate::types::Acl;

/// The handle reserved for the completely-open ACL; never interned, never reference counted.
pub(crate) const OPEN_UNSAFE_ACL_ID: i64 = -1;

/// Interns ACL lists and hands out stable 64-bit handles with reference counts.
///
/// A small closed set of ACL configurations is shared by many znodes, so nodes store a handle
/// rather than the list itself. A handle's reference count tracks how many znodes currently use
/// it; entries that drop to zero are retained until [`AclCache::purge_unused`] sweeps them, which
/// happens once at the end of a snapshot restore.
#[derive(Debug, Default)]
pub(crate) struct AclCache {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    long_key_map: HashMap<i64, Vec<Acl>>,
    acl_key_map: HashMap<Vec<Acl>, i64>,
    reference_counter: HashMap<i64, i64>,
    acl_index: i64,
}

impl AclCache {
    pub(crate) fn new() -> AclCache {
        AclCache::default()
    }

    /// Intern `acl` (order-significant) and return its handle, incrementing the reference count.
    pub(crate) fn convert_acls(&self, acl: &[Acl]) -> i64 {
        let mut inner = self.inner.lock();
        let handle = match inner.acl_key_map.get(acl) {
            Some(&handle) => handle,
            None => {
                inner.acl_index += 1;
                let handle = inner.acl_index;
                inner.long_key_map.insert(handle, acl.to_vec());
                inner.acl_key_map.insert(acl.to_vec(), handle);
                handle
            }
        };
        *inner.reference_counter.entry(handle).or_insert(0) += 1;
        handle
    }

    /// Fetch the interned list for `handle`.
    ///
    /// # Panics
    ///
    /// If `handle` was never interned; handing the cache a handle it did not produce is a
    /// programming error.
    pub(crate) fn convert_long(&self, handle: i64) -> Vec<Acl> {
        if handle == OPEN_UNSAFE_ACL_ID {
            return Acl::open_unsafe().to_vec();
        }
        let inner = self.inner.lock();
        match inner.long_key_map.get(&handle) {
            Some(acl) => acl.clone(),
            None => unreachable!("ACL handle {} not present in cache", handle),
        }
    }

    /// Increment the reference count of a handle read back from a snapshot.
    ///
    /// Returns false when the handle is unknown, which a restore must treat as fatal.
    pub(crate) fn add_usage(&self, handle: i64) -> bool {
        if handle == OPEN_UNSAFE_ACL_ID {
            return true;
        }
        let mut inner = self.inner.lock();
        if !inner.long_key_map.contains_key(&handle) {
            return false;
        }
        *inner.reference_counter.entry(handle).or_insert(0) += 1;
        true
    }

    /// Decrement the reference count for `handle`.
    pub(crate) fn remove_usage(&self, handle: i64) {
        if handle == OPEN_UNSAFE_ACL_ID {
            return;
        }
        let mut inner = self.inner.lock();
        *inner.reference_counter.entry(handle).or_insert(0) -= 1;
    }

    /// Drop every interned entry whose reference count is zero or less.
    pub(crate) fn purge_unused(&self) {
        let mut inner = self.inner.lock();
        let unused: Vec<i64> = inner
            .reference_counter
            .iter()
            .filter(|&(_, &count)| count <= 0)
            .map(|(&handle, _)| handle)
            .collect();
        for handle in unused {
            inner.reference_counter.remove(&handle);
            if let Some(acl) = inner.long_key_map.remove(&handle) {
                inner.acl_key_map.remove(&acl);
            }
        }
    }

    /// The number of distinct interned ACL lists.
    pub(crate) fn size(&self) -> usize {
        self.inner.lock().long_key_map.len()
    }

    #[cfg(test)]
    pub(crate) fn reference_count(&self, handle: i64) -> i64 {
        self.inner
            .lock()
            .reference_counter
            .get(&handle)
            .copied()
            .unwrap_or(0)
    }

    /// Write the handle-to-list table, in handle order.
    pub(crate) fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let inner = self.inner.lock();
        writer.write_i32::<BigEndian>(inner.long_key_map.len() as i32)?;
        let mut handles: Vec<i64> = inner.long_key_map.keys().copied().collect();
        handles.sort_unstable();
        for handle in handles {
            writer.write_i64::<BigEndian>(handle)?;
            let acl = &inner.long_key_map[&handle];
            writer.write_i32::<BigEndian>(acl.len() as i32)?;
            for entry in acl {
                entry.write_to(&mut *writer)?;
            }
        }
        Ok(())
    }

    /// Replace the cache contents with a table serialized by [`AclCache::serialize`].
    ///
    /// Reference counts start at zero; the restore re-derives them through
    /// [`AclCache::add_usage`] as it attaches nodes.
    pub(crate) fn deserialize<R: Read>(&self, reader: &mut R) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.long_key_map.clear();
        inner.acl_key_map.clear();
        inner.reference_counter.clear();
        inner.acl_index = 0;

        let entries = reader.read_i32::<BigEndian>()?;
        for _ in 0..entries {
            let handle = reader.read_i64::<BigEndian>()?;
            let len = reader.read_i32::<BigEndian>()?;
            let mut acl = Vec::with_capacity(len.max(0) as usize);
            for _ in 0..len {
                acl.push(Acl::read_from(reader)?);
            }
            inner.long_key_map.insert(handle, acl.clone());
            inner.acl_key_map.insert(acl, handle);
            inner.reference_counter.insert(handle, 0);
            if handle > inner.acl_index {
                inner.acl_index = handle;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_identical_lists_once() {
        let cache = AclCache::new();
        let a = cache.convert_acls(Acl::open_unsafe());
        let b = cache.convert_acls(Acl::open_unsafe());
        assert_eq!(a, b);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.reference_count(a), 2);
        assert_eq!(cache.convert_long(a), Acl::open_unsafe().to_vec());
    }

    #[test]
    fn order_of_entries_is_significant() {
        let cache = AclCache::new();
        let mut forward = Acl::read_unsafe().to_vec();
        forward.extend_from_slice(Acl::creator_all());
        let mut backward = Acl::creator_all().to_vec();
        backward.extend_from_slice(Acl::read_unsafe());
        assert_ne!(cache.convert_acls(&forward), cache.convert_acls(&backward));
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn purge_drops_only_unreferenced_entries() {
        let cache = AclCache::new();
        let kept = cache.convert_acls(Acl::open_unsafe());
        let dropped = cache.convert_acls(Acl::read_unsafe());
        cache.remove_usage(dropped);
        cache.purge_unused();
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.convert_long(kept), Acl::open_unsafe().to_vec());
    }

    #[test]
    fn open_unsafe_sentinel_is_never_interned() {
        let cache = AclCache::new();
        assert!(cache.add_usage(OPEN_UNSAFE_ACL_ID));
        cache.remove_usage(OPEN_UNSAFE_ACL_ID);
        assert_eq!(cache.size(), 0);
        assert_eq!(
            cache.convert_long(OPEN_UNSAFE_ACL_ID),
            Acl::open_unsafe().to_vec()
        );
    }

    #[test]
    fn serialization_round_trips() {
        let cache = AclCache::new();
        let open = cache.convert_acls(Acl::open_unsafe());
        let read = cache.convert_acls(Acl::read_unsafe());

        let mut buf = Vec::new();
        cache.serialize(&mut buf).unwrap();

        let restored = AclCache::new();
        restored.deserialize(&mut &buf[..]).unwrap();
        assert_eq!(restored.size(), 2);
        assert_eq!(restored.convert_long(open), Acl::open_unsafe().to_vec());
        assert_eq!(restored.convert_long(read), Acl::read_unsafe().to_vec());
        assert!(restored.add_usage(open));
        assert!(!restored.add_usage(12345));
    }
}
