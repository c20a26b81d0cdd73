use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use bytes::Bytes;
use crossbeam_skiplist::SkipMap;

/// Contract over the ordered key-value map that holds the blocks. The map
/// owns key allocation: `append` hands out fresh, strictly increasing keys,
/// never reused within the store's lifetime.
pub trait BlockMap {
    /// Store a block and return its freshly allocated key.
    fn append(&self, block: Bytes) -> Result<u64>;

    /// Fetch a block, or `None` if the key has no entry.
    fn get(&self, key: u64) -> Result<Option<Bytes>>;

    /// Remove a block, returning it if it was present.
    fn remove(&self, key: u64) -> Result<Option<Bytes>>;

    /// Largest key currently in the map.
    fn last_key(&self) -> Option<u64>;

    fn is_empty(&self) -> bool;

    fn clear(&self) -> Result<()>;

    fn save(&self) -> Result<()> {
        Ok(())
    }

    fn gc(&self) {}

    fn close(&self) {}
}

/// An in-memory block map backed by a skip list.
pub struct MemBlockMap {
    map: SkipMap<u64, Bytes>,
    next_key: AtomicU64,
}

impl MemBlockMap {
    pub fn new() -> Self {
        MemBlockMap {
            map: SkipMap::new(),
            next_key: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.map.contains_key(&key)
    }

    pub fn keys(&self) -> Vec<u64> {
        self.map.iter().map(|entry| *entry.key()).collect()
    }
}

impl Default for MemBlockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockMap for MemBlockMap {
    fn append(&self, block: Bytes) -> Result<u64> {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.map.insert(key, block);
        Ok(key)
    }

    fn get(&self, key: u64) -> Result<Option<Bytes>> {
        Ok(self.map.get(&key).map(|entry| entry.value().clone()))
    }

    fn remove(&self, key: u64) -> Result<Option<Bytes>> {
        Ok(self.map.remove(&key).map(|entry| entry.value().clone()))
    }

    fn last_key(&self) -> Option<u64> {
        self.map.back().map(|entry| *entry.key())
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) -> Result<()> {
        while self.map.pop_front().is_some() {}
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::{BlockMap, MemBlockMap};

    #[test]
    fn test_append_allocates_increasing_keys() {
        let map = MemBlockMap::new();
        let k0 = map.append(Bytes::from_static(b"a")).unwrap();
        let k1 = map.append(Bytes::from_static(b"b")).unwrap();
        let k2 = map.append(Bytes::from_static(b"c")).unwrap();
        assert!(k0 < k1 && k1 < k2);
        assert_eq!(map.last_key(), Some(k2));
    }

    #[test]
    fn test_get_and_remove() {
        let map = MemBlockMap::new();
        let key = map.append(Bytes::from_static(b"block")).unwrap();
        assert_eq!(map.get(key).unwrap().unwrap(), &b"block"[..]);
        assert_eq!(map.remove(key).unwrap().unwrap(), &b"block"[..]);
        assert_eq!(map.get(key).unwrap(), None);
        assert_eq!(map.remove(key).unwrap(), None);
    }

    #[test]
    fn test_keys_not_reused_after_remove() {
        let map = MemBlockMap::new();
        let k0 = map.append(Bytes::from_static(b"a")).unwrap();
        map.remove(k0).unwrap();
        let k1 = map.append(Bytes::from_static(b"b")).unwrap();
        assert!(k1 > k0);
    }

    #[test]
    fn test_clear() {
        let map = MemBlockMap::new();
        for _ in 0..10 {
            map.append(Bytes::from_static(b"x")).unwrap();
        }
        assert!(!map.is_empty());
        map.clear().unwrap();
        assert!(map.is_empty());
        assert_eq!(map.last_key(), None);
    }
}
