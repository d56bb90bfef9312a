//! One numbered database's key-to-entity mapping.
//!
//! Backed by `DashMap` for concurrent readers and writers; no cross-key
//! atomicity beyond what a single map operation provides. Expiration is
//! lazy: every read consults the deadline and removes entries that have
//! passed it. There is no timer thread.

use bytes::Bytes;
use dashmap::DashMap;

use crate::entity::Entity;

/// A concurrent dictionary of key → [`Entity`].
#[derive(Debug, Default)]
pub struct Keyspace {
    map: DashMap<Bytes, Entity>,
}

impl Keyspace {
    pub fn new() -> Self {
        Keyspace {
            map: DashMap::new(),
        }
    }

    /// Drops the entry if its deadline has passed. Called before every
    /// read so expired keys behave as absent.
    fn expire_if_due(&self, key: &[u8]) {
        self.map.remove_if(key, |_, entity| entity.is_expired());
    }

    /// Returns a clone of the entity under `key`, lazily expiring it.
    ///
    /// Cloning is cheap for string payloads (`Bytes` is reference
    /// counted); sorted-set readers should prefer [`Keyspace::view`].
    pub fn get(&self, key: &[u8]) -> Option<Entity> {
        self.expire_if_due(key);
        self.map.get(key).map(|e| e.clone())
    }

    /// Runs `f` against the live entity under `key` without cloning it.
    pub fn view<R>(&self, key: &[u8], f: impl FnOnce(&Entity) -> R) -> Option<R> {
        self.expire_if_due(key);
        self.map.get(key).map(|e| f(&e))
    }

    /// Runs `f` with mutable access to the live entity under `key`,
    /// holding the map's shard lock for the duration. This is the
    /// synchronization point for sorted-set mutations, which are not
    /// internally thread-safe.
    pub fn update<R>(&self, key: &[u8], f: impl FnOnce(&mut Entity) -> R) -> Option<R> {
        self.expire_if_due(key);
        self.map.get_mut(key).map(|mut e| f(&mut e))
    }

    /// Like [`Keyspace::update`], but inserts `default()` first when the
    /// key is absent (or expired).
    pub fn upsert<R>(
        &self,
        key: Bytes,
        default: impl FnOnce() -> Entity,
        f: impl FnOnce(&mut Entity) -> R,
    ) -> R {
        self.expire_if_due(&key);
        let mut entry = self.map.entry(key).or_insert_with(default);
        f(entry.value_mut())
    }

    /// Stores `entity` under `key`. Returns 1 if the key was newly
    /// inserted, 0 if an existing value was replaced.
    pub fn put(&self, key: Bytes, entity: Entity) -> u32 {
        self.expire_if_due(&key);
        match self.map.insert(key, entity) {
            Some(_) => 0,
            None => 1,
        }
    }

    /// Stores `entity` only if `key` is absent. Returns 1 on insert.
    pub fn put_if_absent(&self, key: Bytes, entity: Entity) -> u32 {
        self.expire_if_due(&key);
        let mut inserted = 0;
        self.map.entry(key).or_insert_with(|| {
            inserted = 1;
            entity
        });
        inserted
    }

    /// Stores `entity` only if `key` already exists. Returns 1 on
    /// update.
    pub fn put_if_exists(&self, key: Bytes, entity: Entity) -> u32 {
        self.expire_if_due(&key);
        match self.map.get_mut(&key) {
            Some(mut existing) => {
                *existing = entity;
                1
            }
            None => 0,
        }
    }

    /// Removes `key`. Returns whether a live entry was removed.
    pub fn remove(&self, key: &[u8]) -> bool {
        self.expire_if_due(key);
        self.map.remove(key).is_some()
    }

    /// Removes every key in `keys`, returning how many were actually
    /// present and removed.
    pub fn remove_many<K: AsRef<[u8]>>(&self, keys: &[K]) -> usize {
        keys.iter().filter(|k| self.remove(k.as_ref())).count()
    }

    /// Replaces the deadline on a live entry. Returns whether the key
    /// existed.
    pub fn set_deadline(&self, key: &[u8], expires_at_ms: u64) -> bool {
        self.update(key, |entity| entity.expires_at_ms = expires_at_ms)
            .is_some()
    }

    /// Removes every entry.
    pub fn flush(&self) {
        self.map.clear();
    }

    /// Visits each live entry. Keys inserted or removed concurrently
    /// may or may not be visited; the visitor returns `false` to stop
    /// early. Expired entries are skipped (but not removed — the next
    /// direct read reaps them).
    pub fn for_each(&self, mut f: impl FnMut(&Bytes, &Entity) -> bool) {
        for entry in self.map.iter() {
            if entry.value().is_expired() {
                continue;
            }
            if !f(entry.key(), entry.value()) {
                break;
            }
        }
    }

    /// Number of entries, including any not-yet-reaped expired ones.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
