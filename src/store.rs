use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::seq::IteratorRandom;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Bytes,
    pub expires_at: Option<Instant>,
}

/// The keyspace: byte-string values keyed by name, each with an optional
/// expiry instant. Expired entries are dropped lazily by every accessor,
/// and in bulk by the sampled background sweep.
#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<String, Entry>,
}

impl Store {
    pub fn new() -> Store {
        Store {
            entries: HashMap::new(),
        }
    }

    /// Stores a value. Overwriting always clears a previous expiry.
    pub fn set(&mut self, key: String, value: Bytes) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: None,
            },
        );
    }

    pub fn get(&mut self, key: &str) -> Option<&Bytes> {
        if self.remove_if_expired(key) {
            return None;
        }
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn exists(&mut self, key: &str) -> bool {
        !self.remove_if_expired(key) && self.entries.contains_key(key)
    }

    /// Sets the expiry of an existing key; false when the key is absent.
    pub fn set_expiry(&mut self, key: &str, at: Instant) -> bool {
        if self.remove_if_expired(key) {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(at);
                true
            }
            None => false,
        }
    }

    /// Clears the expiry of a key; true only if an expiry was present.
    pub fn persist(&mut self, key: &str) -> bool {
        if self.remove_if_expired(key) {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(entry) if entry.expires_at.is_some() => {
                entry.expires_at = None;
                true
            }
            _ => false,
        }
    }

    /// `None` when the key is absent (or just lazily expired),
    /// `Some(None)` when it has no expiry, `Some(Some(d))` otherwise.
    pub fn remaining_ttl(&mut self, key: &str) -> Option<Option<Duration>> {
        let now = Instant::now();
        if self.remove_if_expired_at(key, now) {
            return None;
        }
        let entry = self.entries.get(key)?;
        Some(
            entry
                .expires_at
                .map(|at| at.saturating_duration_since(now)),
        )
    }

    pub fn remove_if_expired(&mut self, key: &str) -> bool {
        self.remove_if_expired_at(key, Instant::now())
    }

    fn remove_if_expired_at(&mut self, key: &str, now: Instant) -> bool {
        match self.entries.get(key) {
            Some(Entry {
                expires_at: Some(at),
                ..
            }) if *at <= now => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Uniform sample of up to `max` keys for the background sweep.
    pub fn sample_keys(&self, max: usize, rng: &mut impl Rng) -> Vec<String> {
        self.entries.keys().cloned().choose_multiple(rng, max)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
