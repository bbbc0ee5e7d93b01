//! Bounded converter resolution cache
//!
//! Maps a `ConvertiblePair` to the converter resolved for it, or to the
//! `Unconvertible` sentinel when the hierarchy walk found nothing. The cache
//! is bounded: when an insert pushes it over capacity, the oldest batch of
//! entries (in insertion order) is evicted. Eviction only forces
//! re-resolution, so results never depend on what was evicted.
//!
//! Every `clear` starts a new generation. An outcome resolved under an older
//! generation is discarded instead of cached, so a walk that raced with a
//! registration cannot leave a stale entry behind.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::converter::TypeConverter;
use crate::pair::ConvertiblePair;

/// A cached resolution outcome
#[derive(Clone)]
pub enum CachedConverter {
    /// A converter was found
    Found(Arc<dyn TypeConverter>),
    /// The walk found no converter
    Unconvertible,
}

impl fmt::Debug for CachedConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachedConverter::Found(_) => f.write_str("Found(..)"),
            CachedConverter::Unconvertible => f.write_str("Unconvertible"),
        }
    }
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that required a hierarchy walk
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Current number of entries
    pub entries: usize,
}

/// Thread-safe bounded map from pair to resolution outcome
pub struct ConverterCache {
    entries: DashMap<ConvertiblePair, CachedConverter>,
    /// Insertion order, oldest first
    order: Mutex<VecDeque<ConvertiblePair>>,
    capacity: usize,
    eviction_batch: usize,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ConverterCache {
    /// Create a cache holding at most `capacity` entries, evicting
    /// `eviction_batch` of the oldest at a time
    pub fn new(capacity: usize, eviction_batch: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity,
            eviction_batch: eviction_batch.clamp(1, capacity),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a pair
    pub fn get(&self, pair: &ConvertiblePair) -> Option<CachedConverter> {
        match self.entries.get(pair) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Current generation, read before resolving an outcome to insert
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store a resolution outcome
    pub fn insert(&self, pair: ConvertiblePair, outcome: CachedConverter) {
        self.insert_at(pair, outcome, self.generation());
    }

    /// Store an outcome resolved during `generation`
    ///
    /// Returns false, caching nothing, if the cache was cleared since.
    pub fn insert_at(&self, pair: ConvertiblePair, outcome: CachedConverter, generation: u64) -> bool {
        let mut order = self.order.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::trace!(%pair, "discarding outcome from a cleared generation");
            return false;
        }
        if self.entries.insert(pair.clone(), outcome).is_none() {
            order.push_back(pair);
        }
        if self.entries.len() > self.capacity {
            self.evict(&mut order);
        }
        true
    }

    fn evict(&self, order: &mut VecDeque<ConvertiblePair>) {
        let keep = self.capacity - self.eviction_batch;
        let mut evicted = 0u64;
        while self.entries.len() > keep {
            let Some(oldest) = order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            tracing::trace!(evicted, remaining = self.entries.len(), "converter cache eviction");
        }
    }

    /// Drop all entries and start a new generation
    pub fn clear(&self) {
        let mut order = self.order.lock();
        self.entries.clear();
        order.clear();
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot the counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
