//! Memoization cache for classified execution results.
//!
//! Results are keyed by a SHA-256 content hash of the snippet. Entries carry
//! a per-entry TTL, expired lazily on lookup and eagerly on an explicit
//! sweep. Eviction kicks in before an insert would exceed the capacity;
//! the policy is selectable between LRU, LFU and insertion order.
//!
//! The cache is a caller-owned instance with single-writer semantics; a
//! deployment with concurrent callers must add its own synchronization.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::classifier::EnhancedResult;

/// Default capacity in entries.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// Default time-to-live (30 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(1800);

/// Rough per-entry bookkeeping overhead used for the memory estimate.
const ENTRY_OVERHEAD_BYTES: usize = 256;

/// Eviction policy applied when the cache is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Evict the entry with the oldest last access.
    #[default]
    Lru,
    /// Evict the entry with the lowest hit count.
    Lfu,
    /// Evict the oldest inserted entry.
    InsertionOrder,
}

/// A single cached result entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    result: EnhancedResult,
    created: Instant,
    ttl: Duration,
    hit_count: u64,
    last_accessed: Instant,
    /// Monotonic insertion counter for the insertion-order policy.
    sequence: u64,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created.elapsed() > self.ttl
    }

    fn record_hit(&mut self) {
        self.hit_count += 1;
        self.last_accessed = Instant::now();
    }
}

/// Cache performance statistics, computed on demand to avoid drift.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// Total cache hits.
    pub hits: u64,
    /// Total cache misses (including expired lookups).
    pub misses: u64,
    /// Current live entry count.
    pub entries: usize,
    /// Configured capacity.
    pub max_entries: usize,
    /// Entries evicted by the policy.
    pub evicted: u64,
    /// Entries dropped because their TTL elapsed.
    pub expired: u64,
    /// Hit rate over all lookups, in `[0, 1]`.
    pub hit_rate: f64,
    /// Estimated memory footprint of live entries in bytes.
    pub estimated_memory_bytes: usize,
}

/// Hash-keyed store of classified results with TTL and eviction.
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    max_entries: usize,
    default_ttl: Duration,
    policy: EvictionPolicy,
    hits: u64,
    misses: u64,
    evicted: u64,
    expired: u64,
    next_sequence: u64,
}

impl ResultCache {
    /// Creates a cache with explicit capacity, TTL and policy.
    pub fn new(max_entries: usize, default_ttl: Duration, policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            default_ttl,
            policy,
            hits: 0,
            misses: 0,
            evicted: 0,
            expired: 0,
            next_sequence: 0,
        }
    }

    /// Creates a cache with default capacity, TTL and LRU eviction.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL, EvictionPolicy::Lru)
    }

    /// SHA-256 content hash of a snippet, hex-encoded.
    pub fn hash_code(code: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(code.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Looks up a cached result, expiring the entry lazily.
    pub fn get(&mut self, code: &str) -> Option<EnhancedResult> {
        let hash = Self::hash_code(code);

        let expired = match self.entries.get(&hash) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            self.entries.remove(&hash);
            self.expired += 1;
            self.misses += 1;
            debug!(code_hash = %hash, "Cache entry expired on lookup");
            return None;
        }

        // Present and fresh.
        let entry = self.entries.get_mut(&hash)?;
        entry.record_hit();
        self.hits += 1;
        Some(entry.result.clone())
    }

    /// Stores a result; a no-op for non-cacheable results.
    pub fn put(&mut self, code: &str, result: EnhancedResult, ttl: Option<Duration>) {
        if !result.is_cacheable {
            debug!(category = %result.category, "Skipping cache store for non-cacheable result");
            return;
        }

        let hash = Self::hash_code(code);

        // Evict before inserting a genuinely new entry at capacity.
        if !self.entries.contains_key(&hash) && self.entries.len() >= self.max_entries {
            self.evict_one();
        }

        let now = Instant::now();
        self.entries.insert(
            hash,
            CacheEntry {
                result,
                created: now,
                ttl: ttl.unwrap_or(self.default_ttl),
                hit_count: 0,
                last_accessed: now,
                sequence: self.next_sequence,
            },
        );
        self.next_sequence += 1;
    }

    /// Removes all entries and resets statistics.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
        self.evicted = 0;
        self.expired = 0;
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(hash, _)| hash.clone())
            .collect();

        for hash in &stale {
            self.entries.remove(hash);
        }
        self.expired += stale.len() as u64;
        stale.len()
    }

    /// Current number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes statistics, sweeping expired entries first.
    pub fn statistics(&mut self) -> CacheStatistics {
        self.cleanup_expired();

        let lookups = self.hits + self.misses;
        let hit_rate = if lookups > 0 {
            self.hits as f64 / lookups as f64
        } else {
            0.0
        };

        let estimated_memory_bytes = self
            .entries
            .iter()
            .map(|(hash, entry)| {
                hash.len()
                    + entry.result.metadata.output_size_bytes
                    + entry.result.summary.len()
                    + ENTRY_OVERHEAD_BYTES
            })
            .sum();

        CacheStatistics {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
            max_entries: self.max_entries,
            evicted: self.evicted,
            expired: self.expired,
            hit_rate,
            estimated_memory_bytes,
        }
    }

    /// Most frequently hit entries as `(code_hash, hit_count)` pairs.
    pub fn hot_entries(&self, top_n: usize) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(hash, entry)| (hash.clone(), entry.hit_count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(top_n);
        entries
    }

    fn evict_one(&mut self) {
        let victim = match self.policy {
            EvictionPolicy::Lru => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(hash, _)| hash.clone()),
            EvictionPolicy::Lfu => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.hit_count)
                .map(|(hash, _)| hash.clone()),
            EvictionPolicy::InsertionOrder => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(hash, _)| hash.clone()),
        };

        if let Some(hash) = victim {
            self.entries.remove(&hash);
            self.evicted += 1;
            debug!(code_hash = %hash, policy = ?self.policy, "Evicted cache entry");
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}
