//! Auto-ID allocation - per-collection used-ID tracking.
//!
//! An [`AutoIdContext`] records which integer IDs one destination collection
//! already occupies. Existing collections usually fill a dense `0..N` prefix,
//! so construction compresses that prefix into a single `min_id` watermark:
//! every ID below `min_id` is implicitly used, and only the sparse IDs above
//! it are kept in the set. `has_id` on the dense prefix is then O(1) without
//! holding N entries.
//!
//! The [`AutoIdRegistry`] caches one context per destination-collection
//! identity for the lifetime of the install session, created lazily on first
//! use.

use std::collections::{HashMap, HashSet};

/// Used-ID state for one destination collection.
#[derive(Debug, Clone)]
pub struct AutoIdContext {
    assigned: HashSet<i64>,
    min_id: i64,
}

impl AutoIdContext {
    /// Build a context from the IDs currently in use.
    pub fn new<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        let mut ids: Vec<i64> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut min_id = 0;
        let mut i = 0;
        while i < ids.len() && ids[i] == min_id {
            min_id += 1;
            i += 1;
        }

        // Everything below min_id is covered by the watermark; keep the rest.
        let assigned = ids[i..].iter().copied().filter(|&id| id >= min_id).collect();
        Self { assigned, min_id }
    }

    /// All IDs below this are implicitly used.
    pub fn min_id(&self) -> i64 {
        self.min_id
    }

    /// Number of sparse IDs tracked above the watermark.
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }

    pub fn has_id(&self, id: i64) -> bool {
        id < self.min_id || self.assigned.contains(&id)
    }

    /// Reserve an ID. IDs below the watermark are already covered.
    pub fn mark_used(&mut self, id: i64) {
        if id >= self.min_id {
            self.assigned.insert(id);
        }
    }

    /// Find and reserve the first run of `sequence` consecutive free IDs whose
    /// start lies in `[min, max]`. The whole block is checked before anything
    /// is reserved, so a mid-block collision never leaks a partial
    /// reservation. Returns `None` when the range is exhausted.
    pub fn allocate(&mut self, min: i64, max: i64, sequence: i64) -> Option<i64> {
        let sequence = sequence.max(1);
        let mut id = min;
        'scan: while id <= max {
            for offset in 0..sequence {
                if self.has_id(id + offset) {
                    id += offset + 1;
                    continue 'scan;
                }
            }
            for offset in 0..sequence {
                self.mark_used(id + offset);
            }
            return Some(id);
        }
        None
    }
}

/// Session-scoped cache: destination-collection identity -> context.
#[derive(Debug, Default)]
pub struct AutoIdRegistry {
    contexts: HashMap<String, AutoIdContext>,
}

impl AutoIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached context for `identity`, seeding a new one from
    /// `seed` on first use.
    pub fn get_or_create(
        &mut self,
        identity: &str,
        seed: impl FnOnce() -> Vec<i64>,
    ) -> &mut AutoIdContext {
        self.contexts
            .entry(identity.to_string())
            .or_insert_with(|| AutoIdContext::new(seed()))
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.contexts.contains_key(identity)
    }
}
