// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The fixed-capacity object-index arena backing the per-cluster lists.

use std::sync::atomic::{AtomicU32, Ordering};
use vireo_core::renderer::{WordAllocation, TYPED_OBJECT_COUNT};

/// A bump-allocated arena of object indices in frame staging memory.
///
/// The first [`TYPED_OBJECT_COUNT`] words are the permanent *sentinel*: an
/// entry of four zero counts that every empty cluster points at. The rest
/// of the pool is handed out in contiguous runs through an atomic
/// `fetch_add` cursor. The cursor never decreases within a frame; a run
/// that would exceed the capacity is refused and the requesting cluster
/// falls back to the sentinel (lossy degradation, reported by the caller).
///
/// Handles are indices, never pointers: workers write their reserved run
/// through [`IndexPool::store`], which bounds-checks against the
/// allocation.
#[derive(Debug)]
pub struct IndexPool {
    words: WordAllocation,
    cursor: AtomicU32,
}

impl IndexPool {
    /// The index of the shared empty-cluster sentinel entry.
    pub const SENTINEL: u32 = 0;

    /// Wraps a frame allocation as an index pool and writes the sentinel.
    ///
    /// # Panics
    ///
    /// Panics if the allocation cannot hold the sentinel entry.
    pub fn new(words: WordAllocation) -> Self {
        assert!(
            words.len() >= TYPED_OBJECT_COUNT,
            "index pool must at least hold the sentinel entry"
        );
        for i in 0..TYPED_OBJECT_COUNT {
            words.store(i, 0);
        }
        Self {
            words,
            cursor: AtomicU32::new(TYPED_OBJECT_COUNT as u32),
        }
    }

    /// The pool capacity in words.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.words.len() as u32
    }

    /// Reserves `word_count` contiguous words and returns the first index,
    /// or `None` if the pool is exhausted.
    ///
    /// A failed reservation still advances the cursor; the pool never
    /// reuses space within a frame.
    #[inline]
    pub fn alloc(&self, word_count: u32) -> Option<u32> {
        let first = self.cursor.fetch_add(word_count, Ordering::Relaxed);
        if first as u64 + word_count as u64 > self.capacity() as u64 {
            return None;
        }
        Some(first)
    }

    /// Writes `value` at `index` inside a previously reserved run.
    #[inline]
    pub fn store(&self, index: u32, value: u32) {
        self.words.store(index as usize, value);
    }

    /// Reads the word at `index`.
    #[inline]
    pub fn load(&self, index: u32) -> u32 {
        self.words.load(index as usize)
    }
}

// --- Tests ---
