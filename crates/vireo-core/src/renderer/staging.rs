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

//! Frame-lifetime GPU-visible staging memory.
//!
//! Every buffer the binning engine produces (cluster array, object-index
//! pool, typed-object arrays) is requested through the
//! [`FrameStagingAllocator`] trait and is valid only until the allocator is
//! reset at the end of the frame. Allocations are identified by an opaque
//! [`StagingToken`] that the caller forwards to the GPU binding layer.
//!
//! Two allocation shapes are offered:
//!
//! - [`FrameStagingAllocator::allocate_words`] returns shared, zeroed
//!   `u32` storage that multiple workers write concurrently through atomic
//!   stores. Each slot is written by at most one worker; the scheduler's
//!   join barrier publishes the writes to the consumer.
//! - [`FrameStagingAllocator::upload_bytes`] copies a finished CPU-side
//!   array into frame memory in one shot.

use super::error::StagingError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// The GPU usage class of a staging allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingMemoryKind {
    /// Storage-buffer usage (large, random-access data).
    Storage,
    /// Uniform-buffer usage (small, per-frame constants and object arrays).
    Uniform,
}

/// An opaque handle to a frame-lifetime staging allocation.
///
/// The token is what the shading stage binds; the host never derives
/// pointers from it. A token can also be [`StagingToken::UNUSED`], which
/// marks an output that was intentionally not allocated (e.g. a typed
/// object category with zero visible objects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingToken {
    /// The usage class the allocation was made with.
    pub kind: StagingMemoryKind,
    /// The byte offset of the allocation within the frame arena.
    pub offset: u64,
    /// The size of the allocation in bytes.
    pub size: u64,
}

impl StagingToken {
    /// The token value marking an intentionally absent allocation.
    pub const UNUSED: Self = Self {
        kind: StagingMemoryKind::Uniform,
        offset: u64::MAX,
        size: 0,
    };

    /// Returns `true` if this token marks an absent allocation.
    #[inline]
    pub fn is_unused(&self) -> bool {
        self.offset == u64::MAX && self.size == 0
    }
}

/// A frame-lifetime allocation of shared `u32` words.
///
/// The words start zeroed. Workers write disjoint slots with relaxed
/// atomic stores; the task scheduler's wait-all barrier orders those
/// stores before any consumer read.
#[derive(Debug, Clone)]
pub struct WordAllocation {
    /// The GPU binding token for this allocation.
    pub token: StagingToken,
    /// The host-visible words backing the allocation.
    pub words: Arc<[AtomicU32]>,
}

impl WordAllocation {
    /// Returns the number of `u32` words in the allocation.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if the allocation holds no words.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Stores `value` into the slot at `index`.
    #[inline]
    pub fn store(&self, index: usize, value: u32) {
        self.words[index].store(value, Ordering::Relaxed);
    }

    /// Loads the value of the slot at `index`.
    #[inline]
    pub fn load(&self, index: usize) -> u32 {
        self.words[index].load(Ordering::Relaxed)
    }
}

/// The narrow interface to the engine's frame-lifetime GPU-visible
/// allocator.
///
/// Implementations are expected to be cheap bump allocators that are reset
/// wholesale between frames; nothing allocated through this trait survives
/// the frame.
pub trait FrameStagingAllocator: Send + Sync {
    /// Allocates `count` zero-initialized `u32` words for concurrent
    /// writing.
    fn allocate_words(
        &self,
        count: usize,
        kind: StagingMemoryKind,
    ) -> Result<WordAllocation, StagingError>;

    /// Copies a finished byte slice into frame memory and returns its
    /// binding token.
    fn upload_bytes(
        &self,
        bytes: &[u8],
        kind: StagingMemoryKind,
    ) -> Result<StagingToken, StagingError>;
}

/// Uploads a finished Pod slice through a [`FrameStagingAllocator`].
pub fn upload_slice<T: bytemuck::Pod>(
    allocator: &dyn FrameStagingAllocator,
    data: &[T],
    kind: StagingMemoryKind,
) -> Result<StagingToken, StagingError> {
    allocator.upload_bytes(bytemuck::cast_slice(data), kind)
}

// --- HostStagingArena ---

#[derive(Debug, Default)]
struct ArenaState {
    cursor: u64,
    uploads: Vec<(u64, Vec<u8>)>,
}

/// A host-memory [`FrameStagingAllocator`] with a fixed per-frame budget.
///
/// This is the reference implementation used by tests and by CPU capture
/// paths; a GPU backend substitutes its own persistently-mapped arena
/// behind the same trait. Offsets increase monotonically within a frame
/// and [`HostStagingArena::reset`] reclaims everything at once.
#[derive(Debug)]
pub struct HostStagingArena {
    capacity_bytes: u64,
    state: Mutex<ArenaState>,
}

impl HostStagingArena {
    /// Creates an arena with the given per-frame byte budget.
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            state: Mutex::new(ArenaState::default()),
        }
    }

    /// Reclaims all frame allocations. Outstanding tokens become stale.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.cursor = 0;
        state.uploads.clear();
    }

    /// Returns the bytes consumed so far this frame.
    pub fn used_bytes(&self) -> u64 {
        self.state.lock().unwrap().cursor
    }

    /// Reads back the bytes of an upload made this frame.
    ///
    /// Returns `None` for unused tokens or tokens from word allocations.
    pub fn read_bytes(&self, token: StagingToken) -> Option<Vec<u8>> {
        if token.is_unused() {
            return None;
        }
        let state = self.state.lock().unwrap();
        state
            .uploads
            .iter()
            .find(|(offset, _)| *offset == token.offset)
            .map(|(_, bytes)| bytes.clone())
    }

    fn reserve(&self, state: &mut ArenaState, size: u64) -> Result<u64, StagingError> {
        let remaining = self.capacity_bytes - state.cursor;
        if size > remaining {
            return Err(StagingError::OutOfMemory {
                requested_bytes: size,
                remaining_bytes: remaining,
            });
        }
        let offset = state.cursor;
        state.cursor += size;
        Ok(offset)
    }
}

impl FrameStagingAllocator for HostStagingArena {
    fn allocate_words(
        &self,
        count: usize,
        kind: StagingMemoryKind,
    ) -> Result<WordAllocation, StagingError> {
        let size = (count * std::mem::size_of::<u32>()) as u64;
        let mut state = self.state.lock().unwrap();
        let offset = self.reserve(&mut state, size)?;

        let words: Arc<[AtomicU32]> = (0..count).map(|_| AtomicU32::new(0)).collect();
        Ok(WordAllocation {
            token: StagingToken { kind, offset, size },
            words,
        })
    }

    fn upload_bytes(
        &self,
        bytes: &[u8],
        kind: StagingMemoryKind,
    ) -> Result<StagingToken, StagingError> {
        let size = bytes.len() as u64;
        let mut state = self.state.lock().unwrap();
        let offset = self.reserve(&mut state, size)?;
        state.uploads.push((offset, bytes.to_vec()));
        Ok(StagingToken { kind, offset, size })
    }
}

// --- Tests ---
