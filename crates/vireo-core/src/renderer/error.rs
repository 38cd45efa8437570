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

//! Defines the error types for the renderer interface contracts.

use std::fmt;

/// An error produced by a frame-lifetime staging allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingError {
    /// The allocator cannot satisfy the request within its frame budget.
    OutOfMemory {
        /// The size of the failed request in bytes.
        requested_bytes: u64,
        /// The bytes still available in the frame arena.
        remaining_bytes: u64,
    },
}

impl fmt::Display for StagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagingError::OutOfMemory {
                requested_bytes,
                remaining_bytes,
            } => {
                write!(
                    f,
                    "Frame staging memory exhausted: requested {requested_bytes} bytes, \
                     {remaining_bytes} remaining"
                )
            }
        }
    }
}

impl std::error::Error for StagingError {}
