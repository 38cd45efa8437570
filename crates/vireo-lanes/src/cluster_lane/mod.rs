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

//! Clustered object-binning lane.
//!
//! This lane partitions the view frustum into a 3D grid of clusters
//! (screen tile × screen tile × depth split) and determines, once per
//! frame, which visible lights, decals and reflection probes overlap
//! which cluster. The result is a compact index structure in
//! frame-lifetime GPU memory that the shading stage walks per fragment.
//!
//! # Per-frame flow
//!
//! 1. [`ClusterBinner::bin`] computes the shader magic values and rebuilds
//!    the per-tile froxel edge cache if the projection changed
//!    (single-threaded prologue).
//! 2. The cluster buffer and object-index pool are allocated from the
//!    frame staging allocator.
//! 3. `N + 1` tasks are submitted together: one typed-object marshaller
//!    and `N` binning workers that pull tile indices from a shared atomic
//!    counter. The call blocks until all tasks complete.
//!
//! Capacity overflow in the index pool degrades the affected clusters to
//! the shared empty sentinel and is reported through
//! [`ClusterBinStats`] and a warning log, never as a frame failure.

mod binner;
mod grid;
mod index_pool;
mod marshal;
mod world;

pub use binner::{
    ClusterBinError, ClusterBinInput, ClusterBinOutput, ClusterBinStats, ClusterBinner,
};
pub use grid::{unproject_to_view, ClusterMagicValues, EdgeCache};
pub use index_pool::IndexPool;
pub use marshal::{write_typed_objects, TypedObjectTokens};
pub use world::{
    CameraView, ExtractedDecal, ExtractedPointLight, ExtractedReflectionProbe,
    ExtractedSpotLight, PointShadowInfo, RenderWorld, TextureAtlasId,
};
