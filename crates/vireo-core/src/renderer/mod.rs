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

//! Renderer interface contracts and GPU-facing data structures.
//!
//! The types here form the boundary between the engine's CPU-side binning
//! code and its collaborators: the frame-lifetime staging allocator and
//! the shading stage that consumes the produced buffers.

pub mod cluster;
pub mod error;
pub mod staging;

pub use cluster::{
    ClusterGridConfig, GpuClusterMagicValues, GpuDecal, GpuPointLight, GpuReflectionProbe,
    GpuSpotLight, TypedObjectKind, INVALID_TEXTURE_INDEX, MAX_TYPED_OBJECTS_PER_CLUSTER,
    TYPED_OBJECT_COUNT,
};
pub use error::StagingError;
pub use staging::{
    FrameStagingAllocator, HostStagingArena, StagingMemoryKind, StagingToken, WordAllocation,
};
