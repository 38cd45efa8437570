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

//! Defines the data structures for clustered object binning.
//!
//! Clustered binning partitions the view frustum into a 3D grid of
//! clusters (screen tile × screen tile × depth split) and records, per
//! cluster, which lights, decals and probes overlap it. The shading stage
//! then only evaluates the objects bound to a fragment's cluster.
//!
//! # Buffers produced per frame
//!
//! - A **cluster buffer**: one `u32` per cluster, the first index of the
//!   cluster's entry in the object-index buffer (`0` = the shared empty
//!   sentinel).
//! - An **object-index buffer**: per non-empty cluster, four
//!   `[count, indices…]` runs, one per typed object category in
//!   [`TypedObjectKind`] order.
//! - Four **typed-object arrays** ([`GpuDecal`], [`GpuPointLight`],
//!   [`GpuSpotLight`], [`GpuReflectionProbe`]) the recorded indices point
//!   into.
//! - The [`GpuClusterMagicValues`] the shader uses to map a world position
//!   back to a depth split without a full unprojection.

use bytemuck::{Pod, Zeroable};

/// The number of typed object categories recorded per cluster.
pub const TYPED_OBJECT_COUNT: usize = 4;

/// Upper bound on objects of all categories collected into a single
/// cluster.
///
/// This sizes the fixed per-cluster scratch buffer on the binning workers'
/// stacks. Exceeding it is a programming/configuration error (the constant
/// is mis-tuned for the scene), not a runtime condition.
pub const MAX_TYPED_OBJECTS_PER_CLUSTER: usize = 64;

/// Marker written in place of a shadow atlas reference when an object
/// casts no shadow.
pub const INVALID_TEXTURE_INDEX: f32 = -1.0;

/// The typed object categories, in the order their index runs are packed
/// per cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TypedObjectKind {
    /// Projected decals.
    Decal = 0,
    /// Omnidirectional lights.
    PointLight = 1,
    /// Cone lights.
    SpotLight = 2,
    /// Reflection/irradiance probes.
    ReflectionProbe = 3,
}

impl TypedObjectKind {
    /// All categories in packing order.
    pub const ALL: [TypedObjectKind; TYPED_OBJECT_COUNT] = [
        TypedObjectKind::Decal,
        TypedObjectKind::PointLight,
        TypedObjectKind::SpotLight,
        TypedObjectKind::ReflectionProbe,
    ];

    /// Returns the category's position in the per-cluster packing order.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

// --- Grid configuration ---

/// Configuration of the cluster grid.
///
/// Set once at engine initialization; the derived buffer sizes are fixed
/// for the lifetime of the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterGridConfig {
    /// Number of screen tiles along X and Y.
    pub tile_counts: [u32; 2],
    /// Number of non-linear depth divisions between the near and far plane.
    pub depth_split_count: u32,
    /// Average object index budget per cluster. Sizes the shared index
    /// pool; clusters that collectively exceed it degrade to the empty
    /// sentinel.
    pub avg_objects_per_cluster: u32,
}

impl Default for ClusterGridConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterGridConfig {
    /// Creates the default grid: 32×16 tiles, 16 depth splits, 16 average
    /// objects per cluster.
    pub const fn new() -> Self {
        Self {
            tile_counts: [32, 16],
            depth_split_count: 16,
            avg_objects_per_cluster: 16,
        }
    }

    /// A grid tuned for scenes with dense object placement.
    pub const fn high_density() -> Self {
        Self {
            tile_counts: [32, 16],
            depth_split_count: 16,
            avg_objects_per_cluster: 32,
        }
    }

    /// A coarse grid for low-overhead rendering paths.
    pub const fn low_overhead() -> Self {
        Self {
            tile_counts: [16, 8],
            depth_split_count: 8,
            avg_objects_per_cluster: 8,
        }
    }

    /// The number of screen tiles (clusters per depth split).
    #[inline]
    pub const fn tile_count(&self) -> u32 {
        self.tile_counts[0] * self.tile_counts[1]
    }

    /// The total number of clusters in the grid.
    #[inline]
    pub const fn total_cluster_count(&self) -> u32 {
        self.tile_count() * self.depth_split_count
    }

    /// The capacity of the shared object-index pool, in `u32` words.
    ///
    /// The first [`TYPED_OBJECT_COUNT`] words are the permanent empty-cluster
    /// sentinel; the rest back the per-cluster index runs.
    #[inline]
    pub const fn index_pool_word_count(&self) -> u32 {
        self.avg_objects_per_cluster * self.total_cluster_count()
    }

    /// The size of the object-index buffer in bytes.
    #[inline]
    pub const fn index_buffer_size(&self) -> u64 {
        self.index_pool_word_count() as u64 * std::mem::size_of::<u32>() as u64
    }

    /// The size of the cluster buffer in bytes (one `u32` per cluster).
    #[inline]
    pub const fn cluster_buffer_size(&self) -> u64 {
        self.total_cluster_count() as u64 * std::mem::size_of::<u32>() as u64
    }
}

// --- GPU structures ---

/// The precomputed coefficients a shader uses to derive a cluster's depth
/// split from a world position.
///
/// `k = sqrt(dot(val0.xyz, worldPos) - val0.w)`; `val1` holds
/// `(far - near) / splits²` and the near distance for the inverse mapping.
/// Valid only for the camera state that produced it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuClusterMagicValues {
    /// The world-space near-plane normal scaled by `splits²/(far-near)`
    /// (xyz) and the equally scaled plane offset (w).
    pub val0: [f32; 4],
    /// `x = (far-near)/splits²`, `y = near`; `z`, `w` reserved.
    pub val1: [f32; 4],
}

/// GPU representation of a visible point light.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    /// World position (xyz) and `1 / radius²` (w) for attenuation.
    pub position_inv_radius_sq: [f32; 4],
    /// Diffuse color (rgb) and the shadow atlas tile size, or
    /// [`INVALID_TEXTURE_INDEX`] when the light casts no shadow (w).
    pub diffuse_color_tile_size: [f32; 4],
    /// Shadow atlas tile coordinates.
    pub atlas_tiles: [u32; 2],
    /// The light's influence radius; second element is padding.
    pub radius_pad: [f32; 2],
}

/// GPU representation of a visible spot light.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuSpotLight {
    /// `bias * proj * view` matrix for shadow lookup. Identity when the
    /// light casts no shadow.
    pub texture_matrix: [[f32; 4]; 4],
    /// World position (xyz) and `1 / range²` (w).
    pub position_inv_radius_sq: [f32; 4],
    /// Diffuse color (rgb) and the shadowmap id, or
    /// [`INVALID_TEXTURE_INDEX`] (w).
    pub diffuse_color_shadowmap_id: [f32; 4],
    /// Light direction (xyz) and range (w).
    pub direction_range: [f32; 4],
    /// `cos(outerAngle/2)` (x), `cos(innerAngle/2)` (y); `z`, `w` reserved.
    pub outer_cos_inner_cos: [f32; 4],
}

/// GPU representation of a visible decal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuDecal {
    /// Diffuse atlas rectangle as `(u, v, width, height)`.
    pub diffuse_uv: [f32; 4],
    /// Specular/roughness atlas rectangle as `(u, v, width, height)`.
    pub normal_roughness_uv: [f32; 4],
    /// Blend factors for the diffuse and specular/roughness layers.
    pub blend_factors: [f32; 2],
    /// Padding for 16-byte alignment.
    pub _padding: [f32; 2],
    /// `bias * proj * view` matrix projecting world space into decal UVs.
    pub texture_matrix: [[f32; 4]; 4],
}

/// GPU representation of a visible reflection probe.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuReflectionProbe {
    /// World position (xyz) and cubemap array index (w).
    pub position_cubemap_index: [f32; 4],
    /// Minimum corner of the probe's world AABB; `w` is padding.
    pub aabb_min: [f32; 4],
    /// Maximum corner of the probe's world AABB; `w` is padding.
    pub aabb_max: [f32; 4],
}

// --- Tests ---
