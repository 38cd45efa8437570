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

//! Defines the intermediate `RenderWorld` consumed by the cluster lane.
//!
//! The `RenderWorld` is a temporary, frame-by-frame representation of the
//! visible scene, populated by the visibility system before binning
//! starts. It is read-only for the whole binning pass; no worker mutates
//! it.

use vireo_core::math::{LinearRgba, Mat3, Mat4, Vec3, Vec4};

/// Identifies a texture atlas owned by the resource system.
///
/// The cluster lane only compares and forwards these; it never
/// dereferences them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureAtlasId(pub usize);

/// The camera state the cluster grid is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// Distance to the near clipping plane.
    pub near: f32,
    /// Distance to the far clipping plane.
    pub far: f32,
    /// The world-to-view matrix.
    pub view: Mat4,
    /// The view-to-clip projection matrix ([0, 1] depth, right-handed).
    pub projection: Mat4,
    /// `projection * view`, cached by the render queue.
    pub view_projection: Mat4,
    /// The camera's world transform (view-to-world). Changes every frame
    /// even when the projection does not.
    pub camera_transform: Mat4,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 1000.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            camera_transform: Mat4::IDENTITY,
        }
    }
}

impl CameraView {
    /// Builds a view from a camera world transform and a perspective
    /// projection, deriving the view and view-projection matrices.
    ///
    /// Returns `None` if the camera transform is not invertible.
    pub fn from_camera(
        camera_transform: Mat4,
        projection: Mat4,
        near: f32,
        far: f32,
    ) -> Option<Self> {
        let view = camera_transform.affine_inverse()?;
        Some(Self {
            near,
            far,
            view,
            projection,
            view_projection: projection * view,
            camera_transform,
        })
    }
}

/// Shadow atlas placement for a shadow-casting point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointShadowInfo {
    /// The size of one atlas tile in UV space.
    pub atlas_tile_size: f32,
    /// The light's tile coordinates within the shadow atlas.
    pub atlas_tiles: [u32; 2],
}

/// A visible point light, flattened for binning and marshalling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedPointLight {
    /// World-space position of the light.
    pub position: Vec3,
    /// The influence radius in world units.
    pub radius: f32,
    /// Diffuse color in linear space.
    pub diffuse_color: LinearRgba,
    /// Shadow atlas placement, or `None` for a shadowless light.
    pub shadow: Option<PointShadowInfo>,
}

/// A visible spot light, flattened for binning and marshalling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedSpotLight {
    /// The light's world transform. The cone opens along the local −Z axis.
    pub world_transform: Mat4,
    /// The cone length (influence range) in world units.
    pub range: f32,
    /// Full outer aperture of the cone, in radians.
    pub outer_angle: f32,
    /// Full inner aperture of the cone, in radians.
    pub inner_angle: f32,
    /// Diffuse color in linear space.
    pub diffuse_color: LinearRgba,
    /// `bias * proj * view` matrix for shadow lookups.
    pub texture_matrix: Mat4,
    /// Whether the light renders a shadow map this frame.
    pub has_shadow: bool,
}

impl ExtractedSpotLight {
    /// The apex of the cone in world space.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.world_transform.cols[3].truncate()
    }

    /// The direction the cone opens towards (the transform's −Z axis).
    #[inline]
    pub fn direction(&self) -> Vec3 {
        -self.world_transform.cols[2].truncate()
    }
}

/// A visible decal, flattened for binning and marshalling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedDecal {
    /// Center of the decal's oriented box in world space.
    pub center: Vec3,
    /// Orientation of the decal box.
    pub rotation: Mat3,
    /// Half-extents of the decal box along its local axes.
    pub half_extents: Vec3,
    /// The diffuse texture atlas. All visible decals must share one.
    pub diffuse_atlas: TextureAtlasId,
    /// The specular/roughness texture atlas. All visible decals must share
    /// one.
    pub specular_roughness_atlas: TextureAtlasId,
    /// Diffuse atlas rectangle as `(minU, minV, maxU, maxV)`.
    pub diffuse_uv: Vec4,
    /// Specular/roughness atlas rectangle as `(minU, minV, maxU, maxV)`.
    pub specular_roughness_uv: Vec4,
    /// Blend factor of the diffuse layer.
    pub diffuse_blend_factor: f32,
    /// Blend factor of the specular/roughness layer.
    pub specular_roughness_blend_factor: f32,
    /// `bias * proj * view` matrix projecting world space into decal UVs.
    pub texture_matrix: Mat4,
}

/// A visible reflection probe, flattened for binning and marshalling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedReflectionProbe {
    /// World-space position of the probe.
    pub position: Vec3,
    /// Minimum corner of the probe's precomputed world AABB.
    pub aabb_min: Vec3,
    /// Maximum corner of the probe's precomputed world AABB.
    pub aabb_max: Vec3,
    /// Index of the probe's cubemap in the texture array.
    pub cubemap_array_index: f32,
}

/// All data the cluster lane needs for one frame.
///
/// Populated by the (external) visibility system; read-only for every
/// binning worker and the marshaller.
#[derive(Debug, Default)]
pub struct RenderWorld {
    /// The active camera.
    pub view: CameraView,
    /// Visible point lights.
    pub point_lights: Vec<ExtractedPointLight>,
    /// Visible spot lights.
    pub spot_lights: Vec<ExtractedSpotLight>,
    /// Visible decals.
    pub decals: Vec<ExtractedDecal>,
    /// Visible reflection probes.
    pub probes: Vec<ExtractedReflectionProbe>,
}

impl RenderWorld {
    /// Creates an empty world for the given camera.
    pub fn new(view: CameraView) -> Self {
        Self {
            view,
            ..Default::default()
        }
    }

    /// Clears all object lists, preparing for the next frame's extraction.
    pub fn clear(&mut self) {
        self.point_lights.clear();
        self.spot_lights.clear();
        self.decals.clear();
        self.probes.clear();
    }
}
