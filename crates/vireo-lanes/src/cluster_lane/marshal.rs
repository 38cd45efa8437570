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

//! Converts the visible-object lists into GPU-consumable typed arrays.
//!
//! The marshaller runs as its own task, concurrently with the binning
//! workers: it only reads the visible lists, never the bin contents. Each
//! category is packed into its GPU layout and uploaded through the frame
//! staging allocator; a category with zero visible objects gets
//! [`StagingToken::UNUSED`] instead of a zero-sized allocation.

use super::world::{RenderWorld, TextureAtlasId};
use vireo_core::math::{Mat4, Vec4};
use vireo_core::renderer::staging::upload_slice;
use vireo_core::renderer::{
    FrameStagingAllocator, GpuDecal, GpuPointLight, GpuReflectionProbe, GpuSpotLight,
    StagingError, StagingMemoryKind, StagingToken, INVALID_TEXTURE_INDEX,
};

/// The GPU binding tokens of the per-category typed-object arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypedObjectTokens {
    /// The [`GpuDecal`] array, or unused.
    pub decals: StagingToken,
    /// The [`GpuPointLight`] array, or unused.
    pub point_lights: StagingToken,
    /// The [`GpuSpotLight`] array, or unused.
    pub spot_lights: StagingToken,
    /// The [`GpuReflectionProbe`] array, or unused.
    pub probes: StagingToken,
    /// The diffuse atlas shared by every visible decal this frame.
    pub decal_diffuse_atlas: Option<TextureAtlasId>,
    /// The specular/roughness atlas shared by every visible decal.
    pub decal_specular_roughness_atlas: Option<TextureAtlasId>,
}

fn uv_rect(uv: Vec4) -> [f32; 4] {
    // Stored as (min, max) corners; the shader wants origin + size.
    [uv.x, uv.y, uv.z - uv.x, uv.w - uv.y]
}

fn mat_to_cols(m: &Mat4) -> [[f32; 4]; 4] {
    [
        [m.cols[0].x, m.cols[0].y, m.cols[0].z, m.cols[0].w],
        [m.cols[1].x, m.cols[1].y, m.cols[1].z, m.cols[1].w],
        [m.cols[2].x, m.cols[2].y, m.cols[2].z, m.cols[2].w],
        [m.cols[3].x, m.cols[3].y, m.cols[3].z, m.cols[3].w],
    ]
}

/// Writes all four typed-object categories to frame staging memory.
///
/// # Panics
///
/// Panics if the visible decals do not all share the same diffuse and
/// specular/roughness atlases. That is a content/configuration error;
/// continuing would make the shared atlas binding silently wrong for some
/// of the decals.
pub fn write_typed_objects(
    world: &RenderWorld,
    staging: &dyn FrameStagingAllocator,
    shadows_enabled: bool,
) -> Result<TypedObjectTokens, StagingError> {
    // Point lights.
    let point_lights = if world.point_lights.is_empty() {
        StagingToken::UNUSED
    } else {
        let gpu: Vec<GpuPointLight> = world
            .point_lights
            .iter()
            .map(|light| {
                let mut out = GpuPointLight {
                    position_inv_radius_sq: [
                        light.position.x,
                        light.position.y,
                        light.position.z,
                        1.0 / (light.radius * light.radius),
                    ],
                    diffuse_color_tile_size: [
                        light.diffuse_color.r,
                        light.diffuse_color.g,
                        light.diffuse_color.b,
                        INVALID_TEXTURE_INDEX,
                    ],
                    atlas_tiles: [0, 0],
                    radius_pad: [light.radius, 0.0],
                };
                if let (Some(shadow), true) = (light.shadow, shadows_enabled) {
                    out.diffuse_color_tile_size[3] = shadow.atlas_tile_size;
                    out.atlas_tiles = shadow.atlas_tiles;
                }
                out
            })
            .collect();
        upload_slice(staging, &gpu, StagingMemoryKind::Uniform)?
    };

    // Spot lights.
    let spot_lights = if world.spot_lights.is_empty() {
        StagingToken::UNUSED
    } else {
        let gpu: Vec<GpuSpotLight> = world
            .spot_lights
            .iter()
            .map(|light| {
                let shadowed = light.has_shadow && shadows_enabled;
                let position = light.position();
                let direction = light.direction();
                GpuSpotLight {
                    texture_matrix: if shadowed {
                        mat_to_cols(&light.texture_matrix)
                    } else {
                        mat_to_cols(&Mat4::IDENTITY)
                    },
                    position_inv_radius_sq: [
                        position.x,
                        position.y,
                        position.z,
                        1.0 / (light.range * light.range),
                    ],
                    diffuse_color_shadowmap_id: [
                        light.diffuse_color.r,
                        light.diffuse_color.g,
                        light.diffuse_color.b,
                        if shadowed { 1.0 } else { INVALID_TEXTURE_INDEX },
                    ],
                    direction_range: [direction.x, direction.y, direction.z, light.range],
                    outer_cos_inner_cos: [
                        (light.outer_angle / 2.0).cos(),
                        (light.inner_angle / 2.0).cos(),
                        1.0,
                        1.0,
                    ],
                }
            })
            .collect();
        upload_slice(staging, &gpu, StagingMemoryKind::Uniform)?
    };

    // Decals. All visible decals must reference one shared atlas pair.
    let mut decal_diffuse_atlas: Option<TextureAtlasId> = None;
    let mut decal_specular_roughness_atlas: Option<TextureAtlasId> = None;
    let decals = if world.decals.is_empty() {
        StagingToken::UNUSED
    } else {
        let gpu: Vec<GpuDecal> = world
            .decals
            .iter()
            .map(|decal| {
                let diffuse_matches =
                    decal_diffuse_atlas.is_none_or(|atlas| atlas == decal.diffuse_atlas);
                let specular_matches = decal_specular_roughness_atlas
                    .is_none_or(|atlas| atlas == decal.specular_roughness_atlas);
                assert!(
                    diffuse_matches && specular_matches,
                    "all visible decals must share the same texture atlases"
                );
                decal_diffuse_atlas = Some(decal.diffuse_atlas);
                decal_specular_roughness_atlas = Some(decal.specular_roughness_atlas);

                GpuDecal {
                    diffuse_uv: uv_rect(decal.diffuse_uv),
                    normal_roughness_uv: uv_rect(decal.specular_roughness_uv),
                    blend_factors: [
                        decal.diffuse_blend_factor,
                        decal.specular_roughness_blend_factor,
                    ],
                    _padding: [0.0, 0.0],
                    texture_matrix: mat_to_cols(&decal.texture_matrix),
                }
            })
            .collect();
        upload_slice(staging, &gpu, StagingMemoryKind::Uniform)?
    };

    // Probes.
    let probes = if world.probes.is_empty() {
        StagingToken::UNUSED
    } else {
        let gpu: Vec<GpuReflectionProbe> = world
            .probes
            .iter()
            .map(|probe| GpuReflectionProbe {
                position_cubemap_index: [
                    probe.position.x,
                    probe.position.y,
                    probe.position.z,
                    probe.cubemap_array_index,
                ],
                aabb_min: [probe.aabb_min.x, probe.aabb_min.y, probe.aabb_min.z, 0.0],
                aabb_max: [probe.aabb_max.x, probe.aabb_max.y, probe.aabb_max.z, 0.0],
            })
            .collect();
        upload_slice(staging, &gpu, StagingMemoryKind::Uniform)?
    };

    Ok(TypedObjectTokens {
        decals,
        point_lights,
        spot_lights,
        probes,
        decal_diffuse_atlas,
        decal_specular_roughness_atlas,
    })
}

// --- Tests ---
