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

//! Cluster grid geometry: the non-linear depth mapping and the per-tile
//! froxel edge cache.

use vireo_core::math::{Mat4, Plane, Vec2, Vec3, Vec4};
use vireo_core::renderer::{ClusterGridConfig, GpuClusterMagicValues};

/// Unprojects NDC coordinates to view space at the given view-space depth.
///
/// `unproj_params` comes from
/// [`Mat4::perspective_unprojection_params`]. The returned point has
/// `w = 0`; callers mark point vs. direction themselves.
#[inline]
pub fn unproject_to_view(z_view: f32, ndc: Vec2, unproj_params: Vec4) -> Vec4 {
    Vec4::new(ndc.x * unproj_params.x, ndc.y * unproj_params.y, 1.0, 0.0) * z_view
}

/// The coefficients mapping world positions to depth-split indices.
///
/// Given a distance `d` from the camera's near plane, the split index is
/// `k = sqrt(d / (far - near) * splits²)`. For an arbitrary world position
/// `W`, `d = dot(Pn, W) - Po` with `(Pn, Po)` the world-space near plane,
/// so with `A = Pn * splits² / (far - near)` and
/// `B = Po * splits² / (far - near)`:
///
/// `k = sqrt(dot(A, W) - B)`
///
/// Valid only for the camera state that produced it; recomputed whenever
/// the projection or the split count changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterMagicValues {
    /// `A` (xyz) and `B` (w).
    pub val0: Vec4,
    /// `x = (far - near) / splits²`, `y = near`.
    pub val1: Vec4,
}

impl ClusterMagicValues {
    /// Derives the magic values from the frame's camera state.
    pub fn compute(view_projection: &Mat4, near: f32, far: f32, depth_split_count: u32) -> Self {
        let splits_sq = (depth_split_count * depth_split_count) as f32;
        let scale = splits_sq / (far - near);

        // The near clip plane in world space: with a [0, 1] depth range the
        // half-space z_ndc >= 0 is the z row of the view-projection matrix.
        let near_plane = Plane::from_clip_row(view_projection.get_row(2));

        Self {
            val0: Vec4::from_vec3(near_plane.normal * scale, near_plane.offset * scale),
            val1: Vec4::new((far - near) / splits_sq, near, 0.0, 0.0),
        }
    }

    /// The distance from the camera to the near boundary of depth split
    /// `split_index`.
    ///
    /// Inverse of the `k = sqrt(dot(A, W) - B)` mapping; strictly
    /// increasing in `split_index`.
    #[inline]
    pub fn depth_split_near(&self, split_index: u32) -> f32 {
        let k = split_index as f32;
        self.val1.y + k * k * self.val1.x
    }

    /// The (fractional) depth-split index of a world position, as the
    /// shader computes it.
    #[inline]
    pub fn depth_split_index(&self, world_pos: Vec3) -> f32 {
        (self.val0.truncate().dot(world_pos) - self.val0.w).max(0.0).sqrt()
    }

    /// Packs the values for the shading stage.
    #[inline]
    pub fn to_gpu(&self) -> GpuClusterMagicValues {
        GpuClusterMagicValues {
            val0: [self.val0.x, self.val0.y, self.val0.z, self.val0.w],
            val1: [self.val1.x, self.val1.y, self.val1.z, self.val1.w],
        }
    }
}

/// Per-tile cache of froxel corner points in view space.
///
/// For every screen tile the cache holds `(splits + 1) × 4` view-space
/// points: the tile's four NDC corners unprojected at every depth-split
/// boundary. View-space corners only change when the unprojection
/// parameters change, so the cache is kept across frames and rebuilt
/// wholesale when they differ. The dirty condition is global because all
/// tiles share the same projection. Transformation to world space is *not*
/// cached; the camera moves every frame even when the projection does not.
///
/// The rebuild runs in the binner's single-threaded prologue; workers only
/// ever read.
#[derive(Debug)]
pub struct EdgeCache {
    tile_counts: [u32; 2],
    depth_split_count: u32,
    points: Vec<Vec4>,
    prev_unproj_params: Option<Vec4>,
}

impl EdgeCache {
    /// Creates an empty cache sized for the given grid.
    pub fn new(config: &ClusterGridConfig) -> Self {
        let point_count =
            (config.tile_count() * (config.depth_split_count + 1) * 4) as usize;
        Self {
            tile_counts: config.tile_counts,
            depth_split_count: config.depth_split_count,
            points: vec![Vec4::ZERO; point_count],
            prev_unproj_params: None,
        }
    }

    /// The number of cached points per tile.
    #[inline]
    pub fn points_per_tile(&self) -> usize {
        ((self.depth_split_count + 1) * 4) as usize
    }

    /// Rebuilds every tile's corner points if `unproj_params` differ from
    /// the previous frame's. Returns whether a rebuild happened.
    pub fn prepare(&mut self, unproj_params: Vec4, magic: &ClusterMagicValues) -> bool {
        if self.prev_unproj_params == Some(unproj_params) {
            return false;
        }

        let tile_count = (self.tile_counts[0] * self.tile_counts[1]) as usize;
        for tile_index in 0..tile_count {
            self.rebuild_tile(tile_index, unproj_params, magic);
        }
        self.prev_unproj_params = Some(unproj_params);
        true
    }

    /// The cached view-space corner points of one tile, four per
    /// depth-split boundary.
    #[inline]
    pub fn tile_points(&self, tile_index: usize) -> &[Vec4] {
        let ppt = self.points_per_tile();
        &self.points[tile_index * ppt..(tile_index + 1) * ppt]
    }

    fn rebuild_tile(&mut self, tile_index: usize, unproj_params: Vec4, magic: &ClusterMagicValues) {
        let tiles_x = self.tile_counts[0];
        let tiles_y = self.tile_counts[1];
        let tile_x = (tile_index as u32 % tiles_x) as f32;
        let tile_y = (tile_index as u32 / tiles_x) as f32;

        let tile_size = Vec2::new(2.0 / tiles_x as f32, 2.0 / tiles_y as f32);
        let start_ndc = Vec2::new(
            tile_x / tiles_x as f32 * 2.0 - 1.0,
            tile_y / tiles_y as f32 * 2.0 - 1.0,
        );

        let base = tile_index * self.points_per_tile();
        for split in 0..=self.depth_split_count {
            let z_view = -magic.depth_split_near(split);
            let idx = base + (split * 4) as usize;

            let corners = [
                start_ndc,
                start_ndc + Vec2::new(tile_size.x, 0.0),
                start_ndc + tile_size,
                start_ndc + Vec2::new(0.0, tile_size.y),
            ];
            for (offset, corner) in corners.iter().enumerate() {
                let view = unproject_to_view(z_view, *corner, unproj_params);
                self.points[idx + offset] = Vec4::from_vec3(view.truncate(), 1.0);
            }
        }
    }
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_core::math::{approx_eq_eps, Vec3, FRAC_PI_2};

    fn test_camera(near: f32, far: f32) -> (Mat4, Mat4) {
        let projection = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, near, far);
        // Camera at origin looking down -Z: view is identity.
        (projection, projection)
    }

    #[test]
    fn test_depth_split_near_endpoints() {
        let (_, view_proj) = test_camera(1.0, 100.0);
        let magic = ClusterMagicValues::compute(&view_proj, 1.0, 100.0, 4);

        assert!(approx_eq_eps(magic.depth_split_near(0), 1.0, 1e-4));
        assert!(approx_eq_eps(magic.depth_split_near(4), 100.0, 1e-3));
    }

    #[test]
    fn test_depth_split_near_monotonic() {
        let (_, view_proj) = test_camera(0.5, 250.0);
        let magic = ClusterMagicValues::compute(&view_proj, 0.5, 250.0, 16);

        for k in 0..16 {
            assert!(magic.depth_split_near(k) < magic.depth_split_near(k + 1));
        }
    }

    #[test]
    fn test_depth_split_index_matches_inverse() {
        let (_, view_proj) = test_camera(1.0, 100.0);
        let splits = 8;
        let magic = ClusterMagicValues::compute(&view_proj, 1.0, 100.0, splits);

        // A world point exactly on each split boundary maps back to that
        // split index. The camera looks down -Z from the origin.
        for k in 1..=splits {
            let distance = magic.depth_split_near(k);
            let world_pos = Vec3::new(0.0, 0.0, -distance);
            assert!(approx_eq_eps(magic.depth_split_index(world_pos), k as f32, 1e-2));
        }
    }

    #[test]
    fn test_unproject_matches_projection() {
        let projection = Mat4::perspective_rh_zo(FRAC_PI_2, 16.0 / 9.0, 0.25, 64.0);
        let params = projection.perspective_unprojection_params();

        let view_point = Vec4::new(3.0, -2.0, -20.0, 1.0);
        let clip = projection * view_point;
        let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);

        let unprojected = unproject_to_view(view_point.z, ndc, params);
        assert!(approx_eq_eps(unprojected.x, view_point.x, 1e-3));
        assert!(approx_eq_eps(unprojected.y, view_point.y, 1e-3));
        assert!(approx_eq_eps(unprojected.z, view_point.z, 1e-3));
        assert_eq!(unprojected.w, 0.0);
    }

    #[test]
    fn test_edge_cache_rebuild_only_when_dirty() {
        let config = ClusterGridConfig {
            tile_counts: [4, 4],
            depth_split_count: 4,
            avg_objects_per_cluster: 8,
        };
        let (projection, view_proj) = test_camera(1.0, 100.0);
        let magic = ClusterMagicValues::compute(&view_proj, 1.0, 100.0, 4);
        let params = projection.perspective_unprojection_params();

        let mut cache = EdgeCache::new(&config);
        assert!(cache.prepare(params, &magic));
        assert!(!cache.prepare(params, &magic));

        // A different projection dirties every tile.
        let other_proj = Mat4::perspective_rh_zo(1.0, 1.0, 1.0, 100.0);
        assert!(cache.prepare(other_proj.perspective_unprojection_params(), &magic));
    }

    #[test]
    fn test_edge_cache_corner_positions() {
        let config = ClusterGridConfig {
            tile_counts: [2, 2],
            depth_split_count: 2,
            avg_objects_per_cluster: 8,
        };
        let near = 1.0;
        let far = 100.0;
        let (projection, view_proj) = test_camera(near, far);
        let magic = ClusterMagicValues::compute(&view_proj, near, far, 2);
        let params = projection.perspective_unprojection_params();

        let mut cache = EdgeCache::new(&config);
        cache.prepare(params, &magic);

        // With fov = 90° and aspect 1, the view frustum spans x in
        // [-z, z]. Tile (0,0) starts at NDC (-1,-1), so its first cached
        // corner at the near boundary must be (-near, -near, -near).
        let points = cache.tile_points(0);
        let first = points[0];
        assert!(approx_eq_eps(first.x, -near, 1e-4));
        assert!(approx_eq_eps(first.y, -near, 1e-4));
        assert!(approx_eq_eps(first.z, -near, 1e-4));
        assert_eq!(first.w, 1.0);

        // All cached points sit at negative view-space depth.
        assert!(points.iter().all(|p| p.z < 0.0));
        assert_eq!(points.len(), cache.points_per_tile());
    }
}
