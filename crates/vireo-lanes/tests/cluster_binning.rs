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

//! End-to-end binning scenario: a single point light in a 4×4×4 grid,
//! with cluster membership cross-checked against an independently
//! computed frustum decomposition.

use vireo_lanes::cluster_lane::{
    CameraView, ClusterBinInput, ClusterBinOutput, ClusterBinner, ExtractedPointLight,
    RenderWorld,
};

use vireo_core::math::{Aabb, LinearRgba, Mat3, Mat4, Sphere, Vec3, FRAC_PI_2};
use vireo_core::renderer::{
    ClusterGridConfig, GpuPointLight, HostStagingArena, TypedObjectKind, TYPED_OBJECT_COUNT,
};
use vireo_core::task::ScopedTaskScheduler;

const NEAR: f32 = 1.0;
const FAR: f32 = 100.0;
const GRID: u32 = 4;
const LIGHT_RADIUS: f32 = 10.0;
const CAMERA_Z: f32 = 30.0;

fn grid_config() -> ClusterGridConfig {
    ClusterGridConfig {
        tile_counts: [GRID, GRID],
        depth_split_count: GRID,
        avg_objects_per_cluster: 8,
    }
}

fn camera() -> CameraView {
    // fov = 90°, aspect 1: at view depth d the frustum spans x, y in
    // [-d, d]. The camera sits on +Z looking at the origin.
    let projection = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, NEAR, FAR);
    let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, CAMERA_Z));
    CameraView::from_camera(transform, projection, NEAR, FAR).unwrap()
}

/// The distance from the camera to the near boundary of depth split `k`,
/// computed from first principles.
fn split_distance(k: u32) -> f32 {
    NEAR + (k * k) as f32 * (FAR - NEAR) / (GRID * GRID) as f32
}

/// The world-space AABB of one cluster, derived without any engine code:
/// with fov 90° and aspect 1, the corner of NDC x at view depth d sits at
/// `x = ndc_x · d`.
fn expected_cluster_aabb(tile_x: u32, tile_y: u32, split: u32) -> Aabb {
    let ndc = |tile: u32| tile as f32 / GRID as f32 * 2.0 - 1.0;
    let mut corners = Vec::new();
    for k in [split, split + 1] {
        let d = split_distance(k);
        for (tx, ty) in [
            (tile_x, tile_y),
            (tile_x + 1, tile_y),
            (tile_x + 1, tile_y + 1),
            (tile_x, tile_y + 1),
        ] {
            corners.push(Vec3::new(ndc(tx) * d, ndc(ty) * d, CAMERA_Z - d));
        }
    }
    Aabb::from_points(&corners).unwrap()
}

fn decode_cluster(output: &ClusterBinOutput, cluster: usize) -> [Vec<u32>; TYPED_OBJECT_COUNT] {
    let mut lists: [Vec<u32>; TYPED_OBJECT_COUNT] = Default::default();
    let mut cursor = output.clusters.load(cluster) as usize;
    for list in lists.iter_mut() {
        let count = output.indices.load(cursor);
        cursor += 1;
        for _ in 0..count {
            list.push(output.indices.load(cursor));
            cursor += 1;
        }
    }
    lists
}

#[test]
fn point_light_binning_matches_frustum_decomposition() {
    let config = grid_config();
    let mut world = RenderWorld::new(camera());
    world.point_lights.push(ExtractedPointLight {
        position: Vec3::ZERO,
        radius: LIGHT_RADIUS,
        diffuse_color: LinearRgba::rgb(1.0, 0.8, 0.6),
        shadow: None,
    });

    let staging = HostStagingArena::new(1 << 20);
    let scheduler = ScopedTaskScheduler::new(4);
    let mut binner = ClusterBinner::new(config);
    let output = binner
        .bin(&ClusterBinInput {
            world: &world,
            staging: &staging,
            scheduler: &scheduler,
            shadows_enabled: true,
        })
        .unwrap();

    let light_sphere = Sphere::new(Vec3::ZERO, LIGHT_RADIUS);
    let mut bound_clusters = 0;

    for split in 0..GRID {
        for tile_y in 0..GRID {
            for tile_x in 0..GRID {
                let cluster =
                    (split * GRID * GRID + tile_y * GRID + tile_x) as usize;
                let expected = light_sphere
                    .intersects_aabb(&expected_cluster_aabb(tile_x, tile_y, split));

                let first = output.clusters.load(cluster);
                let lists = decode_cluster(&output, cluster);

                if expected {
                    assert_ne!(
                        first, 0,
                        "cluster ({tile_x},{tile_y},{split}) overlaps the light \
                         but reported the sentinel"
                    );
                    assert_eq!(
                        lists[TypedObjectKind::PointLight.index()],
                        vec![0],
                        "cluster ({tile_x},{tile_y},{split}) must bind light 0"
                    );
                    bound_clusters += 1;
                } else {
                    assert_eq!(
                        first, 0,
                        "cluster ({tile_x},{tile_y},{split}) does not overlap \
                         the light but bound something"
                    );
                }

                // No other category ever matches in this scene.
                assert!(lists[TypedObjectKind::Decal.index()].is_empty());
                assert!(lists[TypedObjectKind::SpotLight.index()].is_empty());
                assert!(lists[TypedObjectKind::ReflectionProbe.index()].is_empty());
            }
        }
    }

    assert!(bound_clusters > 0, "the light must bind at least one cluster");
    assert_eq!(output.stats.overflowed_clusters, 0);

    // The marshaller ran concurrently and produced the light array.
    let bytes = staging.read_bytes(output.typed_objects.point_lights).unwrap();
    let lights: &[GpuPointLight] = bytemuck::cast_slice(&bytes);
    assert_eq!(lights.len(), 1);
    assert_eq!(
        lights[0].position_inv_radius_sq,
        [0.0, 0.0, 0.0, 1.0 / (LIGHT_RADIUS * LIGHT_RADIUS)]
    );
    assert!(output.typed_objects.decals.is_unused());
    assert!(output.typed_objects.spot_lights.is_unused());
    assert!(output.typed_objects.probes.is_unused());

    // The magic values place the light's center between the splits that
    // bound it: the center sits 30 units from the camera, past the k = 2
    // boundary at ~25.75 but short of the k = 3 boundary at ~56.7.
    let a = output.magic_values.val0;
    let k = (a[0] * 0.0 + a[1] * 0.0 + a[2] * 0.0 - a[3]).max(0.0).sqrt();
    assert!((2.0..3.0).contains(&k), "unexpected split index {k}");
}

/// A camera rotated 90° around Y, looking at the light along −X instead
/// of −Z, must produce exactly the same per-cluster binding pattern: the
/// scene (a single sphere at the origin) is rotation invariant and the
/// frustum geometry is rigid.
#[test]
fn rotated_camera_binds_the_same_pattern() {
    let config = grid_config();
    let projection = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, NEAR, FAR);

    let light = ExtractedPointLight {
        position: Vec3::ZERO,
        radius: LIGHT_RADIUS,
        diffuse_color: LinearRgba::WHITE,
        shadow: None,
    };

    // The camera's local -Z axis must point at the origin from both
    // positions.
    let straight = Mat4::from_translation(Vec3::new(0.0, 0.0, CAMERA_Z));
    let rotated = Mat4::from_rotation_translation(
        Mat3::from_rotation_y(FRAC_PI_2),
        Vec3::new(CAMERA_Z, 0.0, 0.0),
    );

    let staging = HostStagingArena::new(1 << 20);
    let scheduler = ScopedTaskScheduler::new(2);

    let mut patterns = Vec::new();
    for transform in [straight, rotated] {
        staging.reset();
        let view = CameraView::from_camera(transform, projection, NEAR, FAR).unwrap();
        let mut world = RenderWorld::new(view);
        world.point_lights.push(light);

        let mut binner = ClusterBinner::new(config);
        let output = binner
            .bin(&ClusterBinInput {
                world: &world,
                staging: &staging,
                scheduler: &scheduler,
                shadows_enabled: true,
            })
            .unwrap();

        let pattern: Vec<bool> = (0..config.total_cluster_count() as usize)
            .map(|cluster| output.clusters.load(cluster) != 0)
            .collect();
        patterns.push(pattern);
    }

    assert_eq!(patterns[0], patterns[1]);
}

#[test]
fn repeated_runs_are_identical() {
    let config = grid_config();
    let mut world = RenderWorld::new(camera());
    world.point_lights.push(ExtractedPointLight {
        position: Vec3::new(4.0, -3.0, -5.0),
        radius: 12.0,
        diffuse_color: LinearRgba::WHITE,
        shadow: None,
    });
    world.point_lights.push(ExtractedPointLight {
        position: Vec3::new(-6.0, 2.0, 10.0),
        radius: 9.0,
        diffuse_color: LinearRgba::WHITE,
        shadow: None,
    });

    let staging = HostStagingArena::new(1 << 20);
    let scheduler = ScopedTaskScheduler::new(8);

    let mut snapshots = Vec::new();
    for _ in 0..3 {
        staging.reset();
        let mut binner = ClusterBinner::new(config);
        let output = binner
            .bin(&ClusterBinInput {
                world: &world,
                staging: &staging,
                scheduler: &scheduler,
                shadows_enabled: true,
            })
            .unwrap();

        let membership: Vec<_> = (0..config.total_cluster_count() as usize)
            .map(|cluster| decode_cluster(&output, cluster))
            .collect();
        snapshots.push(membership);
    }

    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[1], snapshots[2]);
}
