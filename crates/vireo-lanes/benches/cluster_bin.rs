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

//! Benchmarks the full binning pass over a synthetic many-light scene.

use criterion::{criterion_group, criterion_main, Criterion};

use vireo_core::math::{LinearRgba, Mat4, Vec3, FRAC_PI_2};
use vireo_core::renderer::{ClusterGridConfig, HostStagingArena};
use vireo_core::task::ScopedTaskScheduler;
use vireo_lanes::cluster_lane::{
    CameraView, ClusterBinInput, ClusterBinner, ExtractedPointLight, ExtractedReflectionProbe,
    RenderWorld,
};

fn build_world(light_count: usize) -> RenderWorld {
    let near = 0.5;
    let far = 200.0;
    let projection = Mat4::perspective_rh_zo(FRAC_PI_2, 16.0 / 9.0, near, far);
    let transform = Mat4::from_translation(Vec3::new(0.0, 5.0, 60.0));
    let view = CameraView::from_camera(transform, projection, near, far).unwrap();

    let mut world = RenderWorld::new(view);
    for i in 0..light_count {
        // Deterministic pseudo-scatter across the frustum.
        let t = i as f32;
        world.point_lights.push(ExtractedPointLight {
            position: Vec3::new(
                (t * 0.73).sin() * 40.0,
                (t * 0.37).cos() * 20.0,
                -((i % 40) as f32) * 3.0,
            ),
            radius: 6.0,
            diffuse_color: LinearRgba::WHITE,
            shadow: None,
        });
    }
    for i in 0..8 {
        let center = Vec3::new((i as f32 - 4.0) * 12.0, 0.0, -30.0);
        world.probes.push(ExtractedReflectionProbe {
            position: center,
            aabb_min: center - Vec3::splat(10.0),
            aabb_max: center + Vec3::splat(10.0),
            cubemap_array_index: i as f32,
        });
    }
    world
}

fn bench_bin(c: &mut Criterion) {
    let config = ClusterGridConfig::new();
    let staging = HostStagingArena::new(64 << 20);
    let scheduler = ScopedTaskScheduler::default();
    let world = build_world(256);

    let mut binner = ClusterBinner::new(config);
    c.bench_function("bin_256_lights_32x16x16", |b| {
        b.iter(|| {
            staging.reset();
            let output = binner
                .bin(&ClusterBinInput {
                    world: &world,
                    staging: &staging,
                    scheduler: &scheduler,
                    shadows_enabled: true,
                })
                .unwrap();
            std::hint::black_box(output.stats)
        })
    });
}

criterion_group!(benches, bench_bin);
criterion_main!(benches);
