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

//! The cluster binner: per-frame orchestration and the per-tile binning
//! algorithm.

use super::grid::{ClusterMagicValues, EdgeCache};
use super::index_pool::IndexPool;
use super::marshal::{write_typed_objects, TypedObjectTokens};
use super::world::RenderWorld;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use vireo_core::math::{Aabb, Cone, Mat4, Obb, Sphere, Vec3};
use vireo_core::renderer::{
    ClusterGridConfig, FrameStagingAllocator, GpuClusterMagicValues, StagingError,
    StagingMemoryKind, TypedObjectKind, WordAllocation, MAX_TYPED_OBJECTS_PER_CLUSTER,
    TYPED_OBJECT_COUNT,
};
use vireo_core::task::{TaskError, TaskScheduler};

/// Errors that abort the binning pass for the frame.
///
/// Capacity overflow inside the index pool is *not* represented here: it
/// degrades the affected clusters to the empty sentinel and is reported
/// through [`ClusterBinStats`] instead.
#[derive(Debug, Error)]
pub enum ClusterBinError {
    /// The frame staging allocator could not provide a buffer.
    #[error("frame staging allocation failed: {0}")]
    Staging(#[from] StagingError),
    /// The task scheduler rejected the submission.
    #[error("task submission failed: {0}")]
    Tasks(#[from] TaskError),
}

/// The collaborators and inputs for one binning pass.
pub struct ClusterBinInput<'a> {
    /// The frame's visible objects and camera. Read-only for the whole
    /// pass.
    pub world: &'a RenderWorld,
    /// The frame-lifetime GPU-visible allocator.
    pub staging: &'a dyn FrameStagingAllocator,
    /// The parallel task submission service.
    pub scheduler: &'a dyn TaskScheduler,
    /// Whether shadow data should be forwarded to the GPU structs.
    pub shadows_enabled: bool,
}

/// Per-frame diagnostics of a binning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterBinStats {
    /// Clusters that fell back to the empty sentinel because the index
    /// pool was exhausted. Non-zero values mean objects were silently
    /// dropped from shading for those clusters.
    pub overflowed_clusters: u32,
}

/// Everything the shading stage consumes from a binning pass.
///
/// All buffers live in frame staging memory and are invalidated by the
/// allocator's end-of-frame reset.
#[derive(Debug)]
pub struct ClusterBinOutput {
    /// One `u32` per cluster: the first index of the cluster's entry in
    /// the object-index buffer, `0` for the empty sentinel.
    pub clusters: WordAllocation,
    /// The object-index buffer: per non-empty cluster, four
    /// `[count, indices…]` runs in [`TypedObjectKind`] order.
    pub indices: WordAllocation,
    /// Coefficients for the shader-side world-position → depth-split
    /// mapping.
    pub magic_values: GpuClusterMagicValues,
    /// The typed-object array tokens produced by the marshaller.
    pub typed_objects: TypedObjectTokens,
    /// Diagnostics for this pass.
    pub stats: ClusterBinStats,
}

/// Camera-derived state for one frame, produced by the binner's
/// single-threaded prologue.
///
/// Binning workers are only constructed from a `PreparedFrame`, which
/// guarantees the edge cache rebuild ran to completion before any worker
/// could observe it.
#[derive(Debug, Clone, Copy)]
struct PreparedFrame {
    magic: ClusterMagicValues,
    camera_transform: Mat4,
}

/// Per-cluster scratch collecting matching object indices, category by
/// category.
///
/// Categories are visited in [`TypedObjectKind`] packing order, so the
/// index array is already grouped by category when the cluster is flushed.
#[derive(Debug, Clone)]
struct ClusterCollector {
    counts: [u16; TYPED_OBJECT_COUNT],
    indices: [u32; MAX_TYPED_OBJECTS_PER_CLUSTER],
    len: u16,
}

impl ClusterCollector {
    fn new() -> Self {
        Self {
            counts: [0; TYPED_OBJECT_COUNT],
            indices: [0; MAX_TYPED_OBJECTS_PER_CLUSTER],
            len: 0,
        }
    }

    fn reset(&mut self) {
        self.counts = [0; TYPED_OBJECT_COUNT];
        self.len = 0;
    }

    fn push(&mut self, kind: TypedObjectKind, object_index: u32) {
        assert!(
            (self.len as usize) < MAX_TYPED_OBJECTS_PER_CLUSTER,
            "per-cluster object collector overflow; MAX_TYPED_OBJECTS_PER_CLUSTER is mis-tuned \
             for this scene"
        );
        self.indices[self.len as usize] = object_index;
        self.len += 1;
        self.counts[kind.index()] += 1;
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn word_count(&self) -> u32 {
        TYPED_OBJECT_COUNT as u32 + self.len as u32
    }
}

/// Per-worker scratch buffers, allocated once per task and reused across
/// the tiles the worker pulls.
struct TileBinContext {
    edges_world: Vec<Vec3>,
    boxes: Vec<Aabb>,
    spheres: Vec<Sphere>,
    collectors: Vec<ClusterCollector>,
}

impl TileBinContext {
    fn new(config: &ClusterGridConfig) -> Self {
        let splits = config.depth_split_count as usize;
        Self {
            edges_world: vec![Vec3::ZERO; (splits + 1) * 4],
            boxes: vec![Aabb::INVALID; splits],
            spheres: vec![Sphere::new(Vec3::ZERO, 0.0); splits],
            collectors: vec![ClusterCollector::new(); splits],
        }
    }
}

/// The read-only frame state shared by every binning worker.
///
/// The only mutable members are the two atomics: the pull-based tile
/// cursor and the overflow counter. Cluster slots and pool runs are each
/// written by exactly one worker.
struct BinFrameContext<'a> {
    config: &'a ClusterGridConfig,
    edges: &'a EdgeCache,
    prepared: &'a PreparedFrame,
    world: &'a RenderWorld,
    pool: &'a IndexPool,
    clusters: &'a WordAllocation,
    tile_cursor: AtomicU32,
    overflowed_clusters: AtomicU32,
}

/// Bins the frame's visible lights, decals and probes into the cluster
/// grid.
///
/// The binner owns the grid configuration and the cross-frame froxel edge
/// cache. One call to [`ClusterBinner::bin`] per frame produces the full
/// [`ClusterBinOutput`]; there is no other entry point and no state to
/// reset between frames.
#[derive(Debug)]
pub struct ClusterBinner {
    config: ClusterGridConfig,
    edge_cache: EdgeCache,
}

impl ClusterBinner {
    /// Creates a binner for the given grid.
    ///
    /// # Panics
    ///
    /// Panics if any grid dimension is zero.
    pub fn new(config: ClusterGridConfig) -> Self {
        assert!(
            config.tile_counts[0] > 0 && config.tile_counts[1] > 0,
            "cluster grid needs at least one tile"
        );
        assert!(
            config.depth_split_count > 0,
            "cluster grid needs at least one depth split"
        );
        log::debug!(
            "ClusterBinner: {}x{}x{} grid, {} indices",
            config.tile_counts[0],
            config.tile_counts[1],
            config.depth_split_count,
            config.index_pool_word_count()
        );
        Self {
            config,
            edge_cache: EdgeCache::new(&config),
        }
    }

    /// The grid configuration the binner was created with.
    pub fn config(&self) -> &ClusterGridConfig {
        &self.config
    }

    /// Runs the binning pass for one frame and blocks until it completes.
    ///
    /// Submits one marshaller task plus one binning task per scheduler
    /// worker; workers pull tiles from a shared atomic cursor until the
    /// grid is exhausted.
    pub fn bin(&mut self, input: &ClusterBinInput<'_>) -> Result<ClusterBinOutput, ClusterBinError> {
        let config = self.config;
        let prepared = self.prepare(input.world);

        // Frame-lifetime output buffers.
        let indices = input.staging.allocate_words(
            config.index_pool_word_count() as usize,
            StagingMemoryKind::Storage,
        )?;
        let clusters = input.staging.allocate_words(
            config.total_cluster_count() as usize,
            StagingMemoryKind::Storage,
        )?;
        let pool = IndexPool::new(indices.clone());

        let frame = BinFrameContext {
            config: &config,
            edges: &self.edge_cache,
            prepared: &prepared,
            world: input.world,
            pool: &pool,
            clusters: &clusters,
            tile_cursor: AtomicU32::new(0),
            overflowed_clusters: AtomicU32::new(0),
        };

        let marshalled: Mutex<Option<Result<TypedObjectTokens, StagingError>>> = Mutex::new(None);
        let marshal_task = || {
            let result = write_typed_objects(input.world, input.staging, input.shadows_enabled);
            *marshalled.lock().unwrap() = Some(result);
        };
        let worker_task = || {
            let mut tile_ctx = TileBinContext::new(frame.config);
            let tile_count = frame.config.tile_count();
            loop {
                let tile_index = frame.tile_cursor.fetch_add(1, Ordering::Relaxed);
                if tile_index >= tile_count {
                    break;
                }
                bin_tile(&frame, tile_index, &mut tile_ctx);
            }
        };

        let worker_count = input.scheduler.worker_count();
        let mut tasks: Vec<&(dyn Fn() + Sync)> = Vec::with_capacity(worker_count + 1);
        tasks.push(&marshal_task);
        for _ in 0..worker_count {
            tasks.push(&worker_task);
        }
        input.scheduler.run(&tasks)?;

        let stats = ClusterBinStats {
            overflowed_clusters: frame.overflowed_clusters.load(Ordering::Relaxed),
        };
        let typed_objects = marshalled
            .into_inner()
            .unwrap()
            .expect("scheduler completed without running the marshaller task")?;

        Ok(ClusterBinOutput {
            clusters,
            indices,
            magic_values: prepared.magic.to_gpu(),
            typed_objects,
            stats,
        })
    }

    /// Single-threaded per-frame prologue: derives the magic values and
    /// brings the edge cache up to date before any worker exists.
    fn prepare(&mut self, world: &RenderWorld) -> PreparedFrame {
        let view = &world.view;
        let magic = ClusterMagicValues::compute(
            &view.view_projection,
            view.near,
            view.far,
            self.config.depth_split_count,
        );
        let unproj_params = view.projection.perspective_unprojection_params();
        if self.edge_cache.prepare(unproj_params, &magic) {
            log::debug!("ClusterBinner: edge cache rebuilt for new unprojection parameters");
        }
        PreparedFrame {
            magic,
            camera_transform: view.camera_transform,
        }
    }
}

/// Bins every depth split of one tile. Called by exactly one worker per
/// tile per frame.
fn bin_tile(frame: &BinFrameContext<'_>, tile_index: u32, tile_ctx: &mut TileBinContext) {
    let tiles_x = frame.config.tile_counts[0];
    debug_assert!(tile_index < frame.config.tile_count());
    let tile_x = tile_index % tiles_x;
    let tile_y = tile_index / tiles_x;
    let splits = frame.config.depth_split_count as usize;

    // Cached view-space corners into world space. The camera transform
    // changes every frame, so this part is never cached.
    let view_points = frame.edges.tile_points(tile_index as usize);
    for (world, view) in tile_ctx.edges_world.iter_mut().zip(view_points) {
        *world = (frame.prepared.camera_transform * *view).truncate();
    }

    // Conservative cluster AABBs and bounding spheres over the 8 corners
    // of each froxel.
    for split in 0..splits {
        let corners = &tile_ctx.edges_world[split * 4..split * 4 + 8];
        let aabb = Aabb::from_points(corners).unwrap();
        let center = aabb.center();
        tile_ctx.spheres[split] = Sphere::new(center, (aabb.min - center).length());
        tile_ctx.boxes[split] = aabb;
        tile_ctx.collectors[split].reset();
    }

    // Tile-level prefilter shapes. The tile box contains every cluster
    // box, and the tile sphere contains every cluster sphere, so an
    // object rejected here cannot pass any per-cluster test below.
    let tile_box = Aabb::from_points(&tile_ctx.edges_world).unwrap();
    let tile_center = tile_box.center();
    let tile_sphere_radius = tile_ctx
        .spheres
        .iter()
        .map(|sphere| sphere.center.distance(tile_center) + sphere.radius)
        .fold(0.0f32, f32::max);
    let tile_sphere = Sphere::new(tile_center, tile_sphere_radius);

    // Category order is fixed: it is the packing order of the per-cluster
    // index runs.

    // Decals: oriented box vs cluster AABB.
    for (i, decal) in frame.world.decals.iter().enumerate() {
        let obb = Obb::new(decal.center, decal.rotation, decal.half_extents);
        if !obb.intersects_aabb(&tile_box) {
            continue;
        }
        for split in 0..splits {
            if obb.intersects_aabb(&tile_ctx.boxes[split]) {
                tile_ctx.collectors[split].push(TypedObjectKind::Decal, i as u32);
            }
        }
    }

    // Point lights: influence sphere vs cluster AABB.
    for (i, light) in frame.world.point_lights.iter().enumerate() {
        let sphere = Sphere::new(light.position, light.radius);
        if !sphere.intersects_aabb(&tile_box) {
            continue;
        }
        for split in 0..splits {
            if sphere.intersects_aabb(&tile_ctx.boxes[split]) {
                tile_ctx.collectors[split].push(TypedObjectKind::PointLight, i as u32);
            }
        }
    }

    // Spot lights: cone vs cluster bounding sphere, prefiltered by the
    // cone vs the tile's enclosing sphere.
    for (i, light) in frame.world.spot_lights.iter().enumerate() {
        let half_angle = light.outer_angle / 2.0;
        let cone = Cone::new(light.position(), light.direction(), light.range, half_angle);
        if !cone.intersects_sphere(&tile_sphere) {
            continue;
        }
        for split in 0..splits {
            if cone.intersects_sphere(&tile_ctx.spheres[split]) {
                tile_ctx.collectors[split].push(TypedObjectKind::SpotLight, i as u32);
            }
        }
    }

    // Probes: precomputed world AABB vs cluster AABB.
    for (i, probe) in frame.world.probes.iter().enumerate() {
        let probe_box = Aabb::from_min_max(probe.aabb_min, probe.aabb_max);
        if !probe_box.intersects_aabb(&tile_box) {
            continue;
        }
        for split in 0..splits {
            if probe_box.intersects_aabb(&tile_ctx.boxes[split]) {
                tile_ctx.collectors[split].push(TypedObjectKind::ReflectionProbe, i as u32);
            }
        }
    }

    // Flush every cluster of the tile.
    for (split, collector) in tile_ctx.collectors.iter().enumerate() {
        let cluster_index =
            split as u32 * frame.config.tile_count() + tile_y * tiles_x + tile_x;

        let first_index = if collector.is_empty() {
            IndexPool::SENTINEL
        } else {
            match frame.pool.alloc(collector.word_count()) {
                Some(first) => {
                    write_collector(frame.pool, first, collector);
                    first
                }
                None => {
                    log::warn!(
                        "Cluster index pool exhausted; increase \
                         ClusterGridConfig::avg_objects_per_cluster"
                    );
                    frame.overflowed_clusters.fetch_add(1, Ordering::Relaxed);
                    IndexPool::SENTINEL
                }
            }
        };

        frame.clusters.store(cluster_index as usize, first_index);
    }
}

/// Writes a collector's `[count, indices…]` runs into a reserved pool
/// range.
fn write_collector(pool: &IndexPool, first_index: u32, collector: &ClusterCollector) {
    let mut write = first_index;
    let mut read = 0usize;
    for count in collector.counts {
        pool.store(write, count as u32);
        write += 1;
        for _ in 0..count {
            pool.store(write, collector.indices[read]);
            write += 1;
            read += 1;
        }
    }
    debug_assert_eq!(read, collector.len as usize);
}

// --- Tests ---
