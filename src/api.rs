//! Public API for the swarm.
//!
//! [`SwarmDriver`] is the per-frame entry point for a host (game loop, server,
//! demo). It owns a `bevy_ecs` world holding the swarm core and its companion
//! resources, and a schedule that runs one frame in a fixed order:
//!
//! 1. `chase_target_system` - copy the player position into the core's target
//! 2. `progressive_spawn_system` - place pending units within the frame budget
//! 3. `swarm_step_system` - advance the simulation by `dt`
//! 4. `visibility_system` - cull against the camera
//! 5. `render_sync_system` - rebuild instance and projectile buffers
//! 6. `count_log_system` - periodic swarm count line
//!
//! The frame is variable-step: `dt` is whatever the host measured. The core
//! treats a non-positive `dt` as a no-op.

use crate::components::{DamageReport, TypeIndex};
use crate::config::SwarmConfig;
use crate::error::SwarmError;
use crate::math::Float3;
use crate::profiler::FrameProfiler;
use crate::render_sync::{type_scales, RenderBatches};
use crate::snapshot::SwarmSnapshot;
use crate::spawn::{FlatGround, GroundProjector, SpawnQueue, SpawnReport};
use crate::visibility::{CameraView, VisibilitySet};
use crate::world::SwarmWorld;
use bevy_ecs::prelude::*;
use std::time::Instant;

/// Host input for the current frame.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub dt: f32,
    pub camera: CameraView,
    /// Player position: chase target and spawn exclusion center.
    pub player: Float3,
}

/// Ground queries used by the spawner.
#[derive(Resource)]
pub struct GroundResource(pub Box<dyn GroundProjector>);

/// Uniform render scale per enemy type.
#[derive(Resource, Debug, Clone, Default)]
pub struct TypeScales(pub Vec<f32>);

/// Bookkeeping carried between frames.
#[derive(Resource, Debug, Clone, Default)]
pub struct FrameStats {
    pub frames: u64,
    /// Simulated seconds since the driver was created.
    pub time: f32,
    pub spawned_this_frame: usize,
    pub last_spawn: SpawnReport,
    since_count_log: f32,
}

fn chase_target_system(input: Res<FrameInput>, mut core: ResMut<SwarmWorld>) {
    if input.player.is_finite() {
        core.target = input.player;
    }
}

fn progressive_spawn_system(
    input: Res<FrameInput>,
    config: Res<SwarmConfig>,
    ground: Res<GroundResource>,
    mut queue: ResMut<SpawnQueue>,
    mut core: ResMut<SwarmWorld>,
    mut stats: ResMut<FrameStats>,
    mut profiler: ResMut<FrameProfiler>,
) {
    stats.spawned_this_frame = 0;
    if queue.pending_total() == 0 || core.archetypes().is_empty() {
        return;
    }
    let start = Instant::now();
    let report = queue.drain(&mut core, &input.camera, input.player, &config.spawn, &*ground.0);
    profiler.record("spawn", start.elapsed());
    stats.spawned_this_frame = report.spawned;
    stats.last_spawn = report;
}

fn swarm_step_system(
    input: Res<FrameInput>,
    mut core: ResMut<SwarmWorld>,
    mut stats: ResMut<FrameStats>,
    mut profiler: ResMut<FrameProfiler>,
) {
    let start = Instant::now();
    core.step(input.dt);
    profiler.record("step", start.elapsed());
    if input.dt > 0.0 && input.dt.is_finite() {
        stats.time += input.dt;
    }
}

fn visibility_system(
    input: Res<FrameInput>,
    config: Res<SwarmConfig>,
    core: Res<SwarmWorld>,
    mut visibility: ResMut<VisibilitySet>,
    mut profiler: ResMut<FrameProfiler>,
) {
    if !config.visibility.culling_enabled() {
        visibility.clear();
        return;
    }
    let start = Instant::now();
    visibility.compute(&core, &input.camera, &config.visibility);
    profiler.record("visibility", start.elapsed());
}

fn render_sync_system(
    config: Res<SwarmConfig>,
    core: Res<SwarmWorld>,
    visibility: Res<VisibilitySet>,
    scales: Res<TypeScales>,
    mut batches: ResMut<RenderBatches>,
    mut profiler: ResMut<FrameProfiler>,
) {
    let start = Instant::now();
    let visible = config.visibility.culling_enabled().then_some(&*visibility);
    batches.sync(&core, visible, &scales.0);
    profiler.record("render_sync", start.elapsed());
}

fn count_log_system(
    input: Res<FrameInput>,
    config: Res<SwarmConfig>,
    core: Res<SwarmWorld>,
    queue: Res<SpawnQueue>,
    mut stats: ResMut<FrameStats>,
) {
    stats.frames += 1;
    if !(config.count_log_interval > 0.0) || !(input.dt > 0.0) {
        return;
    }
    stats.since_count_log += input.dt;
    if stats.since_count_log < config.count_log_interval {
        return;
    }
    stats.since_count_log = 0.0;
    let per_type: Vec<usize> = (0..core.archetypes().len())
        .map(|t| core.alive_of_type(t))
        .collect();
    tracing::info!(
        alive = core.num_alive(),
        types = per_type.len(),
        per_type = ?per_type,
        spawned_this_frame = stats.spawned_this_frame,
        pending = queue.pending_total(),
        "swarm count"
    );
}

/// Owns the swarm session and runs it one frame at a time.
pub struct SwarmDriver {
    world: World,
    schedule: Schedule,
}

impl SwarmDriver {
    /// Validate `config` and build a driver that places spawns with `projector`.
    pub fn new(config: SwarmConfig, projector: impl GroundProjector + 'static) -> Result<Self, SwarmError> {
        config.validate()?;

        let mut world = World::new();
        world.insert_resource(SwarmWorld::from_config(&config));
        world.insert_resource(SpawnQueue::from_config(&config));
        world.insert_resource(TypeScales(type_scales(&config)));
        world.insert_resource(GroundResource(Box::new(projector)));
        world.insert_resource(FrameInput::default());
        world.insert_resource(VisibilitySet::default());
        world.insert_resource(RenderBatches::default());
        world.insert_resource(FrameStats::default());
        world.insert_resource(FrameProfiler::default());

        tracing::info!(
            types = config.type_count(),
            max_agents = config.max_agents,
            projectile_pool = config.projectile_pool,
            lock_to_ground = config.lock_agents_to_ground,
            "swarm driver configured"
        );
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                chase_target_system,
                progressive_spawn_system,
                swarm_step_system,
                visibility_system,
                render_sync_system,
                count_log_system,
            )
                .chain(),
        );

        Ok(Self { world, schedule })
    }

    /// Driver over an infinite flat ground at height zero.
    pub fn with_flat_ground(config: SwarmConfig) -> Result<Self, SwarmError> {
        Self::new(config, FlatGround::default())
    }

    /// Run one frame: spawn, step, cull, sync.
    pub fn frame(&mut self, dt: f32, camera: CameraView, player: Float3) {
        *self.world.resource_mut::<FrameInput>() = FrameInput { dt, camera, player };
        self.schedule.run(&mut self.world);
        self.world.resource_mut::<FrameProfiler>().end_frame();
    }

    /// Queue `count` units of one type for progressive placement.
    pub fn enqueue(&mut self, type_index: TypeIndex, count: usize) -> Result<(), SwarmError> {
        self.world.resource_mut::<SpawnQueue>().enqueue(type_index, count)
    }

    /// Queue the configured auto-spawn count for every type. Returns the
    /// number of units queued.
    pub fn queue_auto_spawn(&mut self) -> usize {
        let config = self.world.resource::<SwarmConfig>();
        let (per_type, types) = (config.spawn.auto_spawn_count, config.type_count());
        if types == 0 {
            tracing::warn!("auto spawn skipped: no enemy types configured");
            return 0;
        }
        self.world.resource_mut::<SpawnQueue>().enqueue_all(per_type);
        tracing::info!(per_type, types, "queued progressive spawn");
        per_type * types
    }

    pub fn spawn_projectile(&mut self, origin: Float3, direction: Float3) -> Option<usize> {
        self.core_mut().spawn_projectile(origin, direction)
    }

    pub fn apply_radial_damage(&mut self, origin: Float3, radius: f32, damage: f32) -> DamageReport {
        self.core_mut().apply_radial_damage(origin, radius, damage)
    }

    pub fn core(&self) -> &SwarmWorld {
        self.world.resource::<SwarmWorld>()
    }

    pub fn core_mut(&mut self) -> &mut SwarmWorld {
        self.world.resource_mut::<SwarmWorld>().into_inner()
    }

    pub fn config(&self) -> &SwarmConfig {
        self.world.resource::<SwarmConfig>()
    }

    pub fn spawn_queue(&self) -> &SpawnQueue {
        self.world.resource::<SpawnQueue>()
    }

    pub fn visibility(&self) -> &VisibilitySet {
        self.world.resource::<VisibilitySet>()
    }

    pub fn batches(&self) -> &RenderBatches {
        self.world.resource::<RenderBatches>()
    }

    pub fn stats(&self) -> &FrameStats {
        self.world.resource::<FrameStats>()
    }

    pub fn profiler(&self) -> &FrameProfiler {
        self.world.resource::<FrameProfiler>()
    }

    /// Count summary of the last frame.
    pub fn snapshot(&self) -> SwarmSnapshot {
        let stats = self.stats();
        let mut snapshot = SwarmSnapshot::capture(
            self.core(),
            self.spawn_queue(),
            self.visibility(),
            stats.time,
            stats.spawned_this_frame,
        );
        if !self.config().visibility.culling_enabled() {
            snapshot.visible = snapshot.alive;
        }
        snapshot
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }
}
