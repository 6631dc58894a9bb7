//! Swarm configuration.
//!
//! [`SwarmConfig`] is the data-driven description of a swarm session (enemy
//! types, culling, spawn rules, ground lock). It is loaded from JSON by the
//! host and flattened into [`SwarmParams`] plus an archetype table when the
//! core is configured.

use crate::components::EnemyType;
use crate::error::SwarmError;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest `max_agents` a config may request.
pub const MAX_AGENTS_LIMIT: usize = 1 << 24;

/// Flat parameter block consumed by [`crate::world::SwarmWorld::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmParams {
    /// Spatial hash cell size in world units.
    pub cell_size: f32,
    /// Distance below which two agents push each other apart.
    pub separation: f32,
    /// Global speed cap, applied together with each archetype's speed.
    pub max_speed: f32,
    /// Half-size of the playable cube; agents bounce off its faces.
    pub world_extent: f32,
    /// Force every agent onto the ground plane after integration.
    pub lock_z: bool,
    /// Ground height used when `lock_z` is set.
    pub ground_z: f32,
    /// Steer agents toward the world's target position.
    pub chase_target: bool,
    /// Steering acceleration toward the target (units/s^2).
    pub chase_accel: f32,
    /// Exponential velocity decay rate (1/s).
    pub damping: f32,
    /// Separation response (1/s^2): overlap distance converted into acceleration.
    pub separation_stiffness: f32,
    /// Extra decay (1/s) of the velocity component along an overlapping
    /// agent's push direction. About `2 * sqrt(separation_stiffness)` settles
    /// a pair at the separation distance without overshoot.
    pub contact_damping: f32,
    /// Hard cap on live agents. `None` grows storage on demand.
    pub max_agents: Option<usize>,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            cell_size: 200.0,
            separation: 100.0,
            max_speed: 800.0,
            world_extent: 20_000.0,
            lock_z: false,
            ground_z: 0.0,
            chase_target: false,
            chase_accel: 800.0,
            damping: 1.0,
            separation_stiffness: 60.0,
            contact_damping: 15.5,
            max_agents: None,
        }
    }
}

/// Per-type configuration entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTypeConfig {
    pub radius: f32,
    pub speed: f32,
    pub hp: f32,
    pub dps: f32,
    /// XP granted when an agent of this type dies.
    pub xp_reward: u32,
    pub max_count: u32,
    /// Spawn behind the camera instead of inside the view cone (bosses).
    pub force_spawn_out_of_view: bool,
    /// Bounding-sphere radius of the mesh used to draw this type.
    pub mesh_radius: f32,
}

impl Default for EnemyTypeConfig {
    fn default() -> Self {
        Self {
            radius: 40.0,
            speed: 600.0,
            hp: 10.0,
            dps: 5.0,
            xp_reward: 1,
            max_count: 10_000,
            force_spawn_out_of_view: false,
            mesh_radius: 50.0,
        }
    }
}

impl EnemyTypeConfig {
    pub fn archetype(&self) -> EnemyType {
        EnemyType::new(self.radius, self.speed, self.hp, self.dps).with_xp_reward(self.xp_reward)
    }
}

/// Culling toggles for the visibility pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    pub frustum_cull: bool,
    pub distance_cull: bool,
    /// Maximum visible distance. Non-positive means unlimited.
    pub max_distance: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            frustum_cull: true,
            distance_cull: true,
            max_distance: 2500.0,
        }
    }
}

impl VisibilityConfig {
    pub fn culling_enabled(&self) -> bool {
        self.frustum_cull || self.distance_cull
    }
}

/// Progressive spawn rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Sample in-view candidates; when off, sample a ring around the player.
    pub spawn_in_view_only: bool,
    /// Disk radius of the lateral offset around the sampled view axis point.
    pub spawn_radius: f32,
    pub near: f32,
    pub far: f32,
    /// Stop spawning once this many agents are alive.
    pub max_active: usize,
    pub max_spawn_per_frame: usize,
    pub use_navmesh_projection: bool,
    /// Navmesh/ground projections allowed per frame.
    pub max_raycast_per_frame: usize,
    pub min_distance_from_player: f32,
    /// Candidate attempts per unit before moving on.
    pub max_attempts: usize,
    /// Units queued per type when a session starts.
    pub auto_spawn_count: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spawn_in_view_only: true,
            spawn_radius: 2500.0,
            near: 800.0,
            far: 2600.0,
            max_active: 10_000,
            max_spawn_per_frame: 128,
            use_navmesh_projection: true,
            max_raycast_per_frame: 256,
            min_distance_from_player: 1800.0,
            max_attempts: 8,
            auto_spawn_count: 5000,
        }
    }
}

/// Full configuration of a swarm session.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub seed: u64,
    pub max_agents: usize,
    pub cell_size: f32,
    pub separation: f32,
    pub max_speed: f32,
    pub world_extent: f32,
    pub damping: f32,
    pub separation_stiffness: f32,
    pub contact_damping: f32,
    pub chase_target: bool,
    pub chase_accel: f32,
    pub projectile_pool: usize,
    pub projectile_speed: f32,
    pub projectile_radius: f32,
    pub lock_agents_to_ground: bool,
    pub ground_z: f32,
    /// Seconds of simulated time between swarm count log lines.
    pub count_log_interval: f32,
    pub enemy_types: Vec<EnemyTypeConfig>,
    pub visibility: VisibilityConfig,
    pub spawn: SpawnConfig,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            max_agents: 10_000,
            cell_size: 200.0,
            separation: 120.0,
            max_speed: 800.0,
            world_extent: 20_000.0,
            damping: 1.0,
            separation_stiffness: 60.0,
            contact_damping: 15.5,
            chase_target: true,
            chase_accel: 600.0,
            projectile_pool: 20_000,
            projectile_speed: 2000.0,
            projectile_radius: 20.0,
            lock_agents_to_ground: true,
            ground_z: 55.0,
            count_log_interval: 5.0,
            enemy_types: Vec::new(),
            visibility: VisibilityConfig::default(),
            spawn: SpawnConfig::default(),
        }
    }
}

impl SwarmConfig {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(data: &str) -> Result<Self, SwarmError> {
        let config: SwarmConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from JSON bytes and validate it.
    pub fn from_json_slice(data: &[u8]) -> Result<Self, SwarmError> {
        let config: SwarmConfig = serde_json::from_slice(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SwarmError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_json_slice(&bytes)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values the core cannot run with; warn about ones it degrades on.
    pub fn validate(&self) -> Result<(), SwarmError> {
        if !(self.cell_size > 0.0) || !self.cell_size.is_finite() {
            return Err(SwarmError::Config(format!(
                "cell_size must be positive and finite, got {}",
                self.cell_size
            )));
        }
        for (name, value) in [
            ("separation", self.separation),
            ("max_speed", self.max_speed),
            ("world_extent", self.world_extent),
            ("damping", self.damping),
            ("contact_damping", self.contact_damping),
            ("chase_accel", self.chase_accel),
            ("projectile_speed", self.projectile_speed),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(SwarmError::Config(format!(
                    "{name} must be non-negative and finite, got {value}"
                )));
            }
        }
        if self.max_agents > MAX_AGENTS_LIMIT {
            return Err(SwarmError::Config(format!(
                "max_agents must be at most {MAX_AGENTS_LIMIT}, got {}",
                self.max_agents
            )));
        }
        if self.spawn.near > self.spawn.far {
            return Err(SwarmError::Config(format!(
                "spawn.near ({}) must not exceed spawn.far ({})",
                self.spawn.near, self.spawn.far
            )));
        }
        if self.spawn.max_attempts == 0 {
            return Err(SwarmError::Config("spawn.max_attempts must be at least 1".into()));
        }
        for (i, t) in self.enemy_types.iter().enumerate() {
            if !(t.radius >= 0.0) || !(t.speed >= 0.0) {
                return Err(SwarmError::Config(format!(
                    "enemy_types[{i}] radius and speed must be non-negative"
                )));
            }
        }

        if self.enemy_types.is_empty() {
            tracing::warn!("swarm config has 0 enemy types; nothing will spawn");
        }
        if self.projectile_pool == 0 {
            tracing::warn!("swarm config has an empty projectile pool; projectile spawns are refused");
        }
        if self.separation > self.cell_size {
            tracing::warn!(
                separation = self.separation,
                cell_size = self.cell_size,
                "separation is wider than a grid cell; some neighbors will be missed"
            );
        }
        Ok(())
    }

    /// Flatten into the parameter block used by the core.
    pub fn params(&self) -> SwarmParams {
        SwarmParams {
            cell_size: self.cell_size,
            separation: self.separation,
            max_speed: self.max_speed,
            world_extent: self.world_extent,
            lock_z: self.lock_agents_to_ground,
            ground_z: self.ground_z,
            chase_target: self.chase_target,
            chase_accel: self.chase_accel,
            damping: self.damping,
            separation_stiffness: self.separation_stiffness,
            contact_damping: self.contact_damping,
            max_agents: (self.max_agents > 0).then_some(self.max_agents),
        }
    }

    /// Archetype table in type-index order.
    pub fn archetypes(&self) -> Vec<EnemyType> {
        self.enemy_types.iter().map(EnemyTypeConfig::archetype).collect()
    }

    pub fn type_count(&self) -> usize {
        self.enemy_types.len()
    }
}
