//! Struct-of-arrays swarm core.
//!
//! Every agent is an index into a set of parallel arrays. Killing an agent
//! clears its `alive` flag and pushes the slot on a free list; storage is never
//! compacted, so indices held by consumers stay valid until the slot is reused.
//!
//! ## Step
//!
//! 1. Rebuild the spatial hash from alive agents
//! 2. Gather separation pushes (parallel with the `parallel` feature)
//! 3. Integrate velocity and position per agent
//! 4. Advance projectiles

use crate::components::{AgentIndex, DamageReport, EnemyType, TypeIndex};
use crate::config::{SwarmConfig, SwarmParams};
use crate::math::Float3;
use crate::projectile::ProjectileRing;
use crate::spatial::SpatialGrid;
use crate::systems::{gather_separation, integrate_agents, SeparationInput};
use bevy_ecs::prelude::*;

/// Most slots reserved up front for a capped world; the rest grow on demand.
pub const INITIAL_RESERVE: usize = 16_384;

/// The swarm simulation core.
#[derive(Resource, Debug, Clone, Default)]
pub struct SwarmWorld {
    pub(crate) px: Vec<f32>,
    pub(crate) py: Vec<f32>,
    pub(crate) pz: Vec<f32>,
    pub(crate) vx: Vec<f32>,
    pub(crate) vy: Vec<f32>,
    pub(crate) vz: Vec<f32>,
    pub(crate) hp: Vec<f32>,
    pub(crate) cooldown: Vec<f32>,
    pub(crate) types: Vec<TypeIndex>,
    pub(crate) alive: Vec<bool>,
    free: Vec<AgentIndex>,
    pub(crate) archetypes: Vec<EnemyType>,
    pub(crate) params: SwarmParams,
    grid: SpatialGrid,
    projectiles: ProjectileRing,
    /// Position agents steer toward when chasing is enabled.
    pub target: Float3,
    separation_scratch: Vec<Float3>,
    tick: u64,
}

impl SwarmWorld {
    pub fn new(
        params: SwarmParams,
        archetypes: Vec<EnemyType>,
        projectile_capacity: usize,
        projectile_speed: f32,
        projectile_radius: f32,
    ) -> Self {
        let mut world = Self::default();
        world.configure(
            params,
            archetypes,
            projectile_capacity,
            projectile_speed,
            projectile_radius,
        );
        world
    }

    /// Build a core from a validated session config.
    pub fn from_config(config: &SwarmConfig) -> Self {
        Self::new(
            config.params(),
            config.archetypes(),
            config.projectile_pool,
            config.projectile_speed,
            config.projectile_radius,
        )
    }

    /// Reset all state and apply new parameters.
    ///
    /// Existing agents and projectiles are discarded.
    pub fn configure(
        &mut self,
        params: SwarmParams,
        archetypes: Vec<EnemyType>,
        projectile_capacity: usize,
        projectile_speed: f32,
        projectile_radius: f32,
    ) {
        if archetypes.is_empty() {
            tracing::warn!("swarm configured with 0 archetypes; spawns will be refused");
        }
        if params.separation > params.cell_size {
            tracing::warn!(
                separation = params.separation,
                cell_size = params.cell_size,
                "separation exceeds cell size; distant overlaps will be missed"
            );
        }
        *self = Self {
            archetypes,
            params,
            grid: SpatialGrid::new(params.cell_size),
            projectiles: ProjectileRing::new(
                projectile_capacity,
                projectile_speed,
                projectile_radius,
            ),
            ..Default::default()
        };
        if let Some(cap) = params.max_agents {
            self.reserve(cap.min(INITIAL_RESERVE));
        }
        tracing::debug!(
            types = self.archetypes.len(),
            cell_size = params.cell_size,
            projectile_capacity,
            "swarm world configured"
        );
    }

    fn reserve(&mut self, additional: usize) {
        self.px.reserve(additional);
        self.py.reserve(additional);
        self.pz.reserve(additional);
        self.vx.reserve(additional);
        self.vy.reserve(additional);
        self.vz.reserve(additional);
        self.hp.reserve(additional);
        self.cooldown.reserve(additional);
        self.types.reserve(additional);
        self.alive.reserve(additional);
    }

    /// Spawn an agent at rest.
    pub fn spawn(&mut self, type_index: TypeIndex, position: Float3) -> Option<AgentIndex> {
        self.spawn_with_velocity(type_index, position, Float3::ZERO)
    }

    /// Spawn an agent, reusing a free slot when one exists.
    ///
    /// Returns `None` when the archetype table is empty, the capacity cap is
    /// reached, or the position is not finite. An out-of-range type index with
    /// a populated table is a caller bug: it panics in debug builds.
    pub fn spawn_with_velocity(
        &mut self,
        type_index: TypeIndex,
        position: Float3,
        velocity: Float3,
    ) -> Option<AgentIndex> {
        let Some(archetype) = self.archetypes.get(type_index).copied() else {
            if self.archetypes.is_empty() {
                tracing::warn!(type_index, "spawn refused: no archetypes configured");
            } else {
                tracing::error!(
                    type_index,
                    count = self.archetypes.len(),
                    "spawn with out-of-range archetype index"
                );
                if cfg!(debug_assertions) {
                    panic!(
                        "archetype index {type_index} out of range ({} types)",
                        self.archetypes.len()
                    );
                }
            }
            return None;
        };
        if let Some(cap) = self.params.max_agents {
            if self.num_alive() >= cap {
                tracing::debug!(cap, "spawn dropped: agent cap reached");
                return None;
            }
        }
        if !position.is_finite() {
            tracing::warn!(type_index, "spawn refused: non-finite position");
            return None;
        }

        let mut position = position;
        let mut velocity = if velocity.is_finite() {
            velocity
        } else {
            Float3::ZERO
        };
        if self.params.lock_z {
            position.z = self.params.ground_z;
            velocity.z = 0.0;
        }

        let index = match self.free.pop() {
            Some(index) => {
                self.px[index] = position.x;
                self.py[index] = position.y;
                self.pz[index] = position.z;
                self.vx[index] = velocity.x;
                self.vy[index] = velocity.y;
                self.vz[index] = velocity.z;
                self.hp[index] = archetype.hp;
                self.cooldown[index] = 0.0;
                self.types[index] = type_index;
                self.alive[index] = true;
                index
            }
            None => {
                self.px.push(position.x);
                self.py.push(position.y);
                self.pz.push(position.z);
                self.vx.push(velocity.x);
                self.vy.push(velocity.y);
                self.vz.push(velocity.z);
                self.hp.push(archetype.hp);
                self.cooldown.push(0.0);
                self.types.push(type_index);
                self.alive.push(true);
                self.alive.len() - 1
            }
        };
        Some(index)
    }

    /// Free an agent's slot. Returns false if it was already dead.
    pub fn kill(&mut self, index: AgentIndex) -> bool {
        match self.alive.get_mut(index) {
            Some(alive) if *alive => {
                *alive = false;
                self.vx[index] = 0.0;
                self.vy[index] = 0.0;
                self.vz[index] = 0.0;
                self.free.push(index);
                true
            }
            _ => false,
        }
    }

    /// Subtract `amount` HP. Returns true if this killed the agent.
    pub fn apply_damage(&mut self, index: AgentIndex, amount: f32) -> bool {
        if !self.is_alive(index) {
            return false;
        }
        self.hp[index] -= amount;
        if self.hp[index] <= 0.0 {
            return self.kill(index);
        }
        false
    }

    /// Damage every alive agent within `radius` of `origin`.
    pub fn apply_radial_damage(&mut self, origin: Float3, radius: f32, damage: f32) -> DamageReport {
        let mut report = DamageReport::default();
        if !(radius >= 0.0) || !origin.is_finite() {
            return report;
        }
        let r2 = radius * radius;
        for i in 0..self.alive.len() {
            if !self.alive[i] {
                continue;
            }
            let p = Float3::new(self.px[i], self.py[i], self.pz[i]);
            if p.distance_squared(origin) > r2 {
                continue;
            }
            report.hit += 1;
            if self.apply_damage(i, damage) {
                report.killed.push(i);
                let xp = self.archetypes.get(self.types[i]).map_or(0, |t| t.xp_reward);
                report.xp = report.xp.saturating_add(xp);
            }
        }
        tracing::debug!(hit = report.hit, killed = report.killed.len(), xp = report.xp, "radial damage applied");
        report
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// A non-positive or non-finite `dt` leaves the world untouched.
    pub fn step(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        let _span = tracing::info_span!("swarm_step", agents = self.alive.len()).entered();

        let alive = &self.alive;
        self.grid
            .build_where(&self.px, &self.py, &self.pz, |i| alive[i]);

        let mut pushes = std::mem::take(&mut self.separation_scratch);
        let input = SeparationInput {
            px: &self.px,
            py: &self.py,
            pz: &self.pz,
            alive: &self.alive,
            types: &self.types,
            archetypes: &self.archetypes,
            grid: &self.grid,
            separation: self.params.separation,
        };
        gather_separation(&input, &mut pushes);

        integrate_agents(self, &pushes, dt);
        self.separation_scratch = pushes;

        self.projectiles.step(dt);
        self.tick += 1;
    }

    /// Launch a projectile from the shared ring.
    pub fn spawn_projectile(&mut self, origin: Float3, direction: Float3) -> Option<usize> {
        self.projectiles.spawn(origin, direction)
    }

    pub fn set_target(&mut self, target: Float3) {
        self.target = target;
    }

    /// Number of slots, alive or free.
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    pub fn num_alive(&self) -> usize {
        self.alive.len() - self.free.len()
    }

    pub fn alive_of_type(&self, type_index: TypeIndex) -> usize {
        self.alive
            .iter()
            .zip(&self.types)
            .filter(|(alive, t)| **alive && **t == type_index)
            .count()
    }

    pub fn is_alive(&self, index: AgentIndex) -> bool {
        self.alive.get(index).copied().unwrap_or(false)
    }

    pub fn position(&self, index: AgentIndex) -> Option<Float3> {
        (index < self.len()).then(|| Float3::new(self.px[index], self.py[index], self.pz[index]))
    }

    pub fn velocity(&self, index: AgentIndex) -> Option<Float3> {
        (index < self.len()).then(|| Float3::new(self.vx[index], self.vy[index], self.vz[index]))
    }

    pub fn type_of(&self, index: AgentIndex) -> Option<TypeIndex> {
        self.types.get(index).copied()
    }

    pub fn px(&self) -> &[f32] {
        &self.px
    }

    pub fn py(&self) -> &[f32] {
        &self.py
    }

    pub fn pz(&self) -> &[f32] {
        &self.pz
    }

    pub fn vx(&self) -> &[f32] {
        &self.vx
    }

    pub fn vy(&self) -> &[f32] {
        &self.vy
    }

    pub fn vz(&self) -> &[f32] {
        &self.vz
    }

    pub fn hp(&self) -> &[f32] {
        &self.hp
    }

    pub fn cooldown(&self) -> &[f32] {
        &self.cooldown
    }

    /// Attack cooldowns, writable by combat consumers.
    pub fn cooldown_mut(&mut self) -> &mut [f32] {
        &mut self.cooldown
    }

    pub fn types(&self) -> &[TypeIndex] {
        &self.types
    }

    pub fn alive(&self) -> &[bool] {
        &self.alive
    }

    pub fn free_slots(&self) -> &[AgentIndex] {
        &self.free
    }

    pub fn archetypes(&self) -> &[EnemyType] {
        &self.archetypes
    }

    pub fn archetype(&self, type_index: TypeIndex) -> Option<&EnemyType> {
        self.archetypes.get(type_index)
    }

    pub fn params(&self) -> &SwarmParams {
        &self.params
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn projectiles(&self) -> &ProjectileRing {
        &self.projectiles
    }

    pub fn projectiles_mut(&mut self) -> &mut ProjectileRing {
        &mut self.projectiles
    }

    /// Steps taken since the last `configure`.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}
