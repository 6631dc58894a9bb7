//! Render sync - flat instance buffers for the host renderer.
//!
//! Converts the visible part of the swarm into contiguous `f32` buffers that
//! an instanced-mesh renderer can upload without per-agent allocation.
//!
//! # Agent Instance Layout
//!
//! One buffer per enemy type, `INSTANCE_STRIDE` floats per instance:
//!
//! ```text
//! [+0] x      - world position
//! [+1] y
//! [+2] z
//! [+3] yaw    - degrees, heading of the velocity in the XY plane
//! [+4] pitch  - degrees, climb angle of the velocity
//! [+5] roll   - always 0
//! [+6] scale  - uniform scale, type radius / mesh radius
//! ```
//!
//! Agents at rest get zero rotation.
//!
//! # Projectile Layout
//!
//! `PROJECTILE_STRIDE` floats (x, y, z) per ring slot, every slot emitted so
//! the host's instance count never changes. Dead slots are parked at
//! `z = DEAD_PROJECTILE_Z`, far below anything visible.
//!
//! # Determinism
//!
//! Instances follow the order of the visibility lists (ascending agent index);
//! projectiles follow ring slot order.

use crate::components::{AgentIndex, TypeIndex};
use crate::config::SwarmConfig;
use crate::math::Float3;
use crate::projectile::ProjectileRing;
use crate::visibility::VisibilitySet;
use crate::world::SwarmWorld;
use bevy_ecs::prelude::*;

/// Floats per agent instance.
pub const INSTANCE_STRIDE: usize = 7;
/// Floats per projectile slot.
pub const PROJECTILE_STRIDE: usize = 3;
/// Z coordinate given to dead projectile slots.
pub const DEAD_PROJECTILE_Z: f32 = -1.0e9;
/// Mesh bounding radius assumed when the host reports none.
pub const DEFAULT_MESH_RADIUS: f32 = 50.0;

pub const FIELD_X: usize = 0;
pub const FIELD_Y: usize = 1;
pub const FIELD_Z: usize = 2;
pub const FIELD_YAW: usize = 3;
pub const FIELD_PITCH: usize = 4;
pub const FIELD_ROLL: usize = 5;
pub const FIELD_SCALE: usize = 6;

/// Uniform scale that makes a mesh of `mesh_radius` appear `radius` large.
#[inline]
pub fn uniform_scale(radius: f32, mesh_radius: f32) -> f32 {
    if !(radius > 0.0) {
        return 1.0;
    }
    let mesh_radius = if mesh_radius > f32::EPSILON {
        mesh_radius
    } else {
        DEFAULT_MESH_RADIUS
    };
    radius / mesh_radius
}

/// Yaw and pitch in degrees facing along `v`. Zero for a zero vector.
#[inline]
pub fn facing_degrees(v: Float3) -> (f32, f32) {
    if v.normalized_or_zero() == Float3::ZERO {
        return (0.0, 0.0);
    }
    let yaw = v.y.atan2(v.x).to_degrees();
    let pitch = v.z.atan2(v.x.hypot(v.y)).to_degrees();
    (yaw, pitch)
}

/// Per-type scales from a session config.
pub fn type_scales(config: &SwarmConfig) -> Vec<f32> {
    config
        .enemy_types
        .iter()
        .map(|t| uniform_scale(t.radius, t.mesh_radius))
        .collect()
}

/// Instance transforms for one enemy type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceBuffer {
    pub type_index: TypeIndex,
    pub scale: f32,
    pub data: Vec<f32>,
}

impl InstanceBuffer {
    fn new(type_index: TypeIndex, scale: f32) -> Self {
        Self {
            type_index,
            scale,
            data: Vec::new(),
        }
    }

    fn reset(&mut self, type_index: TypeIndex, scale: f32) {
        self.type_index = type_index;
        self.scale = scale;
        self.data.clear();
    }

    fn push_agent(&mut self, world: &SwarmWorld, i: AgentIndex) {
        let v = Float3::new(world.vx[i], world.vy[i], world.vz[i]);
        let (yaw, pitch) = facing_degrees(v);
        self.data
            .extend_from_slice(&[world.px[i], world.py[i], world.pz[i], yaw, pitch, 0.0, self.scale]);
    }

    fn fill_visible(&mut self, world: &SwarmWorld, visibility: &VisibilitySet) {
        let visible = visibility.visible_of_type(self.type_index);
        self.data.reserve(visible.len() * INSTANCE_STRIDE);
        for &i in visible {
            if world.is_alive(i) {
                self.push_agent(world, i);
            }
        }
    }

    fn fill_all_alive(&mut self, world: &SwarmWorld) {
        for i in 0..world.len() {
            if world.alive[i] && world.types[i] == self.type_index {
                self.push_agent(world, i);
            }
        }
    }

    /// Buffer for the visible agents of `type_index`.
    pub fn from_visible(world: &SwarmWorld, visibility: &VisibilitySet, type_index: TypeIndex, scale: f32) -> Self {
        let mut buffer = Self::new(type_index, scale);
        buffer.fill_visible(world, visibility);
        buffer
    }

    /// Buffer for every alive agent of `type_index`, used when culling is off.
    pub fn from_all_alive(world: &SwarmWorld, type_index: TypeIndex, scale: f32) -> Self {
        let mut buffer = Self::new(type_index, scale);
        buffer.fill_all_alive(world);
        buffer
    }

    pub fn instance_count(&self) -> usize {
        self.data.len() / INSTANCE_STRIDE
    }

    /// The `INSTANCE_STRIDE` floats of one instance.
    pub fn instance(&self, n: usize) -> Option<&[f32]> {
        self.data.get(n * INSTANCE_STRIDE..(n + 1) * INSTANCE_STRIDE)
    }
}

/// Positions of every ring slot, dead slots parked out of sight.
pub fn projectile_buffer(ring: &ProjectileRing) -> Vec<f32> {
    let mut out = Vec::new();
    fill_projectile_buffer(ring, &mut out);
    out
}

/// Overwrite `out` with the ring's slot positions, reusing its allocation.
pub fn fill_projectile_buffer(ring: &ProjectileRing, out: &mut Vec<f32>) {
    out.clear();
    out.reserve(ring.capacity() * PROJECTILE_STRIDE);
    for p in ring.items() {
        if p.alive {
            out.extend_from_slice(&[p.position.x, p.position.y, p.position.z]);
        } else {
            out.extend_from_slice(&[p.position.x, p.position.y, DEAD_PROJECTILE_Z]);
        }
    }
}

/// All render buffers for one frame.
#[derive(Resource, Debug, Clone, Default)]
pub struct RenderBatches {
    pub per_type: Vec<InstanceBuffer>,
    pub projectiles: Vec<f32>,
}

impl RenderBatches {
    /// Rebuild every buffer in place. With `visibility` set to `None` all
    /// alive agents are emitted.
    pub fn sync(&mut self, world: &SwarmWorld, visibility: Option<&VisibilitySet>, scales: &[f32]) {
        let type_count = world.archetypes().len();
        self.per_type.truncate(type_count);
        while self.per_type.len() < type_count {
            self.per_type.push(InstanceBuffer::new(self.per_type.len(), 1.0));
        }
        for (t, buffer) in self.per_type.iter_mut().enumerate() {
            buffer.reset(t, scales.get(t).copied().unwrap_or(1.0));
            match visibility {
                Some(vis) => buffer.fill_visible(world, vis),
                None => buffer.fill_all_alive(world),
            }
        }
        fill_projectile_buffer(world.projectiles(), &mut self.projectiles);
    }

    pub fn instance_total(&self) -> usize {
        self.per_type.iter().map(InstanceBuffer::instance_count).sum()
    }
}
