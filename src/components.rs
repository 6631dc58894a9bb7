//! Per-type and per-agent data shared by the simulation core.
//!
//! Agents have no per-object storage: an agent is an index into the parallel
//! arrays owned by [`crate::world::SwarmWorld`]. The only structured record is
//! the archetype, one per enemy type, shared by every agent of that type.

use serde::{Deserialize, Serialize};

/// Dense index of an agent slot in the struct-of-arrays storage.
pub type AgentIndex = usize;

/// Index into the archetype table.
pub type TypeIndex = usize;

/// Immutable stat block shared by all agents of one enemy type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyType {
    /// Collision/visual radius in world units.
    pub radius: f32,
    /// Maximum movement speed (units per second).
    pub speed: f32,
    /// Hit points an agent of this type spawns with.
    pub hp: f32,
    /// Contact damage per second dealt to the player.
    pub dps: f32,
    /// XP credited when an agent of this type is killed by damage.
    #[serde(default)]
    pub xp_reward: u32,
}

impl EnemyType {
    pub fn new(radius: f32, speed: f32, hp: f32, dps: f32) -> Self {
        Self {
            radius,
            speed,
            hp,
            dps,
            xp_reward: 1,
        }
    }

    pub fn with_xp_reward(mut self, xp_reward: u32) -> Self {
        self.xp_reward = xp_reward;
        self
    }

    /// Effective speed cap: the lesser of this type's speed and the global cap.
    #[inline]
    pub fn speed_cap(&self, global_max_speed: f32) -> f32 {
        self.speed.min(global_max_speed).max(0.0)
    }
}

impl Default for EnemyType {
    fn default() -> Self {
        Self {
            radius: 40.0,
            speed: 600.0,
            hp: 10.0,
            dps: 5.0,
            xp_reward: 1,
        }
    }
}

/// Result of an area damage query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageReport {
    /// Number of alive agents inside the radius that took damage.
    pub hit: usize,
    /// Agents whose HP reached zero; their slots are now free.
    pub killed: Vec<AgentIndex>,
    /// Sum of the killed agents' XP rewards.
    pub xp: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_cap_takes_lesser() {
        let t = EnemyType::new(40.0, 600.0, 10.0, 5.0);
        assert_eq!(t.speed_cap(800.0), 600.0);
        assert_eq!(t.speed_cap(300.0), 300.0);
        assert_eq!(t.speed_cap(-5.0), 0.0);
    }
}
