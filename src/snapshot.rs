//! Serializable per-frame swarm summary.
//!
//! Counts only, no per-agent data: the render buffers carry transforms, this
//! carries what a HUD, a log shipper or a test harness wants to read.

use crate::spawn::SpawnQueue;
use crate::visibility::VisibilitySet;
use crate::world::SwarmWorld;
use serde::{Deserialize, Serialize};

/// Swarm state at the end of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwarmSnapshot {
    /// Simulation steps taken.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub alive: usize,
    pub per_type_alive: Vec<usize>,
    /// Units still waiting to be placed, per type.
    pub pending: Vec<usize>,
    pub spawned_this_frame: usize,
    /// Visible agents across all types.
    pub visible: usize,
    pub projectiles_alive: usize,
}

impl SwarmSnapshot {
    pub fn capture(
        world: &SwarmWorld,
        queue: &SpawnQueue,
        visibility: &VisibilitySet,
        time: f32,
        spawned_this_frame: usize,
    ) -> Self {
        let type_count = world.archetypes().len();
        let mut per_type_alive = vec![0; type_count];
        for (&alive, &t) in world.alive().iter().zip(world.types()) {
            if alive && t < type_count {
                per_type_alive[t] += 1;
            }
        }
        Self {
            tick: world.tick(),
            time,
            alive: world.num_alive(),
            per_type_alive,
            pending: queue.pending_per_type().to_vec(),
            spawned_this_frame,
            visible: visibility.total(),
            projectiles_alive: world.projectiles().alive_count(),
        }
    }

    pub fn pending_total(&self) -> usize {
        self.pending.iter().sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::EnemyType;
    use crate::config::SwarmParams;
    use crate::math::Float3;

    #[test]
    fn test_capture_counts() {
        let mut world = SwarmWorld::new(SwarmParams::default(), vec![EnemyType::default(); 2], 2, 10.0, 1.0);
        world.spawn(0, Float3::ZERO);
        world.spawn(1, Float3::new(300.0, 0.0, 0.0));
        world.spawn(1, Float3::new(600.0, 0.0, 0.0));
        world.kill(0);
        world.spawn_projectile(Float3::ZERO, Float3::UP);
        let mut queue = SpawnQueue::new(2, 1);
        queue.enqueue(0, 7).unwrap();

        let snap = SwarmSnapshot::capture(&world, &queue, &VisibilitySet::new(), 1.5, 3);
        assert_eq!(snap.alive, 2);
        assert_eq!(snap.per_type_alive, vec![0, 2]);
        assert_eq!(snap.pending, vec![7, 0]);
        assert_eq!(snap.pending_total(), 7);
        assert_eq!(snap.projectiles_alive, 1);
        assert_eq!(snap.spawned_this_frame, 3);
    }

    #[test]
    fn test_json_fields() {
        let snap = SwarmSnapshot {
            tick: 4,
            alive: 10,
            per_type_alive: vec![6, 4],
            ..Default::default()
        };
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"per_type_alive\":[6,4]"));
        assert_eq!(SwarmSnapshot::from_json_str(&json).unwrap(), snap);
    }
}
