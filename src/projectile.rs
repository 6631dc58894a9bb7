//! Fixed-capacity projectile ring.
//!
//! Spawning always writes the slot at `head` and advances it, so once the ring
//! is full the oldest projectile is overwritten whether or not it has expired.
//! Memory stays bounded; an undersized pool evicts early instead of growing.
//! Hit detection and lifetime expiry belong to the consumer, which calls
//! [`ProjectileRing::kill`] when it has resolved a slot.

use crate::math::Float3;
use serde::{Deserialize, Serialize};

/// One ring slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub position: Float3,
    pub velocity: Float3,
    pub alive: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectileRing {
    items: Vec<Projectile>,
    head: usize,
    speed: f32,
    radius: f32,
}

impl Default for ProjectileRing {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            head: 0,
            speed: 2000.0,
            radius: 20.0,
        }
    }
}

impl ProjectileRing {
    pub fn new(capacity: usize, speed: f32, radius: f32) -> Self {
        let mut ring = Self::default();
        ring.configure(capacity, speed, radius);
        ring
    }

    /// Allocate `capacity` zeroed slots, discarding any previous state.
    pub fn configure(&mut self, capacity: usize, speed: f32, radius: f32) {
        self.items.clear();
        self.items.resize(capacity, Projectile::default());
        self.head = 0;
        self.speed = speed;
        self.radius = radius;
    }

    /// Launch a projectile from `origin` along `direction`.
    ///
    /// Returns the slot written, or `None` when the ring has no capacity.
    /// A zero direction yields a stationary projectile rather than NaN.
    pub fn spawn(&mut self, origin: Float3, direction: Float3) -> Option<usize> {
        if self.items.is_empty() {
            tracing::warn!("projectile spawn refused: ring has zero capacity");
            return None;
        }
        let slot = self.head;
        self.head = (self.head + 1) % self.items.len();
        self.items[slot] = Projectile {
            position: origin,
            velocity: direction.normalized_or_zero() * self.speed,
            alive: true,
        };
        Some(slot)
    }

    /// Advance every alive projectile by `velocity * dt`.
    pub fn step(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        for item in self.items.iter_mut().filter(|p| p.alive) {
            item.position += item.velocity * dt;
        }
    }

    /// Mark a slot dead. Returns false if it was already dead or out of range.
    pub fn kill(&mut self, slot: usize) -> bool {
        match self.items.get_mut(slot) {
            Some(item) if item.alive => {
                item.alive = false;
                true
            }
            _ => false,
        }
    }

    pub fn items(&self) -> &[Projectile] {
        &self.items
    }

    pub fn get(&self, slot: usize) -> Option<&Projectile> {
        self.items.get(slot)
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Slot the next spawn will write.
    pub fn head(&self) -> usize {
        self.head
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn alive_count(&self) -> usize {
        self.items.iter().filter(|p| p.alive).count()
    }
}
