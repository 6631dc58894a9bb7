//! Swarm Arena - Simulation Core
//!
//! A struct-of-arrays enemy swarm for survivor-style arena games. Thousands of
//! agents share one spatial hash, separate from each other, chase the player
//! and are culled against the camera every frame.
//! Uses `bevy_ecs` for the per-frame driver's resources and schedule.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod math;
pub mod profiler;
pub mod projectile;
pub mod render_sync;
pub mod snapshot;
pub mod spatial;
pub mod spawn;
pub mod systems;
pub mod terrain;
pub mod visibility;
pub mod world;

pub use api::{FrameInput, FrameStats, SwarmDriver};
pub use components::*;
pub use config::{EnemyTypeConfig, SpawnConfig, SwarmConfig, SwarmParams, VisibilityConfig};
pub use error::SwarmError;
pub use math::Float3;
pub use projectile::{Projectile, ProjectileRing};
pub use render_sync::{InstanceBuffer, RenderBatches};
pub use snapshot::SwarmSnapshot;
pub use spatial::SpatialGrid;
pub use spawn::{FlatGround, GroundProjector, SpawnQueue, SpawnReport};
pub use terrain::Heightfield;
pub use visibility::{CameraView, VisibilitySet};
pub use world::SwarmWorld;
