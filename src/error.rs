//! Error types for configuration loading.
//!
//! Per-frame operations never return these: spawning, stepping and culling
//! degrade locally (skip, clamp, no-op) and report through `tracing`.

/// Errors raised while loading or validating swarm configuration.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    /// A configuration value is out of its valid range.
    #[error("invalid swarm config: {0}")]
    Config(String),

    /// Failed to parse configuration JSON.
    #[error("failed to parse swarm config: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read a configuration file.
    #[error("failed to read swarm config: {0}")]
    Io(#[from] std::io::Error),

    /// An archetype index outside the configured table.
    #[error("archetype index {index} out of range (table has {count} types)")]
    InvalidArchetype { index: usize, count: usize },
}
