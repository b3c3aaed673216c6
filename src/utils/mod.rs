//! Utility Module
//!
//! - [`task`]: spawners, platform future aliases and blocking helpers

pub mod task;

pub use task::{InlineSpawner, PlatformFuture, TaskSpawner, default_spawner};
