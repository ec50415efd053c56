//! Common types shared across the substrate
//!
//! Identity tokens, world poses, and the object-kind tags used by the
//! spatial snapshot boundary.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a bot (used to exclude a bot's own parts from
/// its sensor queries)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotToken(u64);

static NEXT_BOT_TOKEN: AtomicU64 = AtomicU64::new(1);

impl BotToken {
    /// Generate a new unique bot token
    pub fn new() -> Self {
        BotToken(NEXT_BOT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value (useful for debugging/serialization)
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Create a BotToken from a raw u64 (for deserialization)
    pub fn from_raw(id: u64) -> Self {
        // Update the counter if this ID is higher than current
        NEXT_BOT_TOKEN.fetch_max(id + 1, Ordering::Relaxed);
        BotToken(id)
    }
}

impl Default for BotToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BotToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bot({})", self.0)
    }
}

/// Kind tag carried by objects returned from the spatial snapshot,
/// usable as a sensor query filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Bot,
    Food,
    Hazard,
    Debris,
}

/// World position + orientation of a body or neuron container,
/// refreshed from the physics body each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Identity pose at the origin
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    /// Transform a local point into world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.rotation * local + self.position
    }

    /// Rotate a world-space vector into this pose's local frame
    pub fn rotate_into_local(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * world
    }

    /// Orthonormal basis frame of this pose
    pub fn frame(&self) -> Frame {
        let m = Mat3::from_quat(self.rotation);
        Frame {
            right: m.x_axis,
            up: m.y_axis,
            front: m.z_axis,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Orthonormal basis extracted from a pose, used by the fixed-angular
/// constraint to compare parent and child orientations axis by axis
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub right: Vec3,
    pub up: Vec3,
    pub front: Vec3,
}
