//! Motion controller: neuron commands to motor targets
//!
//! Converts a ring of "linear" neuron values plus two dedicated
//! rotation neurons into a motion command for the downstream motor.
//! The linear command is the value-weighted centroid of the ring, a
//! vector sum of pulls toward active neurons.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::neuron::Neuron;
use crate::types::Pose;

/// Total-weight floor below which the linear command is left unchanged
/// instead of dividing by (nearly) zero
const WEIGHT_EPSILON: f32 = 1e-6;

/// Motion command handed to the external motor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    /// Target point in container-local units (weighted centroid of the
    /// linear ring)
    pub target: Vec3,
    /// Signed target angular velocity: sign selects the turn
    /// direction, magnitude the speed
    pub angular_velocity: f32,
    /// Desired orbit radius about the rotation center
    pub orbit_radius: f32,
}

impl Default for MotionCommand {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            angular_velocity: 0.0,
            orbit_radius: 0.0,
        }
    }
}

impl MotionCommand {
    /// Rotation center in world space under the given container pose
    pub fn rotation_center(&self, pose: &Pose) -> Vec3 {
        pose.transform_point(self.target)
    }
}

/// Maps neuron values to `MotionCommand`s, holding the last command
/// when the ring is silent
#[derive(Debug, Clone, Default)]
pub struct MotionController {
    command: MotionCommand,
}

impl MotionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the command from the linear ring and the two rotation
    /// neurons. An all-zero ring leaves the previous target in place
    /// (the command is undefined, not NaN); the rotation pair is read
    /// directly with no aggregation.
    pub fn update(&mut self, linear_ring: &[Neuron], rotation: &Neuron, orbit: &Neuron) {
        let mut weighted = Vec3::ZERO;
        let mut total = 0.0;
        for neuron in linear_ring {
            weighted += neuron.position() * neuron.value();
            total += neuron.value();
        }
        if total.abs() > WEIGHT_EPSILON {
            self.command.target = weighted / total;
        }

        self.command.angular_velocity = rotation.value();
        self.command.orbit_radius = orbit.value().abs();
    }

    pub fn command(&self) -> &MotionCommand {
        &self.command
    }
}
