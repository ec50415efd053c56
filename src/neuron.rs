//! The neuron: a scalar analog signal with a fixed spatial position
//!
//! Sensors write neuron values each tick; actuators read them. Values
//! are clamped on every write so downstream consumers can rely on the
//! advertised range.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Minimum position length for a neuron to have a defined unit
/// direction (origin neurons have none and homing leaves them at zero)
const UNIT_DIRECTION_EPSILON: f32 = 1e-4;

/// A single neuron: position local to its container, current value,
/// and polarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neuron {
    position: Vec3,
    value: f32,
    positive_only: bool,
    sensor_owned: bool,
}

impl Neuron {
    /// Create a neuron at the given local position
    pub fn new(position: Vec3, positive_only: bool) -> Self {
        Self {
            position,
            value: 0.0,
            positive_only,
            sensor_owned: false,
        }
    }

    /// Create a sensor-owned neuron: positive-only, and external
    /// writes are rejected
    pub fn sensor_only(position: Vec3) -> Self {
        Self {
            position,
            value: 0.0,
            positive_only: true,
            sensor_owned: true,
        }
    }

    /// Local position (non-metric container units)
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current value, within `range()`
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Whether this neuron only carries values in [0, 1]
    pub fn positive_only(&self) -> bool {
        self.positive_only
    }

    /// Whether external writes are rejected (sensor neurons)
    pub fn sensor_owned(&self) -> bool {
        self.sensor_owned
    }

    /// Valid value range of this neuron
    pub fn range(&self) -> (f32, f32) {
        if self.positive_only {
            (0.0, 1.0)
        } else {
            (-1.0, 1.0)
        }
    }

    /// Write the value, clamped to this neuron's range. Used by the
    /// owning sensor/actuator engine.
    pub fn set_value(&mut self, value: f32) {
        let (lo, hi) = self.range();
        self.value = value.clamp(lo, hi);
    }

    /// Write the value from outside the owning engine. Returns false
    /// (and leaves the value untouched) for sensor-owned neurons.
    pub fn set_external(&mut self, value: f32) -> bool {
        if self.sensor_owned {
            return false;
        }
        self.set_value(value);
        true
    }

    /// Unit direction of this neuron's position, or None for neurons
    /// sitting at the origin
    pub fn unit_position(&self) -> Option<Vec3> {
        let len = self.position.length();
        if len < UNIT_DIRECTION_EPSILON {
            None
        } else {
            Some(self.position / len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_only_clamps_to_unit_interval() {
        let mut neuron = Neuron::new(Vec3::X, true);
        neuron.set_value(1.7);
        assert_eq!(neuron.value(), 1.0);
        neuron.set_value(-0.3);
        assert_eq!(neuron.value(), 0.0);
    }

    #[test]
    fn test_bipolar_clamps_to_signed_unit_interval() {
        let mut neuron = Neuron::new(Vec3::X, false);
        neuron.set_value(-2.0);
        assert_eq!(neuron.value(), -1.0);
        neuron.set_value(0.25);
        assert_eq!(neuron.value(), 0.25);
    }

    #[test]
    fn test_sensor_owned_rejects_external_write() {
        let mut neuron = Neuron::sensor_only(Vec3::X);
        neuron.set_value(0.5);
        assert!(!neuron.set_external(0.9));
        assert_eq!(neuron.value(), 0.5);
    }

    #[test]
    fn test_origin_neuron_has_no_unit_direction() {
        let neuron = Neuron::new(Vec3::ZERO, true);
        assert!(neuron.unit_position().is_none());

        let neuron = Neuron::new(Vec3::new(0.0, 2.0, 0.0), true);
        let unit = neuron.unit_position().unwrap();
        assert!((unit - Vec3::Y).length() < 1e-6);
    }
}
