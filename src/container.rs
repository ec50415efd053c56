//! Neuron container plumbing
//!
//! A container is a sensor or actuator part owning a fixed array of
//! neurons, a bounding radius, a world pose, and an energy-derived
//! on/off state. The neuron array length never changes after
//! construction; only values mutate.

use serde::{Deserialize, Serialize};

use crate::error::SubstrateError;
use crate::genome::NeuronDna;
use crate::layout::{generate_layout, LayoutShape};
use crate::neuron::Neuron;
use crate::traits::{BilateralJoint, WorldSnapshot};
use crate::types::Pose;

/// Capability of a sensor part: recompute neuron values from the world
/// snapshot each tick
pub trait Sense {
    fn sense(&mut self, world: &dyn WorldSnapshot);
}

/// Capability of an actuator part: emit constraint rows to a joint
/// each physics sub-step
pub trait Act {
    fn act(&mut self, joint: &mut dyn BilateralJoint) -> Result<(), SubstrateError>;
}

/// Fixed-size neuron array with pose, bounding radius, and energy gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuronContainer {
    neurons: Vec<Neuron>,
    radius: f32,
    pose: Pose,
    powered: bool,
}

impl NeuronContainer {
    /// Build a container from a layout, optionally seeded by DNA so
    /// surviving neurons keep their positions
    pub fn from_layout(
        dna: Option<&NeuronDna>,
        count: usize,
        radius: f32,
        shape: LayoutShape,
        sensor_owned: bool,
    ) -> Result<Self, SubstrateError> {
        let positions = generate_layout(dna.map(|d| d.points.as_slice()), count, radius, shape)?;
        let neurons = positions
            .into_iter()
            .map(|p| {
                if sensor_owned {
                    Neuron::sensor_only(p)
                } else {
                    Neuron::new(p, false)
                }
            })
            .collect();
        Ok(Self {
            neurons,
            radius,
            pose: Pose::identity(),
            powered: true,
        })
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub(crate) fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    /// Bounding radius in world-proportional units
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Refresh the pose from the owning physics body (once per tick)
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn powered(&self) -> bool {
        self.powered
    }

    /// Gate the container on energy availability. Turning a sensor off
    /// forces its next update to zero all values; turning an actuator
    /// off suppresses its row emission.
    pub fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }

    /// Zero every neuron value
    pub fn zero_all(&mut self) {
        for neuron in &mut self.neurons {
            neuron.set_value(0.0);
        }
    }

    /// Snapshot of current values, in neuron order
    pub fn values(&self) -> Vec<f32> {
        self.neurons.iter().map(|n| n.value()).collect()
    }

    /// Write command values from the external neural substrate.
    /// Sensor-owned neurons reject the write; returns how many neurons
    /// accepted. Extra commands beyond the array length are ignored.
    pub fn write_commands(&mut self, commands: &[f32]) -> usize {
        let mut accepted = 0;
        for (neuron, &value) in self.neurons.iter_mut().zip(commands) {
            if neuron.set_external(value) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Capture DNA for persistence
    pub fn dna(&self) -> NeuronDna {
        NeuronDna::from_neurons(&self.neurons)
    }

    /// Largest neuron distance from the container origin
    pub fn max_neuron_radius(&self) -> f32 {
        self.neurons
            .iter()
            .map(|n| n.position().length())
            .fold(0.0, f32::max)
    }
}

/// Per-container energy meter deriving the powered state.
///
/// Draw happens once per tick; running dry is a normal operating
/// state, not an error. A negative draw is a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyMeter {
    current: f32,
    capacity: f32,
    draw_per_tick: f32,
}

impl EnergyMeter {
    pub fn new(capacity: f32, draw_per_tick: f32) -> Result<Self, SubstrateError> {
        if capacity <= 0.0 {
            return Err(SubstrateError::validation("capacity", capacity, "> 0"));
        }
        if draw_per_tick < 0.0 {
            return Err(SubstrateError::validation(
                "draw_per_tick",
                draw_per_tick,
                ">= 0",
            ));
        }
        Ok(Self {
            current: capacity,
            capacity,
            draw_per_tick,
        })
    }

    /// Draw one tick's worth of energy; returns whether the container
    /// is powered for this tick
    pub fn tick(&mut self) -> bool {
        self.current = (self.current - self.draw_per_tick).max(0.0);
        self.is_powered()
    }

    pub fn is_powered(&self) -> bool {
        self.current > 0.0
    }

    pub fn recharge(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.capacity);
    }

    /// Remaining energy as a fraction (0.0 - 1.0)
    pub fn fraction(&self) -> f32 {
        (self.current / self.capacity).clamp(0.0, 1.0)
    }
}
