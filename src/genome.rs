//! Persisted neuron DNA
//!
//! The only serialized artifact this layer owns: an ordered list of 3D
//! points per neuron container, used to reconstruct a container
//! deterministically on respawn and to seed the layout generator after
//! mutation.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SubstrateError;
use crate::layout::{generate_layout, LayoutShape};
use crate::neuron::Neuron;

/// Ordered neuron positions for one container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NeuronDna {
    pub points: Vec<Vec3>,
}

impl NeuronDna {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    /// Capture the DNA of an existing neuron array
    pub fn from_neurons(neurons: &[Neuron]) -> Self {
        Self {
            points: neurons.iter().map(|n| n.position()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Regenerate a full position set of `count` points, preserving
    /// this DNA's prefix and generating only the remainder
    pub fn grow(
        &self,
        count: usize,
        radius: f32,
        shape: LayoutShape,
    ) -> Result<Vec<Vec3>, SubstrateError> {
        generate_layout(Some(&self.points), count, radius, shape)
    }
}
