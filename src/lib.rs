//! Spatial neuron substrate for physically simulated bots
//!
//! This crate implements:
//! - Deterministic neuron layout over disc, shell, and sphere geometry,
//!   with position continuity across respawn/mutation
//! - Per-tick analog sensor activation (proximity, homing, rotor)
//! - The motion controller mapping neuron rings to motor commands
//! - Actuator constraint rows for an external bilateral joint solver,
//!   with rolling force feedback
//!
//! The rigid-body engine and the spatial index are external
//! collaborators reached through the traits in [`traits`]; the neural
//! substrate between sensing and acting is out of scope entirely.

pub mod constraint;
pub mod container;
pub mod error;
pub mod genome;
pub mod layout;
pub mod motion;
pub mod neuron;
pub mod sensors;
pub mod traits;
pub mod types;

// Re-export main types for convenience
pub use constraint::{ConstraintProperties, ConstraintSet, ForceAverage, JointConstraint, RowKind};
pub use container::{Act, EnergyMeter, NeuronContainer, Sense};
pub use error::SubstrateError;
pub use genome::NeuronDna;
pub use layout::{generate_layout, LayoutShape};
pub use motion::{MotionCommand, MotionController};
pub use neuron::Neuron;
pub use sensors::{
    DistanceProps, FalloffConfig, HomingConfig, HomingSensor, ProximityConfig, ProximitySensor,
    RotorMode, RotorSensor,
};
pub use traits::{BilateralJoint, NearbyObject, StaticSnapshot, WorldSnapshot};
pub use types::{BotToken, ObjectKind, Pose};
