//! Error types for the substrate
//!
//! Configuration errors surface at the point of mutation; degenerate
//! geometry is handled with neutral results and never reaches here.

use thiserror::Error;

/// Errors produced by the neuron substrate
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubstrateError {
    /// A configuration bound was violated when a property was set
    #[error("validation failed: {field} = {value} must satisfy {requirement}")]
    Validation {
        field: &'static str,
        value: f32,
        requirement: &'static str,
    },

    /// Layout generation was asked for zero neurons; callers must clamp
    /// to their own documented minimum
    #[error("neuron layout requires at least one position")]
    EmptyLayout,

    /// Only one half of the spring stiffness/damper pair was set
    #[error("spring pair incomplete: {missing} is unset")]
    HalfSpringPair { missing: &'static str },

    /// A constraint was applied before being bound to a joint
    #[error("constraint applied before initialise")]
    UnboundConstraint,
}

impl SubstrateError {
    pub(crate) fn validation(field: &'static str, value: f32, requirement: &'static str) -> Self {
        Self::Validation {
            field,
            value,
            requirement,
        }
    }
}
