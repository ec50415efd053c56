//! Boundary traits for the substrate's external collaborators
//!
//! These traits decouple the neuron layer from the spatial index and
//! the rigid-body engine, the same way creatures are decoupled from the
//! world implementation elsewhere. The physics solver itself is never
//! part of this crate; it is reached only through `BilateralJoint`.

use glam::Vec3;

use crate::types::{BotToken, ObjectKind, Pose};

/// Descriptor of one object returned by a spatial snapshot query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyObject {
    pub position: Vec3,
    pub kind: ObjectKind,
    pub owner: BotToken,
}

/// Read-only spatial snapshot of the world, captured at the start of a
/// tick. Queries return `None` when no snapshot is available this tick
/// (stale or missing), which sensors treat as "nothing sensed".
pub trait WorldSnapshot {
    /// All objects within `radius` of `center`, optionally restricted
    /// to one kind
    fn query(
        &self,
        center: Vec3,
        radius: f32,
        filter: Option<ObjectKind>,
    ) -> Option<Vec<NearbyObject>>;
}

/// Simple vector-backed snapshot, usable as-is by hosts and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSnapshot {
    objects: Vec<NearbyObject>,
}

impl StaticSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, position: Vec3, kind: ObjectKind, owner: BotToken) {
        self.objects.push(NearbyObject {
            position,
            kind,
            owner,
        });
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl WorldSnapshot for StaticSnapshot {
    fn query(
        &self,
        center: Vec3,
        radius: f32,
        filter: Option<ObjectKind>,
    ) -> Option<Vec<NearbyObject>> {
        let radius_sq = radius * radius;
        Some(
            self.objects
                .iter()
                .filter(|obj| filter.map_or(true, |kind| obj.kind == kind))
                .filter(|obj| obj.position.distance_squared(center) <= radius_sq)
                .copied()
                .collect(),
        )
    }
}

/// A user-defined bilateral physics joint, as exposed by the external
/// rigid-body engine.
///
/// Row setters follow the engine convention of acting on the most
/// recently added row; `add_linear_row`/`add_angular_row` return the
/// row index for later force read-back. Row indices restart from zero
/// each solver sub-step.
pub trait BilateralJoint {
    /// Current world pose of the parent body
    fn parent_pose(&self) -> Pose;

    /// Current world pose of the child body
    fn child_pose(&self) -> Pose;

    /// Add one linear constraint row along `direction` between the two
    /// world-space pivot points
    fn add_linear_row(&mut self, pivot_parent: Vec3, pivot_child: Vec3, direction: Vec3) -> usize;

    /// Add one angular constraint row with `relative_angle` as the
    /// error term about `axis`
    fn add_angular_row(&mut self, relative_angle: f32, axis: Vec3) -> usize;

    /// Lower friction bound of the just-added row (<= 0)
    fn set_row_min_friction(&mut self, force: f32);

    /// Upper friction bound of the just-added row (>= 0)
    fn set_row_max_friction(&mut self, force: f32);

    /// Target acceleration of the just-added row
    fn set_row_acceleration(&mut self, acceleration: f32);

    /// Stiffness of the just-added row, in [0, 1]
    fn set_row_stiffness(&mut self, stiffness: f32);

    /// Spring/damper pair of the just-added row
    fn set_row_spring_damper(&mut self, spring: f32, damper: f32);

    /// Force the solver resolved for `row` in the last sub-step
    fn row_force(&self, row: usize) -> f32;
}
