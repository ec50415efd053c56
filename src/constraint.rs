//! Actuator constraint pipeline
//!
//! Converts a validated constraint configuration into joint-constraint
//! rows handed to the external bilateral joint every physics sub-step,
//! and maintains rolling force feedback read back from the solver.
//! Row kinds form a closed variant (linear / angular / fixed-angular)
//! dispatched by a single apply path.

use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::container::Act;
use crate::error::SubstrateError;
use crate::traits::BilateralJoint;

/// Row stiffness applied when the host does not override it
pub const DEFAULT_STIFFNESS: f32 = 0.9;

/// Effectively unbounded friction magnitude
const UNBOUNDED_FRICTION: f32 = 1.0e20;

/// Validated configuration for one constraint.
///
/// Every bound is checked at the moment the property is set, never at
/// apply time; the one exception is the spring pair, whose
/// half-set state surfaces when the pair is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintProperties {
    min_friction: f32,
    max_friction: f32,
    acceleration: Option<f32>,
    stiffness: f32,
    spring_stiffness: Option<f32>,
    spring_damper: Option<f32>,
    max_force: f32,
    force_average_sample_count: usize,
}

impl Default for ConstraintProperties {
    fn default() -> Self {
        Self {
            min_friction: -UNBOUNDED_FRICTION,
            max_friction: UNBOUNDED_FRICTION,
            acceleration: None,
            stiffness: DEFAULT_STIFFNESS,
            spring_stiffness: None,
            spring_damper: None,
            max_force: UNBOUNDED_FRICTION,
            force_average_sample_count: 10,
        }
    }
}

impl ConstraintProperties {
    pub fn min_friction(&self) -> f32 {
        self.min_friction
    }

    /// Lower friction bound; must be <= 0
    pub fn set_min_friction(&mut self, value: f32) -> Result<(), SubstrateError> {
        if value > 0.0 {
            return Err(SubstrateError::validation("min_friction", value, "<= 0"));
        }
        self.min_friction = value;
        Ok(())
    }

    pub fn max_friction(&self) -> f32 {
        self.max_friction
    }

    /// Upper friction bound; must be >= 0
    pub fn set_max_friction(&mut self, value: f32) -> Result<(), SubstrateError> {
        if value < 0.0 {
            return Err(SubstrateError::validation("max_friction", value, ">= 0"));
        }
        self.max_friction = value;
        Ok(())
    }

    pub fn acceleration(&self) -> Option<f32> {
        self.acceleration
    }

    /// Target acceleration for the row
    pub fn set_acceleration(&mut self, value: Option<f32>) {
        self.acceleration = value;
    }

    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Row stiffness; must be in [0, 1]
    pub fn set_stiffness(&mut self, value: f32) -> Result<(), SubstrateError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(SubstrateError::validation("stiffness", value, "in [0, 1]"));
        }
        self.stiffness = value;
        Ok(())
    }

    /// Spring half of the spring/damper pair; requires stiffness < 1
    pub fn set_spring_stiffness(&mut self, value: f32) -> Result<(), SubstrateError> {
        if self.stiffness >= 1.0 {
            return Err(SubstrateError::validation(
                "spring_stiffness",
                value,
                "stiffness < 1 when a spring is set",
            ));
        }
        self.spring_stiffness = Some(value);
        Ok(())
    }

    /// Damper half of the spring/damper pair; requires stiffness < 1
    pub fn set_spring_damper(&mut self, value: f32) -> Result<(), SubstrateError> {
        if self.stiffness >= 1.0 {
            return Err(SubstrateError::validation(
                "spring_damper",
                value,
                "stiffness < 1 when a spring is set",
            ));
        }
        self.spring_damper = Some(value);
        Ok(())
    }

    /// Set both halves of the spring pair at once
    pub fn set_spring(&mut self, spring: f32, damper: f32) -> Result<(), SubstrateError> {
        self.set_spring_stiffness(spring)?;
        self.set_spring_damper(damper)
    }

    pub fn clear_spring(&mut self) {
        self.spring_stiffness = None;
        self.spring_damper = None;
    }

    /// The spring/damper pair: both set, or neither. A half-set pair
    /// is a validation failure surfaced here, when the pair is read.
    pub fn spring(&self) -> Result<Option<(f32, f32)>, SubstrateError> {
        match (self.spring_stiffness, self.spring_damper) {
            (Some(s), Some(d)) => Ok(Some((s, d))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(SubstrateError::HalfSpringPair {
                missing: "spring_damper",
            }),
            (None, Some(_)) => Err(SubstrateError::HalfSpringPair {
                missing: "spring_stiffness",
            }),
        }
    }

    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Advisory force cap; not enforced by the row itself
    pub fn set_max_force(&mut self, value: f32) -> Result<(), SubstrateError> {
        if value < 0.0 {
            return Err(SubstrateError::validation("max_force", value, ">= 0"));
        }
        self.max_force = value;
        Ok(())
    }

    pub fn force_average_sample_count(&self) -> usize {
        self.force_average_sample_count
    }

    pub fn set_force_average_sample_count(&mut self, count: usize) -> Result<(), SubstrateError> {
        if count == 0 {
            return Err(SubstrateError::validation(
                "force_average_sample_count",
                0.0,
                ">= 1",
            ));
        }
        self.force_average_sample_count = count;
        Ok(())
    }
}

/// Bounded FIFO of row-force samples.
///
/// The mean is reported only once the window is full; a partially
/// filled window reads 0 so a couple of early samples can't report a
/// misleading average.
#[derive(Debug, Clone, Default)]
pub struct ForceAverage {
    samples: VecDeque<f32>,
    window: usize,
    last: f32,
}

impl ForceAverage {
    pub fn new(window: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            last: 0.0,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.last = sample;
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Rolling average once the window is full, otherwise 0
    pub fn force(&self) -> f32 {
        if self.samples.len() < self.window {
            0.0
        } else {
            self.samples.iter().sum::<f32>() / self.window as f32
        }
    }

    /// Most recent raw sample regardless of averaging state
    pub fn impulse_force(&self) -> f32 {
        self.last
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.last = 0.0;
    }
}

/// The closed set of constraint row kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RowKind {
    /// One linear row along `direction` (child frame) between the two
    /// body-local pivot points
    Linear {
        parent_pivot: Vec3,
        child_pivot: Vec3,
        direction: Vec3,
    },
    /// One angular row: signed relative angle between a child-frame
    /// axis and a parent-frame reference axis about `normal`
    Angular {
        child_axis: Vec3,
        parent_axis: Vec3,
        normal: Vec3,
    },
    /// Three angular rows locking all rotational degrees of freedom
    /// via the front/up/right frame comparison
    FixedAngular,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BindState {
    Unbound,
    Bound {
        /// Relative angle captured at bind time; subsequent errors are
        /// measured against it (angular kind only)
        rest_angle: f32,
    },
}

/// Signed angle from `a` to `b` about `normal`. The sign convention
/// determines which way corrective torque is applied and must match
/// the solver's row handedness.
fn signed_angle(a: Vec3, b: Vec3, normal: Vec3) -> f32 {
    a.cross(b).dot(normal).atan2(a.dot(b))
}

fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::PI;
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// One constraint bound to a bilateral joint, applied every physics
/// sub-step for the lifetime of the joint
#[derive(Debug, Clone)]
pub struct JointConstraint {
    kind: RowKind,
    props: ConstraintProperties,
    state: BindState,
    feedback: ForceAverage,
    /// Row indices emitted during the current sub-step
    row_slots: SmallVec<[usize; 3]>,
}

impl JointConstraint {
    pub fn new(kind: RowKind, props: ConstraintProperties) -> Self {
        let feedback = ForceAverage::new(props.force_average_sample_count());
        Self {
            kind,
            props,
            state: BindState::Unbound,
            feedback,
            row_slots: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> &RowKind {
        &self.kind
    }

    pub fn properties(&self) -> &ConstraintProperties {
        &self.props
    }

    pub fn properties_mut(&mut self) -> &mut ConstraintProperties {
        &mut self.props
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, BindState::Bound { .. })
    }

    /// Bind to a concrete joint. Angular constraints capture the
    /// relative angle under the parent's current orientation so later
    /// errors are measured against the bind pose.
    pub fn initialise(&mut self, joint: &dyn BilateralJoint) {
        let rest_angle = match &self.kind {
            RowKind::Angular {
                child_axis,
                parent_axis,
                normal,
            } => {
                let parent = joint.parent_pose();
                let child = joint.child_pose();
                signed_angle(
                    parent.rotation * *parent_axis,
                    child.rotation * *child_axis,
                    parent.rotation * *normal,
                )
            }
            _ => 0.0,
        };
        self.state = BindState::Bound { rest_angle };
        self.feedback.reset();
        log::debug!("constraint bound: kind={:?}, rest_angle={:.4}", self.kind, rest_angle);
    }

    /// Release the joint binding (joint teardown)
    pub fn unbind(&mut self) {
        self.state = BindState::Unbound;
        self.row_slots.clear();
        self.feedback.reset();
    }

    /// Emit this constraint's rows for the current sub-step. Row slots
    /// from the previous sub-step are forgotten up front so a failed or
    /// skipped emission never leaves stale indices behind for the
    /// feedback read-back.
    pub fn apply(&mut self, joint: &mut dyn BilateralJoint) -> Result<(), SubstrateError> {
        self.row_slots.clear();

        let BindState::Bound { rest_angle } = self.state else {
            return Err(SubstrateError::UnboundConstraint);
        };

        let parent = joint.parent_pose();
        let child = joint.child_pose();

        match &self.kind {
            RowKind::Linear {
                parent_pivot,
                child_pivot,
                direction,
            } => {
                let pivot_parent = parent.transform_point(*parent_pivot);
                let pivot_child = child.transform_point(*child_pivot);
                let dir = (child.rotation * *direction).normalize_or_zero();
                let row = joint.add_linear_row(pivot_parent, pivot_child, dir);
                self.row_slots.push(row);
                self.apply_row_props(joint)?;
            }
            RowKind::Angular {
                child_axis,
                parent_axis,
                normal,
            } => {
                let axis = parent.rotation * *normal;
                let angle = signed_angle(
                    parent.rotation * *parent_axis,
                    child.rotation * *child_axis,
                    axis,
                );
                let error = wrap_angle(angle - rest_angle);
                let row = joint.add_angular_row(error, axis);
                self.row_slots.push(row);
                self.apply_row_props(joint)?;
            }
            RowKind::FixedAngular => {
                let pf = parent.frame();
                let cf = child.frame();
                // Three independent angular rows from the frame
                // comparison: (up about front), (front about up),
                // (front about right)
                let rows = [
                    (signed_angle(pf.up, cf.up, pf.front), pf.front),
                    (signed_angle(pf.front, cf.front, pf.up), pf.up),
                    (signed_angle(pf.front, cf.front, pf.right), pf.right),
                ];
                for (error, axis) in rows {
                    let row = joint.add_angular_row(error, axis);
                    self.row_slots.push(row);
                    self.apply_row_props(joint)?;
                }
            }
        }

        Ok(())
    }

    /// Apply friction/stiffness/spring properties to the just-added row
    fn apply_row_props(&self, joint: &mut dyn BilateralJoint) -> Result<(), SubstrateError> {
        joint.set_row_min_friction(self.props.min_friction());
        joint.set_row_max_friction(self.props.max_friction());
        if let Some(acceleration) = self.props.acceleration() {
            joint.set_row_acceleration(acceleration);
        }
        if self.props.stiffness() != DEFAULT_STIFFNESS {
            joint.set_row_stiffness(self.props.stiffness());
        }
        if let Some((spring, damper)) = self.props.spring()? {
            joint.set_row_spring_damper(spring, damper);
        }
        Ok(())
    }

    /// Read back this sub-step's row forces after the solver ran. A
    /// multi-row constraint contributes the mean of its rows as one
    /// sample.
    pub fn collect_feedback(&mut self, joint: &dyn BilateralJoint) {
        if self.row_slots.is_empty() {
            return;
        }
        let sum: f32 = self.row_slots.iter().map(|&row| joint.row_force(row)).sum();
        self.feedback.push(sum / self.row_slots.len() as f32);
    }

    /// Rolling force average (0 until the sample window fills)
    pub fn force(&self) -> f32 {
        self.feedback.force()
    }

    /// Instantaneous last-sample force
    pub fn impulse_force(&self) -> f32 {
        self.feedback.impulse_force()
    }
}

/// Ordered collection of constraints sharing one joint. Order matters:
/// the solver prioritizes earlier rows under over-constraint.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    constraints: Vec<JointConstraint>,
    powered: bool,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
            powered: true,
        }
    }

    /// Append a constraint; returns its index in application order
    pub fn push(&mut self, constraint: JointConstraint) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }

    pub fn constraints(&self) -> &[JointConstraint] {
        &self.constraints
    }

    pub fn constraints_mut(&mut self) -> &mut [JointConstraint] {
        &mut self.constraints
    }

    pub fn powered(&self) -> bool {
        self.powered
    }

    /// Energy gate: an unpowered actuator emits no rows
    pub fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }

    pub fn initialise_all(&mut self, joint: &dyn BilateralJoint) {
        for constraint in &mut self.constraints {
            constraint.initialise(joint);
        }
    }

    /// Emit all rows for this sub-step, in insertion order. An
    /// unpowered set emits nothing and also drops last sub-step's row
    /// slots so the next feedback pass cannot read rows this set no
    /// longer owns.
    pub fn apply_all(&mut self, joint: &mut dyn BilateralJoint) -> Result<(), SubstrateError> {
        if !self.powered {
            for constraint in &mut self.constraints {
                constraint.row_slots.clear();
            }
            return Ok(());
        }
        for constraint in &mut self.constraints {
            constraint.apply(joint)?;
        }
        Ok(())
    }

    /// Read back all row forces after the solver step
    pub fn collect_feedback_all(&mut self, joint: &dyn BilateralJoint) {
        for constraint in &mut self.constraints {
            constraint.collect_feedback(joint);
        }
    }

    pub fn unbind_all(&mut self) {
        for constraint in &mut self.constraints {
            constraint.unbind();
        }
    }
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Act for ConstraintSet {
    fn act(&mut self, joint: &mut dyn BilateralJoint) -> Result<(), SubstrateError> {
        self.apply_all(joint)
    }
}
