//! Integration tests for the sense -> act tick loop
//!
//! These tests wire the layout generator, sensors, motion controller,
//! and constraint pipeline together against concrete snapshot and
//! joint fixtures, the way a simulation host would drive them.

use glam::{Quat, Vec3};
use somabot::{
    BilateralJoint, BotToken, ConstraintProperties, ConstraintSet, EnergyMeter, HomingConfig,
    HomingSensor, JointConstraint, LayoutShape, MotionController, NeuronContainer, NeuronDna,
    ObjectKind, Pose, ProximityConfig, ProximitySensor, RowKind, StaticSnapshot,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Joint double that records rows and plays back configurable forces
#[derive(Debug)]
struct RecordingJoint {
    parent: Pose,
    child: Pose,
    rows: Vec<RowRecord>,
    forces: Vec<f32>,
}

#[derive(Debug)]
enum RowRecord {
    Linear { direction: Vec3 },
    Angular { error: f32, axis: Vec3 },
}

impl RecordingJoint {
    fn new() -> Self {
        Self {
            parent: Pose::identity(),
            child: Pose::identity(),
            rows: Vec::new(),
            forces: Vec::new(),
        }
    }

    /// Start a new solver sub-step: row indices restart at zero
    fn begin_substep(&mut self) {
        self.rows.clear();
    }
}

impl BilateralJoint for RecordingJoint {
    fn parent_pose(&self) -> Pose {
        self.parent
    }

    fn child_pose(&self) -> Pose {
        self.child
    }

    fn add_linear_row(&mut self, _pivot_parent: Vec3, _pivot_child: Vec3, direction: Vec3) -> usize {
        self.rows.push(RowRecord::Linear { direction });
        self.rows.len() - 1
    }

    fn add_angular_row(&mut self, relative_angle: f32, axis: Vec3) -> usize {
        self.rows.push(RowRecord::Angular {
            error: relative_angle,
            axis,
        });
        self.rows.len() - 1
    }

    fn set_row_min_friction(&mut self, _force: f32) {}
    fn set_row_max_friction(&mut self, _force: f32) {}
    fn set_row_acceleration(&mut self, _acceleration: f32) {}
    fn set_row_stiffness(&mut self, _stiffness: f32) {}
    fn set_row_spring_damper(&mut self, _spring: f32, _damper: f32) {}

    fn row_force(&self, row: usize) -> f32 {
        self.forces.get(row).copied().unwrap_or(0.0)
    }
}

fn shell_container(count: usize) -> NeuronContainer {
    NeuronContainer::from_layout(None, count, 1.0, LayoutShape::Shell, true).unwrap()
}

// ============================================================================
// Sense -> command -> act loop
// ============================================================================

#[test]
fn test_proximity_sense_feeds_motion_command() {
    let mut sensor = ProximitySensor::new(
        shell_container(8),
        ProximityConfig {
            search_radius: 10.0,
            ..Default::default()
        },
        BotToken::new(),
    )
    .unwrap();

    // Food cluster to the +X side of the bot
    let other = BotToken::new();
    let mut snapshot = StaticSnapshot::new();
    snapshot.push(Vec3::new(4.0, 0.0, 0.0), ObjectKind::Food, other);
    snapshot.push(Vec3::new(5.0, 1.0, 0.0), ObjectKind::Food, other);
    sensor.update(&snapshot);

    // Route sensed values into an actuator ring of the same layout and
    // derive the motion command; the target must point toward +X
    let mut actuator = NeuronContainer::from_layout(
        Some(&sensor.container().dna()),
        8,
        1.0,
        LayoutShape::Shell,
        false,
    )
    .unwrap();
    let values = sensor.container().values();
    assert_eq!(actuator.write_commands(&values), 8);

    let rotation = somabot::Neuron::new(Vec3::ZERO, false);
    let orbit = somabot::Neuron::new(Vec3::ZERO, true);
    let mut controller = MotionController::new();
    controller.update(actuator.neurons(), &rotation, &orbit);

    let target = controller.command().target;
    assert!(target.x > 0.0, "expected +X pull, got {target:?}");
    assert!(target.x.abs() > target.y.abs());
}

#[test]
fn test_energy_exhaustion_silences_the_loop() {
    let mut sensor = ProximitySensor::new(
        shell_container(6),
        ProximityConfig::default(),
        BotToken::new(),
    )
    .unwrap();
    let mut meter = EnergyMeter::new(1.0, 0.4).unwrap();

    let other = BotToken::new();
    let mut snapshot = StaticSnapshot::new();
    snapshot.push(Vec3::new(2.0, 0.0, 0.0), ObjectKind::Food, other);

    let mut activity = Vec::new();
    for _ in 0..4 {
        let powered = meter.tick();
        sensor.container_mut().set_powered(powered);
        sensor.update(&snapshot);
        activity.push(sensor.container().values().iter().any(|&v| v > 0.0));
    }

    // Two powered ticks, then the meter runs dry and values go silent
    assert_eq!(activity, vec![true, true, false, false]);
}

#[test]
fn test_homing_sensor_follows_moving_target() {
    let mut sensor = HomingSensor::new(shell_container(8), HomingConfig::default());

    let mut pose = Pose::identity();
    pose.position = Vec3::new(100.0, 50.0, 0.0);
    sensor.container_mut().set_pose(pose);

    // Target to the east of the bot
    sensor.set_target(Some(Vec3::new(110.0, 50.0, 0.0)));
    sensor.update();
    assert!(sensor.container().values()[0] > 0.9);

    // Bot turns 90 degrees; the same world target now lands on the
    // neuron a quarter-ring away in the container's local frame
    pose.rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    sensor.container_mut().set_pose(pose);
    sensor.update();
    assert_eq!(sensor.container().values()[0], 0.0);
    assert!(sensor.container().values()[6] > 0.9);
}

// ============================================================================
// Constraint rows over a joint lifetime
// ============================================================================

#[test]
fn test_hinge_like_constraint_over_substeps() {
    // A linear attachment row plus an angular row, the way a motor
    // joint pins a child part to its parent
    let mut set = ConstraintSet::new();
    set.push(JointConstraint::new(
        RowKind::Linear {
            parent_pivot: Vec3::new(0.0, 0.5, 0.0),
            child_pivot: Vec3::new(0.0, -0.5, 0.0),
            direction: Vec3::Y,
        },
        ConstraintProperties::default(),
    ));
    let mut props = ConstraintProperties::default();
    props.set_force_average_sample_count(3).unwrap();
    set.push(JointConstraint::new(
        RowKind::Angular {
            child_axis: Vec3::X,
            parent_axis: Vec3::X,
            normal: Vec3::Z,
        },
        props,
    ));

    let mut joint = RecordingJoint::new();
    joint.child.position = Vec3::new(0.0, 1.0, 0.0);
    set.initialise_all(&joint);

    for step in 0..3 {
        joint.begin_substep();
        set.apply_all(&mut joint).unwrap();
        assert_eq!(joint.rows.len(), 2, "one linear + one angular row");

        // Solver resolves some force on each row
        joint.forces = vec![1.0, 2.0];
        set.collect_feedback_all(&joint);

        let angular = &set.constraints()[1];
        assert_eq!(angular.impulse_force(), 2.0);
        if step < 2 {
            assert_eq!(angular.force(), 0.0);
        } else {
            assert!((angular.force() - 2.0).abs() < 1e-6);
        }
    }

    // Child drifts: the angular error tracks the rotation away from
    // the bind pose
    joint.child.rotation = Quat::from_rotation_z(0.25);
    joint.begin_substep();
    set.apply_all(&mut joint).unwrap();
    match joint.rows[1] {
        RowRecord::Angular { error, axis } => {
            assert!((error - 0.25).abs() < 1e-5);
            assert!((axis - Vec3::Z).length() < 1e-6);
        }
        _ => panic!("expected angular row"),
    }

    // Teardown: rows must stop and feedback resets
    set.unbind_all();
    joint.begin_substep();
    assert!(set.apply_all(&mut joint).is_err());
    assert_eq!(set.constraints()[1].impulse_force(), 0.0);
}

#[test]
fn test_fixed_angular_locks_three_axes_in_order() {
    let mut set = ConstraintSet::new();
    set.push(JointConstraint::new(
        RowKind::FixedAngular,
        ConstraintProperties::default(),
    ));

    let mut joint = RecordingJoint::new();
    set.initialise_all(&joint);
    set.apply_all(&mut joint).unwrap();

    assert_eq!(joint.rows.len(), 3);
    for row in &joint.rows {
        match row {
            RowRecord::Angular { error, .. } => assert!(error.abs() < 1e-6),
            _ => panic!("fixed-angular emits only angular rows"),
        }
    }
}

// ============================================================================
// Genome persistence
// ============================================================================

#[test]
fn test_dna_survives_serialization_and_respawn() {
    let container = NeuronContainer::from_layout(None, 16, 2.0, LayoutShape::Sphere, true).unwrap();
    let dna = container.dna();

    let bytes = bincode_next::serde::encode_to_vec(&dna, bincode_next::config::standard())
        .expect("Failed to serialize DNA");
    let (decoded, _): (NeuronDna, usize) =
        bincode_next::serde::decode_from_slice(&bytes, bincode_next::config::standard())
            .expect("Failed to deserialize DNA");
    assert_eq!(decoded, dna);

    // Respawn with two extra neurons after a mutation: the original
    // sixteen keep their exact positions
    let respawned =
        NeuronContainer::from_layout(Some(&decoded), 18, 2.0, LayoutShape::Sphere, true).unwrap();
    for (old, new) in container.neurons().iter().zip(respawned.neurons()) {
        assert_eq!(old.position(), new.position());
    }
}
