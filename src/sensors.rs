//! Per-tick sensor activation
//!
//! Three activation policies write neuron values each simulation tick:
//! proximity (nearby objects through a linear distance falloff), homing
//! (alignment with a single target direction), and the rotor sensor
//! that re-samples a moving reference part through either policy.

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::container::{NeuronContainer, Sense};
use crate::error::SubstrateError;
use crate::layout::mean_nearest_neighbor_distance;
use crate::traits::WorldSnapshot;
use crate::types::{BotToken, ObjectKind, Pose};

/// Zero-direction guard threshold, squared
const ZERO_DIRECTION_EPSILON_SQ: f32 = 1e-8;

/// Linear falloff configuration for proximity sensing.
///
/// The constants are tuned values carried over from the original
/// substrate; they are kept as named, overridable defaults rather than
/// derived from a formula.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FalloffConfig {
    /// Falloff value at distance zero (B). Below 1 so a single object
    /// never fully saturates a neuron.
    pub intercept: f32,
    /// Falloff value at the mean nearest-neighbor distance, which
    /// guarantees overlapping coverage between neighboring neurons
    pub value_at_neighbor: f32,
    /// Cap on a neuron's accumulated total
    pub saturation: f32,
}

impl Default for FalloffConfig {
    fn default() -> Self {
        Self {
            intercept: 0.9,
            value_at_neighbor: 0.5,
            saturation: 1.0,
        }
    }
}

/// Precomputed geometry for one proximity sensor: world-scaled neuron
/// positions and the linear falloff coefficients.
///
/// Rebuilt whole whenever the search radius or layout changes, and held
/// behind an `Arc` so the per-tick update only ever reads a complete
/// snapshot even while a replacement is being built.
#[derive(Debug, Clone)]
pub struct DistanceProps {
    pub search_radius: f32,
    pub max_neuron_radius: f32,
    /// Mean nearest-neighbor spacing of the world-scaled positions
    pub distance_between_neurons: f32,
    /// Falloff `value = slope * distance + intercept`, slope < 0
    pub slope: f32,
    pub intercept: f32,
    /// Neuron-local positions rescaled into world-proportional units
    /// (the outermost neuron sits on the search sphere)
    pub world_positions: Vec<Vec3>,
}

impl DistanceProps {
    /// Build a fresh snapshot for the given container layout
    pub fn build(container: &NeuronContainer, search_radius: f32, falloff: &FalloffConfig) -> Arc<Self> {
        let max_neuron_radius = container.max_neuron_radius();
        let scale = if max_neuron_radius > 0.0 {
            search_radius / max_neuron_radius
        } else {
            1.0
        };

        let world_positions: Vec<Vec3> = container
            .neurons()
            .iter()
            .map(|n| n.position() * scale)
            .collect();

        // Single-neuron layouts have no neighbor; fall back to the
        // search radius so the falloff still spans the sensed volume.
        let mut distance_between_neurons = mean_nearest_neighbor_distance(&world_positions);
        if distance_between_neurons <= 0.0 {
            distance_between_neurons = search_radius;
        }

        let slope = (falloff.value_at_neighbor - falloff.intercept) / distance_between_neurons;

        log::debug!(
            "DistanceProps rebuilt: search_radius={:.2}, neuron_spacing={:.3}, slope={:.4}",
            search_radius,
            distance_between_neurons,
            slope
        );

        Arc::new(Self {
            search_radius,
            max_neuron_radius,
            distance_between_neurons,
            slope,
            intercept: falloff.intercept,
            world_positions,
        })
    }
}

/// Accumulate falloff contributions from `object_positions` into every
/// neuron. Contributions are summed only while positive (objects past
/// the falloff zero-crossing add nothing) and each total is capped at
/// `saturation`.
pub(crate) fn proximity_activate(
    container: &mut NeuronContainer,
    props: &DistanceProps,
    object_positions: &[Vec3],
    saturation: f32,
) {
    let pose = container.pose();
    for (i, neuron) in container.neurons_mut().iter_mut().enumerate() {
        let neuron_world = pose.transform_point(props.world_positions[i]);
        let mut total = 0.0;
        for &obj in object_positions {
            let distance = neuron_world.distance(obj);
            let contribution = props.slope * distance + props.intercept;
            if contribution > 0.0 {
                total += contribution;
            }
        }
        neuron.set_value(total.min(saturation));
    }
}

/// Write homing activation: each neuron with a defined unit direction
/// gets `magnitude` scaled by how closely it aligns with the target
/// direction; nearly-opposite and origin neurons stay at zero.
pub(crate) fn homing_activate(
    container: &mut NeuronContainer,
    config: &HomingConfig,
    target_world: Vec3,
) {
    let pose = container.pose();
    let direction = pose.rotate_into_local(target_world - pose.position);

    if direction.length_squared() < ZERO_DIRECTION_EPSILON_SQ {
        container.zero_all();
        return;
    }

    let distance = direction.length();
    let magnitude = (distance / config.home_radius).clamp(0.0, 1.0);
    let unit_direction = direction / distance;
    let threshold = config.alignment_threshold;

    for neuron in container.neurons_mut() {
        let value = match neuron.unit_position() {
            Some(unit_position) => {
                // Rescaled dot product in [0, 2]; 2 is exact alignment
                let dot = unit_direction.dot(unit_position) + 1.0;
                if dot < threshold {
                    0.0
                } else {
                    magnitude * (dot - threshold) / (2.0 - threshold)
                }
            }
            None => 0.0,
        };
        neuron.set_value(value);
    }
}

/// Proximity sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    pub search_radius: f32,
    /// Restrict sensing to one object kind
    pub kind_filter: Option<ObjectKind>,
    pub falloff: FalloffConfig,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            search_radius: 10.0,
            kind_filter: None,
            falloff: FalloffConfig::default(),
        }
    }
}

/// Proximity/vision sensor: sees nearby world objects through the
/// linear falloff
pub struct ProximitySensor {
    container: NeuronContainer,
    config: ProximityConfig,
    owner: BotToken,
    props: Arc<DistanceProps>,
}

impl ProximitySensor {
    /// Minimum neuron count this sensor accepts (a single rim neuron
    /// still senses distance, just not direction)
    pub const MIN_NEURONS: usize = 1;

    /// Build the sensor; the search radius is validated here the same
    /// way `set_search_radius` validates it later
    pub fn new(
        container: NeuronContainer,
        config: ProximityConfig,
        owner: BotToken,
    ) -> Result<Self, SubstrateError> {
        if config.search_radius <= 0.0 {
            return Err(SubstrateError::validation(
                "search_radius",
                config.search_radius,
                "> 0",
            ));
        }
        let props = DistanceProps::build(&container, config.search_radius, &config.falloff);
        Ok(Self {
            container,
            config,
            owner,
            props,
        })
    }

    pub fn container(&self) -> &NeuronContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut NeuronContainer {
        &mut self.container
    }

    pub fn owner(&self) -> BotToken {
        self.owner
    }

    /// Current geometry snapshot
    pub fn props(&self) -> Arc<DistanceProps> {
        Arc::clone(&self.props)
    }

    /// Change the search radius; rebuilds the geometry cache as one
    /// atomic snapshot swap
    pub fn set_search_radius(&mut self, search_radius: f32) -> Result<(), SubstrateError> {
        if search_radius <= 0.0 {
            return Err(SubstrateError::validation(
                "search_radius",
                search_radius,
                "> 0",
            ));
        }
        self.config.search_radius = search_radius;
        self.props = DistanceProps::build(&self.container, search_radius, &self.config.falloff);
        Ok(())
    }

    /// Recompute every neuron value from the world snapshot
    pub fn update(&mut self, world: &dyn WorldSnapshot) {
        if !self.container.powered() {
            self.container.zero_all();
            return;
        }

        let Some(objects) = world.query(
            self.container.pose().position,
            self.config.search_radius,
            self.config.kind_filter,
        ) else {
            // Stale snapshot: nothing sensed this tick, never reuse
            // last tick's values
            self.container.zero_all();
            return;
        };

        let positions: Vec<Vec3> = objects
            .iter()
            .filter(|obj| obj.owner != self.owner)
            .map(|obj| obj.position)
            .collect();

        let props = Arc::clone(&self.props);
        proximity_activate(
            &mut self.container,
            &props,
            &positions,
            self.config.falloff.saturation,
        );
    }
}

impl Sense for ProximitySensor {
    fn sense(&mut self, world: &dyn WorldSnapshot) {
        self.update(world);
    }
}

/// Homing/directional sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomingConfig {
    /// Distance at which the sensed magnitude reaches 1
    pub home_radius: f32,
    /// Rescaled-dot cutoff in [0, 2] below which a neuron reads zero
    /// ("nearly opposite" the target direction)
    pub alignment_threshold: f32,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            home_radius: 10.0,
            alignment_threshold: 1.75,
        }
    }
}

/// Homing sensor: senses the direction to a single target point rather
/// than discrete objects
pub struct HomingSensor {
    container: NeuronContainer,
    config: HomingConfig,
    target: Option<Vec3>,
}

impl HomingSensor {
    pub fn new(container: NeuronContainer, config: HomingConfig) -> Self {
        Self {
            container,
            config,
            target: None,
        }
    }

    pub fn container(&self) -> &NeuronContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut NeuronContainer {
        &mut self.container
    }

    /// Set the world-space point to home toward (refreshed by the host
    /// whenever the target moves)
    pub fn set_target(&mut self, target: Option<Vec3>) {
        self.target = target;
    }

    pub fn update(&mut self) {
        if !self.container.powered() {
            self.container.zero_all();
            return;
        }
        match self.target {
            Some(target) => homing_activate(&mut self.container, &self.config, target),
            None => self.container.zero_all(),
        }
    }
}

impl Sense for HomingSensor {
    fn sense(&mut self, _world: &dyn WorldSnapshot) {
        self.update();
    }
}

/// Which activation policy a rotor sensor writes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotorMode {
    Proximity,
    Homing,
}

/// Rotating-reference sensor: tracks a spinning part relative to its
/// parent container. No new math, but the reference frame is
/// recomputed every tick since the tracked part moves independently.
pub struct RotorSensor {
    container: NeuronContainer,
    mode: RotorMode,
    falloff: FalloffConfig,
    homing: HomingConfig,
    props: Arc<DistanceProps>,
}

impl RotorSensor {
    pub fn new(
        container: NeuronContainer,
        mode: RotorMode,
        falloff: FalloffConfig,
        homing: HomingConfig,
    ) -> Self {
        let search_radius = container.max_neuron_radius().max(1.0);
        let props = DistanceProps::build(&container, search_radius, &falloff);
        Self {
            container,
            mode,
            falloff,
            homing,
            props,
        }
    }

    pub fn container(&self) -> &NeuronContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut NeuronContainer {
        &mut self.container
    }

    /// Sample the tracked part's current pose and write activations
    pub fn update(&mut self, tracked: &Pose) {
        if !self.container.powered() {
            self.container.zero_all();
            return;
        }
        match self.mode {
            RotorMode::Proximity => {
                let props = Arc::clone(&self.props);
                proximity_activate(
                    &mut self.container,
                    &props,
                    &[tracked.position],
                    self.falloff.saturation,
                );
            }
            RotorMode::Homing => {
                homing_activate(&mut self.container, &self.homing, tracked.position);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutShape;
    use crate::traits::StaticSnapshot;

    fn shell_sensor(count: usize, search_radius: f32) -> ProximitySensor {
        let container =
            NeuronContainer::from_layout(None, count, 1.0, LayoutShape::Shell, true).unwrap();
        let config = ProximityConfig {
            search_radius,
            ..Default::default()
        };
        ProximitySensor::new(container, config, BotToken::new()).unwrap()
    }

    /// Snapshot that never has data (stale world)
    struct StaleSnapshot;

    impl WorldSnapshot for StaleSnapshot {
        fn query(
            &self,
            _center: Vec3,
            _radius: f32,
            _filter: Option<ObjectKind>,
        ) -> Option<Vec<crate::traits::NearbyObject>> {
            None
        }
    }

    #[test]
    fn test_values_bounded_with_many_objects() {
        let mut sensor = shell_sensor(8, 10.0);
        let other = BotToken::new();
        let mut snapshot = StaticSnapshot::new();
        for i in 0..50 {
            let angle = i as f32 * 0.13;
            snapshot.push(
                Vec3::new(angle.cos() * 3.0, angle.sin() * 3.0, 0.0),
                ObjectKind::Food,
                other,
            );
        }

        sensor.update(&snapshot);
        for value in sensor.container().values() {
            assert!((0.0..=1.0).contains(&value), "value out of range: {value}");
        }
    }

    #[test]
    fn test_contribution_monotonic_in_distance() {
        let props = shell_sensor(8, 10.0).props();
        // Closer objects never contribute less
        let near = (props.slope * 1.0 + props.intercept).max(0.0);
        let mid = (props.slope * 3.0 + props.intercept).max(0.0);
        let far = (props.slope * 50.0 + props.intercept).max(0.0);
        assert!(near >= mid && mid >= far);
        assert_eq!(far, 0.0);
    }

    #[test]
    fn test_neighbor_distance_object_reads_configured_constant() {
        let mut sensor = shell_sensor(8, 10.0);
        let props = sensor.props();
        let neuron_world = props.world_positions[0];

        // Place one object exactly one neighbor-spacing away from
        // neuron 0, radially inward so it stays inside the query radius
        let inward = -neuron_world.normalize();
        let object = neuron_world + inward * props.distance_between_neurons;

        let other = BotToken::new();
        let mut snapshot = StaticSnapshot::new();
        snapshot.push(object, ObjectKind::Food, other);

        sensor.update(&snapshot);
        let value = sensor.container().values()[0];
        let expected = sensor.config.falloff.value_at_neighbor;
        assert!(
            (value - expected).abs() < 1e-4,
            "expected {expected}, got {value}"
        );
    }

    #[test]
    fn test_own_token_excluded() {
        let mut sensor = shell_sensor(6, 10.0);
        let me = sensor.owner();
        let mut snapshot = StaticSnapshot::new();
        snapshot.push(Vec3::new(1.0, 0.0, 0.0), ObjectKind::Bot, me);

        sensor.update(&snapshot);
        assert!(sensor.container().values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_unpowered_sensor_zeroes_values() {
        let mut sensor = shell_sensor(6, 10.0);
        let other = BotToken::new();
        let mut snapshot = StaticSnapshot::new();
        snapshot.push(Vec3::new(1.0, 0.0, 0.0), ObjectKind::Food, other);

        sensor.update(&snapshot);
        assert!(sensor.container().values().iter().any(|&v| v > 0.0));

        sensor.container_mut().set_powered(false);
        sensor.update(&snapshot);
        assert!(sensor.container().values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_stale_snapshot_zeroes_values() {
        let mut sensor = shell_sensor(6, 10.0);
        let other = BotToken::new();
        let mut snapshot = StaticSnapshot::new();
        snapshot.push(Vec3::new(1.0, 0.0, 0.0), ObjectKind::Food, other);
        sensor.update(&snapshot);
        assert!(sensor.container().values().iter().any(|&v| v > 0.0));

        sensor.update(&StaleSnapshot);
        assert!(sensor.container().values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_constructor_rejects_degenerate_search_radius() {
        let container =
            NeuronContainer::from_layout(None, 6, 1.0, LayoutShape::Shell, true).unwrap();
        let config = ProximityConfig {
            search_radius: 0.0,
            ..Default::default()
        };
        let result = ProximitySensor::new(container, config, BotToken::new());
        assert!(matches!(
            result,
            Err(SubstrateError::Validation { field: "search_radius", .. })
        ));
    }

    #[test]
    fn test_search_radius_change_rebuilds_cache() {
        let mut sensor = shell_sensor(8, 10.0);
        let before = sensor.props();
        sensor.set_search_radius(20.0).unwrap();
        let after = sensor.props();
        assert!(after.search_radius > before.search_radius);
        assert!(after.distance_between_neurons > before.distance_between_neurons);

        assert!(sensor.set_search_radius(0.0).is_err());
    }

    #[test]
    fn test_homing_target_at_own_position_gives_all_zero() {
        let container =
            NeuronContainer::from_layout(None, 8, 1.0, LayoutShape::Sphere, true).unwrap();
        let mut sensor = HomingSensor::new(container, HomingConfig::default());
        let position = sensor.container().pose().position;
        sensor.set_target(Some(position));
        sensor.update();
        assert!(sensor.container().values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_homing_aligned_neuron_reads_highest() {
        let container =
            NeuronContainer::from_layout(None, 8, 1.0, LayoutShape::Shell, true).unwrap();
        let mut sensor = HomingSensor::new(container, HomingConfig::default());
        // Target along +X at exactly home_radius: magnitude 1, and the
        // first shell neuron sits at (1, 0, 0)
        sensor.set_target(Some(Vec3::new(10.0, 0.0, 0.0)));
        sensor.update();

        let values = sensor.container().values();
        assert!((values[0] - 1.0).abs() < 1e-5);
        // All other neurons are at least 45 degrees off; dot + 1 stays
        // below the 1.75 cutoff
        assert!(values[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_homing_origin_neuron_stays_zero() {
        let dna = crate::genome::NeuronDna::new(vec![Vec3::ZERO, Vec3::X]);
        let container = NeuronContainer::from_layout(
            Some(&dna),
            2,
            1.0,
            LayoutShape::Shell,
            true,
        )
        .unwrap();
        let mut sensor = HomingSensor::new(container, HomingConfig::default());
        sensor.set_target(Some(Vec3::new(5.0, 0.0, 0.0)));
        sensor.update();

        let values = sensor.container().values();
        assert_eq!(values[0], 0.0);
        assert!(values[1] > 0.0);
    }

    #[test]
    fn test_rotor_homing_tracks_moving_part() {
        let container =
            NeuronContainer::from_layout(None, 8, 1.0, LayoutShape::Shell, true).unwrap();
        let mut sensor = RotorSensor::new(
            container,
            RotorMode::Homing,
            FalloffConfig::default(),
            HomingConfig::default(),
        );

        let mut tracked = Pose::identity();
        tracked.position = Vec3::new(5.0, 0.0, 0.0);
        sensor.update(&tracked);
        let toward_x = sensor.container().values()[0];
        assert!(toward_x > 0.0);

        // Part swings to +Y: activation follows it around the ring
        tracked.position = Vec3::new(0.0, 5.0, 0.0);
        sensor.update(&tracked);
        assert_eq!(sensor.container().values()[0], 0.0);
        let quarter = sensor.container().neurons().len() / 4;
        assert!(sensor.container().values()[quarter] > 0.0);
    }
}
