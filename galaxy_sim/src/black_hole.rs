//! Supermassive black hole dynamics
//!
//! Up to two holes. Outside collision mode they are parked at the origin and
//! never move. In collision mode each sits at the center of its galaxy and the
//! pair attract each other with softened Newtonian gravity plus a stylized
//! frame-dragging term. Frame dragging is a tangential push, not a GR solution.

use glam::Vec3;
use rand::Rng;

use crate::config::{BlackHoleConfig, SimulationConfig, SimulationType};
use crate::orientation::{CollisionCourse, OrientationPair, OrientationSequencer};
use crate::params::{BlackHoleParams, SimulationParameters};

/// Scale of the frame-dragging acceleration
pub const FRAME_DRAGGING_STRENGTH: f32 = 5000.0;

/// Fixed axis frame dragging rotates around
pub const SPIN_AXIS: Vec3 = Vec3::Y;

/// Below this squared separation the holes do not interact for a step
const MIN_SEPARATION_SQ: f32 = 1e-6;

/// Tangential acceleration a spinning hole exerts on a body at `offset` from it.
///
/// `spin × 5000 / softened_dist_sq` along `normalize(SPIN_AXIS × offset)`. Zero
/// for zero spin or a body on the spin axis.
pub fn spin_acceleration(spin: f32, offset: Vec3, softened_dist_sq: f32) -> Vec3 {
    if spin == 0.0 {
        return Vec3::ZERO;
    }
    let tangent = SPIN_AXIS.cross(offset);
    let len = tangent.length();
    if len <= 1e-6 {
        return Vec3::ZERO;
    }
    tangent / len * (spin * FRAME_DRAGGING_STRENGTH / softened_dist_sq)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackHole {
    pub position: Vec3,
    pub velocity: Vec3,
    pub mass: f32,
    /// Signed, the sign picks the rotation direction
    pub spin: f32,
    pub accretion_radius: f32,
    pub enabled: bool,
}

impl BlackHole {
    /// A hole at rest at the origin
    pub fn parked(config: &BlackHoleConfig) -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            mass: config.mass,
            spin: config.spin,
            accretion_radius: config.accretion_radius,
            enabled: config.enabled,
        }
    }

    pub fn momentum(&self) -> Vec3 {
        self.velocity * self.mass
    }

    pub fn to_params(&self) -> BlackHoleParams {
        BlackHoleParams {
            position: self.position.to_array(),
            mass: self.mass,
            spin: self.spin,
            accretion_radius: self.accretion_radius,
            enabled: u32::from(self.enabled),
            _padding: 0.0,
        }
    }
}

/// Owns both black holes and advances them once per frame
#[derive(Debug, Clone)]
pub struct BlackHoleDynamics {
    holes: [BlackHole; 2],
    sim_type: SimulationType,
    gravity_multiplier: f32,
    smoothing_length: f32,
    /// -1 when the second galaxy counter-rotates
    second_spin_sign: f32,
    orientation: Option<OrientationPair>,
}

impl BlackHoleDynamics {
    pub fn new(config: &SimulationConfig) -> Self {
        let mut dynamics = Self {
            holes: [
                BlackHole::parked(&config.black_holes[0]),
                BlackHole::parked(&config.black_holes[1]),
            ],
            sim_type: config.sim_type,
            gravity_multiplier: config.black_hole_gravity,
            smoothing_length: config.smoothing_length,
            second_spin_sign: 1.0,
            orientation: None,
        };
        dynamics.apply_settings(config);
        dynamics
    }

    /// Place both holes for a fresh run.
    ///
    /// In collision mode this draws the next orientation from `sequencer`, puts
    /// the holes at the galaxy centers and gives them closing velocities. The
    /// drawn orientation is returned so the particle generator can use the same
    /// one. Other modes park both holes at the origin.
    pub fn initialize(
        &mut self,
        config: &SimulationConfig,
        sequencer: &mut OrientationSequencer,
        rng: &mut impl Rng,
    ) -> Option<OrientationPair> {
        self.sim_type = config.sim_type;
        self.holes = [
            BlackHole::parked(&config.black_holes[0]),
            BlackHole::parked(&config.black_holes[1]),
        ];

        if config.sim_type == SimulationType::Collision {
            let pair = sequencer.next_pair(rng);
            let course =
                CollisionCourse::new(config.radius, config.initial_speed, config.collision_velocity);
            for (hole, (center, velocity)) in self
                .holes
                .iter_mut()
                .zip(course.centers.iter().zip(course.velocities.iter()))
            {
                hole.position = *center;
                hole.velocity = *velocity;
            }
            self.second_spin_sign = if pair.same_direction { 1.0 } else { -1.0 };
            self.orientation = Some(pair);
            log::info!(
                "Black holes placed for {} collision, separation {:.1}, closing speed {:.3}",
                pair.orientation.name(),
                self.holes[0].position.distance(self.holes[1].position),
                course.velocities[0].x
            );
        } else {
            self.second_spin_sign = 1.0;
            self.orientation = None;
        }

        self.apply_settings(config);
        self.orientation
    }

    /// Refresh mass, spin, accretion radius, enabled flags, gravity multiplier
    /// and softening from `config` without moving anything.
    pub fn apply_settings(&mut self, config: &SimulationConfig) {
        for (hole, settings) in self.holes.iter_mut().zip(config.black_holes.iter()) {
            hole.mass = settings.mass;
            hole.spin = settings.spin;
            hole.accretion_radius = settings.accretion_radius;
            hole.enabled = settings.enabled;
        }
        self.holes[1].spin *= self.second_spin_sign;
        // The second hole only exists in collision runs
        if self.sim_type != SimulationType::Collision {
            self.holes[1].enabled = false;
        }
        self.gravity_multiplier = config.black_hole_gravity;
        self.smoothing_length = config.smoothing_length;
    }

    /// One explicit Euler step of the pair under mutual gravity and spin coupling.
    ///
    /// Does nothing unless both holes are enabled. Interaction is skipped for a
    /// step when the holes are closer than a small epsilon.
    pub fn advance(&mut self, dt: f32, g: f32) {
        let [first, second] = &mut self.holes;
        if !(first.enabled && second.enabled) {
            return;
        }

        let offset = second.position - first.position;
        let dist_sq = offset.length_squared();
        let mut accel_first = Vec3::ZERO;
        let mut accel_second = Vec3::ZERO;

        if dist_sq >= MIN_SEPARATION_SQ {
            let softened = dist_sq + self.smoothing_length * self.smoothing_length;
            let direction = offset / dist_sq.sqrt();
            let force = g * self.gravity_multiplier * first.mass * second.mass / softened;

            if first.mass > 0.0 {
                accel_first += direction * (force / first.mass);
            }
            if second.mass > 0.0 {
                accel_second -= direction * (force / second.mass);
            }

            accel_second += spin_acceleration(first.spin, offset, softened);
            accel_first += spin_acceleration(second.spin, -offset, softened);
        }

        for (hole, accel) in [(first, accel_first), (second, accel_second)] {
            hole.velocity += accel * dt;
            hole.position += hole.velocity * dt;
        }
    }

    /// Write both holes into the shared parameter block.
    pub fn publish(&self, params: &mut SimulationParameters) {
        for (slot, hole) in params.black_holes.iter_mut().zip(self.holes.iter()) {
            *slot = hole.to_params();
        }
    }

    pub fn holes(&self) -> &[BlackHole; 2] {
        &self.holes
    }

    pub fn first(&self) -> &BlackHole {
        &self.holes[0]
    }

    pub fn second(&self) -> &BlackHole {
        &self.holes[1]
    }

    /// Orientation drawn at the last collision reset
    pub fn orientation(&self) -> Option<&OrientationPair> {
        self.orientation.as_ref()
    }

    /// Distance between the holes when both are active
    pub fn separation(&self) -> Option<f32> {
        let [first, second] = &self.holes;
        (first.enabled && second.enabled).then(|| first.position.distance(second.position))
    }

    pub fn total_momentum(&self) -> Vec3 {
        self.holes.iter().map(BlackHole::momentum).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::GalaxyOrientation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn collision_dynamics(spin: f32) -> BlackHoleDynamics {
        let mut config = SimulationConfig::new(SimulationType::Collision).with_radius(1000.0);
        config.black_holes[0] = BlackHoleConfig::new(30_000.0, spin);
        config.black_holes[1] = BlackHoleConfig::new(80_000.0, spin);
        let mut rng = StdRng::seed_from_u64(11);
        let mut sequencer = OrientationSequencer::new();
        let mut dynamics = BlackHoleDynamics::new(&config);
        dynamics.initialize(&config, &mut sequencer, &mut rng);
        dynamics
    }

    #[test]
    fn test_momentum_conserved_without_spin() {
        let mut dynamics = collision_dynamics(0.0);
        let before = dynamics.total_momentum();
        let scale = dynamics
            .holes()
            .iter()
            .map(|h| h.momentum().length())
            .fold(1.0f32, f32::max);

        for _ in 0..200 {
            dynamics.advance(0.1, 1.0);
            let after = dynamics.total_momentum();
            assert!(
                (after - before).length() <= scale * 1e-4,
                "momentum drifted from {:?} to {:?}",
                before,
                after
            );
        }
    }

    #[test]
    fn test_holes_attract() {
        let mut dynamics = collision_dynamics(0.0);
        let start = dynamics.separation().unwrap();
        // Cancel the closing velocities so only gravity acts
        for hole in dynamics.holes.iter_mut() {
            hole.velocity = Vec3::ZERO;
        }
        dynamics.advance(1.0, 1.0);
        assert!(dynamics.separation().unwrap() < start);
    }

    #[test]
    fn test_collision_placement() {
        let dynamics = collision_dynamics(1.0);
        let [first, second] = dynamics.holes();
        assert!((first.position.x + 1500.0).abs() < 1e-3);
        assert!((second.position.x - 1500.0).abs() < 1e-3);
        assert!(first.velocity.x > 0.0);
        assert!(second.velocity.x < 0.0);
        assert!(dynamics.orientation().is_some());
    }

    #[test]
    fn test_galaxy_mode_is_static() {
        let config = SimulationConfig::new(SimulationType::Galaxy);
        let mut rng = StdRng::seed_from_u64(5);
        let mut sequencer = OrientationSequencer::new();
        let mut dynamics = BlackHoleDynamics::new(&config);
        assert!(dynamics.initialize(&config, &mut sequencer, &mut rng).is_none());
        assert_eq!(sequencer.draws(), 0);

        dynamics.advance(1.0, 1.0);
        assert_eq!(dynamics.first().position, Vec3::ZERO);
        assert_eq!(dynamics.first().velocity, Vec3::ZERO);
        assert!(dynamics.first().enabled);
        assert!(!dynamics.second().enabled);
    }

    #[test]
    fn test_disabled_hole_freezes_pair() {
        let mut dynamics = collision_dynamics(1.0);
        dynamics.holes[1].enabled = false;
        let before = *dynamics.holes();
        dynamics.advance(1.0, 1.0);
        assert_eq!(*dynamics.holes(), before);
    }

    #[test]
    fn test_coincident_holes_skip_interaction() {
        let mut dynamics = collision_dynamics(1.0);
        for hole in dynamics.holes.iter_mut() {
            hole.position = Vec3::new(3.0, 0.0, 0.0);
            hole.velocity = Vec3::ZERO;
        }
        dynamics.advance(1.0, 1.0);
        for hole in dynamics.holes() {
            assert_eq!(hole.velocity, Vec3::ZERO);
            assert!(hole.position.is_finite());
        }
    }

    #[test]
    fn test_spin_acceleration_is_tangential() {
        let offset = Vec3::new(10.0, 0.0, 0.0);
        let accel = spin_acceleration(2.0, offset, 100.0);
        assert!(accel.dot(offset).abs() < 1e-4);
        assert!((accel.length() - 2.0 * FRAME_DRAGGING_STRENGTH / 100.0).abs() < 1e-3);
        assert_eq!(spin_acceleration(0.0, offset, 100.0), Vec3::ZERO);
        assert_eq!(spin_acceleration(1.0, Vec3::Y * 5.0, 25.0), Vec3::ZERO);
    }

    #[test]
    fn test_retrograde_pair_flips_second_spin() {
        let mut config = SimulationConfig::new(SimulationType::Collision).with_radius(1000.0);
        config.black_holes[0] = BlackHoleConfig::new(50_000.0, 1.25);
        config.black_holes[1] = BlackHoleConfig::new(50_000.0, 1.25);
        let mut rng = StdRng::seed_from_u64(13);

        // Random, prograde, random; the next draw is retrograde
        let mut sequencer = OrientationSequencer::new();
        for _ in 0..3 {
            sequencer.next_pair(&mut rng);
        }

        let mut dynamics = BlackHoleDynamics::new(&config);
        let pair = dynamics
            .initialize(&config, &mut sequencer, &mut rng)
            .unwrap();
        assert_eq!(pair.orientation, GalaxyOrientation::Retrograde);
        assert!(!pair.same_direction);
        assert_eq!(dynamics.first().spin, 1.25);
        assert_eq!(dynamics.second().spin, -1.25);

        // Runtime settings keep the counter-rotation
        config.black_holes[1].spin = 2.0;
        dynamics.apply_settings(&config);
        assert_eq!(dynamics.first().spin, 1.25);
        assert_eq!(dynamics.second().spin, -2.0);

        let mut params = SimulationParameters::default();
        dynamics.publish(&mut params);
        assert_eq!(params.black_holes[1].spin, -2.0);
    }

    #[test]
    fn test_prograde_pair_keeps_second_spin() {
        let config = SimulationConfig::new(SimulationType::Collision);
        let mut rng = StdRng::seed_from_u64(14);
        let mut sequencer = OrientationSequencer::new();
        sequencer.next_pair(&mut rng);

        let mut dynamics = BlackHoleDynamics::new(&config);
        let pair = dynamics
            .initialize(&config, &mut sequencer, &mut rng)
            .unwrap();
        assert_eq!(pair.orientation, GalaxyOrientation::Prograde);
        assert_eq!(dynamics.second().spin, config.black_holes[1].spin);
    }

    #[test]
    fn test_publish_fills_parameter_block() {
        let dynamics = collision_dynamics(1.5);
        let mut params = SimulationParameters::default();
        dynamics.publish(&mut params);
        assert_eq!(params.black_holes[0].position, dynamics.first().position.to_array());
        assert_eq!(params.black_holes[1].mass, 80_000.0);
        assert!(params.black_holes[0].is_enabled());
        assert!(params.black_holes[1].is_enabled());
        assert_eq!(params.black_holes[0].spin, 1.5);
    }
}
