//! Galaxy orientations for collision runs
//!
//! Each collision reset asks an [`OrientationSequencer`] for the next pair of
//! disk rotations. The sequencer alternates between a fully random pair and the
//! next predefined pair in round-robin order. The sequencer lives on the
//! orchestrator, so the alternation carries across resets. [`CollisionCourse`]
//! places the two galaxies and their closing velocities.

use glam::{Mat3, Vec3};
use rand::Rng;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6, PI};

use crate::rotation::{axis_rotation, random_rotation, Axis};

/// Predefined (or random) orientation of the two galaxies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalaxyOrientation {
    /// Both disks in the collision plane, spinning the same way
    Prograde,
    /// Both disks in the collision plane, spinning opposite ways
    Retrograde,
    /// Second disk stood on edge relative to the first
    Perpendicular,
    /// Both disks tilted in opposite senses about the collision axis
    Tilted,
    Random,
}

impl GalaxyOrientation {
    /// The predefined orientations, in round-robin order
    pub const PREDEFINED: [GalaxyOrientation; 4] = [
        GalaxyOrientation::Prograde,
        GalaxyOrientation::Retrograde,
        GalaxyOrientation::Perpendicular,
        GalaxyOrientation::Tilted,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GalaxyOrientation::Prograde => "prograde",
            GalaxyOrientation::Retrograde => "retrograde",
            GalaxyOrientation::Perpendicular => "perpendicular",
            GalaxyOrientation::Tilted => "tilted",
            GalaxyOrientation::Random => "random",
        }
    }

    /// Orientation at `index` in [`GalaxyOrientation::PREDEFINED`]; out-of-range
    /// indices give an untilted prograde pair.
    pub fn predefined(index: usize) -> OrientationPair {
        match Self::PREDEFINED.get(index) {
            Some(orientation) => orientation.pair(),
            None => GalaxyOrientation::Prograde.pair(),
        }
    }

    /// Rotation pair for a predefined orientation. `Random` has no fixed pair
    /// and yields identities; use [`OrientationPair::random`] instead.
    pub fn pair(&self) -> OrientationPair {
        let (first, second, same_direction) = match self {
            GalaxyOrientation::Prograde => (Mat3::IDENTITY, Mat3::IDENTITY, true),
            GalaxyOrientation::Retrograde => (Mat3::IDENTITY, Mat3::IDENTITY, false),
            GalaxyOrientation::Perpendicular => (
                Mat3::IDENTITY,
                axis_rotation(Axis::X, FRAC_PI_2),
                true,
            ),
            GalaxyOrientation::Tilted => (
                axis_rotation(Axis::X, FRAC_PI_6),
                axis_rotation(Axis::X, -FRAC_PI_4) * axis_rotation(Axis::Y, PI / 3.0),
                false,
            ),
            GalaxyOrientation::Random => (Mat3::IDENTITY, Mat3::IDENTITY, true),
        };
        OrientationPair {
            orientation: *self,
            first,
            second,
            same_direction,
        }
    }
}

/// Disk rotations for the two colliding galaxies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationPair {
    pub orientation: GalaxyOrientation,
    pub first: Mat3,
    pub second: Mat3,
    /// Whether the second galaxy spins the same way as the first in its own frame
    pub same_direction: bool,
}

impl OrientationPair {
    /// Two independent random rotations; spins are aligned when the disk
    /// normals point into the same hemisphere.
    pub fn random(rng: &mut impl Rng) -> Self {
        let first = random_rotation(rng);
        let second = random_rotation(rng);
        let same_direction = (first * Vec3::Y).dot(second * Vec3::Y) >= 0.0;
        Self {
            orientation: GalaxyOrientation::Random,
            first,
            second,
            same_direction,
        }
    }

    /// Both galaxies unrotated and co-rotating
    pub fn identity() -> Self {
        GalaxyOrientation::Prograde.pair()
    }
}

impl Default for OrientationPair {
    fn default() -> Self {
        Self::identity()
    }
}

/// Galaxy centers sit this many radii either side of the origin
pub const COLLISION_OFFSET: f32 = 1.5;

/// Transverse velocity nudge as a fraction of the closing speed
pub const TRANSVERSE_NUDGE: f32 = 0.1;

/// Where the two galaxies start and how fast they close, along the +X axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionCourse {
    pub centers: [Vec3; 2],
    pub velocities: [Vec3; 2],
}

impl CollisionCourse {
    pub fn new(radius: f32, initial_speed: f32, collision_velocity: f32) -> Self {
        let speed = closing_speed(radius, initial_speed, collision_velocity);
        let offset = Vec3::X * (COLLISION_OFFSET * radius);
        let velocity = Vec3::new(speed, 0.0, speed * TRANSVERSE_NUDGE);
        Self {
            centers: [-offset, offset],
            velocities: [velocity, -velocity],
        }
    }
}

/// `initialSpeed × 0.5 × collisionVelocity × sqrt(radius / 100)`
pub fn closing_speed(radius: f32, initial_speed: f32, collision_velocity: f32) -> f32 {
    initial_speed * 0.5 * collision_velocity * (radius.max(0.0) / 100.0).sqrt()
}

/// Alternates random and predefined orientations across collision resets
#[derive(Debug, Clone, Default)]
pub struct OrientationSequencer {
    draws: usize,
    next_predefined: usize,
}

impl OrientationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next orientation pair. Even calls draw at random, odd calls take the next
    /// predefined orientation.
    pub fn next_pair(&mut self, rng: &mut impl Rng) -> OrientationPair {
        let pair = if self.draws % 2 == 0 {
            OrientationPair::random(rng)
        } else {
            let pair = GalaxyOrientation::predefined(self.next_predefined);
            self.next_predefined = (self.next_predefined + 1) % GalaxyOrientation::PREDEFINED.len();
            pair
        };
        self.draws += 1;
        pair
    }

    /// Number of pairs handed out so far
    pub fn draws(&self) -> usize {
        self.draws
    }

    /// Restart the alternation from a random draw and the first predefined entry.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sequence_alternates_and_cycles() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sequencer = OrientationSequencer::new();
        let k = 10;
        let pairs: Vec<_> = (0..2 * k).map(|_| sequencer.next_pair(&mut rng)).collect();

        let random = pairs
            .iter()
            .filter(|p| p.orientation == GalaxyOrientation::Random)
            .count();
        assert_eq!(random, k);

        let predefined: Vec<_> = pairs
            .iter()
            .map(|p| p.orientation)
            .filter(|o| *o != GalaxyOrientation::Random)
            .collect();
        assert_eq!(predefined.len(), k);
        for (i, orientation) in predefined.iter().enumerate() {
            assert_eq!(*orientation, GalaxyOrientation::PREDEFINED[i % 4]);
        }

        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.orientation == GalaxyOrientation::Random, i % 2 == 0);
        }
        assert_eq!(sequencer.draws(), 2 * k);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut sequencer = OrientationSequencer::new();
        for _ in 0..5 {
            sequencer.next_pair(&mut rng);
        }
        sequencer.reset();
        assert_eq!(sequencer.next_pair(&mut rng).orientation, GalaxyOrientation::Random);
        assert_eq!(sequencer.next_pair(&mut rng).orientation, GalaxyOrientation::Prograde);
    }

    #[test]
    fn test_out_of_range_index_falls_back() {
        let pair = GalaxyOrientation::predefined(99);
        assert_eq!(pair.first, Mat3::IDENTITY);
        assert_eq!(pair.second, Mat3::IDENTITY);
    }

    #[test]
    fn test_collision_course_is_symmetric() {
        let course = CollisionCourse::new(400.0, 2.0, 1.0);
        assert_eq!(course.centers[0], Vec3::new(-600.0, 0.0, 0.0));
        assert_eq!(course.centers[1], Vec3::new(600.0, 0.0, 0.0));
        // 2 × 0.5 × 1 × sqrt(4)
        assert!((course.velocities[0].x - 2.0).abs() < 1e-6);
        assert_eq!(course.velocities[0], -course.velocities[1]);
        assert!(course.velocities[0].z > 0.0);
    }

    #[test]
    fn test_retrograde_spins_opposed() {
        assert!(!GalaxyOrientation::Retrograde.pair().same_direction);
        assert!(GalaxyOrientation::Prograde.pair().same_direction);
    }
}
