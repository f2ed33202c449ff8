//! Color model: speed-mapped gradients for one or two galaxies

use glam::Vec3;
use rand::Rng;

use crate::config::SimulationType;

/// Exponent applied to normalized speed before interpolating. Values above 1
/// pull mid-range speeds toward the low color.
pub const SPEED_ACCENT: f32 = 1.2;

/// Two-stop gradient between a slow and a fast color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    pub low: [f32; 3],
    pub high: [f32; 3],
}

impl Gradient {
    pub fn new(low: [f32; 3], high: [f32; 3]) -> Self {
        Self { low, high }
    }

    /// Channel-wise `1 - c` of both stops
    pub fn inverted(&self) -> Self {
        Self {
            low: self.low.map(|c| 1.0 - c),
            high: self.high.map(|c| 1.0 - c),
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            low: [rng.gen(), rng.gen(), rng.gen()],
            high: [rng.gen(), rng.gen(), rng.gen()],
        }
    }

    /// Interpolated RGBA at `t` (clamped to 0..=1), scaled by `brightness`.
    pub fn color_at(&self, t: f32, brightness: f32) -> [f32; 4] {
        let t = t.clamp(0.0, 1.0);
        let low = Vec3::from_array(self.low);
        let high = Vec3::from_array(self.high);
        let rgb = (low.lerp(high, t) * brightness).clamp(Vec3::ZERO, Vec3::ONE);
        [rgb.x, rgb.y, rgb.z, 1.0]
    }
}

/// Palette shared by the generator and recoloring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPalette {
    /// Universe, galaxy, and the first collision half
    pub primary: Gradient,
    /// Second collision half
    pub secondary: Gradient,
}

impl Default for ColorPalette {
    fn default() -> Self {
        let primary = Gradient::new([0.25, 0.45, 1.0], [1.0, 0.85, 0.6]);
        Self {
            primary,
            secondary: primary.inverted(),
        }
    }
}

impl ColorPalette {
    /// Pick new gradients for a regeneration. With `random` set both gradients
    /// are drawn independently; otherwise the secondary mirrors the primary.
    pub fn refresh(&mut self, random: bool, rng: &mut impl Rng) {
        if random {
            self.primary = Gradient::random(rng);
            self.secondary = Gradient::random(rng);
        } else {
            self.secondary = self.primary.inverted();
        }
    }

    /// Color every particle from its velocity. In collision mode the second
    /// half of the arrays uses the secondary gradient.
    pub fn apply(
        &self,
        sim_type: SimulationType,
        velocities: &[Vec3],
        sizes: &[f32],
        size_range: (f32, f32),
        colors: &mut [[f32; 4]],
    ) {
        let (min_size, max_size) = size_range;
        if sim_type == SimulationType::Collision {
            let half = colors.len() / 2;
            let (first, second) = colors.split_at_mut(half);
            colorize(
                &self.primary,
                &velocities[..half],
                &sizes[..half],
                min_size,
                max_size,
                first,
            );
            colorize(
                &self.secondary,
                &velocities[half..],
                &sizes[half..],
                min_size,
                max_size,
                second,
            );
        } else {
            colorize(&self.primary, velocities, sizes, min_size, max_size, colors);
        }
    }
}

/// Normalized speed with the accent curve applied
pub fn speed_parameter(speed: f32, max_speed: f32) -> f32 {
    if max_speed <= f32::EPSILON {
        return 0.0;
    }
    (speed / max_speed).clamp(0.0, 1.0).powf(SPEED_ACCENT)
}

/// Brightness multiplier from particle size, 0.7 for the smallest particle up to 1.0
pub fn size_brightness(size: f32, min_size: f32, max_size: f32) -> f32 {
    let range = max_size - min_size;
    if range <= f32::EPSILON {
        return 1.0;
    }
    0.7 + 0.3 * ((size - min_size) / range).clamp(0.0, 1.0)
}

/// Fill `colors` from `velocities` and `sizes`, normalizing speed by the fastest
/// particle in the slice.
pub fn colorize(
    gradient: &Gradient,
    velocities: &[Vec3],
    sizes: &[f32],
    min_size: f32,
    max_size: f32,
    colors: &mut [[f32; 4]],
) {
    let max_speed = velocities
        .iter()
        .map(|v| v.length())
        .fold(0.0f32, f32::max);

    for ((color, velocity), size) in colors.iter_mut().zip(velocities).zip(sizes) {
        let t = speed_parameter(velocity.length(), max_speed);
        *color = gradient.color_at(t, size_brightness(*size, min_size, max_size));
    }
}
