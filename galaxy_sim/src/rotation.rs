//! Rotation matrices used to orient galaxy disks

use glam::Mat3;
use rand::Rng;
use std::f32::consts::TAU;

/// Coordinate axis for a canonical rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" | "X" => Some(Axis::X),
            "y" | "Y" => Some(Axis::Y),
            "z" | "Z" => Some(Axis::Z),
            _ => None,
        }
    }
}

/// Canonical rotation about a coordinate axis.
pub fn axis_rotation(axis: Axis, angle: f32) -> Mat3 {
    match axis {
        Axis::X => Mat3::from_rotation_x(angle),
        Axis::Y => Mat3::from_rotation_y(angle),
        Axis::Z => Mat3::from_rotation_z(angle),
    }
}

/// Rotation about a named axis. Unknown names give the identity.
pub fn named_axis_rotation(name: &str, angle: f32) -> Mat3 {
    match Axis::from_name(name) {
        Some(axis) => axis_rotation(axis, angle),
        None => Mat3::IDENTITY,
    }
}

/// `Rx · Ry · Rz` with each angle uniform in [0, 2π).
pub fn random_rotation(rng: &mut impl Rng) -> Mat3 {
    let ax = rng.gen_range(0.0..TAU);
    let ay = rng.gen_range(0.0..TAU);
    let az = rng.gen_range(0.0..TAU);
    axis_rotation(Axis::X, ax) * axis_rotation(Axis::Y, ay) * axis_rotation(Axis::Z, az)
}
