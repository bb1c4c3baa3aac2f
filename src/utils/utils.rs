//! Helper functions

use crate::kinematic_traits::{Joints, Position};

/// Checks the solution for validity.
pub(crate) mod planar_kinematics {
    use crate::kinematic_traits::Joints;

    /// Checks if all elements in the array are finite
    pub fn is_valid(qs: &Joints) -> bool {
        qs.iter().all(|&q| q.is_finite())
    }
}

/// Print joint values, converting radians to degrees.
pub fn dump_joints(joints: &Joints) {
    println!("[{}]", format_joints(joints));
}

/// Joint values in degrees, as printed by `dump_joints`.
pub fn format_joints(joints: &Joints) -> String {
    joints
        .iter()
        .map(|q| format!("{:7.2}", q.to_degrees()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn dump_position(position: &Position) {
    println!("x: {:.5}, y: {:.5}", position.x, position.y);
}

/// formatting for YAML output
pub(crate) fn deg(x: &f64) -> String {
    if *x == 0.0 {
        return "0".to_string();
    }
    format!("deg({:.4})", x.to_degrees())
}

/// Weighted Euclidean distance between two joint configurations.
pub fn weighted_distance(from: &Joints, to: &Joints, weights: &[f64; 4]) -> f64 {
    from.iter()
        .zip(to.iter())
        .zip(weights.iter())
        .map(|((a, b), w)| w * (a - b) * (a - b))
        .sum::<f64>()
        .sqrt()
}

pub fn assert_position_eq(pa: &Position, pb: &Position, distance_tolerance: f64) -> bool {
    let distance = (*pa - *pb).norm();
    if distance > distance_tolerance {
        dump_position(pa);
        dump_position(pb);
        panic!("Positions are {} apart, more than {} allowed", distance, distance_tolerance);
    }
    true
}
