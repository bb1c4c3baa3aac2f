//! Forward kinematics of the planar open chain.

use crate::kinematic_traits::{Joints, Position};

/// Absolute orientation of every segment. Joint angles are relative to the previous segment,
/// so the absolute angle of a segment is the running sum of the joint angles up to it.
pub(crate) fn cumulative_angles(joints: &Joints) -> [f64; 4] {
    let mut theta = 0.0;
    joints.map(|q| {
        theta += q;
        theta
    })
}

/// Position of the end effector for the given joint angles and segment lengths.
pub fn forward(joints: &Joints, lengths: &[f64; 4]) -> Position {
    let thetas = cumulative_angles(joints);
    let (mut x, mut y) = (0.0, 0.0);
    for (length, theta) in lengths.iter().zip(thetas.iter()) {
        let (sin, cos) = theta.sin_cos();
        x += length * cos;
        y += length * sin;
    }
    Position::new(x, y)
}

/// Position of the base followed by the position at the end of every segment.
/// The last value is the end effector and is the same as returned by `forward`.
pub fn forward_with_joint_positions(joints: &Joints, lengths: &[f64; 4]) -> [Position; 5] {
    let thetas = cumulative_angles(joints);
    let mut positions = [Position::origin(); 5];
    for i in 0..4 {
        let (sin, cos) = thetas[i].sin_cos();
        positions[i + 1] = Position::new(
            positions[i].x + lengths[i] * cos,
            positions[i].y + lengths[i] * sin,
        );
    }
    positions
}
