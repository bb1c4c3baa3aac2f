extern crate nalgebra as na;

use na::Matrix2x4;

use crate::forward::cumulative_angles;
use crate::kinematic_traits::Joints;

/// Struct representing the position Jacobian of the planar arm
pub struct Jacobian {
    /// A 2x4 matrix mapping joint velocities to the end effector velocity.
    /// Each column corresponds to a joint, rows are x and y.
    matrix: Matrix2x4<f64>,
}

impl Jacobian {
    /// Computes the Jacobian for the given segment lengths and joint configuration.
    ///
    /// Joint `j` rotates all segments from `j` onwards, so its column is the sum
    /// of the derivatives of these segments.
    pub fn new(lengths: &[f64; 4], qs: &Joints) -> Self {
        let thetas = cumulative_angles(qs);
        let mut matrix = Matrix2x4::zeros();
        // Accumulate from the end link towards the shoulder.
        let (mut dx, mut dy) = (0.0, 0.0);
        for j in (0..4).rev() {
            let (sin, cos) = thetas[j].sin_cos();
            dx -= lengths[j] * sin;
            dy += lengths[j] * cos;
            matrix[(0, j)] = dx;
            matrix[(1, j)] = dy;
        }
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix2x4<f64> {
        &self.matrix
    }
}
