//! Objective and constraints of the inverse kinematics, as seen by the optimizer.

extern crate nalgebra as na;

use na::{SMatrix, SVector};

use crate::forward::forward;
use crate::jacobian::Jacobian;
use crate::kinematic_traits::{Joints, Position};
use crate::parameters::arm_kinematics::Parameters;
use crate::sqp::ConstrainedProblem;
use crate::utils::weighted_distance;

/// Everything the optimizer needs to evaluate one inverse kinematics request:
/// geometry and resting pose of the arm, and the target to reach.
#[derive(Debug, Clone, Copy)]
pub struct RestPoseProblem {
    pub segment_lengths: [f64; 4],
    pub rest_pose: Joints,
    pub joint_weights: [f64; 4],
    pub target: Position,
}

impl RestPoseProblem {
    pub fn new(parameters: &Parameters, target: &Position) -> Self {
        RestPoseProblem {
            segment_lengths: parameters.segment_lengths,
            rest_pose: parameters.rest_pose,
            joint_weights: parameters.joint_weights,
            target: *target,
        }
    }

    /// Weighted Euclidean distance through joint space to the resting pose.
    pub fn distance_to_rest(&self, qs: &Joints) -> f64 {
        weighted_distance(qs, &self.rest_pose, &self.joint_weights)
    }

    /// Difference between the reached and the desired position, (x, y).
    pub fn position_error(&self, qs: &Joints) -> [f64; 2] {
        let reached = forward(qs, &self.segment_lengths);
        [reached.x - self.target.x, reached.y - self.target.y]
    }
}

fn joints_of(x: &SVector<f64, 4>) -> Joints {
    [x[0], x[1], x[2], x[3]]
}

/// The optimizer minimizes half the squared `distance_to_rest`. It has the same minimizer
/// and, unlike the distance, is smooth at the resting pose.
impl ConstrainedProblem<4, 2> for RestPoseProblem {
    fn objective(&self, x: &SVector<f64, 4>) -> f64 {
        0.5 * self.distance_to_rest(&joints_of(x)).powi(2)
    }

    fn constraints(&self, x: &SVector<f64, 4>) -> SVector<f64, 2> {
        let [ex, ey] = self.position_error(&joints_of(x));
        SVector::<f64, 2>::new(ex, ey)
    }

    fn objective_gradient(&self, x: &SVector<f64, 4>) -> SVector<f64, 4> {
        SVector::<f64, 4>::from_fn(|i, _| self.joint_weights[i] * (x[i] - self.rest_pose[i]))
    }

    fn constraint_jacobian(&self, x: &SVector<f64, 4>) -> SMatrix<f64, 2, 4> {
        *Jacobian::new(&self.segment_lengths, &joints_of(x)).matrix()
    }
}
