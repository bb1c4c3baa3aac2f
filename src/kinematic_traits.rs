extern crate nalgebra as na;

use na::Point2;

/// Position of the arm end effector in the reach plane. Units are the same as of segment lengths.
/// ```
/// use planar_arm_ik::kinematic_traits::Position;
///
/// let target = Position::new(1.0, 2.5);
/// assert!((target.coords.norm() - 7.25_f64.sqrt()).abs() < 1e-12);
/// ```
pub type Position = Point2<f64>;

/// Four joint angles in radians, ordered [shoulder, elbow, wrist, end]. Every angle is measured
/// relative to the orientation of the previous segment.
pub type Joints = [f64; 4];

/// Number of joints (and segments) of the arm.
pub const JOINT_COUNT: usize = 4;

/// All joints at zero: the arm is stretched along the x axis.
pub const JOINTS_AT_ZERO: Joints = [0.0; 4];

/// Index of the wrist joint
pub const J_WRIST: usize = 2;

pub trait Kinematics {
    /// Find joint angles that place the end effector at the target while staying close
    /// to the resting pose. The search starts from the current pose of the arm.
    ///
    /// There is no success flag: if the target is unreachable, the best effort configuration
    /// is returned. Use `forward` on the result to check the residual.
    fn inverse(&self, target: &Position) -> Joints;

    /// Same as `inverse`, but the search starts from the explicitly given joint configuration
    /// rather than from the current pose.
    fn inverse_continuing(&self, target: &Position, start: &Joints) -> Joints;

    /// Position of the end effector for the given joint angles.
    fn forward(&self, qs: &Joints) -> Position;

    /// Positions of the base and of the end of every segment, the last one being the
    /// end effector.
    fn forward_with_joint_positions(&self, qs: &Joints) -> [Position; 5];
}
