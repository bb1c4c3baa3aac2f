//! Rust implementation of inverse and forward kinematics for a planar arm with four
//! rotary joints (shoulder, elbow, wrist and the end link).
//!
//! The arm has more joints than needed to reach a point in the plane, so inverse kinematics
//! has infinitely many solutions. This library picks the one closest to the preferred
//! (resting) configuration: it minimizes the weighted distance from the resting pose in joint
//! space, subject to the end effector being exactly at the target. The wrist is weighted more
//! than other joints, so the arm prefers bending other joints first.
//!
//! # Features
//!
//! - Forward kinematics, also providing positions of all segment ends.
//! - Inverse kinematics with a sequential quadratic programming solver. Tolerance and the
//!   iteration cap are configurable.
//! - The search starts from the current pose of the arm. It can be updated after every solve
//!   (`solve`), or the starting pose can be passed explicitly (`inverse_continuing`).
//! - Unreachable targets are not errors: the best effort configuration is returned, and
//!   `inverse_with_report` tells if the solver has converged.
//! - Joint limits can be checked, but they are advisory and not enforced by the solver.
//! - Optional YAML configuration (feature `allow_filesystem`).
//!
//! # Example
//!
//! ```
//! use planar_arm_ik::kinematic_traits::{Kinematics, Position};
//! use planar_arm_ik::kinematics_impl::ArmKinematics;
//!
//! let arm = ArmKinematics::default();
//! let target = Position::new(1.0, 2.0);
//! let joints = arm.inverse(&target);
//! assert!(arm.residual(&joints, &target) < 1e-4);
//! ```

pub mod parameters;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;

#[path = "utils/utils.rs"]
pub mod utils;
pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod constraints;

pub mod forward;

pub mod jacobian;

pub mod ik_problem;

pub mod sqp;

pub mod parameter_error;

#[cfg(test)]
mod tests;

use kinematic_traits::{Joints, Kinematics, Position};
use kinematics_impl::ArmKinematics;

/// Joint angles reaching (`x`, `y`) with the default arm: unit segment lengths,
/// 45/45/0/0 degrees both as the initial and the resting pose.
pub fn solve(x: f64, y: f64) -> Joints {
    ArmKinematics::default().inverse(&Position::new(x, y))
}
