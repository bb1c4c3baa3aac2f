use std::f64::consts::{FRAC_PI_2, PI};

use approx::assert_abs_diff_eq;

use crate::kinematic_traits::{JOINTS_AT_ZERO, Kinematics, Position};
use crate::kinematics_impl::ArmKinematics;
use crate::parameters::arm_kinematics::Parameters;

const SMALL: f64 = 1e-9;

fn arm(segment_lengths: [f64; 4]) -> ArmKinematics {
    ArmKinematics::new(Parameters {
        segment_lengths,
        ..Parameters::new()
    }).expect("Valid parameters")
}

fn assert_positions(actual: &[Position; 5], expected: &[(f64, f64); 5]) {
    for (i, (a, (x, y))) in actual.iter().zip(expected.iter()).enumerate() {
        assert!((a.x - x).abs() < SMALL && (a.y - y).abs() < SMALL,
                "Position {} is ({}, {}), expected ({}, {})", i, a.x, a.y, x, y);
    }
}

#[test]
fn test_link_positions_stretched() {
    let robot = arm([0.5, 1.0, 1.5, 2.0]);
    let positions = robot.forward_with_joint_positions(&JOINTS_AT_ZERO);
    assert_positions(&positions, &[(0.0, 0.0), (0.5, 0.0), (1.5, 0.0), (3.0, 0.0), (5.0, 0.0)]);
}

#[test]
fn test_link_positions_square() {
    // Every joint turns left by 90 degrees, the unit arm draws a square
    let robot = arm([1.0; 4]);
    let positions = robot.forward_with_joint_positions(&[0.0, FRAC_PI_2, FRAC_PI_2, FRAC_PI_2]);
    assert_positions(&positions, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
}

#[test]
fn test_link_positions_folded() {
    let robot = arm([2.0, 1.0, 1.0, 1.0]);
    let positions = robot.forward_with_joint_positions(&[FRAC_PI_2, PI, 0.0, PI]);
    assert_positions(&positions, &[(0.0, 0.0), (0.0, 2.0), (0.0, 1.0), (0.0, 0.0), (0.0, 1.0)]);
}

#[test]
fn test_last_link_position_is_forward() {
    let robot = arm([1.0, 0.8, 0.6, 0.4]);
    let qs = [0.7, -0.3, 1.1, 0.2];
    let positions = robot.forward_with_joint_positions(&qs);
    let tip = robot.forward(&qs);
    assert_abs_diff_eq!(positions[4].x, tip.x, epsilon = SMALL);
    assert_abs_diff_eq!(positions[4].y, tip.y, epsilon = SMALL);
}
