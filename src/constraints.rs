//! Joint limits of the arm.
//!
//! Limits are advisory: the solver does not enforce them. Use `compliant` or
//! `violations` to check a solution afterwards.

use std::f64::consts::PI;

use crate::kinematic_traits::Joints;
use crate::parameter_error::{ParameterError, four_of};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    /// Lower limit of every joint, radians
    pub from: [f64; 4],

    /// Upper limit of every joint, radians. Never less than the lower limit.
    pub to: [f64; 4],
}

impl Default for Constraints {
    /// Shoulder and elbow only bend one way, wrist and end link both ways.
    fn default() -> Self {
        Constraints {
            from: [0.0, 0.0, -PI, -PI],
            to: [PI, PI, PI, PI],
        }
    }
}

impl Constraints {
    pub fn new(from: [f64; 4], to: [f64; 4]) -> Result<Self, ParameterError> {
        for i in 0..4 {
            if !(from[i].is_finite() && to[i].is_finite()) {
                return Err(ParameterError::InvalidConfiguration(format!(
                    "limits of joint {} must be finite (got {} .. {})", i, from[i], to[i]
                )));
            }
            if from[i] > to[i] {
                return Err(ParameterError::InvalidConfiguration(format!(
                    "lower limit of joint {} is above the upper limit ({} > {})", i, from[i], to[i]
                )));
            }
        }
        Ok(Constraints { from, to })
    }

    /// Build limits from (min, max) pairs, one per joint. There must be exactly four.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ParameterError> {
        let pairs = four_of(pairs)?;
        Self::new(pairs.map(|(min, _)| min), pairs.map(|(_, max)| max))
    }

    pub fn compliant(&self, angles: &Joints) -> bool {
        self.violations(angles).is_empty()
    }

    /// Indices of joints outside their limits, in joint order.
    pub fn violations(&self, angles: &Joints) -> Vec<usize> {
        (0..4)
            .filter(|&i| !(angles[i] >= self.from[i] && angles[i] <= self.to[i]))
            .collect()
    }

    /// Joint configurations that are within the limits, in the original order.
    pub fn filter(&self, angles: &[Joints]) -> Vec<Joints> {
        angles.iter()
            .filter(|angle_array| self.compliant(angle_array))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_default_accepts_resting_pose() {
        let limits = Constraints::default();
        assert!(limits.compliant(&[FRAC_PI_4, FRAC_PI_4, 0.0, 0.0]));
    }

    #[test]
    fn test_violations_reported_in_order() {
        let limits = Constraints::default();
        let angles = [-0.1, 0.5, 4.0, -4.0];
        assert_eq!(limits.violations(&angles), vec![0, 2, 3]);
        assert!(!limits.compliant(&angles));
    }

    #[test]
    fn test_nan_is_not_compliant() {
        let limits = Constraints::default();
        assert!(!limits.compliant(&[f64::NAN, 0.5, 0.0, 0.0]));
    }

    #[test]
    fn test_limits_are_inclusive() {
        let limits = Constraints::default();
        assert!(limits.compliant(&[0.0, PI, -PI, PI]));
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let result = Constraints::new([0.0, 1.0, 0.0, 0.0], [1.0, 0.5, 1.0, 1.0]);
        assert!(matches!(result, Err(ParameterError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_from_pairs_wrong_length() {
        let result = Constraints::from_pairs(&[(0.0, 1.0); 3]);
        assert!(matches!(result, Err(ParameterError::InvalidLength { expected: 4, found: 3 })));
    }

    #[test]
    fn test_filter_angles() {
        let limits = Constraints::new([0.0; 4], [PI / 2.0; 4]).unwrap();
        let angles = vec![
            [PI / 3.0, PI / 4.0, PI / 6.0, PI / 3.0], // Should be retained
            [PI, 2.0 * PI, PI, PI], // Should be removed
        ];
        let filtered_angles = limits.filter(&angles);
        assert_eq!(filtered_angles, vec![[PI / 3.0, PI / 4.0, PI / 6.0, PI / 3.0]]);
    }
}
