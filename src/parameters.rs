//! Defines the arm parameter data structure

pub mod arm_kinematics {
    use std::f64::consts::FRAC_PI_4;

    use crate::kinematic_traits::Joints;
    use crate::parameter_error::{ParameterError, four_of};
    use crate::utils::deg;

    /// Penalty of each joint being away from the resting position. The wrist is weighted more,
    /// so the solver prefers bending other joints first.
    pub const DEFAULT_JOINT_WEIGHTS: [f64; 4] = [1.0, 1.0, 1.3, 1.0];

    /// Default resting pose and initial angles: shoulder and elbow at 45 degrees.
    pub const DEFAULT_REST_POSE: Joints = [FRAC_PI_4, FRAC_PI_4, 0.0, 0.0];

    /// Parameters of the planar arm. All arrays are in order [shoulder, elbow, wrist, end].
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Parameters {
        /// Lengths of the four arm segments, all positive.
        pub segment_lengths: [f64; 4],

        /// The preferred (resting) joint configuration the solver stays close to.
        pub rest_pose: Joints,

        /// Joint angles the arm has initially. The first solve starts from here.
        pub initial_angles: Joints,

        /// Scales the contribution of each joint to the distance from the resting pose.
        pub joint_weights: [f64; 4],
    }

    impl Default for Parameters {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Parameters {
        /// Fresh default configuration: unit segment lengths, 45/45/0/0 degrees both
        /// as initial and resting pose.
        pub fn new() -> Self {
            Parameters {
                segment_lengths: [1.0; 4],
                rest_pose: DEFAULT_REST_POSE,
                initial_angles: DEFAULT_REST_POSE,
                joint_weights: DEFAULT_JOINT_WEIGHTS,
            }
        }

        /// Build parameters from slices that must each have exactly four values.
        /// Joint weights are set to defaults.
        pub fn from_slices(initial_angles: &[f64], rest_pose: &[f64], segment_lengths: &[f64])
                           -> Result<Self, ParameterError> {
            let parameters = Parameters {
                segment_lengths: four_of(segment_lengths)?,
                rest_pose: four_of(rest_pose)?,
                initial_angles: four_of(initial_angles)?,
                joint_weights: DEFAULT_JOINT_WEIGHTS,
            };
            parameters.validate()?;
            Ok(parameters)
        }

        /// Segment lengths must be positive, joint weights must be positive,
        /// and all values must be finite.
        pub fn validate(&self) -> Result<(), ParameterError> {
            for (i, &length) in self.segment_lengths.iter().enumerate() {
                if !(length.is_finite() && length > 0.0) {
                    return Err(ParameterError::InvalidConfiguration(format!(
                        "segment_lengths[{}] must be positive and finite (got {})", i, length
                    )));
                }
            }
            for (i, &weight) in self.joint_weights.iter().enumerate() {
                if !(weight.is_finite() && weight > 0.0) {
                    return Err(ParameterError::InvalidConfiguration(format!(
                        "joint_weights[{}] must be positive and finite (got {})", i, weight
                    )));
                }
            }
            for (name, angles) in [("rest_pose", &self.rest_pose), ("initial_angles", &self.initial_angles)] {
                if let Some(i) = angles.iter().position(|a| !a.is_finite()) {
                    return Err(ParameterError::InvalidConfiguration(format!(
                        "{}[{}] must be finite (got {})", name, i, angles[i]
                    )));
                }
            }
            Ok(())
        }

        /// The largest distance the end effector can be from the base.
        pub fn reach(&self) -> f64 {
            self.segment_lengths.iter().sum()
        }

        /// Convert to string yaml representation (quick viewing, etc).
        pub fn to_yaml(&self) -> String {
            fn angles(values: &[f64; 4]) -> String {
                values.iter().map(deg).collect::<Vec<_>>().join(", ")
            }
            fn plain(values: &[f64; 4]) -> String {
                values.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(", ")
            }
            format!(
                "planar_arm:\n  \
              segment_lengths: [{}]\n  \
              rest_pose: [{}]\n  \
              initial_angles: [{}]\n  \
              joint_weights: [{}]\n",
                plain(&self.segment_lengths),
                angles(&self.rest_pose),
                angles(&self.initial_angles),
                plain(&self.joint_weights),
            )
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_defaults_are_fresh() {
            let mut first = Parameters::new();
            first.rest_pose[0] = 1.0;
            first.segment_lengths[3] = 2.0;
            let second = Parameters::new();
            assert_eq!(second.rest_pose, DEFAULT_REST_POSE);
            assert_eq!(second.segment_lengths, [1.0; 4]);
        }

        #[test]
        fn test_from_slices_wrong_length() {
            let result = Parameters::from_slices(&[0.0; 4], &[0.0; 3], &[1.0; 4]);
            assert!(matches!(result, Err(ParameterError::InvalidLength { expected: 4, found: 3 })));
        }

        #[test]
        fn test_from_slices_rejects_non_positive_length() {
            let result = Parameters::from_slices(&[0.0; 4], &[0.0; 4], &[1.0, 0.0, 1.0, 1.0]);
            assert!(matches!(result, Err(ParameterError::InvalidConfiguration(_))));
        }

        #[test]
        fn test_reach() {
            let parameters = Parameters {
                segment_lengths: [0.5, 1.0, 1.5, 2.0],
                ..Parameters::new()
            };
            assert_eq!(parameters.reach(), 5.0);
        }
    }
}
