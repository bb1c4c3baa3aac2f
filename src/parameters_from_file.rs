//! Supports reading the arm configuration from YAML file (optional)

use std::path::Path;

use regex::Regex;
use yaml_rust2::{Yaml, YamlLoader};

use crate::constraints::Constraints;
use crate::kinematics_impl::ArmKinematics;
use crate::parameter_error::{ParameterError, four_of};
use crate::parameters::arm_kinematics::Parameters;
use crate::sqp::SolverConfig;

/// Everything that can be configured from the file: the arm, its joint limits
/// and the optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmConfiguration {
    pub parameters: Parameters,
    pub constraints: Constraints,
    pub solver: SolverConfig,
}

impl ArmConfiguration {
    /// Read the arm configuration from YAML file. YAML file like this is supported:
    /// ```yaml
    /// planar_arm:
    ///   segment_lengths: [1.0, 1.0, 1.0, 1.0]
    ///   rest_pose: [deg(45), deg(45), 0, 0]
    ///   initial_angles: [deg(45), deg(45), 0, 0]
    ///   joint_weights: [1, 1, 1.3, 1]
    /// joint_limits:
    ///   from: [0, 0, deg(-180), deg(-180)]
    ///   to: [deg(180), deg(180), deg(180), deg(180)]
    /// solver:
    ///   tolerance: 1.0e-6
    ///   max_iterations: 100
    /// ```
    /// Only `segment_lengths` and `rest_pose` are required. Initial angles default to the
    /// resting pose, other values default to the library defaults.
    ///
    /// Angles are in radians unless written as deg(angle).
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let docs = YamlLoader::load_from_str(contents)
            .map_err(|e| ParameterError::ParseError(format!("{}", e)))?;
        let doc = docs.first()
            .ok_or_else(|| ParameterError::ParseError("empty YAML document".to_string()))?;
        let reader = ValueReader::new()?;

        let arm = &doc["planar_arm"];
        if arm.is_badvalue() {
            return Err(ParameterError::MissingField("planar_arm".to_string()));
        }

        let defaults = Parameters::new();
        let segment_lengths = reader.four(&arm["segment_lengths"], "segment_lengths", false)?
            .ok_or_else(|| ParameterError::MissingField("segment_lengths".to_string()))?;
        let rest_pose = reader.four(&arm["rest_pose"], "rest_pose", true)?
            .ok_or_else(|| ParameterError::MissingField("rest_pose".to_string()))?;
        let initial_angles = reader.four(&arm["initial_angles"], "initial_angles", true)?
            .unwrap_or(rest_pose);
        let joint_weights = reader.four(&arm["joint_weights"], "joint_weights", false)?
            .unwrap_or(defaults.joint_weights);

        let parameters = Parameters {
            segment_lengths,
            rest_pose,
            initial_angles,
            joint_weights,
        };
        parameters.validate()?;

        let limits = &doc["joint_limits"];
        let constraints = if limits.is_badvalue() {
            Constraints::default()
        } else {
            let from = reader.four(&limits["from"], "joint_limits.from", true)?
                .ok_or_else(|| ParameterError::MissingField("joint_limits.from".to_string()))?;
            let to = reader.four(&limits["to"], "joint_limits.to", true)?
                .ok_or_else(|| ParameterError::MissingField("joint_limits.to".to_string()))?;
            Constraints::new(from, to)?
        };

        let mut solver = SolverConfig::default();
        let solver_node = &doc["solver"];
        if !solver_node.is_badvalue() {
            if let Some(tolerance) = reader.optional_number(&solver_node["tolerance"], "solver.tolerance", false)? {
                solver.tolerance = tolerance;
            }
            let iterations = &solver_node["max_iterations"];
            if !iterations.is_badvalue() {
                solver.max_iterations = iterations.as_i64()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| ParameterError::ParseError(format!(
                        "solver.max_iterations must be a non-negative integer (got {:?})", iterations
                    )))?;
            }
        }

        Ok(ArmConfiguration { parameters, constraints, solver })
    }

    /// Build the arm, validating the solver configuration.
    pub fn into_kinematics(self) -> Result<ArmKinematics, ParameterError> {
        ArmKinematics::new_with_constraints(self.parameters, self.constraints)?
            .with_solver_config(self.solver)
    }
}

impl Parameters {
    /// Read only the arm parameters (the `planar_arm` section) from YAML file.
    /// See [ArmConfiguration::from_yaml_file] for the format.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        Ok(ArmConfiguration::from_yaml_file(path)?.parameters)
    }
}

/// Converts YAML scalars into numbers, understanding the deg(angle) notation.
struct ValueReader {
    degrees: Regex,
}

impl ValueReader {
    fn new() -> Result<Self, ParameterError> {
        let degrees = Regex::new(r"^\s*deg\(\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)\s*\)\s*$")
            .map_err(|e| ParameterError::ParseError(format!("{}", e)))?;
        Ok(ValueReader { degrees })
    }

    /// Reads a list of exactly four numbers. `None` if the key is absent.
    fn four(&self, yaml: &Yaml, field: &str, angles: bool) -> Result<Option<[f64; 4]>, ParameterError> {
        if yaml.is_badvalue() {
            return Ok(None);
        }
        let values = yaml.as_vec().ok_or_else(|| ParameterError::ParseError(format!(
            "{} must be a list of four values", field
        )))?;
        let numbers = values.iter()
            .map(|value| self.number(value, field, angles))
            .collect::<Result<Vec<f64>, ParameterError>>()?;
        four_of(&numbers).map(Some)
    }

    fn optional_number(&self, yaml: &Yaml, field: &str, angle: bool) -> Result<Option<f64>, ParameterError> {
        if yaml.is_badvalue() {
            return Ok(None);
        }
        self.number(yaml, field, angle).map(Some)
    }

    fn number(&self, yaml: &Yaml, field: &str, angle: bool) -> Result<f64, ParameterError> {
        match yaml {
            Yaml::Real(_) => yaml.as_f64().ok_or_else(|| ParameterError::ParseError(format!(
                "{}: not a number {:?}", field, yaml
            ))),
            Yaml::Integer(i) => Ok(*i as f64),
            Yaml::String(text) => {
                let Some(captures) = self.degrees.captures(text) else {
                    return text.trim().parse::<f64>().map_err(|_| ParameterError::ParseError(format!(
                        "{}: not a number '{}'", field, text
                    )));
                };
                if !angle {
                    return Err(ParameterError::WrongAngle(format!(
                        "{}: deg() is only allowed for angles, got '{}'", field, text
                    )));
                }
                captures[1].parse::<f64>()
                    .map(f64::to_radians)
                    .map_err(|_| ParameterError::WrongAngle(format!("{}: '{}'", field, text)))
            }
            other => Err(ParameterError::ParseError(format!(
                "{}: expected a number, got {:?}", field, other
            ))),
        }
    }
}
