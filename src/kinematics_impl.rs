use tracing::debug;

use crate::constraints::Constraints;
use crate::forward;
use crate::ik_problem::RestPoseProblem;
use crate::kinematic_traits::{Joints, Kinematics, Position};
use crate::parameter_error::ParameterError;
use crate::parameters::arm_kinematics::Parameters;
use crate::sqp::{self, SolverConfig, SolverReport};

/// The planar arm: geometry, resting pose, the pose the arm currently has,
/// advisory joint limits and the configuration of the optimizer.
#[derive(Debug, Clone)]
pub struct ArmKinematics {
    parameters: Parameters,
    current_pose: Joints,
    constraints: Constraints,
    solver: SolverConfig,
}

impl Default for ArmKinematics {
    /// Unit segment lengths, 45/45/0/0 degrees initial and resting pose, default joint limits.
    fn default() -> Self {
        let parameters = Parameters::new();
        ArmKinematics {
            current_pose: parameters.initial_angles,
            parameters,
            constraints: Constraints::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl ArmKinematics {
    /// Creates a new `ArmKinematics` instance with the given parameters.
    /// The arm starts at `parameters.initial_angles`, default joint limits apply.
    pub fn new(parameters: Parameters) -> Result<Self, ParameterError> {
        Self::new_with_constraints(parameters, Constraints::default())
    }

    /// Creates a new `ArmKinematics` instance with explicitly given joint limits.
    pub fn new_with_constraints(parameters: Parameters, constraints: Constraints) -> Result<Self, ParameterError> {
        parameters.validate()?;
        Ok(ArmKinematics {
            current_pose: parameters.initial_angles,
            parameters,
            constraints,
            solver: SolverConfig::default(),
        })
    }

    /// Replace the convergence tolerance and the iteration cap of the optimizer.
    pub fn with_solver_config(mut self, solver: SolverConfig) -> Result<Self, ParameterError> {
        if !(solver.tolerance.is_finite() && solver.tolerance > 0.0) {
            return Err(ParameterError::InvalidConfiguration(format!(
                "solver tolerance must be positive (got {})", solver.tolerance
            )));
        }
        if solver.max_iterations == 0 {
            return Err(ParameterError::InvalidConfiguration(
                "solver max_iterations must be at least 1".to_string(),
            ));
        }
        self.solver = solver;
        Ok(self)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver
    }

    /// Joint angles the next `solve` starts from.
    pub fn current_pose(&self) -> Joints {
        self.current_pose
    }

    /// Move the arm without solving, the next `solve` starts from `joints`.
    pub fn set_current_pose(&mut self, joints: Joints) {
        self.current_pose = joints;
    }

    /// Solve starting from the current pose and move the arm there: the result becomes
    /// the current pose and the starting point of the next solve.
    pub fn solve(&mut self, target: &Position) -> Joints {
        let joints = self.inverse(target);
        self.current_pose = joints;
        joints
    }

    /// Run the optimizer from `start` and return the full report, including the number
    /// of iterations and whether it has converged.
    pub fn inverse_with_report(&self, target: &Position, start: &Joints) -> SolverReport<4> {
        let problem = RestPoseProblem::new(&self.parameters, target);
        let report = sqp::minimize::<_, 4, 2>(&problem, start, &self.solver);
        if !report.converged() {
            debug!(
                x = target.x,
                y = target.y,
                status = ?report.status,
                residual = self.residual(&report.x, target),
                "inverse kinematics did not converge, returning best effort"
            );
        }
        report
    }

    /// Distance between the position the joints reach and the target.
    pub fn residual(&self, joints: &Joints, target: &Position) -> f64 {
        (self.forward(joints) - *target).norm()
    }

    /// Check the joints against the (advisory) joint limits.
    pub fn limits_compliant(&self, joints: &Joints) -> bool {
        self.constraints.compliant(joints)
    }
}

impl Kinematics for ArmKinematics {
    fn inverse(&self, target: &Position) -> Joints {
        self.inverse_continuing(target, &self.current_pose)
    }

    fn inverse_continuing(&self, target: &Position, start: &Joints) -> Joints {
        self.inverse_with_report(target, start).x
    }

    fn forward(&self, qs: &Joints) -> Position {
        forward::forward(qs, &self.parameters.segment_lengths)
    }

    fn forward_with_joint_positions(&self, qs: &Joints) -> [Position; 5] {
        forward::forward_with_joint_positions(qs, &self.parameters.segment_lengths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqp::ExitStatus;

    #[test]
    fn test_rejects_invalid_parameters() {
        let parameters = Parameters {
            segment_lengths: [1.0, -1.0, 1.0, 1.0],
            ..Parameters::new()
        };
        assert!(ArmKinematics::new(parameters).is_err());
    }

    #[test]
    fn test_rejects_invalid_solver_config() {
        let robot = ArmKinematics::new(Parameters::new()).unwrap();
        let config = SolverConfig { tolerance: 0.0, max_iterations: 100 };
        assert!(robot.clone().with_solver_config(config).is_err());
        let config = SolverConfig { tolerance: 1e-6, max_iterations: 0 };
        assert!(robot.with_solver_config(config).is_err());
    }

    #[test]
    fn test_starts_at_initial_angles() {
        let parameters = Parameters {
            initial_angles: [0.1, 0.2, 0.3, 0.4],
            ..Parameters::new()
        };
        let robot = ArmKinematics::new(parameters).unwrap();
        assert_eq!(robot.current_pose(), [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_iteration_cap_from_config() {
        let robot = ArmKinematics::new(Parameters::new()).unwrap()
            .with_solver_config(SolverConfig { tolerance: 1e-6, max_iterations: 2 })
            .unwrap();
        let report = robot.inverse_with_report(&Position::new(-2.0, 1.0), &robot.current_pose());
        assert!(report.iterations <= 2);
        assert_ne!(report.status, ExitStatus::Converged);
    }

    #[test]
    fn test_solve_starts_from_pose_set() {
        let mut robot = ArmKinematics::new(Parameters::new()).unwrap();
        let start = [0.2, 0.9, 0.4, 0.3];
        robot.set_current_pose(start);
        assert_eq!(robot.current_pose(), start);

        // Same start, same result
        let target = robot.forward(&start);
        let report = robot.inverse_with_report(&target, &robot.current_pose());
        assert!(report.converged());
        let joints = robot.solve(&target);
        assert_eq!(joints, report.x);
        assert_eq!(robot.current_pose(), joints);
        assert!(robot.residual(&joints, &target) < 1e-6);
    }

    #[test]
    fn test_stateless_inverse_keeps_current_pose() {
        let robot = ArmKinematics::new(Parameters::new()).unwrap();
        let before = robot.current_pose();
        let _ = robot.inverse(&Position::new(1.0, 2.0));
        assert_eq!(robot.current_pose(), before);
    }
}
