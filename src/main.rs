use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;

use planar_arm_ik::kinematic_traits::{Kinematics, Position};
use planar_arm_ik::kinematics_impl::ArmKinematics;
use planar_arm_ik::parameters_from_file::ArmConfiguration;
use planar_arm_ik::sqp::SolverConfig;
use planar_arm_ik::utils::{dump_joints, dump_position};

/// Find joint angles of the planar arm reaching the given point.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Target x coordinate
    #[arg(allow_hyphen_values = true)]
    x: f64,

    /// Target y coordinate
    #[arg(allow_hyphen_values = true)]
    y: f64,

    /// YAML file with the arm configuration. Default arm if not given.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Convergence tolerance of the solver
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Iteration cap of the solver
    #[arg(short, long)]
    max_iterations: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    ensure!(args.x.is_finite() && args.y.is_finite(), "target coordinates must be finite");

    let arm = match &args.config {
        Some(path) => ArmConfiguration::from_yaml_file(path)
            .and_then(ArmConfiguration::into_kinematics)
            .with_context(|| format!("Failed to load arm configuration from {}", path.display()))?,
        None => ArmKinematics::default(),
    };

    let defaults = *arm.solver_config();
    let solver = SolverConfig {
        tolerance: args.tolerance.unwrap_or(defaults.tolerance),
        max_iterations: args.max_iterations.unwrap_or(defaults.max_iterations),
    };
    let arm = arm.with_solver_config(solver).context("Invalid solver settings")?;

    let target = Position::new(args.x, args.y);
    let report = arm.inverse_with_report(&target, &arm.current_pose());

    println!("Joints (degrees):");
    dump_joints(&report.x);
    println!("Reached:");
    dump_position(&arm.forward(&report.x));
    println!("Residual: {:.6}", arm.residual(&report.x, &target));
    println!("Status: {:?} after {} iterations", report.status, report.iterations);
    if !arm.limits_compliant(&report.x) {
        println!("Joints {:?} are outside the joint limits", arm.constraints().violations(&report.x));
    }
    Ok(())
}
