//! Runs the arm controller with a logging sink.
//!
//! Without a host to talk to, the commands come from the command line: pick a mode, give it a
//! target or a velocity, and watch the joint states in the log (`RUST_LOG=debug` for every tick).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use nalgebra::Vector3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rrr_arm_control::config::ControllerConfig;
use rrr_arm_control::control_loop::{ControlLoop, ControlSink, JointState, NoPoseSource};
use rrr_arm_control::input::InputSender;
use rrr_arm_control::kinematic_traits::Position;
use rrr_arm_control::mode::ModeRequest;
use rrr_arm_control::random_target::RandomTargets;
use rrr_arm_control::utils::{joints_to_string, position_to_string};
use rrr_arm_control::velocity::{CartesianVelocity, VelocityFrame};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Position,
    Teleop,
    Autonomous,
}

/// Kinematic control loop for a 3-joint arm
#[derive(Parser, Debug)]
#[command(name = "rrr-arm-control")]
#[command(version)]
struct Args {
    /// Controller configuration (YAML). Defaults are used if not given.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Mode to start in.
    #[arg(long, value_enum, default_value_t = ModeArg::Autonomous)]
    mode: ModeArg,

    /// Tool tip target for the position mode, meters.
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    target: Option<Vec<f64>>,

    /// Commanded velocity for the teleoperation mode, m/s.
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    velocity: Option<Vec<f64>>,

    /// Interpret the velocity in the end-effector frame rather than the reference frame.
    #[arg(long)]
    end_effector_frame: bool,

    /// Number of ticks to run, runs forever if not given.
    #[arg(long)]
    ticks: Option<usize>,

    /// Seed of the random targets in the autonomous mode.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn vector(values: &[f64], name: &str) -> Result<Vector3<f64>> {
    match values {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => bail!("--{} takes exactly three values", name),
    }
}

/// Logs everything the loop publishes and answers new target requests with random targets.
struct TracingSink {
    targets: RandomTargets,
    inputs: InputSender,
}

impl ControlSink for TracingSink {
    fn joint_state(&mut self, state: &JointState) {
        tracing::debug!("Joint state {}", joints_to_string(&state.positions));
    }

    fn end_effector(&mut self, position: &Position) {
        tracing::trace!("End effector {}", position_to_string(position));
    }

    fn target(&mut self, target: &Position) {
        tracing::trace!("Moving to {}", position_to_string(target));
    }

    fn request_random_target(&mut self) {
        let Some(target) = self.targets.next_target() else {
            tracing::error!("Target reached, but no new target could be generated");
            return;
        };
        info!("Target reached, next target {}", position_to_string(&target));
        if let Err(e) = self.inputs.send_random_target(target) {
            tracing::error!("Cannot deliver random target: {}", e);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ControllerConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ControllerConfig::default(),
    };
    info!("Configuration:\n{}", config.to_yaml());

    let mut control = ControlLoop::new(config).context("Invalid controller configuration")?;
    let request = match args.mode {
        ModeArg::Position => {
            let target = args.target.as_deref().context("--target is required in the position mode")?;
            ModeRequest::PositionTarget(vector(target, "target")?)
        }
        ModeArg::Teleop => ModeRequest::TeleopVelocity(VelocityFrame::from_toggle(args.end_effector_frame)),
        ModeArg::Autonomous => ModeRequest::AutonomousTarget,
    };

    let response = control.request_mode(&request);
    if !response.success {
        bail!("Mode request {:?} was rejected", request);
    }

    if let ModeRequest::TeleopVelocity(frame) = request {
        let velocity = match args.velocity.as_deref() {
            Some(values) => vector(values, "velocity")?,
            None => Vector3::zeros(),
        };
        control.set_velocity(CartesianVelocity::new(velocity, frame));
    }

    let mut sink = TracingSink {
        targets: RandomTargets::new(config.bounds, args.seed),
        inputs: control.input_sender(),
    };
    control.run(&mut NoPoseSource, &mut sink, args.ticks);

    info!("Final joints {}", joints_to_string(control.state().joints()));
    Ok(())
}
