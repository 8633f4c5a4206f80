//! Fixed-frequency control loop.
//!
//! Each tick refreshes the end-effector estimate, publishes it, runs the work of the active
//! mode and publishes the joint configuration. Failures are logged and reported for the tick
//! they happen in; the loop always continues with the next tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info};

use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::ik_solver::{InverseSolver, LevenbergMarquardt};
use crate::input::{ControlInput, InputSender};
use crate::jacobian::Conditioning;
use crate::kinematic_traits::{Joints, Kinematics, Position, JOINTS_AT_ZERO, JOINT_NAMES};
use crate::kinematics_impl::RRRKinematics;
use crate::mode::{Mode, ModeContext, ModeController, ModeRequest, ModeResponse};
use crate::parameter_error::ParameterError;
use crate::state::ControlState;
use crate::utils::position_to_string;
use crate::velocity::{CartesianVelocity, ServoStep, VelocityResolver, VelocityStep};
use crate::workspace::WorkspaceValidator;

/// Joint configuration as published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointState {
    pub names: [&'static str; 3],
    pub positions: Joints,
}

impl JointState {
    pub fn new(positions: Joints) -> Self {
        JointState { names: JOINT_NAMES, positions }
    }
}

/// Source of the measured end-effector position (a transform lookup, usually).
pub trait PoseSource {
    /// `Ok(None)` if there is no fresh data, `Err` if the lookup failed. In both cases the
    /// loop keeps its previous estimate.
    fn lookup(&mut self) -> Result<Option<Position>, ControlError>;
}

/// Pose source that never has data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPoseSource;

impl PoseSource for NoPoseSource {
    fn lookup(&mut self) -> Result<Option<Position>, ControlError> {
        Ok(None)
    }
}

/// Receiver of everything the loop publishes.
pub trait ControlSink {
    fn joint_state(&mut self, state: &JointState);

    fn end_effector(&mut self, position: &Position);

    /// Target the autonomous mode is currently moving to.
    fn target(&mut self, target: &Position);

    /// Autonomous mode reached its target and needs a new one.
    fn request_random_target(&mut self);
}

pub struct ControlLoop {
    config: ControllerConfig,
    robot: Arc<dyn Kinematics>,
    validator: WorkspaceValidator,
    solver: Box<dyn InverseSolver>,
    resolver: VelocityResolver,
    modes: ModeController,
    state: ControlState,
    tx: Sender<ControlInput>,
    rx: Receiver<ControlInput>,
}

impl ControlLoop {
    /// Control loop with the arm geometry and solver settings from the configuration.
    /// The configuration is validated first.
    pub fn new(config: ControllerConfig) -> Result<Self, ParameterError> {
        let robot = Arc::new(RRRKinematics::new(config.geometry));
        let solver = Box::new(LevenbergMarquardt::new(config.solver));
        Self::with_components(config, robot, solver)
    }

    /// Control loop with a custom kinematic model and inverse kinematics solver.
    pub fn with_components(
        config: ControllerConfig,
        robot: Arc<dyn Kinematics>,
        solver: Box<dyn InverseSolver>,
    ) -> Result<Self, ParameterError> {
        config.validate()?;
        let initial = robot.forward(&JOINTS_AT_ZERO).translation.vector;
        let (tx, rx) = unbounded();
        Ok(ControlLoop {
            validator: WorkspaceValidator::new(config.bounds),
            resolver: VelocityResolver::new(config.frequency),
            modes: ModeController::new(),
            state: ControlState::new(JOINTS_AT_ZERO, initial),
            config,
            robot,
            solver,
            tx,
            rx,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn robot(&self) -> &dyn Kinematics {
        self.robot.as_ref()
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.frequency)
    }

    /// Handle for other threads. Inputs sent through it are applied at the start of the next tick.
    pub fn input_sender(&self) -> InputSender {
        InputSender::new(self.tx.clone())
    }

    pub fn request_mode(&mut self, request: &ModeRequest) -> ModeResponse {
        let context = ModeContext {
            robot: self.robot.as_ref(),
            validator: &self.validator,
            solver: self.solver.as_ref(),
        };
        self.modes.request(request, &mut self.state, &context)
    }

    /// Mode request in the wire form `{mode, mode1_pose?, mode2_toggle?}`.
    pub fn request_mode_wire(
        &mut self,
        mode: i32,
        mode1_pose: Option<Position>,
        mode2_toggle: Option<bool>,
    ) -> Result<ModeResponse, ControlError> {
        let context = ModeContext {
            robot: self.robot.as_ref(),
            validator: &self.validator,
            solver: self.solver.as_ref(),
        };
        self.modes.request_wire(mode, mode1_pose, mode2_toggle, &mut self.state, &context)
    }

    pub fn set_velocity(&mut self, velocity: CartesianVelocity) {
        self.state.set_velocity(velocity);
    }

    pub fn set_random_target(&mut self, target: Position) {
        self.state.set_random_target(target);
    }

    /// Applies everything queued through `InputSender` handles, in arrival order.
    pub fn process_inputs(&mut self) {
        while let Ok(input) = self.rx.try_recv() {
            match input {
                ControlInput::Velocity(velocity) => self.state.set_velocity(velocity),
                ControlInput::RandomTarget(target) => self.state.set_random_target(target),
                ControlInput::EndEffector(position) => self.state.set_end_effector(position),
                ControlInput::Mode { request, reply } => {
                    let response = self.request_mode(&request);
                    if reply.send(response).is_err() {
                        debug!("Mode request sender left before the reply");
                    }
                }
            }
        }
    }

    /// One control period.
    pub fn tick(&mut self, source: &mut dyn PoseSource, sink: &mut dyn ControlSink) -> Result<(), ControlError> {
        self.process_inputs();

        match source.lookup() {
            Ok(Some(position)) => self.state.set_end_effector(position),
            Ok(None) => {}
            Err(e) => debug!("Keeping previous end-effector estimate: {}", e),
        }
        sink.end_effector(self.state.end_effector());

        let result = match self.modes.mode() {
            Mode::TeleopVelocity => self.teleop_tick(),
            Mode::AutonomousTarget => self.autonomous_tick(sink),
            Mode::PositionTarget | Mode::Unset => Ok(()),
        };
        if let Err(e) = &result {
            error!("{:?} tick skipped: {}", self.modes.mode(), e);
        }

        sink.joint_state(&JointState::new(*self.state.joints()));
        result
    }

    fn apply(&mut self, step: &VelocityStep) {
        self.state.set_joints(step.joints);
        self.state.set_singular(step.conditioning == Conditioning::Singular);
    }

    fn teleop_tick(&mut self) -> Result<(), ControlError> {
        let velocity = *self.state.velocity();
        let step = self.resolver.teleop_step(self.robot.as_ref(), self.state.joints(), &velocity)?;
        self.apply(&step);
        Ok(())
    }

    fn autonomous_tick(&mut self, sink: &mut dyn ControlSink) -> Result<(), ControlError> {
        let target = *self.state.random_target();
        match self.resolver.servo_step(self.robot.as_ref(), self.state.joints(), &target)? {
            ServoStep::Reached => {
                self.state.set_target_reached(true);
                sink.request_random_target();
            }
            ServoStep::Moved(step) => {
                self.state.set_target_reached(false);
                self.apply(&step);
                sink.target(&target);
                debug!("Target Position {}", position_to_string(&target));
            }
        }
        Ok(())
    }

    /// Runs ticks at the configured frequency, forever or until `max_ticks` have run.
    /// A tick that overruns its period delays the next one rather than being caught up.
    pub fn run(&mut self, source: &mut dyn PoseSource, sink: &mut dyn ControlSink, max_ticks: Option<usize>) {
        let period = self.period();
        info!("Control loop running at {} Hz", self.config.frequency);

        let mut deadline = Instant::now();
        let mut ticks = 0usize;
        while max_ticks.is_none_or(|max| ticks < max) {
            // Errors are already logged by the tick.
            let _ = self.tick(source, sink);
            ticks += 1;

            deadline += period;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else {
                deadline = now;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::velocity::VelocityFrame;
    use nalgebra::Vector3;

    #[derive(Default)]
    struct Recorder {
        joints: Vec<JointState>,
        poses: Vec<Position>,
        targets: Vec<Position>,
        requests: usize,
    }

    impl ControlSink for Recorder {
        fn joint_state(&mut self, state: &JointState) {
            self.joints.push(*state);
        }
        fn end_effector(&mut self, position: &Position) {
            self.poses.push(*position);
        }
        fn target(&mut self, target: &Position) {
            self.targets.push(*target);
        }
        fn request_random_target(&mut self) {
            self.requests += 1;
        }
    }

    struct FailingSource;

    impl PoseSource for FailingSource {
        fn lookup(&mut self) -> Result<Option<Position>, ControlError> {
            Err(ControlError::Transport("frame end_effector does not exist".to_string()))
        }
    }

    #[test]
    fn test_unset_mode_only_publishes() {
        let mut control = ControlLoop::new(ControllerConfig::default()).expect("Default configuration is valid");
        let mut sink = Recorder::default();
        control.tick(&mut NoPoseSource, &mut sink).expect("Idle tick cannot fail");

        assert_eq!(sink.joints, vec![JointState::new([0.0, 0.0, 0.0])]);
        assert_eq!(sink.joints[0].names, ["joint_1", "joint_2", "joint_3"]);
        assert_eq!(sink.poses.len(), 1);
        assert!(sink.targets.is_empty());
        assert_eq!(sink.requests, 0);
    }

    #[test]
    fn test_transport_failure_keeps_estimate() {
        let mut control = ControlLoop::new(ControllerConfig::default()).expect("Default configuration is valid");
        let mut sink = Recorder::default();
        let initial = *control.state().end_effector();

        control.tick(&mut FailingSource, &mut sink).expect("Transport errors are not escalated");
        assert_eq!(sink.poses, vec![initial]);
        assert_eq!(control.state().end_effector(), &initial);
    }

    #[test]
    fn test_inputs_last_writer_wins() {
        let mut control = ControlLoop::new(ControllerConfig::default()).expect("Default configuration is valid");
        let sender = control.input_sender();
        sender.send_random_target(Position::new(0.3, 0.0, 0.2)).unwrap();
        sender.send_random_target(Position::new(0.2, 0.1, 0.3)).unwrap();
        sender.send_velocity(CartesianVelocity::new(Vector3::new(0.01, 0.0, 0.0), VelocityFrame::Reference)).unwrap();
        sender.send_end_effector(Position::new(0.4, 0.0, 0.2)).unwrap();

        control.tick(&mut NoPoseSource, &mut Recorder::default()).unwrap();
        assert_eq!(control.state().random_target(), &Position::new(0.2, 0.1, 0.3));
        assert_eq!(control.state().velocity().linear, Vector3::new(0.01, 0.0, 0.0));
        assert_eq!(control.state().end_effector(), &Position::new(0.4, 0.0, 0.2));
        // No mode active, inputs are stored but not used
        assert_eq!(control.state().joints(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mode_request_from_other_thread() {
        let mut control = ControlLoop::new(ControllerConfig::default()).expect("Default configuration is valid");
        let sender = control.input_sender();

        let client = std::thread::spawn(move || {
            sender.request_mode_wire(1, Some(Position::new(0.2, 0.0, 0.2)), None)
        });
        let mut sink = Recorder::default();
        while !client.is_finished() {
            control.tick(&mut NoPoseSource, &mut sink).unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        let response = client.join().expect("Client thread panicked").expect("Request failed");
        assert!(response.success);
        assert_eq!(control.mode(), Mode::PositionTarget);
        assert_eq!(control.state().joints(), &response.joint_pos);
    }

    #[test]
    fn test_closed_loop_reports_channel_closed() {
        let control = ControlLoop::new(ControllerConfig::default()).expect("Default configuration is valid");
        let sender = control.input_sender();
        drop(control);
        assert_eq!(
            sender.request_mode(ModeRequest::AutonomousTarget),
            Err(ControlError::ChannelClosed)
        );
    }

    #[test]
    fn test_invalid_frequency_rejected() {
        for frequency in [0.0, -10.0, f64::NAN] {
            let config = ControllerConfig { frequency, ..ControllerConfig::default() };
            assert!(
                matches!(ControlLoop::new(config), Err(ParameterError::InvalidValue { field: "frequency", .. })),
                "Frequency {} accepted",
                frequency
            );
        }
    }

    #[test]
    fn test_run_respects_max_ticks() {
        let config = ControllerConfig { frequency: 1000.0, ..ControllerConfig::default() };
        let mut control = ControlLoop::new(config).expect("Configuration is valid");
        let mut sink = Recorder::default();
        control.run(&mut NoPoseSource, &mut sink, Some(5));
        assert_eq!(sink.joints.len(), 5);
        assert_eq!(sink.poses.len(), 5);
    }
}
