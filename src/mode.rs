//! Operating modes of the controller and the handling of mode-change requests.
//!
//! The state machine is flat: any mode can be requested from any other, and there is no
//! terminal state. Position targets are solved synchronously while handling the request;
//! the velocity-driven modes only reset the commanded velocity and do their work per tick.

use tracing::{error, info};

use crate::error::ControlError;
use crate::ik_solver::InverseSolver;
use crate::kinematic_traits::{Joints, Kinematics, Position};
use crate::state::ControlState;
use crate::utils::{joints_to_string, position_to_string};
use crate::velocity::VelocityFrame;
use crate::workspace::WorkspaceValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No mode requested yet, the arm holds still.
    #[default]
    Unset,
    /// Joints set once to reach a Cartesian target.
    PositionTarget,
    /// Joints follow a commanded Cartesian velocity.
    TeleopVelocity,
    /// Joints servo towards random targets, one after another.
    AutonomousTarget,
}

impl Mode {
    /// Identifier of the mode in mode-change requests. `Unset` cannot be requested.
    pub fn id(&self) -> Option<i32> {
        match self {
            Mode::Unset => None,
            Mode::PositionTarget => Some(1),
            Mode::TeleopVelocity => Some(2),
            Mode::AutonomousTarget => Some(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeRequest {
    PositionTarget(Position),
    TeleopVelocity(VelocityFrame),
    AutonomousTarget,
}

impl ModeRequest {
    pub fn mode(&self) -> Mode {
        match self {
            ModeRequest::PositionTarget(_) => Mode::PositionTarget,
            ModeRequest::TeleopVelocity(_) => Mode::TeleopVelocity,
            ModeRequest::AutonomousTarget => Mode::AutonomousTarget,
        }
    }

    /// Builds the request from the wire form `{mode, mode1_pose?, mode2_toggle?}`.
    /// A missing toggle selects the default velocity frame.
    pub fn from_wire(
        mode: i32,
        mode1_pose: Option<Position>,
        mode2_toggle: Option<bool>,
    ) -> Result<Self, ControlError> {
        match mode {
            1 => mode1_pose
                .map(ModeRequest::PositionTarget)
                .ok_or(ControlError::MissingPayload("position target mode needs mode1_pose")),
            2 => Ok(ModeRequest::TeleopVelocity(
                mode2_toggle.map(VelocityFrame::from_toggle).unwrap_or_default(),
            )),
            3 => Ok(ModeRequest::AutonomousTarget),
            other => Err(ControlError::UnknownMode(other)),
        }
    }
}

/// Reply to a mode request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeResponse {
    pub success: bool,
    /// The solved joints for an accepted position target, the rejected target itself
    /// otherwise; the current joints for the other modes.
    pub joint_pos: [f64; 3],
}

impl ModeResponse {
    fn accepted(joints: &Joints) -> Self {
        ModeResponse { success: true, joint_pos: *joints }
    }

    fn rejected(target: &Position) -> Self {
        ModeResponse { success: false, joint_pos: [target.x, target.y, target.z] }
    }
}

/// Collaborators a mode request may need.
pub struct ModeContext<'a> {
    pub robot: &'a dyn Kinematics,
    pub validator: &'a WorkspaceValidator,
    pub solver: &'a dyn InverseSolver,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModeController {
    mode: Mode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches to the requested mode. A position target that fails validation or
    /// cannot be solved is reported with `success = false` and leaves the joints as they were;
    /// the mode still becomes `PositionTarget`, so the arm holds its position.
    pub fn request(&mut self, request: &ModeRequest, state: &mut ControlState, context: &ModeContext) -> ModeResponse {
        self.mode = request.mode();
        match request {
            ModeRequest::PositionTarget(target) => match Self::solve_target(target, state.joints(), context) {
                Ok(joints) => {
                    state.set_joints(joints);
                    info!(
                        "Position target {} accepted, q: {}",
                        position_to_string(target),
                        joints_to_string(&joints)
                    );
                    ModeResponse::accepted(&joints)
                }
                Err(e) => {
                    error!("Position target {} rejected: {}", position_to_string(target), e);
                    ModeResponse::rejected(target)
                }
            },
            ModeRequest::TeleopVelocity(frame) => {
                state.stop(*frame);
                info!("Teleoperation mode has been started ({:?} frame)", frame);
                ModeResponse::accepted(state.joints())
            }
            ModeRequest::AutonomousTarget => {
                let frame = state.velocity().frame;
                state.stop(frame);
                info!("Autonomous mode has been started");
                ModeResponse::accepted(state.joints())
            }
        }
    }

    /// Same as `request`, taking the wire form. Unknown modes and missing payloads are
    /// errors and change nothing.
    pub fn request_wire(
        &mut self,
        mode: i32,
        mode1_pose: Option<Position>,
        mode2_toggle: Option<bool>,
        state: &mut ControlState,
        context: &ModeContext,
    ) -> Result<ModeResponse, ControlError> {
        let request = ModeRequest::from_wire(mode, mode1_pose, mode2_toggle).inspect_err(|e| {
            error!("Error selecting mode: {}", e);
        })?;
        Ok(self.request(&request, state, context))
    }

    fn solve_target(target: &Position, seed: &Joints, context: &ModeContext) -> Result<Joints, ControlError> {
        context.validator.validate(target)?;
        context.solver.solve(context.robot, target, seed)
    }
}
