//! Input queue for hosts that receive commands on other threads.
//!
//! Every mutation of the controller state goes through one channel that only the control
//! loop reads, so the state keeps a single writer. Velocities and targets overwrite each other
//! when the loop drains the queue (last writer wins); mode requests wait for their reply.

use crossbeam_channel::{bounded, Sender};

use crate::error::ControlError;
use crate::kinematic_traits::Position;
use crate::mode::{ModeRequest, ModeResponse};
use crate::velocity::CartesianVelocity;

#[derive(Debug)]
pub enum ControlInput {
    Velocity(CartesianVelocity),
    RandomTarget(Position),
    EndEffector(Position),
    Mode {
        request: ModeRequest,
        reply: Sender<ModeResponse>,
    },
}

/// Cloneable handle to the input queue of a control loop.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: Sender<ControlInput>,
}

impl InputSender {
    pub(crate) fn new(tx: Sender<ControlInput>) -> Self {
        InputSender { tx }
    }

    fn send(&self, input: ControlInput) -> Result<(), ControlError> {
        self.tx.send(input).map_err(|_| ControlError::ChannelClosed)
    }

    /// Desired velocity for teleoperation. Replaces any earlier value.
    pub fn send_velocity(&self, velocity: CartesianVelocity) -> Result<(), ControlError> {
        self.send(ControlInput::Velocity(velocity))
    }

    /// Next target for autonomous mode. Replaces any earlier value.
    pub fn send_random_target(&self, target: Position) -> Result<(), ControlError> {
        self.send(ControlInput::RandomTarget(target))
    }

    /// End-effector position observed by some external source.
    pub fn send_end_effector(&self, position: Position) -> Result<(), ControlError> {
        self.send(ControlInput::EndEffector(position))
    }

    /// Requests a mode change and blocks until the control loop has processed it.
    /// Must not be called from the thread running the loop.
    pub fn request_mode(&self, request: ModeRequest) -> Result<ModeResponse, ControlError> {
        let (reply, response) = bounded(1);
        self.send(ControlInput::Mode { request, reply })?;
        response.recv().map_err(|_| ControlError::ChannelClosed)
    }

    /// Same as `request_mode`, taking the wire form. Malformed requests are rejected here
    /// and never reach the loop.
    pub fn request_mode_wire(
        &self,
        mode: i32,
        mode1_pose: Option<Position>,
        mode2_toggle: Option<bool>,
    ) -> Result<ModeResponse, ControlError> {
        self.request_mode(ModeRequest::from_wire(mode, mode1_pose, mode2_toggle)?)
    }
}
