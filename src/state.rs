//! Mutable state of the controller. One instance lives for the whole process, owned by
//! the control loop; input handlers only write through the narrow setters below.

use crate::kinematic_traits::{Joints, Position, JOINTS_AT_ZERO};
use crate::velocity::{CartesianVelocity, VelocityFrame};

/// Initial random target, until the first one arrives.
pub const INITIAL_RANDOM_TARGET: [f64; 3] = [0.1, 0.1, 0.1];

#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    joints: Joints,
    velocity: CartesianVelocity,
    random_target: Position,
    end_effector: Position,
    target_reached: bool,
    singular: bool,
}

impl ControlState {
    /// State at startup: the given joints, zero velocity, end-effector estimate as given.
    pub fn new(joints: Joints, end_effector: Position) -> Self {
        ControlState {
            joints,
            velocity: CartesianVelocity::default(),
            random_target: Position::from(INITIAL_RANDOM_TARGET),
            end_effector,
            target_reached: false,
            singular: false,
        }
    }

    pub fn joints(&self) -> &Joints {
        &self.joints
    }

    /// Last commanded Cartesian velocity and its frame.
    pub fn velocity(&self) -> &CartesianVelocity {
        &self.velocity
    }

    pub fn random_target(&self) -> &Position {
        &self.random_target
    }

    /// Last known end-effector position.
    pub fn end_effector(&self) -> &Position {
        &self.end_effector
    }

    /// True if the last autonomous tick found the target reached.
    pub fn target_reached(&self) -> bool {
        self.target_reached
    }

    /// True if the last resolved-rate step needed the damped inverse.
    pub fn singular(&self) -> bool {
        self.singular
    }

    pub fn set_velocity(&mut self, velocity: CartesianVelocity) {
        self.velocity = velocity;
    }

    /// Zero velocity in the given frame, as done when a velocity-driven mode starts.
    pub fn stop(&mut self, frame: VelocityFrame) {
        self.velocity = CartesianVelocity::stopped(frame);
    }

    pub fn set_random_target(&mut self, target: Position) {
        self.random_target = target;
    }

    pub fn set_end_effector(&mut self, position: Position) {
        self.end_effector = position;
    }

    pub(crate) fn set_joints(&mut self, joints: Joints) {
        self.joints = joints;
    }

    pub(crate) fn set_target_reached(&mut self, reached: bool) {
        self.target_reached = reached;
    }

    pub(crate) fn set_singular(&mut self, singular: bool) {
        self.singular = singular;
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(JOINTS_AT_ZERO, Position::zeros())
    }
}
