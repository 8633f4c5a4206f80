//! Resolved-rate control: turns a Cartesian velocity, or the distance to a target, into
//! the next joint configuration.

use nalgebra::Vector3;
use tracing::debug;

use crate::error::ControlError;
use crate::jacobian::{Conditioning, Jacobian, SingularityGuard};
use crate::kinematic_traits::{Joints, Kinematics, Position};

/// Fraction of the remaining position error corrected on every autonomous step.
pub const SERVO_GAIN: f64 = 0.1;

/// Distance to the target below which the target counts as reached (meters).
pub const REACHED_TOLERANCE: f64 = 1e-6;

/// Frame the commanded linear velocity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VelocityFrame {
    /// The reference (base) frame of the arm.
    Reference,
    /// The frame of the end-effector; rotated into the reference frame before use.
    #[default]
    EndEffector,
}

impl VelocityFrame {
    /// Mapping of the boolean toggle used by mode requests and the velocity stream.
    pub fn from_toggle(end_effector: bool) -> Self {
        if end_effector { VelocityFrame::EndEffector } else { VelocityFrame::Reference }
    }
}

/// Desired linear velocity of the end-effector (m/s) and the frame it is given in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianVelocity {
    pub linear: Vector3<f64>,
    pub frame: VelocityFrame,
}

impl CartesianVelocity {
    pub fn new(linear: Vector3<f64>, frame: VelocityFrame) -> Self {
        Self { linear, frame }
    }

    /// Zero velocity, keeping the frame.
    pub fn stopped(frame: VelocityFrame) -> Self {
        Self::new(Vector3::zeros(), frame)
    }
}

impl Default for CartesianVelocity {
    fn default() -> Self {
        Self::stopped(VelocityFrame::default())
    }
}

/// Joint update produced by one resolved-rate step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityStep {
    /// The new joint configuration.
    pub joints: Joints,
    /// Joint velocities (teleoperation) or joint increments before the gain (servoing).
    pub joint_rates: Vector3<f64>,
    /// Conditioning of the Jacobian the step was computed with.
    pub conditioning: Conditioning,
}

/// Outcome of an autonomous servo step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoStep {
    /// The tool tip is within tolerance of the target; joints were not changed.
    Reached,
    Moved(VelocityStep),
}

#[derive(Debug, Clone, Copy)]
pub struct VelocityResolver {
    /// Control frequency in Hz, the teleoperation step integrates over `1 / frequency`.
    pub frequency: f64,
    pub servo_gain: f64,
    pub reached_tolerance: f64,
    pub guard: SingularityGuard,
}

impl VelocityResolver {
    pub fn new(frequency: f64) -> Self {
        VelocityResolver {
            frequency,
            servo_gain: SERVO_GAIN,
            reached_tolerance: REACHED_TOLERANCE,
            guard: SingularityGuard::default(),
        }
    }

    /// Expresses the velocity in the reference frame.
    pub fn to_reference(&self, robot: &dyn Kinematics, qs: &Joints, velocity: &CartesianVelocity) -> Vector3<f64> {
        match velocity.frame {
            VelocityFrame::Reference => velocity.linear,
            VelocityFrame::EndEffector => robot.forward(qs).rotation * velocity.linear,
        }
    }

    /// Teleoperation: integrates the joint velocities that produce the commanded Cartesian
    /// velocity over one control period.
    pub fn teleop_step(
        &self,
        robot: &dyn Kinematics,
        qs: &Joints,
        velocity: &CartesianVelocity,
    ) -> Result<VelocityStep, ControlError> {
        let v = self.to_reference(robot, qs, velocity);
        let jacobian = Jacobian::new(robot, qs);
        let (inverse, conditioning) = self.guard.classify_and_invert(&jacobian)?;

        let joint_rates = inverse * v;
        let dt = 1.0 / self.frequency;
        let joints = integrate(qs, &(joint_rates * dt))?;
        debug!("Teleop v = {:?}, dq/dt = {:?}", v.as_slice(), joint_rates.as_slice());

        Ok(VelocityStep { joints, joint_rates, conditioning })
    }

    /// Position error between the target and the tool tip.
    pub fn position_error(&self, robot: &dyn Kinematics, qs: &Joints, target: &Position) -> Vector3<f64> {
        target - robot.forward(qs).translation.vector
    }

    /// True if the tool tip is within tolerance of the target.
    pub fn is_reached(&self, robot: &dyn Kinematics, qs: &Joints, target: &Position) -> bool {
        self.position_error(robot, qs, target).norm() < self.reached_tolerance
    }

    /// Autonomous servoing: moves a fixed fraction of the way to the target.
    pub fn servo_step(
        &self,
        robot: &dyn Kinematics,
        qs: &Joints,
        target: &Position,
    ) -> Result<ServoStep, ControlError> {
        let delta = self.position_error(robot, qs, target);
        if delta.norm() < self.reached_tolerance {
            return Ok(ServoStep::Reached);
        }

        let jacobian = Jacobian::new(robot, qs);
        let (inverse, conditioning) = self.guard.classify_and_invert(&jacobian)?;
        let joint_rates = inverse * delta;
        let joints = integrate(qs, &(joint_rates * self.servo_gain))?;

        Ok(ServoStep::Moved(VelocityStep { joints, joint_rates, conditioning }))
    }
}

fn integrate(qs: &Joints, increment: &Vector3<f64>) -> Result<Joints, ControlError> {
    let joints = [qs[0] + increment[0], qs[1] + increment[1], qs[2] + increment[2]];
    if crate::utils::is_valid(&joints) {
        Ok(joints)
    } else {
        Err(ControlError::Numerical("joint update is not finite"))
    }
}
