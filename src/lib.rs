//! Kinematic control of a small three-revolute-joint arm (base yaw, shoulder, elbow).
//!
//! The crate computes joint configurations for three operating modes:
//!
//! - **Position target**: a Cartesian target for the tool tip is validated against the
//!   workspace and solved once by Levenberg-Marquardt inverse kinematics with random restarts.
//! - **Teleoperation**: a commanded Cartesian velocity, in the reference or the end-effector
//!   frame, is mapped to joint velocities through the inverted Jacobian and integrated each tick.
//! - **Autonomous**: the arm servos towards a random target, a fixed fraction of the remaining
//!   error per tick, and asks for a new target when it gets there.
//!
//! Only the position of the tool tip is controlled, never its orientation. Near singular
//! configurations the Jacobian is inverted with damping instead of the plain pseudo-inverse.
//!
//! # Geometry
//!
//! Links are described with modified Denavit-Hartenberg parameters (`RotX(alpha)·TransX(a)·
//! RotZ(q)·TransZ(d)` per joint). The defaults are d1 = 0.2 m, alpha2 = 90°, d2 = 0.02 m,
//! a3 = 0.25 m and a 0.28 m tool, so the tip is at (0.53, -0.02, 0.2) with all joints at zero.
//! Fill out `rrr_kinematics::Parameters` for a different arm.
//!
//! # Usage
//!
//! `ControlLoop` owns the state and runs at a fixed frequency. Hosts deliver commands either
//! through its methods or, from other threads, through an `InputSender`; what the loop
//! publishes goes to a `ControlSink`.

pub mod parameters;

pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod utils;

pub mod error;
pub mod parameter_error;
pub mod config;

pub mod workspace;
pub mod jacobian;
pub mod ik_solver;
pub mod velocity;

pub mod state;
pub mod mode;
pub mod input;
pub mod control_loop;

pub mod random_target;

#[cfg(test)]
mod tests;
