//! Errors reported by the controller. None of them stop the control loop.

use thiserror::Error;

/// Reason why a Cartesian target was rejected by the workspace check.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum WorkspaceViolation {
    #[error("({x}, {y}, {z}) is {distance:.4} m from the base joint, outside [{r_min}, {r_max}]")]
    OutOfReach {
        x: f64,
        y: f64,
        z: f64,
        distance: f64,
        r_min: f64,
        r_max: f64,
    },

    #[error("({x}, {y}, {z}) is outside the box [{lower}, {upper}] on every axis")]
    OutOfBox {
        x: f64,
        y: f64,
        z: f64,
        lower: f64,
        upper: f64,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// Target outside the workspace bounds
    #[error("Position is out of range: {0}")]
    Validation(#[from] WorkspaceViolation),

    /// Inverse kinematics did not reach the tolerance
    #[error("Inverse kinematics did not converge: residual {residual:e} m after {searches} searches")]
    Convergence { residual: f64, searches: usize },

    /// Inverse kinematics produced NaN or infinite joint values
    #[error("Inverse kinematics produced a non-finite solution")]
    NonFinite,

    /// Matrix inversion failed even with damping
    #[error("Jacobian inversion failed: {0}")]
    Numerical(&'static str),

    /// End-effector transform lookup failed
    #[error("Transform lookup unavailable: {0}")]
    Transport(String),

    #[error("Unknown controller mode {0}, expected 1 (position), 2 (teleoperation) or 3 (autonomous)")]
    UnknownMode(i32),

    #[error("Mode request is missing its payload: {0}")]
    MissingPayload(&'static str),

    /// The control loop that owns the input queue has stopped
    #[error("Control loop input channel closed")]
    ChannelClosed,
}

impl ControlError {
    /// True for errors caused by the request itself rather than by numerics.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ControlError::Validation(_) | ControlError::UnknownMode(_) | ControlError::MissingPayload(_)
        )
    }
}
