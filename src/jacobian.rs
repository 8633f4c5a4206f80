extern crate nalgebra as na;

use crate::error::ControlError;
use crate::kinematic_traits::{JacobianMatrix, Joints, Kinematics};
use na::{Matrix3, Vector3};
use tracing::warn;

/// Condition number above which the Jacobian is treated as singular.
pub const SINGULARITY_THRESHOLD: f64 = 1e6;

/// Damping factor (lambda) of the damped least squares inverse.
pub const DAMPING: f64 = 1e-5;

/// Singular values at or below this are dropped by the pseudo-inverse.
const PINV_EPSILON: f64 = 1e-12;

const SVD_MAX_ITERATIONS: usize = 1000;

/// Struct representing the position Jacobian at some joint configuration
#[derive(Debug, Clone, Copy)]
pub struct Jacobian {
    /// A 3x3 matrix representing the Jacobian
    ///
    /// The Jacobian matrix maps the joint velocities to the end-effector linear velocity.
    /// Each column corresponds to a joint, and each row corresponds to x, y or z.
    matrix: JacobianMatrix,
}

impl Jacobian {
    /// Evaluates the Jacobian of the given robot at the given joint configuration
    pub fn new(robot: &(impl Kinematics + ?Sized), qs: &Joints) -> Self {
        Self::from_matrix(robot.jacobian(qs))
    }

    pub fn from_matrix(matrix: JacobianMatrix) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &JacobianMatrix {
        &self.matrix
    }

    /// Ratio of the largest to the smallest singular value. Infinite if the smallest is zero
    /// or the decomposition produced something not finite.
    pub fn condition_number(&self) -> f64 {
        if !self.matrix.iter().all(|v| v.is_finite()) {
            return f64::INFINITY;
        }
        let Some(svd) = self.matrix.try_svd(false, false, f64::EPSILON, SVD_MAX_ITERATIONS) else {
            return f64::INFINITY;
        };
        let singular_values = svd.singular_values;
        let max = singular_values.max();
        let min = singular_values.min();
        if !(max.is_finite() && min.is_finite()) || min <= 0.0 {
            return f64::INFINITY;
        }
        max / min
    }

    /// Linear velocity of the end-effector for the given joint velocities.
    pub fn linear_velocity(&self, joint_velocities: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * joint_velocities
    }
}

/// How well conditioned the Jacobian is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conditioning {
    Normal,
    Singular,
}

/// Selects and performs the inversion of the Jacobian, switching to damped least squares
/// close to singular configurations.
#[derive(Debug, Clone, Copy)]
pub struct SingularityGuard {
    /// Condition number above which the damped inverse is used
    pub threshold: f64,

    /// Lambda of the damped inverse `J^T (J J^T + lambda^2 I)^-1`
    pub damping: f64,
}

impl Default for SingularityGuard {
    fn default() -> Self {
        SingularityGuard {
            threshold: SINGULARITY_THRESHOLD,
            damping: DAMPING,
        }
    }
}

impl SingularityGuard {
    pub fn classify(&self, jacobian: &Jacobian) -> Conditioning {
        let condition = jacobian.condition_number();
        if condition > self.threshold {
            warn!("Jacobian near-singular (condition number: {:e})", condition);
            Conditioning::Singular
        } else {
            Conditioning::Normal
        }
    }

    /// Inverts the Jacobian the way the conditioning requires: Moore-Penrose pseudo-inverse
    /// when normal, damped least squares when singular.
    pub fn invert(
        &self,
        jacobian: &Jacobian,
        conditioning: Conditioning,
    ) -> Result<Matrix3<f64>, ControlError> {
        let inverse = match conditioning {
            Conditioning::Normal => self.pseudo_inverse(jacobian)?,
            Conditioning::Singular => self.damped_inverse(jacobian)?,
        };
        if inverse.iter().all(|v| v.is_finite()) {
            Ok(inverse)
        } else {
            Err(ControlError::Numerical("inverse contains non-finite values"))
        }
    }

    /// Classifies, then inverts. Returns the inverse with the conditioning it was computed for.
    pub fn classify_and_invert(
        &self,
        jacobian: &Jacobian,
    ) -> Result<(Matrix3<f64>, Conditioning), ControlError> {
        let conditioning = self.classify(jacobian);
        let inverse = self.invert(jacobian, conditioning)?;
        Ok((inverse, conditioning))
    }

    fn pseudo_inverse(&self, jacobian: &Jacobian) -> Result<Matrix3<f64>, ControlError> {
        let svd = jacobian
            .matrix
            .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
            .ok_or(ControlError::Numerical("singular value decomposition did not converge"))?;
        svd.pseudo_inverse(PINV_EPSILON)
            .map_err(|_| ControlError::Numerical("unable to compute the pseudoinverse"))
    }

    fn damped_inverse(&self, jacobian: &Jacobian) -> Result<Matrix3<f64>, ControlError> {
        let j = &jacobian.matrix;
        let damped = j * j.transpose() + Matrix3::identity() * (self.damping * self.damping);
        let damped_inverse = damped
            .try_inverse()
            .ok_or(ControlError::Numerical("damped matrix is not invertible"))?;
        Ok(j.transpose() * damped_inverse)
    }
}
