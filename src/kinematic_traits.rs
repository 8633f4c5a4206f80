//! Defines the types shared by the kinematic model and the controller.

extern crate nalgebra as na;

use na::{Isometry3, Matrix3, Vector3};

/// Pose is used a pose of the end-effector (tool tip). It contains both Cartesian position
/// and rotation quaternion, even if only the position is controlled.
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(0.2, 0.0, 0.2);
/// let transform = Pose::from_parts(translation, UnitQuaternion::identity());
/// ```
pub type Pose = Isometry3<f64>;

/// Cartesian position of the end-effector in the reference (base) frame, in meters.
pub type Position = Vector3<f64>;

/// Three joint angles in radians. The array type guarantees there are always exactly three.
pub type Joints = [f64; 3];

/// 3 x 3 position Jacobian. Each column corresponds to a joint, each row to one of
/// the x, y, z linear velocity components.
pub type JacobianMatrix = Matrix3<f64>;

/// The number of joints of the arm.
pub const DOF: usize = 3;

/// Joint configuration the controller starts from.
pub const JOINTS_AT_ZERO: Joints = [0.0; 3];

/// Joint names published with every joint state.
pub const JOINT_NAMES: [&str; DOF] = ["joint_1", "joint_2", "joint_3"];

pub trait Kinematics: Send + Sync {
    /// Forward kinematics: pose of the tool tip for the given joint angles.
    fn forward(&self, qs: &Joints) -> Pose;

    /// Poses of all joint frames (after the joint rotation is applied), base first.
    /// The tool offset is not included; use `forward` for the tool tip.
    fn forward_with_joint_poses(&self, qs: &Joints) -> [Pose; DOF];

    /// Position rows of the geometric Jacobian expressed in the reference frame.
    fn jacobian(&self, qs: &Joints) -> JacobianMatrix;
}
