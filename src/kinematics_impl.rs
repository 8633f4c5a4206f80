use crate::kinematic_traits::{JacobianMatrix, Joints, Kinematics, Pose, DOF};
use crate::parameters::rrr_kinematics::Parameters;
use nalgebra::{Isometry3, Vector3};

#[derive(Debug, Clone, Copy)]
pub struct RRRKinematics {
    /// The parameters that were used to construct this solver.
    parameters: Parameters,
}

impl RRRKinematics {
    /// Creates a new `RRRKinematics` instance with the given parameters.
    pub fn new(parameters: Parameters) -> Self {
        RRRKinematics { parameters }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

impl Default for RRRKinematics {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}

/// Modified DH link transform: RotX(alpha) * TransX(a) * RotZ(theta) * TransZ(d)
fn link(alpha: f64, a: f64, theta: f64, d: f64) -> Isometry3<f64> {
    Isometry3::rotation(Vector3::x() * alpha)
        * Isometry3::translation(a, 0.0, 0.0)
        * Isometry3::rotation(Vector3::z() * theta)
        * Isometry3::translation(0.0, 0.0, d)
}

impl Kinematics for RRRKinematics {
    fn forward(&self, qs: &Joints) -> Pose {
        let [_, _, j3] = self.forward_with_joint_poses(qs);
        j3 * Isometry3::translation(self.parameters.tool, 0.0, 0.0)
    }

    fn forward_with_joint_poses(&self, qs: &Joints) -> [Pose; DOF] {
        let p = &self.parameters;
        let j1 = link(0.0, 0.0, qs[0], p.d1);
        let j2 = j1 * link(p.alpha2, 0.0, qs[1], p.d2);
        let j3 = j2 * link(0.0, p.a3, qs[2], 0.0);
        [j1, j2, j3]
    }

    fn jacobian(&self, qs: &Joints) -> JacobianMatrix {
        let frames = self.forward_with_joint_poses(qs);
        let tip = self.forward(qs).translation.vector;

        let mut jacobian = JacobianMatrix::zeros();
        for (i, frame) in frames.iter().enumerate() {
            // Revolute joint: z_i x (p_tip - o_i)
            let axis = frame.rotation * Vector3::z();
            let lever = tip - frame.translation.vector;
            jacobian.set_column(i, &axis.cross(&lever));
        }
        jacobian
    }
}
