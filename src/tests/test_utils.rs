use crate::control_loop::{ControlSink, JointState, PoseSource};
use crate::error::ControlError;
use crate::kinematic_traits::{Joints, Kinematics, Position};

/// Sink that keeps everything the loop published.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub joint_states: Vec<JointState>,
    pub end_effectors: Vec<Position>,
    pub targets: Vec<Position>,
    pub random_target_requests: usize,
}

impl ControlSink for RecordingSink {
    fn joint_state(&mut self, state: &JointState) {
        self.joint_states.push(*state);
    }

    fn end_effector(&mut self, position: &Position) {
        self.end_effectors.push(*position);
    }

    fn target(&mut self, target: &Position) {
        self.targets.push(*target);
    }

    fn request_random_target(&mut self) {
        self.random_target_requests += 1;
    }
}

/// Pose source that reports the same measured position every time.
pub(crate) struct FixedPoseSource(pub Position);

impl PoseSource for FixedPoseSource {
    fn lookup(&mut self) -> Result<Option<Position>, ControlError> {
        Ok(Some(self.0))
    }
}

/// Pose source whose transform lookup always fails.
pub(crate) struct FailingPoseSource;

impl PoseSource for FailingPoseSource {
    fn lookup(&mut self) -> Result<Option<Position>, ControlError> {
        Err(ControlError::Transport("could not find a connection between world and end_effector".into()))
    }
}

pub(crate) fn tip(robot: &dyn Kinematics, qs: &Joints) -> Position {
    robot.forward(qs).translation.vector
}

pub(crate) fn assert_position_eq(actual: &Position, expected: &Position, tolerance: f64) {
    let error = (actual - expected).norm();
    assert!(
        error < tolerance,
        "Positions differ by {:e}: actual {:?}, expected {:?}",
        error,
        actual.as_slice(),
        expected.as_slice()
    );
}

pub(crate) fn assert_joints_eq(actual: &Joints, expected: &Joints, tolerance: f64) {
    for i in 0..3 {
        assert!(
            (actual[i] - expected[i]).abs() < tolerance,
            "Joint {} differs: actual {:?}, expected {:?}",
            i + 1,
            actual,
            expected
        );
    }
}
