//! Position-only inverse kinematics.
//!
//! The solver minimizes the distance between the tool tip and the target with
//! Levenberg-Marquardt iterations `dq = (J^T J + mu I)^-1 J^T e`. The orientation of the
//! tool is left free. If a search stalls (typically on the stretched or folded arm where
//! the Jacobian loses rank) it is restarted from a random configuration.

use std::f64::consts::PI;

use nalgebra::Matrix3;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::error::ControlError;
use crate::kinematic_traits::{Joints, Kinematics, Position};
use crate::utils::{is_valid, normalize_angles};

const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e6;

/// Configuration for the Levenberg-Marquardt solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmConfig {
    /// Maximum iterations of a single search.
    pub max_iterations: usize,
    /// Number of searches, the first from the seed and the rest from random configurations.
    pub max_searches: usize,
    /// Position error tolerance (meters).
    pub tolerance: f64,
    /// Damping (mu) the search starts with.
    pub initial_damping: f64,
    /// Seed of the random restarts. Same inputs and seed always give the same solution.
    pub seed: u64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_searches: 50,
            tolerance: 1e-9,
            initial_damping: 1e-3,
            seed: 0,
        }
    }
}

/// Pluggable inverse kinematics. The solution must place the tool tip at the target;
/// a failed solve returns an error and no joint values.
pub trait InverseSolver: Send {
    fn solve(&self, robot: &dyn Kinematics, target: &Position, seed: &Joints) -> Result<Joints, ControlError>;
}

#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    pub const fn new(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// One damped search from `start`. Returns the best joints found and their residual.
    fn search(&self, robot: &dyn Kinematics, target: &Position, start: Joints) -> (Joints, f64) {
        let mut qs = start;
        let mut error = target - robot.forward(&qs).translation.vector;
        let mut residual = error.norm();
        let mut damping = self.config.initial_damping;

        for _ in 0..self.config.max_iterations {
            if residual < self.config.tolerance {
                break;
            }

            let jacobian = robot.jacobian(&qs);
            let jt = jacobian.transpose();
            let normal = jt * jacobian + Matrix3::identity() * damping;
            let Some(normal_inverse) = normal.try_inverse() else {
                damping *= 10.0;
                continue;
            };
            let dq = normal_inverse * (jt * error);

            let candidate = [qs[0] + dq[0], qs[1] + dq[1], qs[2] + dq[2]];
            let candidate_error = target - robot.forward(&candidate).translation.vector;
            let candidate_residual = candidate_error.norm();

            if candidate_residual.is_finite() && candidate_residual < residual {
                qs = candidate;
                error = candidate_error;
                residual = candidate_residual;
                damping = (damping * 0.5).max(MIN_DAMPING);
            } else {
                damping *= 10.0;
                if damping > MAX_DAMPING {
                    // Stalled, no descent direction left
                    break;
                }
            }
        }
        (qs, residual)
    }
}

impl InverseSolver for LevenbergMarquardt {
    fn solve(&self, robot: &dyn Kinematics, target: &Position, seed: &Joints) -> Result<Joints, ControlError> {
        if !is_valid(seed) || !target.iter().all(|c| c.is_finite()) {
            return Err(ControlError::NonFinite);
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let angles = Uniform::new_inclusive(-PI, PI);
        let mut start = *seed;
        let mut best = f64::INFINITY;

        for search in 0..self.config.max_searches {
            let (qs, residual) = self.search(robot, target, start);
            if residual < self.config.tolerance {
                let solution = normalize_angles(&qs);
                if !is_valid(&solution) {
                    return Err(ControlError::NonFinite);
                }
                debug!("IK converged in search {}, residual {:e}", search + 1, residual);
                return Ok(solution);
            }
            best = best.min(residual);
            start = [angles.sample(&mut rng), angles.sample(&mut rng), angles.sample(&mut rng)];
        }

        Err(ControlError::Convergence {
            residual: best,
            searches: self.config.max_searches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics_impl::RRRKinematics;
    use rand::Rng;

    fn reached(robot: &RRRKinematics, qs: &Joints, target: &Position) -> f64 {
        (robot.forward(qs).translation.vector - target).norm()
    }

    #[test]
    fn test_solve_reachable_target() {
        let robot = RRRKinematics::default();
        let solver = LevenbergMarquardt::default();
        let target = Position::new(0.2, 0.0, 0.2);
        let solution = solver.solve(&robot, &target, &[0.0, 0.0, 0.0]).expect("Target must be reachable");
        assert!(reached(&robot, &solution, &target) < 1e-9);
        assert!(solution.iter().all(|q| q.abs() <= PI));
    }

    #[test]
    fn test_solve_round_trip() {
        let robot = RRRKinematics::default();
        let solver = LevenbergMarquardt::default();
        let mut rng = StdRng::seed_from_u64(1234);

        for _ in 0..25 {
            let elbow: f64 = rng.gen_range(0.3..2.8);
            let qs = [
                rng.gen_range(-PI..PI),
                rng.gen_range(-PI..PI),
                if rng.gen_bool(0.5) { elbow } else { -elbow },
            ];
            let target = robot.forward(&qs).translation.vector;
            let solution = solver.solve(&robot, &target, &[0.1, 0.2, 0.3])
                .unwrap_or_else(|e| panic!("No solution for {:?}: {}", qs, e));
            assert!(reached(&robot, &solution, &target) < 1e-9, "{:?} -> {:?}", qs, solution);
        }
    }

    #[test]
    fn test_solve_is_deterministic() {
        let robot = RRRKinematics::default();
        let solver = LevenbergMarquardt::default();
        let target = Position::new(0.1, 0.25, 0.35);
        let seed = [0.0, 0.0, 0.0];
        assert_eq!(solver.solve(&robot, &target, &seed), solver.solve(&robot, &target, &seed));
    }

    #[test]
    fn test_unreachable_inside_shell() {
        // 3.2 cm from the base joint passes the workspace shell check, but the tip is never
        // closer than sqrt(0.03^2 + 0.02^2) to it.
        let robot = RRRKinematics::default();
        let solver = LevenbergMarquardt::new(LmConfig { max_searches: 10, ..LmConfig::default() });
        let result = solver.solve(&robot, &Position::new(0.0, 0.0, 0.232), &[0.0, 0.0, 0.0]);
        match result {
            Err(ControlError::Convergence { residual, searches }) => {
                assert!(residual > 1e-4);
                assert_eq!(searches, 10);
            }
            other => panic!("Expected convergence failure, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_input() {
        let robot = RRRKinematics::default();
        let solver = LevenbergMarquardt::default();
        assert_eq!(
            solver.solve(&robot, &Position::new(f64::NAN, 0.0, 0.2), &[0.0; 3]),
            Err(ControlError::NonFinite)
        );
        assert_eq!(
            solver.solve(&robot, &Position::new(0.2, 0.0, 0.2), &[0.0, f64::INFINITY, 0.0]),
            Err(ControlError::NonFinite)
        );
    }
}
