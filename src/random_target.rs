//! Source of random targets for the autonomous mode.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use tracing::warn;

use crate::kinematic_traits::Position;
use crate::workspace::{WorkspaceBounds, WorkspaceValidator};

/// Candidates drawn before giving up on finding a valid target.
pub const MAX_ATTEMPTS: usize = 100_000;

/// Draws targets uniformly from the workspace box and keeps only those the validator accepts.
pub struct RandomTargets {
    validator: WorkspaceValidator,
    range: Uniform<f64>,
    rng: StdRng,
}

impl RandomTargets {
    pub fn new(bounds: WorkspaceBounds, seed: u64) -> Self {
        RandomTargets {
            validator: WorkspaceValidator::new(bounds),
            range: Uniform::new_inclusive(-bounds.r_min, bounds.r_max),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Next valid target, `None` if none was found within `MAX_ATTEMPTS` candidates
    /// (the bounds leave no or almost no valid point).
    pub fn next_target(&mut self) -> Option<Position> {
        for _ in 0..MAX_ATTEMPTS {
            let candidate = Position::new(
                self.range.sample(&mut self.rng),
                self.range.sample(&mut self.rng),
                self.range.sample(&mut self.rng),
            );
            if self.validator.validate(&candidate).is_ok() {
                return Some(candidate);
            }
        }
        warn!("No valid random target in {} attempts", MAX_ATTEMPTS);
        None
    }
}

impl Iterator for RandomTargets {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        self.next_target()
    }
}
