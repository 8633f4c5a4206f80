//! Workspace bounds of the arm and the checks every Cartesian target must pass.

use crate::error::WorkspaceViolation;
use crate::kinematic_traits::Position;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkspaceBounds {
    /// Inner radius of the reachable shell around the base joint
    pub r_min: f64,

    /// Outer radius of the reachable shell around the base joint
    pub r_max: f64,

    /// Height of the base joint above the reference frame
    pub z_offset: f64,
}

impl Default for WorkspaceBounds {
    fn default() -> Self {
        WorkspaceBounds {
            r_min: 0.03,
            r_max: 0.53,
            z_offset: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceValidator {
    pub bounds: WorkspaceBounds,
}

impl WorkspaceValidator {
    pub fn new(bounds: WorkspaceBounds) -> Self {
        WorkspaceValidator { bounds }
    }

    /// True if the point lies in the spherical shell `[r_min, r_max]` centered at the base joint.
    pub fn is_reachable(&self, x: f64, y: f64, z: f64) -> bool {
        let b = &self.bounds;
        let squared = x * x + y * y + (z - b.z_offset) * (z - b.z_offset);
        b.r_min * b.r_min <= squared && squared <= b.r_max * b.r_max
    }

    /// True if every coordinate lies in `[-r_min, r_max]`.
    pub fn is_in_box(&self, x: f64, y: f64, z: f64) -> bool {
        // The lower limit is -r_min, not -r_max. Kept as is until the intended
        // box is clarified; this is the only place to change.
        let (lower, upper) = self.box_limits();
        [x, y, z].iter().all(|&c| lower <= c && c <= upper)
    }

    fn box_limits(&self) -> (f64, f64) {
        (-self.bounds.r_min, self.bounds.r_max)
    }

    /// Both checks, reachability first.
    pub fn validate(&self, target: &Position) -> Result<(), WorkspaceViolation> {
        let (x, y, z) = (target.x, target.y, target.z);
        if !self.is_reachable(x, y, z) {
            let b = &self.bounds;
            return Err(WorkspaceViolation::OutOfReach {
                x,
                y,
                z,
                distance: (x * x + y * y + (z - b.z_offset).powi(2)).sqrt(),
                r_min: b.r_min,
                r_max: b.r_max,
            });
        }
        if !self.is_in_box(x, y, z) {
            let (lower, upper) = self.box_limits();
            return Err(WorkspaceViolation::OutOfBox { x, y, z, lower, upper });
        }
        Ok(())
    }
}
