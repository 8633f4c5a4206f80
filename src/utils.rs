//! Helper functions

use std::f64::consts::PI;
use crate::kinematic_traits::{Joints, Position};

/// Checks if all joint values are finite
pub fn is_valid(qs: &Joints) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

/// Wraps every angle into (-PI, PI].
pub fn normalize_angles(qs: &Joints) -> Joints {
    qs.map(|q| {
        let wrapped = (q + PI).rem_euclid(2.0 * PI) - PI;
        if wrapped == -PI { PI } else { wrapped }
    })
}

/// Joint values as a string, converting radians to degrees.
pub fn joints_to_string(joints: &Joints) -> String {
    let row: Vec<String> = joints.iter().map(|q| format!("{:5.2}", q.to_degrees())).collect();
    format!("[{}]", row.join(" "))
}

pub fn position_to_string(position: &Position) -> String {
    format!("[{:.4} {:.4} {:.4}]", position.x, position.y, position.z)
}

/// Allows to specify joint values in degrees (converts to radians)
#[allow(dead_code)]
pub fn as_radians(degrees: [i32; 3]) -> Joints {
    std::array::from_fn(|i| (degrees[i] as f64).to_radians())
}

/// formatting for YAML output
pub(crate) fn deg(x: &f64) -> String {
    if *x == 0.0 {
        return "0".to_string();
    }
    format!("deg({:.4})", x.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_with_all_finite() {
        let qs = [0.0, 1.0, -PI];
        assert!(is_valid(&qs));
    }

    #[test]
    fn test_is_valid_with_nan() {
        let qs = [0.0, f64::NAN, 1.0];
        assert!(!is_valid(&qs));
    }

    #[test]
    fn test_is_valid_with_infinity() {
        let qs = [f64::INFINITY, 1.0, -1.0];
        assert!(!is_valid(&qs));
    }

    #[test]
    fn test_normalize_angles() {
        let normalized = normalize_angles(&[2.0 * PI + 3.0, -0.5, -2.0 * PI + 0.25]);
        assert!((normalized[0] - 3.0).abs() < 1e-12);
        assert!((normalized[1] + 0.5).abs() < 1e-12);
        assert!((normalized[2] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_deg_formatting() {
        assert_eq!(deg(&0.0), "0");
        assert_eq!(deg(&(PI / 2.0)), "deg(90.0000)");
        assert_eq!(joints_to_string(&as_radians([90, 0, -45])), "[90.00  0.00 -45.00]");
    }
}
