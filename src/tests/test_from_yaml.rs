use std::f64::consts::FRAC_PI_2;

use crate::config::ControllerConfig;
use crate::control_loop::ControlLoop;
use crate::parameter_error::ParameterError;

const READ_ERROR: &str = "Failed to load controller configuration from file";

#[test]
fn test_config_from_yaml() {
    let loaded = ControllerConfig::from_yaml_file("src/tests/data/controller.yaml").expect(READ_ERROR);

    assert_eq!(loaded.frequency, 50.0);
    assert_eq!(loaded.bounds.r_min, 0.05);
    assert_eq!(loaded.bounds.r_max, 0.5);
    assert_eq!(loaded.bounds.z_offset, 0.2);

    assert_eq!(loaded.geometry.d1, 0.2);
    assert!((loaded.geometry.alpha2 - FRAC_PI_2).abs() < 1e-12);
    assert_eq!(loaded.geometry.d2, 0.02);
    assert_eq!(loaded.geometry.a3, 0.25);
    assert_eq!(loaded.geometry.tool, 0.3);

    assert_eq!(loaded.solver.max_iterations, 200);
    assert_eq!(loaded.solver.max_searches, 20);
    assert_eq!(loaded.solver.tolerance, 1.0e-10);
    assert_eq!(loaded.solver.initial_damping, ControllerConfig::default().solver.initial_damping);
    assert_eq!(loaded.solver.seed, 42);
}

#[test]
fn test_loaded_config_drives_loop() {
    let loaded = ControllerConfig::from_yaml_file("src/tests/data/controller.yaml").expect(READ_ERROR);
    let control = ControlLoop::new(loaded).expect("Loaded configuration is valid");
    assert_eq!(control.period().as_millis(), 20);

    // Longer tool: stretched arm reaches 0.55 along x.
    let tip = control.robot().forward(&[0.0, 0.0, 0.0]).translation.vector;
    assert!((tip.x - 0.55).abs() < 1e-12);
}

#[test]
fn test_invalid_radii_rejected() {
    let result = ControllerConfig::from_yaml_file("src/tests/data/bad_radii.yaml");
    assert!(matches!(result, Err(ParameterError::InvalidValue { field: "r_max", .. })));
}

#[test]
fn test_missing_file() {
    let result = ControllerConfig::from_yaml_file("src/tests/data/no_such_file.yaml");
    assert!(matches!(result, Err(ParameterError::IoError(_))));
}
