//! Controller configuration: control frequency, workspace bounds, arm geometry and solver
//! settings. Every value has a default; a YAML file (optional feature) overrides any subset.

use crate::ik_solver::LmConfig;
use crate::parameter_error::ParameterError;
use crate::parameters::rrr_kinematics::Parameters;
use crate::workspace::WorkspaceBounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Control loop frequency, Hz.
    pub frequency: f64,
    pub bounds: WorkspaceBounds,
    pub geometry: Parameters,
    pub solver: LmConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            frequency: 100.0,
            bounds: WorkspaceBounds::default(),
            geometry: Parameters::default(),
            solver: LmConfig::default(),
        }
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::invalid(field, format!("must be finite (got {})", value)))
    }
}

impl ControllerConfig {
    /// Checks the values make sense together.
    pub fn validate(&self) -> Result<(), ParameterError> {
        finite("frequency", self.frequency)?;
        if self.frequency <= 0.0 {
            return Err(ParameterError::invalid("frequency", format!("must be positive (got {})", self.frequency)));
        }

        let b = &self.bounds;
        finite("r_min", b.r_min)?;
        finite("r_max", b.r_max)?;
        finite("z_offset", b.z_offset)?;
        if b.r_min < 0.0 || b.r_max <= b.r_min {
            return Err(ParameterError::invalid(
                "r_max",
                format!("need 0 <= r_min < r_max (got r_min {}, r_max {})", b.r_min, b.r_max),
            ));
        }
        // Some point of the box [-r_min, r_max]^3 must be in the reach shell around (0, 0, z_offset).
        let nearest_z = b.z_offset.clamp(-b.r_min, b.r_max) - b.z_offset;
        let farthest_z = (-b.r_min - b.z_offset).abs().max((b.r_max - b.z_offset).abs());
        let farthest = (2.0 * b.r_max * b.r_max + farthest_z * farthest_z).sqrt();
        if nearest_z.abs() > b.r_max || farthest < b.r_min {
            return Err(ParameterError::invalid(
                "z_offset",
                format!("no target in [{}, {}] is reachable with z_offset {}", -b.r_min, b.r_max, b.z_offset),
            ));
        }

        let g = &self.geometry;
        for (name, value) in [("d1", g.d1), ("alpha2", g.alpha2), ("d2", g.d2), ("a3", g.a3), ("tool", g.tool)] {
            finite(name, value)?;
        }
        if g.a3 <= 0.0 {
            return Err(ParameterError::invalid("a3", format!("link length must be positive (got {})", g.a3)));
        }

        let s = &self.solver;
        finite("tolerance", s.tolerance)?;
        finite("initial_damping", s.initial_damping)?;
        if s.tolerance <= 0.0 {
            return Err(ParameterError::invalid("tolerance", "must be positive"));
        }
        if s.initial_damping <= 0.0 {
            return Err(ParameterError::invalid("initial_damping", "must be positive"));
        }
        if s.max_iterations == 0 || s.max_searches == 0 {
            return Err(ParameterError::invalid("max_iterations", "iterations and searches must be at least 1"));
        }
        Ok(())
    }

    /// Convert to string yaml representation, readable back by `from_yaml_str`.
    pub fn to_yaml(&self) -> String {
        format!(
            "frequency: {}\n\
            r_min: {}\n\
            r_max: {}\n\
            z_offset: {}\n\
            {}\
            solver:\n  \
              max_iterations: {}\n  \
              max_searches: {}\n  \
              tolerance: {:e}\n  \
              initial_damping: {:e}\n  \
              seed: {}\n",
            self.frequency,
            self.bounds.r_min,
            self.bounds.r_max,
            self.bounds.z_offset,
            self.geometry.to_yaml(),
            self.solver.max_iterations,
            self.solver.max_searches,
            self.solver.tolerance,
            self.solver.initial_damping,
            self.solver.seed,
        )
    }
}

#[cfg(feature = "allow_filesystem")]
mod from_yaml {
    use std::path::Path;
    use yaml_rust2::{Yaml, YamlLoader};

    use super::ControllerConfig;
    use crate::parameter_error::ParameterError;

    impl ControllerConfig {
        /// Read the controller configuration from YAML file. YAML file like this is supported:
        /// ```yaml
        /// frequency: 100
        /// r_min: 0.03
        /// r_max: 0.53
        /// z_offset: 0.2
        /// geometry:
        ///   d1: 0.2
        ///   alpha2: deg(90)
        ///   d2: 0.02
        ///   a3: 0.25
        ///   tool: 0.28
        /// solver:
        ///   max_iterations: 100
        ///   max_searches: 50
        ///   tolerance: 1.0e-9
        ///   seed: 0
        /// ```
        /// Every key is optional; missing keys keep their defaults. The angle `alpha2` can be
        /// given in radians or as deg(angle).
        pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
            let contents = std::fs::read_to_string(path)?;
            Self::from_yaml_str(&contents)
        }

        pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
            let docs = YamlLoader::load_from_str(contents)
                .map_err(|e| ParameterError::ParseError(format!("{}", e)))?;
            let mut config = ControllerConfig::default();
            let Some(doc) = docs.first() else {
                return Ok(config);
            };
            if !matches!(doc, Yaml::Hash(_) | Yaml::Null) {
                return Err(ParameterError::ParseError("expected a mapping at the top level".to_string()));
            }

            config.frequency = read_f64(doc, "frequency", config.frequency)?;
            config.bounds.r_min = read_f64(doc, "r_min", config.bounds.r_min)?;
            config.bounds.r_max = read_f64(doc, "r_max", config.bounds.r_max)?;
            config.bounds.z_offset = read_f64(doc, "z_offset", config.bounds.z_offset)?;

            let geometry = &doc["geometry"];
            let g = &mut config.geometry;
            g.d1 = read_f64(geometry, "d1", g.d1)?;
            g.alpha2 = read_angle(geometry, "alpha2", g.alpha2)?;
            g.d2 = read_f64(geometry, "d2", g.d2)?;
            g.a3 = read_f64(geometry, "a3", g.a3)?;
            g.tool = read_f64(geometry, "tool", g.tool)?;

            let solver = &doc["solver"];
            let s = &mut config.solver;
            s.max_iterations = read_usize(solver, "max_iterations", s.max_iterations)?;
            s.max_searches = read_usize(solver, "max_searches", s.max_searches)?;
            s.tolerance = read_f64(solver, "tolerance", s.tolerance)?;
            s.initial_damping = read_f64(solver, "initial_damping", s.initial_damping)?;
            s.seed = read_usize(solver, "seed", s.seed as usize)? as u64;

            config.validate()?;
            Ok(config)
        }
    }

    fn read_f64(node: &Yaml, key: &str, default: f64) -> Result<f64, ParameterError> {
        match &node[key] {
            Yaml::BadValue | Yaml::Null => Ok(default),
            Yaml::Integer(value) => Ok(*value as f64),
            Yaml::Real(text) => node[key]
                .as_f64()
                .ok_or_else(|| ParameterError::ParseError(format!("{}: not a number: {}", key, text))),
            other => Err(ParameterError::ParseError(format!("{}: expected a number, got {:?}", key, other))),
        }
    }

    /// Like `read_f64`, also accepting deg(angle).
    fn read_angle(node: &Yaml, key: &str, default: f64) -> Result<f64, ParameterError> {
        match &node[key] {
            Yaml::String(text) => parse_angle(text),
            _ => read_f64(node, key, default),
        }
    }

    fn read_usize(node: &Yaml, key: &str, default: usize) -> Result<usize, ParameterError> {
        match &node[key] {
            Yaml::BadValue | Yaml::Null => Ok(default),
            Yaml::Integer(value) if *value >= 0 => Ok(*value as usize),
            other => Err(ParameterError::ParseError(format!(
                "{}: expected a non-negative integer, got {:?}",
                key, other
            ))),
        }
    }

    /// Parses deg(angle) into radians.
    fn parse_angle(text: &str) -> Result<f64, ParameterError> {
        let trimmed = text.trim();
        let degrees = trimmed
            .strip_prefix("deg(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ParameterError::WrongAngle(trimmed.to_string()))?;
        degrees
            .trim()
            .parse::<f64>()
            .map(f64::to_radians)
            .map_err(|_| ParameterError::WrongAngle(trimmed.to_string()))
    }

}
