//! Defines the arm geometry data structure

pub mod rrr_kinematics {
    use std::f64::consts::FRAC_PI_2;

    /// Modified Denavit-Hartenberg geometry of the three revolute joints and the tool.
    /// Each link transform is `RotX(alpha) * TransX(a) * RotZ(q) * TransZ(d)`.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Parameters {
        /// Vertical offset of joint 1 above the base (d1).
        pub d1: f64,

        /// Twist between the axes of joint 1 and joint 2 (alpha1), normally 90 degrees.
        pub alpha2: f64,

        /// Offset along the axis of joint 2 (d2).
        pub d2: f64,

        /// Length of the link between joint 2 and joint 3 (a2).
        pub a3: f64,

        /// Distance from joint 3 to the tool tip, along the x-axis of the last frame.
        pub tool: f64,
    }

    impl Default for Parameters {
        fn default() -> Self {
            Parameters {
                d1: 0.2,
                alpha2: FRAC_PI_2,
                d2: 0.02,
                a3: 0.25,
                tool: 0.28,
            }
        }
    }

    impl Parameters {
        /// The longest distance the tool tip can be from the axis of joint 2.
        pub fn reach(&self) -> f64 {
            self.a3 + self.tool
        }

        /// Convert to string yaml representation (quick viewing, etc).
        pub fn to_yaml(&self) -> String {
            format!(
                "geometry:\n  \
              d1: {}\n  \
              alpha2: {}\n  \
              d2: {}\n  \
              a3: {}\n  \
              tool: {}\n",
                self.d1,
                crate::utils::deg(&self.alpha2),
                self.d2,
                self.a3,
                self.tool,
            )
        }
    }
}
