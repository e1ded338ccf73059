//! Solver-wide options read by devices.

/// Tolerances, limits and default geometry shared by every device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimOptions {
    /// Relative tolerance. Default: 1e-3
    pub reltol: f64,
    /// Absolute current tolerance (A). Default: 1e-12
    pub abstol: f64,
    /// Absolute voltage tolerance (V). Default: 1e-6
    pub vntol: f64,
    /// Charge tolerance (C). Default: 1e-14
    pub chgtol: f64,
    /// Truncation error overestimation factor. Default: 7
    pub trtol: f64,
    /// Minimum conductance across every junction (S). Default: 1e-12
    pub gmin: f64,
    /// Allow devices to skip re-evaluation of unchanged bias points. Default: true
    pub bypass: bool,
    /// Disable drain-source step limiting in inverse mode. Default: false
    pub fix_limit: bool,
    /// Circuit temperature (K). Default: 300.15
    pub temp: f64,
    /// Nominal temperature for model parameters (K). Default: 300.15
    pub tnom: f64,
    /// Default channel length (m). Default: 100e-6
    pub default_l: f64,
    /// Default channel width (m). Default: 100e-6
    pub default_w: f64,
    /// Default drain diffusion area (m^2). Default: 0
    pub default_ad: f64,
    /// Default source diffusion area (m^2). Default: 0
    pub default_as: f64,
    /// Newton iteration limit for an operating point. Default: 100
    pub max_iterations: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            reltol: 1e-3,
            abstol: 1e-12,
            vntol: 1e-6,
            chgtol: 1e-14,
            trtol: 7.0,
            gmin: 1e-12,
            bypass: true,
            fix_limit: false,
            temp: 300.15,
            tnom: 300.15,
            default_l: 100e-6,
            default_w: 100e-6,
            default_ad: 0.0,
            default_as: 0.0,
            max_iterations: 100,
        }
    }
}
