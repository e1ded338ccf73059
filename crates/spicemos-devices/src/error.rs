//! Error types for device models.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A parameter value is out of range, or a request is not supported.
    #[error("bad parameter {name}: {reason}")]
    BadParameter { name: String, reason: String },

    /// No parameter has this name.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// Substrate doping must exceed the intrinsic carrier concentration.
    #[error("substrate doping {nsub:e} cm^-3 is not above the intrinsic concentration")]
    SubstrateDoping { nsub: f64 },

    /// The device was used before setup/temperature ran.
    #[error("device {0} used before setup")]
    NotSetup(String),

    #[error(transparent)]
    Core(#[from] spicemos_core::Error),
}

impl Error {
    pub fn bad_parameter(name: &str, reason: impl Into<String>) -> Self {
        Error::BadParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
