//! MOSFET model evaluation for spicemos.
//!
//! This crate provides the SPICE level 1, 2, 3 and 6 MOSFET models behind a
//! common [`Device`] interface:
//! - Temperature correction of model and instance parameters
//! - Setup of internal drain/source nodes and matrix element handles
//! - Newton load with voltage limiting, bypass and charge integration
//! - AC and pole-zero small-signal loads
//! - Distortion Taylor coefficients by finite differences
//! - Convergence test, truncation error, initial conditions and backup

pub mod device;
pub mod error;
pub mod mosfet;

pub use device::{BackupMode, Device};
pub use error::{Error, Result};
pub use mosfet::{
    ConductionMode, DistortionCoefficients, DistortionMode, InstanceParam, InstanceQuery,
    ModelParam, MosLevel, MosModel, Mosfet, Polarity, Terminals,
};
