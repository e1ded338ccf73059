//! Analysis drivers for spicemos devices.
//!
//! This crate assembles devices into a [`Circuit`] and runs the analyses
//! that exercise every device entry point:
//! - DC operating point by Newton-Raphson through the INITJCT, INITFIX and
//!   INITFLOAT phases
//! - Fixed-step transient with predictor and truncation-error estimates
//! - AC small-signal sweep and pole-zero admittance matrices
//! - Dense and sparse LU solves of the assembled systems

pub mod ac;
pub mod circuit;
pub mod elements;
pub mod error;
pub mod linear;
pub mod newton;
pub mod transient;

pub use ac::AcPoint;
pub use circuit::{Circuit, Element};
pub use elements::{Resistor, VoltageSource, Waveform};
pub use error::{Error, Result};
pub use newton::OpResult;
pub use transient::{TimePoint, TransientResult};
