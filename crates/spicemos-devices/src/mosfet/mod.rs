//! SPICE MOSFET models (levels 1, 2, 3 and 6).
//!
//! # Features
//!
//! - Shichman-Hodges (level 1), Grove-Frohman (level 2), semi-empirical
//!   short-channel (level 3) and Sakurai-Newton n-th power law (level 6)
//!   channel equations
//! - Bulk junction diodes with depletion and sidewall capacitance
//! - Meyer gate capacitance model with overlap capacitances
//! - Series drain/source resistance through internal nodes
//! - Inverse-mode operation when the drain and source swap roles
//!
//! # Usage
//!
//! ```text
//! .MODEL NMOD NMOS LEVEL=1 VTO=0.7 KP=2e-5 LAMBDA=0.02
//! M1 d g s b NMOD W=10u L=2u AD=20p AS=20p
//! ```

mod acload;
mod ask;
mod conv;
pub mod defs;
pub mod disto;
mod eval;
mod instance;
mod junction;
mod level1;
mod level2;
mod level3;
mod level6;
mod limit;
mod load;
mod meyer;
mod model;
mod params;
mod setup;
mod temperature;

pub use defs::{ConductionMode, MosLevel, Polarity};
pub use disto::{DistortionCoefficients, DistortionMode, Taylor3};
pub use instance::{Mosfet, Terminals};
pub use limit::{fetlim, limvds, pnjlim};
pub use model::MosModel;
pub use params::{InstanceParam, InstanceQuery, ModelParam};
