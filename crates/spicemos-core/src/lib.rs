//! Circuit-side collaborators for the spicemos MOSFET evaluator.
//!
//! A device never owns the linear system it contributes to. This crate
//! provides the pieces a device reaches through during setup and load:
//! - Node registry with internal-node synthesis ([`NodeTable`])
//! - Element-handle sparse matrix with real and imaginary planes ([`SparseMatrix`])
//! - Node-indexed right-hand-side and solution vectors ([`NodeVector`])
//! - Per-timepoint history state ([`StateVector`])
//! - Analysis mode bits ([`Mode`]), solver options ([`SimOptions`])
//! - The numerical-integration collaborator ([`Integrator`])
//! - The per-analysis record handed to every device entry point ([`SimContext`])

pub mod context;
pub mod error;
pub mod integrate;
pub mod matrix;
pub mod mode;
pub mod node;
pub mod options;
pub mod state;
pub mod vector;

pub use context::SimContext;
pub use error::{Error, Result};
pub use integrate::{CompanionIntegrator, IntegrationMethod, Integrator, TruncationInputs};
pub use matrix::{ElementHandle, SparseMatrix};
pub use mode::Mode;
pub use node::{NodeId, NodeKind, NodeTable};
pub use options::SimOptions;
pub use state::StateVector;
pub use vector::NodeVector;
