//! The record every device entry point receives.

use crate::integrate::{CompanionIntegrator, IntegrationMethod, Integrator, TruncationInputs};
use crate::matrix::SparseMatrix;
use crate::mode::Mode;
use crate::node::NodeTable;
use crate::options::SimOptions;
use crate::state::StateVector;
use crate::vector::NodeVector;

/// Number of past step sizes remembered.
pub const DELTA_HISTORY: usize = 7;

/// Shared solver state visible to devices.
///
/// The outer solver owns the mode, the step sizes and the solution vectors.
/// Devices read the previous iterate from `rhs_old` (and `irhs_old` in AC),
/// accumulate into `matrix`/`rhs`/`irhs`, and keep their history in
/// `states`.
#[derive(Debug)]
pub struct SimContext {
    pub mode: Mode,
    pub options: SimOptions,
    pub nodes: NodeTable,
    pub matrix: SparseMatrix,
    /// Right-hand side under assembly (real part).
    pub rhs: NodeVector,
    /// Right-hand side under assembly (imaginary part).
    pub irhs: NodeVector,
    /// Previous iterate (real part).
    pub rhs_old: NodeVector,
    /// Previous iterate (imaginary part).
    pub irhs_old: NodeVector,
    pub states: StateVector,
    pub integrator: Box<dyn Integrator>,
    /// Present simulation time (s).
    pub time: f64,
    /// Present time step.
    pub delta: f64,
    /// Previous time steps, most recent first.
    pub delta_old: [f64; DELTA_HISTORY],
    /// Angular frequency for AC loads (rad/s).
    pub omega: f64,
    /// Non-convergence votes cast during the present iteration.
    pub noncon: usize,
    /// Name of the last device that voted against convergence.
    pub trouble: Option<String>,
}

impl SimContext {
    /// Empty context with backward-Euler integration.
    pub fn new(options: SimOptions) -> Self {
        Self {
            mode: Mode::DCOP | Mode::INITJCT,
            options,
            nodes: NodeTable::new(),
            matrix: SparseMatrix::new(),
            rhs: NodeVector::default(),
            irhs: NodeVector::default(),
            rhs_old: NodeVector::default(),
            irhs_old: NodeVector::default(),
            states: StateVector::default(),
            integrator: Box::new(CompanionIntegrator::new(IntegrationMethod::BackwardEuler)),
            time: 0.0,
            delta: 0.0,
            delta_old: [0.0; DELTA_HISTORY],
            omega: 0.0,
            noncon: 0,
            trouble: None,
        }
    }

    /// Replace the integration collaborator.
    pub fn with_integrator(mut self, integrator: Box<dyn Integrator>) -> Self {
        self.integrator = integrator;
        self
    }

    /// Dimension of the linear system (ground excluded).
    pub fn size(&self) -> usize {
        self.nodes.vector_len().saturating_sub(1)
    }

    /// Size every node vector to match the node table.
    pub fn resize_vectors(&mut self) {
        let len = self.nodes.vector_len();
        self.rhs.resize(len);
        self.irhs.resize(len);
        self.rhs_old.resize(len);
        self.irhs_old.resize(len);
    }

    /// Zero the matrix and right-hand sides before a load pass.
    pub fn clear_load(&mut self) {
        self.matrix.clear();
        self.rhs.clear();
        self.irhs.clear();
    }

    /// Leading integration coefficient.
    pub fn ag0(&self) -> f64 {
        self.integrator.ag0()
    }

    /// Start a new time step of size `delta`, shifting the step history.
    pub fn set_step(&mut self, delta: f64) {
        self.delta_old.rotate_right(1);
        self.delta_old[0] = delta;
        self.delta = delta;
        self.integrator.set_step(delta);
    }

    /// Record a vote against convergence.
    pub fn flag_nonconvergence(&mut self, device: &str) {
        self.noncon += 1;
        self.trouble = Some(device.to_string());
    }

    /// Truncation inputs for the present step.
    pub fn truncation_inputs(&self) -> TruncationInputs<'_> {
        TruncationInputs {
            delta: self.delta,
            delta_old: &self.delta_old,
            reltol: self.options.reltol,
            abstol: self.options.abstol,
            chgtol: self.options.chgtol,
            trtol: self.options.trtol,
        }
    }
}
