//! The interface between a device and the outer solver.

use num_complex::Complex64;
use spicemos_core::SimContext;

use crate::error::Result;

/// What [`Device::backup`] should do with the saved snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    /// Snapshot the present instance state.
    Save,
    /// Restore the last snapshot, if any.
    Restore,
    /// Drop the snapshot.
    Clear,
}

/// Entry points the outer solver calls on every device.
///
/// Call order: `setup` once per topology, `temperature` once per
/// temperature, then `load` once per Newton iteration. AC, pole-zero and
/// distortion entry points run against the state left by the last
/// converged `load`.
pub trait Device {
    /// Instance name.
    fn name(&self) -> &str;

    /// Default parameters, create internal nodes, reserve state and bind
    /// matrix handles.
    fn setup(&mut self, ctx: &mut SimContext) -> Result<()>;

    /// Hand back internal nodes created by `setup`.
    fn unsetup(&mut self, ctx: &mut SimContext) -> Result<()>;

    /// Rebind matrix handles after the matrix was reallocated.
    fn resetup(&mut self, ctx: &mut SimContext) -> Result<()>;

    /// Recompute temperature-dependent quantities.
    fn temperature(&mut self, ctx: &SimContext) -> Result<()>;

    /// Linearize at the present iterate and stamp matrix and RHS.
    fn load(&mut self, ctx: &mut SimContext) -> Result<()>;

    /// Stamp the small-signal admittance at `ctx.omega`.
    fn ac_load(&mut self, ctx: &mut SimContext) -> Result<()>;

    /// Stamp the small-signal admittance at complex frequency `s`.
    fn pz_load(&mut self, ctx: &mut SimContext, s: Complex64) -> Result<()>;

    /// Vote on convergence of the present iterate. Returns false (and bumps
    /// `ctx.noncon`) if this device has not converged.
    fn conv_test(&mut self, ctx: &mut SimContext) -> bool;

    /// Tighten `timestep` to keep this device's truncation error in bounds.
    fn trunc(&self, ctx: &SimContext, timestep: &mut f64);

    /// Take initial conditions from the present solution where not given.
    fn getic(&mut self, ctx: &SimContext);

    /// Save, restore or drop a snapshot of the instance state.
    fn backup(&mut self, mode: BackupMode);
}
