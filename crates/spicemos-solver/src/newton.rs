//! DC operating point by Newton-Raphson.

use spicemos_core::{Mode, NodeVector};

use crate::circuit::Circuit;
use crate::error::{Error, Result};

/// Outcome of a converged operating point.
#[derive(Debug, Clone)]
pub struct OpResult {
    /// Node voltages and branch currents, ground at index 0.
    pub solution: NodeVector,
    pub iterations: usize,
}

impl Circuit {
    /// Solve the DC operating point.
    pub fn operating_point(&mut self) -> Result<OpResult> {
        self.setup()?;
        let iterations = self.newton(Mode::DCOP, Mode::INITJCT)?;
        Ok(OpResult {
            solution: self.ctx.rhs_old.clone(),
            iterations,
        })
    }

    /// Iterate to convergence from the given initialization phase.
    ///
    /// INITJCT moves to INITFIX after one pass, INITFIX moves to INITFLOAT
    /// once no device limited its voltages, and the predictor phases move
    /// to INITFLOAT after one pass. Only an INITFLOAT pass can converge.
    pub(crate) fn newton(&mut self, analysis: Mode, init: Mode) -> Result<usize> {
        self.ctx.mode = analysis.with_init(init);
        let max = self.ctx.options.max_iterations;
        for iteration in 1..=max {
            self.ctx.noncon = 0;
            self.ctx.trouble = None;
            self.load()?;
            let next = self.solve()?;
            let settled = self.solution_settled(&next);
            self.ctx.rhs_old = next;

            let mode = self.ctx.mode;
            if mode.contains(Mode::INITFLOAT) {
                if self.ctx.noncon == 0 && settled && self.devices_converged() {
                    log::debug!("converged in {iteration} iterations ({:?})", analysis);
                    return Ok(iteration);
                }
            } else if mode.contains(Mode::INITJCT) {
                self.ctx.mode = mode.with_init(Mode::INITFIX);
            } else if mode.contains(Mode::INITFIX) {
                if self.ctx.noncon == 0 {
                    self.ctx.mode = mode.with_init(Mode::INITFLOAT);
                }
            } else {
                self.ctx.mode = mode.with_init(Mode::INITFLOAT);
            }
            log::trace!(
                "iteration {iteration}: noncon={} trouble={:?}",
                self.ctx.noncon,
                self.ctx.trouble
            );
        }
        log::warn!(
            "no convergence after {max} iterations, last trouble {:?}",
            self.ctx.trouble
        );
        Err(Error::NoConvergence { iterations: max })
    }

    /// Every unknown moved by less than `reltol·max(|new|,|old|) + vntol`.
    fn solution_settled(&self, next: &NodeVector) -> bool {
        let opts = &self.ctx.options;
        let old = self.ctx.rhs_old.as_slice();
        next.as_slice().iter().enumerate().skip(1).all(|(i, &new)| {
            let prev = old.get(i).copied().unwrap_or(0.0);
            (new - prev).abs() <= opts.reltol * new.abs().max(prev.abs()) + opts.vntol
        })
    }

    /// Solve one DC point per value of the named source.
    pub fn dc_sweep(&mut self, source: &str, values: &[f64]) -> Result<Vec<OpResult>> {
        self.setup()?;
        let mut out = Vec::with_capacity(values.len());
        for (k, &value) in values.iter().enumerate() {
            self.voltage_source_mut(source)?.set_dc(value);
            // Later points start from the previous solution.
            let init = if k == 0 { Mode::INITJCT } else { Mode::INITFIX };
            let iterations = self.newton(Mode::DCTRANCURVE, init)?;
            out.push(OpResult {
                solution: self.ctx.rhs_old.clone(),
                iterations,
            });
        }
        Ok(out)
    }
}
