//! Fixed-step transient analysis.

use spicemos_core::{Mode, NodeVector};

use crate::circuit::Circuit;
use crate::error::{Error, Result};

/// One accepted time point.
#[derive(Debug, Clone)]
pub struct TimePoint {
    pub time: f64,
    pub solution: NodeVector,
    /// Newton iterations spent on this point.
    pub iterations: usize,
    /// Largest step the truncation estimates allowed after this point.
    pub step_limit: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TransientResult {
    pub points: Vec<TimePoint>,
}

impl TransientResult {
    /// Points whose step was larger than the truncation estimate allowed.
    pub fn truncation_violations(&self) -> usize {
        self.points
            .windows(2)
            .filter(|w| w[1].time - w[0].time > w[1].step_limit * (1.0 + 1e-9))
            .count()
    }
}

impl Circuit {
    /// Solve the transient operating point and prepare the history.
    pub fn begin_transient(&mut self) -> Result<TimePoint> {
        self.setup()?;
        self.ctx.time = 0.0;
        self.ctx.delta = 0.0;
        self.ctx.delta_old = [0.0; spicemos_core::context::DELTA_HISTORY];
        let iterations = self.newton(Mode::TRANOP, Mode::INITJCT)?;
        self.ctx.states.copy_state(0, 1);
        Ok(TimePoint {
            time: 0.0,
            solution: self.ctx.rhs_old.clone(),
            iterations,
            step_limit: f64::INFINITY,
        })
    }

    /// Advance by `h` from the last accepted point.
    pub fn step(&mut self, h: f64) -> Result<TimePoint> {
        if h.is_nan() || h <= 0.0 {
            return Err(Error::InvalidAnalysis(format!("time step {h} must be positive")));
        }
        let first = self.ctx.delta == 0.0;
        self.ctx.states.rotate();
        self.ctx.set_step(h);
        self.ctx.time += h;
        let init = if first { Mode::INITTRAN } else { Mode::INITPRED };
        let iterations = self.newton(Mode::TRAN, init)?;
        let step_limit = self.truncation_limit();
        if step_limit < h {
            log::debug!(
                "t={:e}: step {:e} exceeds truncation limit {:e}",
                self.ctx.time,
                h,
                step_limit
            );
        }
        Ok(TimePoint {
            time: self.ctx.time,
            solution: self.ctx.rhs_old.clone(),
            iterations,
            step_limit,
        })
    }

    /// Run from 0 to `tstop` in steps of `tstep`.
    pub fn transient(&mut self, tstop: f64, tstep: f64) -> Result<TransientResult> {
        if tstep.is_nan() || tstep <= 0.0 || tstop < tstep {
            return Err(Error::InvalidAnalysis(format!(
                "tstep {tstep} must be positive and not above tstop {tstop}"
            )));
        }
        let mut result = TransientResult {
            points: vec![self.begin_transient()?],
        };
        let steps = (tstop / tstep).round() as usize;
        for _ in 0..steps {
            result.points.push(self.step(tstep)?);
        }
        Ok(result)
    }
}
