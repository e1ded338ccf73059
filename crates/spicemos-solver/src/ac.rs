//! AC small-signal and pole-zero analyses.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use spicemos_core::{Mode, NodeId};

use crate::circuit::Circuit;
use crate::error::{Error, Result};
use crate::linear::solve_system_complex;

/// Solution at one frequency.
#[derive(Debug, Clone)]
pub struct AcPoint {
    pub frequency: f64,
    /// Complex unknowns, ground excluded (node `n` at index `n - 1`).
    pub solution: DVector<Complex64>,
}

impl AcPoint {
    pub fn voltage(&self, node: NodeId) -> Complex64 {
        if node.is_ground() {
            return Complex64::new(0.0, 0.0);
        }
        self.solution
            .get(node.index() - 1)
            .copied()
            .unwrap_or_default()
    }
}

/// `count` logarithmically spaced points from `start` to `stop` inclusive.
pub fn log_frequencies(start: f64, stop: f64, count: usize) -> Result<Vec<f64>> {
    if start <= 0.0 || stop < start || count == 0 {
        return Err(Error::InvalidAnalysis(format!(
            "bad frequency range {start}..{stop} ({count} points)"
        )));
    }
    if count == 1 {
        return Ok(vec![start]);
    }
    let ratio = (stop / start).ln() / (count - 1) as f64;
    Ok((0..count)
        .map(|i| start * (ratio * i as f64).exp())
        .collect())
}

impl Circuit {
    /// Solve the operating point, then load the small-signal state once so
    /// that capacitances are available to the AC loads.
    pub fn small_signal_point(&mut self) -> Result<()> {
        self.operating_point()?;
        self.ctx.mode = Mode::DCOP.with_init(Mode::INITSMSIG);
        self.load()
    }

    /// AC sweep around the operating point.
    pub fn ac(&mut self, frequencies: &[f64]) -> Result<Vec<AcPoint>> {
        self.small_signal_point()?;
        let size = self.ctx.size();
        let mut points = Vec::with_capacity(frequencies.len());
        for &frequency in frequencies {
            self.ctx.mode = Mode::AC;
            self.ctx.omega = 2.0 * PI * frequency;
            self.ctx.clear_load();
            for e in &mut self.elements {
                e.device_mut().ac_load(&mut self.ctx)?;
            }
            let solution =
                solve_system_complex(&self.ctx.matrix, &self.ctx.rhs, &self.ctx.irhs, size)?;
            points.push(AcPoint {
                frequency,
                solution,
            });
        }
        Ok(points)
    }

    /// Admittance matrix at complex frequency `s`, from the pole-zero loads.
    ///
    /// Call after [`Circuit::small_signal_point`].
    pub fn pole_zero_matrix(&mut self, s: Complex64) -> Result<DMatrix<Complex64>> {
        self.ctx.clear_load();
        for e in &mut self.elements {
            e.device_mut().pz_load(&mut self.ctx, s)?;
        }
        Ok(self.ctx.matrix.to_dense_complex(self.ctx.size()))
    }
}
