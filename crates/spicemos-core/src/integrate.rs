//! Numerical integration of charge-storage elements.
//!
//! A device hands a capacitance and the offset of a charge slot to the
//! [`Integrator`]; the integrator writes the companion current into the
//! slot right after the charge and returns the equivalent conductance and
//! current. Which formula runs is the integrator's business.

use std::fmt;

use crate::state::StateVector;

/// Trapezoidal truncation error coefficients by order.
const TRAP_COEFF: [f64; 2] = [0.5, 1.0 / 12.0];

/// Inputs for the local truncation error estimate.
#[derive(Debug, Clone, Copy)]
pub struct TruncationInputs<'a> {
    /// Present step size.
    pub delta: f64,
    /// Previous step sizes, most recent first.
    pub delta_old: &'a [f64],
    pub reltol: f64,
    pub abstol: f64,
    pub chgtol: f64,
    pub trtol: f64,
}

/// Converts a nonlinear charge into a companion conductance and current.
pub trait Integrator: fmt::Debug {
    /// Leading coefficient: d(charge)/dt ≈ ag0·q0 + history.
    fn ag0(&self) -> f64;

    /// Order of the formula in use.
    fn order(&self) -> usize;

    /// Recompute the coefficients for a new step size.
    fn set_step(&mut self, delta: f64);

    /// Integrate the charge at `qcap`, storing the companion current at
    /// `qcap + 1`. Returns `(geq, ceq)`.
    fn integrate(&self, states: &mut StateVector, cap: f64, qcap: usize) -> (f64, f64);

    /// Largest step that keeps the truncation error of charge `qcap`
    /// within tolerance.
    fn truncation(&self, states: &StateVector, qcap: usize, inputs: &TruncationInputs<'_>)
    -> f64;
}

/// Integration method for transient analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// Backward Euler (first order, A-stable).
    BackwardEuler,
    /// Trapezoidal (second order, A-stable).
    Trapezoidal,
}

impl IntegrationMethod {
    pub fn order(self) -> usize {
        match self {
            IntegrationMethod::BackwardEuler => 1,
            IntegrationMethod::Trapezoidal => 2,
        }
    }
}

/// Backward Euler / trapezoidal companion integrator.
#[derive(Debug, Clone)]
pub struct CompanionIntegrator {
    method: IntegrationMethod,
    ag: [f64; 2],
}

impl CompanionIntegrator {
    /// Create an integrator; coefficients stay zero until [`Integrator::set_step`].
    pub fn new(method: IntegrationMethod) -> Self {
        Self {
            method,
            ag: [0.0; 2],
        }
    }

    pub fn method(&self) -> IntegrationMethod {
        self.method
    }

    /// Both coefficients, for callers that need the history term.
    pub fn ag(&self) -> [f64; 2] {
        self.ag
    }
}

impl Integrator for CompanionIntegrator {
    fn ag0(&self) -> f64 {
        self.ag[0]
    }

    fn order(&self) -> usize {
        self.method.order()
    }

    fn set_step(&mut self, delta: f64) {
        self.ag = match self.method {
            IntegrationMethod::BackwardEuler => [1.0 / delta, -1.0 / delta],
            IntegrationMethod::Trapezoidal => [2.0 / delta, 1.0],
        };
    }

    fn integrate(&self, states: &mut StateVector, cap: f64, qcap: usize) -> (f64, f64) {
        let ccap = qcap + 1;
        let q0 = states.get(0, qcap);
        let q1 = states.get(1, qcap);
        let current = match self.method {
            IntegrationMethod::BackwardEuler => self.ag[0] * q0 + self.ag[1] * q1,
            IntegrationMethod::Trapezoidal => {
                -states.get(1, ccap) * self.ag[1] + self.ag[0] * (q0 - q1)
            }
        };
        states.set(0, ccap, current);
        let ceq = current - self.ag[0] * q0;
        let geq = self.ag[0] * cap;
        (geq, ceq)
    }

    fn truncation(
        &self,
        states: &StateVector,
        qcap: usize,
        inputs: &TruncationInputs<'_>,
    ) -> f64 {
        let order = self.order();
        let ccap = qcap + 1;

        let volttol = inputs.abstol
            + inputs.reltol * states.get(0, ccap).abs().max(states.get(1, ccap).abs());
        let chargetol = states.get(0, qcap).abs().max(states.get(1, qcap).abs());
        let chargetol = inputs.reltol * chargetol.max(inputs.chgtol) / inputs.delta;
        let tol = volttol.max(chargetol);

        // Divided differences of the charge history.
        let mut diff = [0.0; 4];
        let mut deltmp = [0.0; 4];
        for (i, d) in diff.iter_mut().enumerate().take(order + 2) {
            *d = states.get(i, qcap);
        }
        for (i, d) in deltmp.iter_mut().enumerate().take(order + 1) {
            *d = inputs.delta_old.get(i).copied().unwrap_or(inputs.delta);
        }
        let mut j = order as isize;
        loop {
            for i in 0..=(j as usize) {
                diff[i] = (diff[i] - diff[i + 1]) / deltmp[i];
            }
            j -= 1;
            if j < 0 {
                break;
            }
            for i in 0..=(j as usize) {
                deltmp[i] = deltmp[i + 1] + inputs.delta_old.get(i).copied().unwrap_or(0.0);
            }
        }

        let factor = TRAP_COEFF[order - 1];
        let del = inputs.trtol * tol / inputs.abstol.max(factor * diff[0].abs());
        match order {
            1 => del,
            2 => del.sqrt(),
            n => (del.ln() / n as f64).exp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states_with_charge(q: [f64; 3]) -> StateVector {
        let mut s = StateVector::default();
        s.allocate(2);
        for (t, &v) in q.iter().enumerate() {
            s.set(t, 0, v);
        }
        s
    }

    #[test]
    fn test_backward_euler_companion() {
        let mut integ = CompanionIntegrator::new(IntegrationMethod::BackwardEuler);
        integ.set_step(1e-9);
        let mut s = states_with_charge([2e-12, 1e-12, 0.0]);
        let (geq, ceq) = integ.integrate(&mut s, 1e-12, 0);
        // i = (q0 - q1)/h
        assert!((s.get(0, 1) - 1e-3).abs() < 1e-15);
        assert!((geq - 1e-3).abs() < 1e-15);
        assert!((ceq - (1e-3 - 2e-3)).abs() < 1e-15);
    }

    #[test]
    fn test_trapezoidal_uses_previous_current() {
        let mut integ = CompanionIntegrator::new(IntegrationMethod::Trapezoidal);
        integ.set_step(1e-9);
        let mut s = states_with_charge([2e-12, 1e-12, 0.0]);
        s.set(1, 1, 0.5e-3);
        let (_, _) = integ.integrate(&mut s, 1e-12, 0);
        // i0 = 2/h (q0 - q1) - i1
        assert!((s.get(0, 1) - (2e-3 - 0.5e-3)).abs() < 1e-15);
    }

    #[test]
    fn test_truncation_linear_charge_allows_large_step() {
        let integ = {
            let mut i = CompanionIntegrator::new(IntegrationMethod::BackwardEuler);
            i.set_step(1e-9);
            i
        };
        // Charge linear in time: second divided difference is zero.
        let s = states_with_charge([2e-12, 1e-12, 0.0]);
        let deltas = [1e-9, 1e-9, 1e-9];
        let inputs = TruncationInputs {
            delta: 1e-9,
            delta_old: &deltas,
            reltol: 1e-3,
            abstol: 1e-12,
            chgtol: 1e-14,
            trtol: 7.0,
        };
        let step = integ.truncation(&s, 0, &inputs);
        assert!(step > 1e-9);
    }
}
