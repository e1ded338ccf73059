//! Bulk junction diodes: DC current and depletion charge.

use super::defs::MAX_EXP_ARG;

/// DC current and conductance of one bulk junction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JunctionCurrent {
    pub current: f64,
    pub conductance: f64,
}

/// Evaluate a junction diode with a `gmin` shunt.
///
/// Below -3 Vt the exponential is dropped and the junction is a pure
/// reverse saturation current.
pub fn junction_current(v: f64, sat_cur: f64, vt: f64, gmin: f64) -> JunctionCurrent {
    if sat_cur <= 0.0 {
        return JunctionCurrent {
            current: gmin * v,
            conductance: gmin,
        };
    }
    if v <= -3.0 * vt {
        JunctionCurrent {
            current: gmin * v - sat_cur,
            conductance: gmin,
        }
    } else {
        let ev = (v / vt).min(MAX_EXP_ARG).exp();
        JunctionCurrent {
            current: sat_cur * (ev - 1.0) + gmin * v,
            conductance: sat_cur * ev / vt + gmin,
        }
    }
}

/// Zero-bias capacitances and grading of one junction.
#[derive(Debug, Clone, Copy)]
pub struct JunctionCaps {
    /// Bottom-wall zero-bias capacitance (F).
    pub bottom: f64,
    /// Sidewall zero-bias capacitance (F).
    pub side: f64,
    pub mj: f64,
    pub mjsw: f64,
    pub bulk_pot: f64,
    pub dep_cap: f64,
    pub f2: f64,
    pub f3: f64,
    pub f4: f64,
}

impl JunctionCaps {
    pub fn is_zero(&self) -> bool {
        self.bottom == 0.0 && self.side == 0.0
    }

    /// Depletion charge and small-signal capacitance at `v`.
    ///
    /// Below the knee `fc * pb` the charge follows the graded power law;
    /// above it a quadratic continuation keeps the capacitance finite.
    pub fn charge(&self, v: f64) -> (f64, f64) {
        if v < self.dep_cap {
            let arg = 1.0 - v / self.bulk_pot;
            let (sarg, sargsw) = if self.mj == self.mjsw && self.mj == 0.5 {
                let s = 1.0 / arg.sqrt();
                (s, s)
            } else {
                let ln = arg.ln();
                ((-self.mj * ln).exp(), (-self.mjsw * ln).exp())
            };
            let q = self.bulk_pot
                * (self.bottom * (1.0 - arg * sarg) / (1.0 - self.mj)
                    + self.side * (1.0 - arg * sargsw) / (1.0 - self.mjsw));
            let cap = self.bottom * sarg + self.side * sargsw;
            (q, cap)
        } else {
            let q = self.f4 + v * (self.f2 + v * (self.f3 * 0.5));
            let cap = self.f2 + self.f3 * v;
            (q, cap)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VT: f64 = 0.025864186;

    #[test]
    fn test_reverse_region() {
        let j = junction_current(-5.0 * VT, 1e-14, VT, 1e-12);
        assert_eq!(j.conductance, 1e-12);
        assert!((j.current - (1e-12 * -5.0 * VT - 1e-14)).abs() < 1e-26);
    }

    #[test]
    fn test_boundary_uses_reverse_branch() {
        let v = -3.0 * VT;
        let j = junction_current(v, 1e-14, VT, 0.0);
        assert_eq!(j.current, -1e-14);
        assert_eq!(j.conductance, 0.0);
    }

    #[test]
    fn test_forward_current() {
        let j = junction_current(0.6, 1e-14, VT, 0.0);
        let ev = (0.6 / VT).exp();
        assert!((j.current - 1e-14 * (ev - 1.0)).abs() / j.current < 1e-12);
        assert!((j.conductance - 1e-14 * ev / VT).abs() / j.conductance < 1e-12);
    }

    #[test]
    fn test_exponent_capped() {
        let j = junction_current(1e3, 1e-14, VT, 0.0);
        assert!(j.current.is_finite());
        assert!(j.conductance.is_finite());
    }

    fn caps(mj: f64, mjsw: f64) -> JunctionCaps {
        let pb = 0.8;
        let fc = 0.5;
        let bottom = 1e-13;
        let side = 2e-14;
        let arg = 1.0 - fc;
        let sarg = (-mj * f64::ln(arg)).exp();
        let sargsw = (-mjsw * f64::ln(arg)).exp();
        let dep_cap = fc * pb;
        let f2 = bottom * (1.0 - fc * (1.0 + mj)) * sarg / arg
            + side * (1.0 - fc * (1.0 + mjsw)) * sargsw / arg;
        let f3 = bottom * mj * sarg / arg / pb + side * mjsw * sargsw / arg / pb;
        let f4 = bottom * pb * (1.0 - arg * sarg) / (1.0 - mj)
            + side * pb * (1.0 - arg * sargsw) / (1.0 - mjsw)
            - f3 / 2.0 * dep_cap * dep_cap
            - dep_cap * f2;
        JunctionCaps {
            bottom,
            side,
            mj,
            mjsw,
            bulk_pot: pb,
            dep_cap,
            f2,
            f3,
            f4,
        }
    }

    #[test]
    fn test_charge_continuous_at_knee() {
        for (mj, mjsw) in [(0.5, 0.5), (0.5, 0.33), (0.4, 0.3)] {
            let c = caps(mj, mjsw);
            let below = c.charge(c.dep_cap - 1e-9);
            let above = c.charge(c.dep_cap);
            assert!((below.0 - above.0).abs() < 1e-20, "q jump for mj={mj}");
            assert!((below.1 - above.1).abs() < 1e-20, "c jump for mj={mj}");
        }
    }

    #[test]
    fn test_capacitance_is_charge_derivative() {
        let c = caps(0.5, 0.33);
        for v in [-2.0, -0.3, 0.1, 0.6] {
            let h = 1e-6;
            let dq = (c.charge(v + h).0 - c.charge(v - h).0) / (2.0 * h);
            let cap = c.charge(v).1;
            assert!((dq - cap).abs() < 1e-6 * cap, "v = {v}");
        }
    }

    #[test]
    fn test_zero_bias_charge() {
        let c = caps(0.5, 0.5);
        let (q, cap) = c.charge(0.0);
        assert_eq!(q, 0.0);
        assert!((cap - 1.2e-13).abs() < 1e-25);
    }
}
