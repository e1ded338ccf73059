//! Distortion analysis support.
//!
//! The nonlinear device equations are expanded to third order around the
//! converged operating point by central finite differences. The channel
//! current is expanded in local coordinates and mapped back to terminal
//! coordinates, which also covers inverse-mode operation.

use nalgebra::Matrix3;
use spicemos_core::SimContext;

use super::defs::ConductionMode;
use super::eval::{ChannelBias, evaluate_channel};
use super::instance::{Derived, Mosfet};
use super::junction::junction_current;
use super::load::{Bias, StoredBias, channel_at, junction_caps, meyer_at};
use super::meyer::MeyerCaps;
use crate::error::{Error, Result};

/// Finite-difference step (V).
pub const DISTO_STEP: f64 = 1e-5;

/// Distortion analysis requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortionMode {
    /// Compute the Taylor coefficients at the operating point.
    Setup,
    TwoF1,
    ThreeF1,
    F1PlusF2,
    F1MinusF2,
    TwoF1MinusF2,
}

/// Cubic Taylor polynomial in three variables.
///
/// `coeff(i, j, k)` multiplies `x^i y^j z^k`; only `i + j + k <= 3` is
/// populated, 20 coefficients in all.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Taylor3 {
    coeffs: [[[f64; 4]; 4]; 4],
}

/// One-dimensional stencil weights for the n-th derivative.
fn stencil(order: usize) -> &'static [(i32, f64)] {
    match order {
        0 => &[(0, 1.0)],
        1 => &[(-1, -0.5), (1, 0.5)],
        2 => &[(-1, 1.0), (0, -2.0), (1, 1.0)],
        _ => &[(-2, -0.5), (-1, 1.0), (1, -1.0), (2, 0.5)],
    }
}

const FACTORIAL: [f64; 4] = [1.0, 1.0, 2.0, 6.0];

/// Exponent triples of total degree at most 3.
fn monomials() -> impl Iterator<Item = (usize, usize, usize)> {
    (0..4).flat_map(|i| {
        (0..4 - i).flat_map(move |j| (0..4 - i - j).map(move |k| (i, j, k)))
    })
}

impl Taylor3 {
    pub fn coeff(&self, i: usize, j: usize, k: usize) -> f64 {
        self.coeffs[i][j][k]
    }

    /// Expand `f` around the origin with step `delta`.
    ///
    /// Mixed and second-order terms use the 27-point grid `{-d, 0, d}^3`;
    /// pure third derivatives add the `±2d` axis points.
    pub fn from_fn<F: FnMut(f64, f64, f64) -> f64>(mut f: F, delta: f64) -> Self {
        // offsets -2..=2 on each axis
        let mut samples = [None::<f64>; 125];
        let mut out = Self::default();
        for (i, j, k) in monomials() {
            let mut d = 0.0;
            for &(a, wa) in stencil(i) {
                for &(b, wb) in stencil(j) {
                    for &(c, wc) in stencil(k) {
                        let slot = ((a + 2) * 25 + (b + 2) * 5 + (c + 2)) as usize;
                        let fv = *samples[slot].get_or_insert_with(|| {
                            f(a as f64 * delta, b as f64 * delta, c as f64 * delta)
                        });
                        d += wa * wb * wc * fv;
                    }
                }
            }
            let order = (i + j + k) as i32;
            out.coeffs[i][j][k] =
                d / delta.powi(order) / (FACTORIAL[i] * FACTORIAL[j] * FACTORIAL[k]);
        }
        out
    }

    pub fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        monomials()
            .map(|(i, j, k)| {
                self.coeffs[i][j][k] * x.powi(i as i32) * y.powi(j as i32) * z.powi(k as i32)
            })
            .sum()
    }

    pub fn scale(&self, factor: f64) -> Self {
        let mut out = *self;
        for (i, j, k) in monomials() {
            out.coeffs[i][j][k] *= factor;
        }
        out
    }

    fn linear(row: [f64; 3]) -> Self {
        let mut out = Self::default();
        out.coeffs[1][0][0] = row[0];
        out.coeffs[0][1][0] = row[1];
        out.coeffs[0][0][1] = row[2];
        out
    }

    fn one() -> Self {
        let mut out = Self::default();
        out.coeffs[0][0][0] = 1.0;
        out
    }

    /// Product truncated at degree 3.
    fn mul(&self, other: &Self) -> Self {
        let mut out = Self::default();
        for (i, j, k) in monomials() {
            let a = self.coeffs[i][j][k];
            if a == 0.0 {
                continue;
            }
            for (p, q, r) in monomials() {
                if i + j + k + p + q + r > 3 {
                    continue;
                }
                out.coeffs[i + p][j + q][k + r] += a * other.coeffs[p][q][r];
            }
        }
        out
    }

    fn add_scaled(&mut self, other: &Self, factor: f64) {
        for (i, j, k) in monomials() {
            self.coeffs[i][j][k] += factor * other.coeffs[i][j][k];
        }
    }

    /// The polynomial `t -> self(map * t)`.
    pub fn compose_linear(&self, map: &Matrix3<f64>) -> Self {
        let powers = |row: usize| {
            let l = Self::linear([map[(row, 0)], map[(row, 1)], map[(row, 2)]]);
            let l2 = l.mul(&l);
            let l3 = l2.mul(&l);
            [Self::one(), l, l2, l3]
        };
        let (px, py, pz) = (powers(0), powers(1), powers(2));
        let mut out = Self::default();
        for (i, j, k) in monomials() {
            let c = self.coeffs[i][j][k];
            if c == 0.0 {
                continue;
            }
            let term = px[i].mul(&py[j]).mul(&pz[k]);
            out.add_scaled(&term, c);
        }
        out
    }
}

/// Cubic expansion `[c0, c1, c2, c3]` of a one-variable function about `x0`.
pub fn taylor1<F: FnMut(f64) -> f64>(mut f: F, x0: f64, delta: f64) -> [f64; 4] {
    let f0 = f(x0);
    let fp1 = f(x0 + delta);
    let fm1 = f(x0 - delta);
    let fp2 = f(x0 + 2.0 * delta);
    let fm2 = f(x0 - 2.0 * delta);
    [
        f0,
        (fp1 - fm1) / (2.0 * delta),
        (fp1 - 2.0 * f0 + fm1) / (2.0 * delta * delta),
        (fp2 - 2.0 * fp1 + 2.0 * fm1 - fm2) / (12.0 * delta * delta * delta),
    ]
}

/// Local channel coordinates `(vgd, vsd, vbd)` as a function of terminal
/// deviations `(vgs, vds, vbs)` in inverse mode.
pub fn inverse_mode_map() -> Matrix3<f64> {
    Matrix3::new(
        1.0, -1.0, 0.0, //
        0.0, -1.0, 0.0, //
        0.0, -1.0, 1.0,
    )
}

/// Third-order expansions at the operating point, in terminal orientation
/// and multiplicity included. Three-variable expansions are in
/// `(vgs, vds, vbs)` deviations.
#[derive(Debug, Clone, PartialEq)]
pub struct DistortionCoefficients {
    /// Drain channel current.
    pub drain_current: Taylor3,
    /// Bulk-source junction current in `vbs`.
    pub bs_current: [f64; 4],
    /// Bulk-drain junction current in `vbd`.
    pub bd_current: [f64; 4],
    /// Bulk-source depletion charge in `vbs`.
    pub bs_charge: [f64; 4],
    /// Bulk-drain depletion charge in `vbd`.
    pub bd_charge: [f64; 4],
    /// Gate capacitances, overlap included.
    pub capgs: Taylor3,
    pub capgd: Taylor3,
    pub capgb: Taylor3,
}

/// Terminal-orientation drain current expansion at `bias` with step `delta`.
pub(crate) fn drain_current_expansion(derived: &Derived, bias: Bias, delta: f64) -> Taylor3 {
    let mode = ConductionMode::from_vds(bias.vds);
    let local = bias.channel(mode);
    let expansion = Taylor3::from_fn(
        |x, y, z| {
            evaluate_channel(
                &derived.model,
                &derived.inst,
                ChannelBias {
                    vgs: local.vgs + x,
                    vds: local.vds + y,
                    vbs: local.vbs + z,
                },
            )
            .cdrain
        },
        delta,
    );
    match mode {
        ConductionMode::Normal => expansion,
        ConductionMode::Inverse => expansion.compose_linear(&inverse_mode_map()).scale(-1.0),
    }
}

impl Mosfet {
    /// Distortion entry point. Only [`DistortionMode::Setup`] is supported.
    pub fn distortion(
        &mut self,
        ctx: &SimContext,
        mode: DistortionMode,
    ) -> Result<&DistortionCoefficients> {
        if mode != DistortionMode::Setup {
            return Err(Error::bad_parameter(
                "distortion",
                format!("{mode:?} is not supported"),
            ));
        }
        let base = self.base()?;
        let derived = self.derived()?;
        let m = self.params.m.get();
        let gmin = ctx.options.gmin;
        let inst = &derived.inst;
        let bias = StoredBias::read(&ctx.states, base).bias();
        let vbd = bias.vbd();

        let (drain_caps, source_caps) = junction_caps(derived);
        let scale1 = |c: [f64; 4]| c.map(|v| v * m);
        let gate_cap = |pick: fn(&MeyerCaps) -> f64, overlap: f64| {
            Taylor3::from_fn(
                |x, y, z| {
                    let b = Bias {
                        vgs: bias.vgs + x,
                        vds: bias.vds + y,
                        vbs: bias.vbs + z,
                    };
                    let (cmode, eval) = channel_at(derived, b);
                    2.0 * pick(&meyer_at(derived, b, cmode, &eval)) + overlap
                },
                DISTO_STEP,
            )
            .scale(m)
        };

        let coeffs = DistortionCoefficients {
            drain_current: drain_current_expansion(derived, bias, DISTO_STEP).scale(m),
            bs_current: scale1(taylor1(
                |v| junction_current(v, inst.source_sat_cur, inst.vt, gmin).current,
                bias.vbs,
                DISTO_STEP,
            )),
            bd_current: scale1(taylor1(
                |v| junction_current(v, inst.drain_sat_cur, inst.vt, gmin).current,
                vbd,
                DISTO_STEP,
            )),
            bs_charge: scale1(taylor1(|v| source_caps.charge(v).0, bias.vbs, DISTO_STEP)),
            bd_charge: scale1(taylor1(|v| drain_caps.charge(v).0, vbd, DISTO_STEP)),
            capgs: gate_cap(|c| c.cgs, inst.gate_source_overlap),
            capgd: gate_cap(|c| c.cgd, inst.gate_drain_overlap),
            capgb: gate_cap(|c| c.cgb, inst.gate_bulk_overlap),
        };
        log::debug!(
            "{}: distortion setup gm={:e} gds={:e}",
            self.name,
            coeffs.drain_current.coeff(1, 0, 0),
            coeffs.drain_current.coeff(0, 1, 0),
        );
        self.distortion = Some(Box::new(coeffs));
        self.distortion
            .as_deref()
            .ok_or_else(|| Error::NotSetup(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosfet::defs::MosLevel;
    use crate::mosfet::model::MosModel;
    use crate::mosfet::params::ModelParam;
    use crate::mosfet::temperature::{Geometry, InstanceDerived, ModelDerived};

    #[test]
    fn test_cubic_recovered_exactly() {
        let f = |x: f64, y: f64, z: f64| {
            1.0 + 2.0 * x - y + 0.5 * z + 3.0 * x * y - z * z + 0.25 * x * x * x + x * y * z
                - 2.0 * y * y * z
        };
        let t = Taylor3::from_fn(f, 1e-2);
        let close = |a: f64, b: f64| (a - b).abs() < 1e-8;
        assert!(close(t.coeff(0, 0, 0), 1.0));
        assert!(close(t.coeff(1, 0, 0), 2.0));
        assert!(close(t.coeff(0, 1, 0), -1.0));
        assert!(close(t.coeff(1, 1, 0), 3.0));
        assert!(close(t.coeff(0, 0, 2), -1.0));
        assert!(close(t.coeff(3, 0, 0), 0.25));
        assert!(close(t.coeff(1, 1, 1), 1.0));
        assert!(close(t.coeff(0, 2, 1), -2.0));
        assert!(close(t.eval(0.1, 0.2, 0.3), f(0.1, 0.2, 0.3)));
    }

    #[test]
    fn test_compose_linear_matches_direct_expansion() {
        let f = |u: f64, v: f64, w: f64| u * u * v + 2.0 * w - 0.5 * u * v * w + v * v * v;
        let a = inverse_mode_map();
        let composed = Taylor3::from_fn(f, 1e-2).compose_linear(&a);
        let direct = Taylor3::from_fn(
            |x, y, z| {
                let t = a * nalgebra::Vector3::new(x, y, z);
                f(t[0], t[1], t[2])
            },
            1e-2,
        );
        for (i, j, k) in monomials() {
            assert!(
                (composed.coeff(i, j, k) - direct.coeff(i, j, k)).abs() < 1e-7,
                "x^{i} y^{j} z^{k}"
            );
        }
    }

    #[test]
    fn test_taylor1_exponential() {
        let c = taylor1(f64::exp, 0.0, 1e-3);
        assert!((c[0] - 1.0).abs() < 1e-12);
        assert!((c[1] - 1.0).abs() < 1e-6);
        assert!((c[2] - 0.5).abs() < 1e-5);
        assert!((c[3] - 1.0 / 6.0).abs() < 1e-3);
    }

    fn derived() -> Derived {
        derived_with_gamma(0.5)
    }

    fn derived_with_gamma(gamma: f64) -> Derived {
        let mut model = MosModel::nmos("n", MosLevel::One);
        model.set(ModelParam::Vto, 0.7).unwrap();
        model.set(ModelParam::Gamma, gamma).unwrap();
        model.set(ModelParam::Lambda, 0.02).unwrap();
        let md = ModelDerived::from_model(&model, 300.15).unwrap();
        let geom = Geometry {
            l: 2e-6,
            w: 20e-6,
            ad: 0.0,
            as_: 0.0,
            pd: 0.0,
            ps: 0.0,
            nrd: 1.0,
            nrs: 1.0,
            m: 1.0,
        };
        let inst = InstanceDerived::from_params_at_temp("m1", &md, &geom, 300.15);
        Derived { model: md, inst }
    }

    #[test]
    fn test_inverse_mode_remap_matches_terminal_difference() {
        let d = derived();
        for bias in [
            Bias { vbs: -0.5, vgs: 2.0, vds: -1.5 },
            Bias { vbs: -1.0, vgs: 1.0, vds: -0.2 },
        ] {
            let remapped = drain_current_expansion(&d, bias, DISTO_STEP);
            let direct = Taylor3::from_fn(
                |x, y, z| {
                    let b = Bias {
                        vgs: bias.vgs + x,
                        vds: bias.vds + y,
                        vbs: bias.vbs + z,
                    };
                    let (mode, eval) = channel_at(&d, b);
                    mode.sign() * eval.cdrain
                },
                DISTO_STEP,
            );
            for (i, j, k) in monomials().filter(|(i, j, k)| i + j + k <= 2) {
                let (a, b) = (remapped.coeff(i, j, k), direct.coeff(i, j, k));
                assert!(
                    (a - b).abs() <= 1e-4 * b.abs() + 1e-9,
                    "x^{i} y^{j} z^{k}: {a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_inverse_mode_remap_third_order() {
        // without body effect the linear-region current is a cubic in
        // (vgs, vds); a wide step keeps rounding out of the cubic terms
        let d = derived_with_gamma(0.0);
        let bias = Bias {
            vbs: 0.0,
            vgs: 2.0,
            vds: -0.5,
        };
        let delta = 1e-2;
        let remapped = drain_current_expansion(&d, bias, delta);
        let direct = Taylor3::from_fn(
            |x, y, z| {
                let b = Bias {
                    vgs: bias.vgs + x,
                    vds: bias.vds + y,
                    vbs: bias.vbs + z,
                };
                let (mode, eval) = channel_at(&d, b);
                mode.sign() * eval.cdrain
            },
            delta,
        );
        let scale = direct.coeff(1, 0, 0).abs();
        for (i, j, k) in monomials() {
            let (a, b) = (remapped.coeff(i, j, k), direct.coeff(i, j, k));
            assert!(
                (a - b).abs() <= 1e-4 * scale,
                "x^{i} y^{j} z^{k}: {a} vs {b}"
            );
        }
        // lambda leaves a nonzero cubic term in vds
        assert!(direct.coeff(0, 3, 0).abs() > 1e-3 * scale);
    }
}
