//! Temperature correction.
//!
//! Model-level constants are resolved once against the nominal temperature
//! ([`ModelDerived`]); instance quantities are then scaled to the instance
//! temperature ([`InstanceDerived`]).

use super::defs::{
    BOLTZ, CHARGE, EPSOX, EPSSIL, KOVERQ, MosLevel, NI, Polarity, REFTEMP,
};
use super::model::MosModel;
use crate::error::{Error, Result};

/// Model parameters with defaults applied and nominal-temperature constants.
#[derive(Debug, Clone)]
pub struct ModelDerived {
    pub polarity: Polarity,
    pub level: MosLevel,
    /// +1 for N-channel, -1 for P-channel.
    pub ty: f64,

    pub vt0: f64,
    pub kp: f64,
    pub gamma: f64,
    pub phi: f64,
    pub lambda: f64,
    pub rd: f64,
    pub rs: f64,
    pub rsh: f64,
    pub cbd: f64,
    pub cbs: f64,
    pub cbd_given: bool,
    pub cbs_given: bool,
    pub is: f64,
    pub js: f64,
    pub pb: f64,
    pub cj: f64,
    pub cj_given: bool,
    pub mj: f64,
    pub cjsw: f64,
    pub cjsw_given: bool,
    pub mjsw: f64,
    pub fc: f64,
    pub cgso: f64,
    pub cgdo: f64,
    pub cgbo: f64,
    pub ld: f64,
    pub uo: f64,
    pub nsub: f64,
    pub nfs: f64,
    pub delta: f64,
    pub uexp: f64,
    pub ucrit: f64,
    pub vmax: f64,
    pub xj: f64,
    pub neff: f64,
    pub eta: f64,
    pub theta: f64,
    pub kappa: f64,
    pub kv: f64,
    pub nv: f64,
    pub kc: f64,
    pub nc: f64,
    pub gamma1: f64,
    pub sigma: f64,
    pub lambda0: f64,
    pub lambda1: f64,

    /// Nominal temperature (K).
    pub tnom: f64,
    /// Thermal voltage at the nominal temperature (V).
    pub vtnom: f64,
    /// tnom / REFTEMP.
    pub fact1: f64,
    /// Silicon bandgap at the nominal temperature (eV).
    pub egfet1: f64,
    /// Potential correction term at the nominal temperature (V).
    pub pbfact1: f64,
    /// Oxide capacitance per area (F/m^2), 0 when TOX is unset.
    pub oxide_cap_factor: f64,
    /// Depletion width coefficient sqrt(2 eps_si / (q N)) (level 2).
    pub xd: f64,
    /// 2 eps_si / (q N) (level 3).
    pub alpha: f64,
    /// sqrt(alpha) (level 3).
    pub coeff_dep_lay_width: f64,
    /// Narrow width factor delta * pi/2 * eps_si / Cox (level 3).
    pub narrow_factor: f64,
}

impl ModelDerived {
    /// Resolve a model card against the circuit's nominal temperature.
    ///
    /// Fails if substrate doping is given but not above the intrinsic
    /// concentration.
    pub fn from_model(model: &MosModel, circuit_tnom: f64) -> Result<Self> {
        let polarity = model.polarity.get();
        let level = model.level.get();
        let ty = polarity.sign();

        let tnom = model.tnom.or(circuit_tnom);
        let fact1 = tnom / REFTEMP;
        let vtnom = tnom * KOVERQ;
        let kt1 = BOLTZ * tnom;
        let egfet1 = 1.16 - (7.02e-4 * tnom * tnom) / (tnom + 1108.0);
        let arg1 = -egfet1 / (kt1 + kt1) + 1.1150877 / (BOLTZ * (REFTEMP + REFTEMP));
        let pbfact1 = -2.0 * vtnom * (1.5 * fact1.ln() + CHARGE * arg1);

        let mut phi = model.phi.get();
        let mut gamma = model.gamma.get();
        let mut vt0 = model.vto.get();
        let mut kp = model.kp.get();
        let uo = model.uo.get();
        let nsub = model.nsub.get();
        let tox = model.tox.get();

        if model.tox.is_given() && tox == 0.0 {
            log::warn!("model {}: TOX = 0, oxide-derived defaults disabled", model.name);
        }
        let oxide_cap_factor = if tox > 0.0 { EPSOX / tox } else { 0.0 };

        let mut xd = 0.0;
        if oxide_cap_factor > 0.0 {
            if !model.kp.is_given() {
                kp = uo * oxide_cap_factor * 1e-4;
            }
            if model.nsub.is_given() {
                if nsub * 1e6 <= NI {
                    return Err(Error::SubstrateDoping { nsub });
                }
                if !model.phi.is_given() {
                    phi = (2.0 * vtnom * (nsub * 1e6 / NI).ln()).max(0.1);
                }
                let fermis = ty * 0.5 * phi;
                let tpg = model.tpg.get();
                let wkfng = if tpg != 0.0 {
                    let fermig = ty * tpg * 0.5 * egfet1;
                    3.25 + 0.5 * egfet1 - fermig
                } else {
                    3.2
                };
                let wkfngs = wkfng - (3.25 + 0.5 * egfet1 + fermis);
                if !model.gamma.is_given() {
                    gamma = (2.0 * EPSSIL * CHARGE * nsub * 1e6).sqrt() / oxide_cap_factor;
                }
                if !model.vto.is_given() {
                    let vfb = wkfngs - model.nss.get() * 1e4 * CHARGE / oxide_cap_factor;
                    vt0 = vfb + ty * (gamma * phi.sqrt() + phi);
                }
                xd = ((EPSSIL + EPSSIL) / (CHARGE * nsub * 1e6)).sqrt();
            }
        }

        let alpha = if nsub > 0.0 {
            (EPSSIL + EPSSIL) / (CHARGE * nsub * 1e6)
        } else {
            0.0
        };
        let narrow_factor = if oxide_cap_factor > 0.0 {
            model.delta.get() * 0.5 * std::f64::consts::PI * EPSSIL / oxide_cap_factor
        } else {
            0.0
        };

        Ok(Self {
            polarity,
            level,
            ty,
            vt0,
            kp,
            gamma,
            phi,
            lambda: model.lambda.get(),
            rd: model.rd.get(),
            rs: model.rs.get(),
            rsh: model.rsh.get(),
            cbd: model.cbd.get(),
            cbs: model.cbs.get(),
            cbd_given: model.cbd.is_given(),
            cbs_given: model.cbs.is_given(),
            is: model.is.get(),
            js: model.js.get(),
            pb: model.pb.get(),
            cj: model.cj.get(),
            cj_given: model.cj.is_given(),
            mj: model.mj.get(),
            cjsw: model.cjsw.get(),
            cjsw_given: model.cjsw.is_given(),
            mjsw: model.mjsw.get(),
            fc: model.fc.get(),
            cgso: model.cgso.get(),
            cgdo: model.cgdo.get(),
            cgbo: model.cgbo.get(),
            ld: model.ld.get(),
            uo,
            nsub,
            nfs: model.nfs.get(),
            delta: model.delta.get(),
            uexp: model.uexp.get(),
            ucrit: model.ucrit.get(),
            vmax: model.vmax.get(),
            xj: model.xj.get(),
            neff: model.neff.get(),
            eta: model.eta.get(),
            theta: model.theta.get(),
            kappa: model.kappa.get(),
            kv: model.kv.get(),
            nv: model.nv.get(),
            kc: model.kc.get(),
            nc: model.nc.get(),
            gamma1: model.gamma1.get(),
            sigma: model.sigma.get(),
            lambda0: model.lambda0.or(model.lambda.get()),
            lambda1: model.lambda1.get(),
            tnom,
            vtnom,
            fact1,
            egfet1,
            pbfact1,
            oxide_cap_factor,
            xd,
            alpha,
            coeff_dep_lay_width: alpha.sqrt(),
            narrow_factor,
        })
    }
}

/// Instance geometry after defaulting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub l: f64,
    pub w: f64,
    pub ad: f64,
    pub as_: f64,
    pub pd: f64,
    pub ps: f64,
    pub nrd: f64,
    pub nrs: f64,
    pub m: f64,
}

/// Per-instance quantities at the instance temperature.
///
/// All values are per unit device; multiplicity is applied when stamping.
#[derive(Debug, Clone)]
pub struct InstanceDerived {
    /// Instance temperature (K).
    pub temp: f64,
    /// Thermal voltage (V).
    pub vt: f64,
    pub w: f64,
    /// Drawn length minus twice the lateral diffusion, never negative (m).
    pub leff: f64,
    pub m: f64,
    pub drain_area: f64,
    pub source_area: f64,
    pub drain_perimeter: f64,
    pub source_perimeter: f64,
    /// Drain series conductance (S), 0 for no resistance.
    pub drain_conductance: f64,
    /// Source series conductance (S), 0 for no resistance.
    pub source_conductance: f64,

    pub t_transconductance: f64,
    pub t_surf_mob: f64,
    pub t_phi: f64,
    pub t_vbi: f64,
    pub t_vto: f64,
    pub t_sat_cur: f64,
    pub t_sat_cur_dens: f64,
    pub t_cbd: f64,
    pub t_cbs: f64,
    pub t_cj: f64,
    pub t_cjsw: f64,
    pub t_bulk_pot: f64,
    /// Forward-bias knee of the depletion capacitance (V).
    pub t_dep_cap: f64,
    /// Level 6 saturation current coefficient at temperature.
    pub t_kc: f64,

    pub drain_sat_cur: f64,
    pub source_sat_cur: f64,
    pub drain_vcrit: f64,
    pub source_vcrit: f64,

    /// Zero-bias bottom/sidewall junction capacitances.
    pub cbd: f64,
    pub cbdsw: f64,
    pub cbs: f64,
    pub cbssw: f64,
    /// Forward-bias Taylor coefficients of the drain junction charge.
    pub f2d: f64,
    pub f3d: f64,
    pub f4d: f64,
    /// Forward-bias Taylor coefficients of the source junction charge.
    pub f2s: f64,
    pub f3s: f64,
    pub f4s: f64,

    /// Transconductance factor KP*W/Leff at temperature (A/V^2).
    pub beta: f64,
    /// Gate oxide capacitance Cox*W*Leff (F).
    pub oxide_cap: f64,
    pub gate_source_overlap: f64,
    pub gate_drain_overlap: f64,
    pub gate_bulk_overlap: f64,
}

impl InstanceDerived {
    /// Scale model constants to the instance temperature.
    pub fn from_params_at_temp(
        name: &str,
        model: &ModelDerived,
        geom: &Geometry,
        temp: f64,
    ) -> Self {
        let vt = temp * KOVERQ;
        let ratio = temp / model.tnom;
        let fact2 = temp / REFTEMP;
        let kt = temp * BOLTZ;
        let egfet = 1.16 - (7.02e-4 * temp * temp) / (temp + 1108.0);
        let arg = -egfet / (kt + kt) + 1.1150877 / (BOLTZ * (REFTEMP + REFTEMP));
        let pbfact = -2.0 * vt * (1.5 * fact2.ln() + CHARGE * arg);

        let drain_conductance = if model.rd != 0.0 {
            1.0 / model.rd
        } else if model.rsh != 0.0 && geom.nrd != 0.0 {
            1.0 / (model.rsh * geom.nrd)
        } else {
            0.0
        };
        let source_conductance = if model.rs != 0.0 {
            1.0 / model.rs
        } else if model.rsh != 0.0 && geom.nrs != 0.0 {
            1.0 / (model.rsh * geom.nrs)
        } else {
            0.0
        };

        let mut leff = geom.l - 2.0 * model.ld;
        if leff <= 0.0 {
            log::warn!(
                "{}: effective channel length {:e} less than zero, clamped to 0",
                name,
                leff
            );
            leff = leff.max(0.0);
        }

        let ratio4 = ratio * ratio.sqrt();
        let t_transconductance = model.kp / ratio4;
        let t_surf_mob = model.uo / ratio4;
        let phio = (model.phi - model.pbfact1) / model.fact1;
        let t_phi = fact2 * phio + pbfact;
        let t_vbi = model.vt0 - model.ty * (model.gamma * model.phi.sqrt())
            + 0.5 * (model.egfet1 - egfet)
            + model.ty * 0.5 * (t_phi - model.phi);
        let t_vto = t_vbi + model.ty * model.gamma * t_phi.sqrt();
        let sat_scale = (-egfet / vt + model.egfet1 / model.vtnom).exp();
        let t_sat_cur = model.is * sat_scale;
        let t_sat_cur_dens = model.js * sat_scale;

        let pbo = (model.pb - model.pbfact1) / model.fact1;
        let gmaold = (model.pb - pbo) / pbo;
        let capfact = 1.0 / (1.0 + model.mj * (4e-4 * (model.tnom - REFTEMP) - gmaold));
        let mut t_cbd = model.cbd * capfact;
        let mut t_cbs = model.cbs * capfact;
        let mut t_cj = model.cj * capfact;
        let capfact = 1.0 / (1.0 + model.mjsw * (4e-4 * (model.tnom - REFTEMP) - gmaold));
        let mut t_cjsw = model.cjsw * capfact;
        let t_bulk_pot = fact2 * pbo + pbfact;
        let gmanew = (t_bulk_pot - pbo) / pbo;
        let capfact = 1.0 + model.mj * (4e-4 * (temp - REFTEMP) - gmanew);
        t_cbd *= capfact;
        t_cbs *= capfact;
        t_cj *= capfact;
        t_cjsw *= 1.0 + model.mjsw * (4e-4 * (temp - REFTEMP) - gmanew);
        let t_dep_cap = model.fc * t_bulk_pot;

        let (drain_sat_cur, source_sat_cur) =
            if t_sat_cur_dens == 0.0 || geom.ad == 0.0 || geom.as_ == 0.0 {
                (t_sat_cur, t_sat_cur)
            } else {
                (t_sat_cur_dens * geom.ad, t_sat_cur_dens * geom.as_)
            };
        let vcrit = |isat: f64| vt * (vt / (std::f64::consts::SQRT_2 * isat)).ln();
        let drain_vcrit = vcrit(drain_sat_cur);
        let source_vcrit = vcrit(source_sat_cur);

        let junction = |cb_given: bool, tcb: f64, area: f64, perimeter: f64| {
            let bottom = if cb_given {
                tcb
            } else if model.cj_given {
                t_cj * area
            } else {
                0.0
            };
            let side = if model.cjsw_given {
                t_cjsw * perimeter
            } else {
                0.0
            };
            (bottom, side)
        };
        let (cbd, cbdsw) = junction(model.cbd_given, t_cbd, geom.ad, geom.pd);
        let (cbs, cbssw) = junction(model.cbs_given, t_cbs, geom.as_, geom.ps);

        let arg = 1.0 - model.fc;
        let sarg = (-model.mj * arg.ln()).exp();
        let sargsw = (-model.mjsw * arg.ln()).exp();
        let knee = |bottom: f64, side: f64| {
            let f2 = bottom * (1.0 - model.fc * (1.0 + model.mj)) * sarg / arg
                + side * (1.0 - model.fc * (1.0 + model.mjsw)) * sargsw / arg;
            let f3 = bottom * model.mj * sarg / arg / t_bulk_pot
                + side * model.mjsw * sargsw / arg / t_bulk_pot;
            let f4 = bottom * t_bulk_pot * (1.0 - arg * sarg) / (1.0 - model.mj)
                + side * t_bulk_pot * (1.0 - arg * sargsw) / (1.0 - model.mjsw)
                - f3 / 2.0 * (t_dep_cap * t_dep_cap)
                - t_dep_cap * f2;
            (f2, f3, f4)
        };
        let (f2d, f3d, f4d) = knee(cbd, cbdsw);
        let (f2s, f3s, f4s) = knee(cbs, cbssw);

        let beta = t_transconductance * geom.w / leff;
        let oxide_cap = model.oxide_cap_factor * leff * geom.w;

        log::debug!(
            "{}: T={:.2}K tVto={:.6} tPhi={:.6} vcrit(d/s)={:.4}/{:.4}",
            name,
            temp,
            t_vto,
            t_phi,
            drain_vcrit,
            source_vcrit
        );

        Self {
            temp,
            vt,
            w: geom.w,
            leff,
            m: geom.m,
            drain_area: geom.ad,
            source_area: geom.as_,
            drain_perimeter: geom.pd,
            source_perimeter: geom.ps,
            drain_conductance,
            source_conductance,
            t_transconductance,
            t_surf_mob,
            t_phi,
            t_vbi,
            t_vto,
            t_sat_cur,
            t_sat_cur_dens,
            t_cbd,
            t_cbs,
            t_cj,
            t_cjsw,
            t_bulk_pot,
            t_dep_cap,
            t_kc: model.kc / ratio4,
            drain_sat_cur,
            source_sat_cur,
            drain_vcrit,
            source_vcrit,
            cbd,
            cbdsw,
            cbs,
            cbssw,
            f2d,
            f3d,
            f4d,
            f2s,
            f3s,
            f4s,
            beta,
            oxide_cap,
            gate_source_overlap: model.cgso * geom.w,
            gate_drain_overlap: model.cgdo * geom.w,
            gate_bulk_overlap: model.cgbo * leff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosfet::params::ModelParam;

    fn geometry() -> Geometry {
        Geometry {
            l: 10e-6,
            w: 10e-6,
            ad: 0.0,
            as_: 0.0,
            pd: 0.0,
            ps: 0.0,
            nrd: 1.0,
            nrs: 1.0,
            m: 1.0,
        }
    }

    #[test]
    fn test_nominal_temperature_is_identity() {
        let mut model = MosModel::default();
        model.set(ModelParam::Vto, 0.7).unwrap();
        model.set(ModelParam::Gamma, 0.4).unwrap();
        let md = ModelDerived::from_model(&model, 300.15).unwrap();
        let inst = InstanceDerived::from_params_at_temp("m1", &md, &geometry(), 300.15);
        assert!((inst.t_vto - 0.7).abs() < 1e-9, "tVto = {}", inst.t_vto);
        assert!((inst.t_phi - 0.6).abs() < 1e-9);
        assert!((inst.t_transconductance - 2e-5).abs() < 1e-18);
        assert!((inst.t_sat_cur - 1e-14).abs() < 1e-24);
        assert!((inst.t_bulk_pot - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_mobility_scales_with_temperature() {
        let model = MosModel::default();
        let md = ModelDerived::from_model(&model, 300.15).unwrap();
        let hot = InstanceDerived::from_params_at_temp("m1", &md, &geometry(), 400.0);
        let expected = 2e-5 / (400.0_f64 / 300.15).powf(1.5);
        assert!((hot.t_transconductance - expected).abs() < 1e-15);
        assert!(hot.t_sat_cur > 1e-14);
    }

    #[test]
    fn test_low_substrate_doping_is_fatal() {
        let mut model = MosModel::default();
        model.set(ModelParam::Tox, 1e-7).unwrap();
        model.set(ModelParam::Nsub, 1e9).unwrap();
        assert!(matches!(
            ModelDerived::from_model(&model, 300.15),
            Err(Error::SubstrateDoping { .. })
        ));
    }

    #[test]
    fn test_nsub_derives_phi_gamma_vto() {
        let mut model = MosModel::default();
        model.set(ModelParam::Tox, 1e-7).unwrap();
        model.set(ModelParam::Nsub, 1e15).unwrap();
        let md = ModelDerived::from_model(&model, 300.15).unwrap();
        assert!(md.phi > 0.5 && md.phi < 0.7, "phi = {}", md.phi);
        assert!(md.gamma > 0.3 && md.gamma < 0.6, "gamma = {}", md.gamma);
        assert!((md.kp - 600.0 * EPSOX / 1e-7 * 1e-4).abs() < 1e-12);
        assert!(md.xd > 0.0);
    }

    #[test]
    fn test_negative_effective_length_clamped() {
        let mut model = MosModel::default();
        model.set(ModelParam::Ld, 6e-6).unwrap();
        let md = ModelDerived::from_model(&model, 300.15).unwrap();
        let inst = InstanceDerived::from_params_at_temp("m1", &md, &geometry(), 300.15);
        assert_eq!(inst.leff, 0.0);
    }

    #[test]
    fn test_series_conductance() {
        let mut model = MosModel::default();
        model.set(ModelParam::Rsh, 20.0).unwrap();
        model.set(ModelParam::Rd, 0.0).unwrap();
        let md = ModelDerived::from_model(&model, 300.15).unwrap();
        let mut geom = geometry();
        geom.nrd = 2.0;
        geom.nrs = 0.0;
        let inst = InstanceDerived::from_params_at_temp("m1", &md, &geom, 300.15);
        assert!((inst.drain_conductance - 1.0 / 40.0).abs() < 1e-15);
        assert_eq!(inst.source_conductance, 0.0);
    }

    #[test]
    fn test_knee_coefficients_continuous() {
        let mut model = MosModel::default();
        model.set(ModelParam::Cbd, 1e-13).unwrap();
        let md = ModelDerived::from_model(&model, 300.15).unwrap();
        let inst = InstanceDerived::from_params_at_temp("m1", &md, &geometry(), 300.15);
        // Capacitance from the Taylor branch matches the power law at the knee.
        let v = inst.t_dep_cap;
        let power_law = inst.cbd * (1.0 - v / inst.t_bulk_pot).powf(-md.mj);
        let taylor = inst.f2d + inst.f3d * v;
        assert!((power_law - taylor).abs() < 1e-12 * inst.cbd.max(1e-30) * 1e3);
    }
}
