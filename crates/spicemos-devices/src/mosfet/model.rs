//! MOSFET model card.

use super::defs::{MosLevel, Polarity};
use super::params::{Given, ModelParam};
use crate::error::{Error, Result};

/// Model parameters shared by every instance bound to the card.
///
/// Parameters are the union over levels 1, 2, 3 and 6; each level reads
/// the subset it needs. Values are SI except where SPICE cards use cm
/// (UO in cm^2/V-s, NSUB in cm^-3, NSS/NFS in cm^-2).
#[derive(Debug, Clone)]
pub struct MosModel {
    pub name: String,
    /// Channel polarity. Default: N
    pub(crate) polarity: Given<Polarity>,
    /// Model level. Default: 1
    pub(crate) level: Given<MosLevel>,

    // ========================================
    // Threshold and transconductance
    // ========================================
    /// Zero-bias threshold voltage (V). Default: 0.0
    pub(crate) vto: Given<f64>,
    /// Transconductance parameter (A/V^2). Default: 2e-5
    pub(crate) kp: Given<f64>,
    /// Body effect coefficient (V^0.5). Default: 0.0
    pub(crate) gamma: Given<f64>,
    /// Surface potential (V). Default: 0.6
    pub(crate) phi: Given<f64>,
    /// Channel length modulation (1/V). Default: 0.0
    pub(crate) lambda: Given<f64>,

    // ========================================
    // Parasitics and junctions
    // ========================================
    /// Drain ohmic resistance (ohm). Default: 0.0
    pub(crate) rd: Given<f64>,
    /// Source ohmic resistance (ohm). Default: 0.0
    pub(crate) rs: Given<f64>,
    /// Zero-bias bulk-drain junction capacitance (F). Default: 0.0
    pub(crate) cbd: Given<f64>,
    /// Zero-bias bulk-source junction capacitance (F). Default: 0.0
    pub(crate) cbs: Given<f64>,
    /// Bulk junction saturation current (A). Default: 1e-14
    pub(crate) is: Given<f64>,
    /// Bulk junction potential (V). Default: 0.8
    pub(crate) pb: Given<f64>,
    /// Gate-source overlap capacitance per width (F/m). Default: 0.0
    pub(crate) cgso: Given<f64>,
    /// Gate-drain overlap capacitance per width (F/m). Default: 0.0
    pub(crate) cgdo: Given<f64>,
    /// Gate-bulk overlap capacitance per length (F/m). Default: 0.0
    pub(crate) cgbo: Given<f64>,
    /// Drain/source diffusion sheet resistance (ohm/sq). Default: 0.0
    pub(crate) rsh: Given<f64>,
    /// Bottom junction capacitance per area (F/m^2). Default: 0.0
    pub(crate) cj: Given<f64>,
    /// Bottom junction grading coefficient. Default: 0.5
    pub(crate) mj: Given<f64>,
    /// Sidewall junction capacitance per length (F/m). Default: 0.0
    pub(crate) cjsw: Given<f64>,
    /// Sidewall grading coefficient. Default: 0.5 (0.33 for levels 2 and 3)
    pub(crate) mjsw: Given<f64>,
    /// Junction saturation current density (A/m^2). Default: 0.0
    pub(crate) js: Given<f64>,
    /// Forward-bias depletion capacitance coefficient. Default: 0.5
    pub(crate) fc: Given<f64>,

    // ========================================
    // Process
    // ========================================
    /// Oxide thickness (m). Default: unset (1e-7 for levels 2 and 3)
    pub(crate) tox: Given<f64>,
    /// Lateral diffusion (m). Default: 0.0
    pub(crate) ld: Given<f64>,
    /// Surface mobility (cm^2/V-s). Default: 600
    pub(crate) uo: Given<f64>,
    /// Substrate doping (cm^-3). Default: 0.0
    pub(crate) nsub: Given<f64>,
    /// Gate material type: +1 opposite to substrate, -1 same, 0 aluminum. Default: 1
    pub(crate) tpg: Given<f64>,
    /// Surface state density (cm^-2). Default: 0.0
    pub(crate) nss: Given<f64>,
    /// Fast surface state density (cm^-2). Default: 0.0
    pub(crate) nfs: Given<f64>,
    /// Nominal parameter temperature (K). Default: circuit TNOM
    pub(crate) tnom: Given<f64>,

    // ========================================
    // Level 2 and 3 secondary effects
    // ========================================
    /// Width effect on threshold. Default: 0.0
    pub(crate) delta: Given<f64>,
    /// Critical field exponent for mobility degradation (level 2). Default: 0.0
    pub(crate) uexp: Given<f64>,
    /// Critical field for mobility degradation (V/cm, level 2). Default: 1e4
    pub(crate) ucrit: Given<f64>,
    /// Maximum carrier drift velocity (m/s). Default: 0.0
    pub(crate) vmax: Given<f64>,
    /// Metallurgical junction depth (m). Default: 0.0
    pub(crate) xj: Given<f64>,
    /// Total channel charge coefficient (level 2). Default: 1.0
    pub(crate) neff: Given<f64>,
    /// Static feedback (level 3). Default: 0.0
    pub(crate) eta: Given<f64>,
    /// Mobility modulation (1/V, level 3). Default: 0.0
    pub(crate) theta: Given<f64>,
    /// Saturation field factor (level 3). Default: 0.2
    pub(crate) kappa: Given<f64>,

    // ========================================
    // Level 6 power-law parameters
    // ========================================
    /// Saturation voltage coefficient (V). Default: 2.0
    pub(crate) kv: Given<f64>,
    /// Saturation voltage exponent. Default: 0.5
    pub(crate) nv: Given<f64>,
    /// Saturation current coefficient (A). Default: 5e-5
    pub(crate) kc: Given<f64>,
    /// Saturation current exponent. Default: 1.0
    pub(crate) nc: Given<f64>,
    /// Linear body effect on threshold. Default: 0.0
    pub(crate) gamma1: Given<f64>,
    /// Drain effect on threshold. Default: 0.0
    pub(crate) sigma: Given<f64>,
    /// Channel length modulation at zero body bias (1/V). Default: 0.0
    pub(crate) lambda0: Given<f64>,
    /// Body bias dependence of channel length modulation (1/V^2). Default: 0.0
    pub(crate) lambda1: Given<f64>,
}

impl Default for MosModel {
    fn default() -> Self {
        Self::new("default", Polarity::N, MosLevel::One)
    }
}

impl MosModel {
    /// Model card with every parameter at its default.
    pub fn new(name: impl Into<String>, polarity: Polarity, level: MosLevel) -> Self {
        let mut model = Self {
            name: name.into(),
            polarity: Given::default_value(polarity),
            level: Given::default_value(level),
            vto: Given::default_value(0.0),
            kp: Given::default_value(2e-5),
            gamma: Given::default_value(0.0),
            phi: Given::default_value(0.6),
            lambda: Given::default_value(0.0),
            rd: Given::default_value(0.0),
            rs: Given::default_value(0.0),
            cbd: Given::default_value(0.0),
            cbs: Given::default_value(0.0),
            is: Given::default_value(1e-14),
            pb: Given::default_value(0.8),
            cgso: Given::default_value(0.0),
            cgdo: Given::default_value(0.0),
            cgbo: Given::default_value(0.0),
            rsh: Given::default_value(0.0),
            cj: Given::default_value(0.0),
            mj: Given::default_value(0.5),
            cjsw: Given::default_value(0.0),
            mjsw: Given::default_value(0.5),
            js: Given::default_value(0.0),
            fc: Given::default_value(0.5),
            tox: Given::default_value(0.0),
            ld: Given::default_value(0.0),
            uo: Given::default_value(600.0),
            nsub: Given::default_value(0.0),
            tpg: Given::default_value(1.0),
            nss: Given::default_value(0.0),
            nfs: Given::default_value(0.0),
            tnom: Given::default_value(300.15),
            delta: Given::default_value(0.0),
            uexp: Given::default_value(0.0),
            ucrit: Given::default_value(1e4),
            vmax: Given::default_value(0.0),
            xj: Given::default_value(0.0),
            neff: Given::default_value(1.0),
            eta: Given::default_value(0.0),
            theta: Given::default_value(0.0),
            kappa: Given::default_value(0.2),
            kv: Given::default_value(2.0),
            nv: Given::default_value(0.5),
            kc: Given::default_value(5e-5),
            nc: Given::default_value(1.0),
            gamma1: Given::default_value(0.0),
            sigma: Given::default_value(0.0),
            lambda0: Given::default_value(0.0),
            lambda1: Given::default_value(0.0),
        };
        model.apply_level_defaults();
        model
    }

    /// N-channel model card.
    pub fn nmos(name: impl Into<String>, level: MosLevel) -> Self {
        Self::new(name, Polarity::N, level)
    }

    /// P-channel model card.
    pub fn pmos(name: impl Into<String>, level: MosLevel) -> Self {
        Self::new(name, Polarity::P, level)
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity.get()
    }

    pub fn level(&self) -> MosLevel {
        self.level.get()
    }

    /// Defaults that differ between levels.
    fn apply_level_defaults(&mut self) {
        match self.level.get() {
            MosLevel::Two | MosLevel::Three => {
                self.mjsw.set_default(0.33);
                self.tox.set_default(1e-7);
            }
            MosLevel::One | MosLevel::Six => {
                self.mjsw.set_default(0.5);
                self.tox.set_default(0.0);
            }
        }
    }

    /// Set a parameter by identifier.
    pub fn set(&mut self, param: ModelParam, value: f64) -> Result<()> {
        let check_grading = |v: f64| {
            if v >= 1.0 {
                Err(Error::bad_parameter(
                    param.name(),
                    format!("grading coefficient {v} must be below 1"),
                ))
            } else {
                Ok(v)
            }
        };
        match param {
            ModelParam::Type => {
                if value > 0.0 {
                    self.polarity.set(Polarity::N);
                } else if value < 0.0 {
                    self.polarity.set(Polarity::P);
                } else {
                    return Err(Error::bad_parameter("type", "must be positive (N) or negative (P)"));
                }
            }
            ModelParam::Level => {
                let level = if value.fract() == 0.0 {
                    MosLevel::from_number(value as i64)
                } else {
                    None
                };
                let level = level.unwrap_or_else(|| {
                    log::warn!(
                        "model {}: unsupported level {}, using level 1",
                        self.name,
                        value
                    );
                    MosLevel::One
                });
                self.level.set(level);
                self.apply_level_defaults();
            }
            ModelParam::Vto => self.vto.set(value),
            ModelParam::Kp => self.kp.set(value),
            ModelParam::Gamma => self.gamma.set(value),
            ModelParam::Phi => self.phi.set(value),
            ModelParam::Lambda => self.lambda.set(value),
            ModelParam::Rd => self.rd.set(value),
            ModelParam::Rs => self.rs.set(value),
            ModelParam::Cbd => self.cbd.set(value),
            ModelParam::Cbs => self.cbs.set(value),
            ModelParam::Is => self.is.set(value),
            ModelParam::Pb => self.pb.set(value),
            ModelParam::Cgso => self.cgso.set(value),
            ModelParam::Cgdo => self.cgdo.set(value),
            ModelParam::Cgbo => self.cgbo.set(value),
            ModelParam::Rsh => self.rsh.set(value),
            ModelParam::Cj => self.cj.set(value),
            ModelParam::Mj => self.mj.set(check_grading(value)?),
            ModelParam::Cjsw => self.cjsw.set(value),
            ModelParam::Mjsw => self.mjsw.set(check_grading(value)?),
            ModelParam::Js => self.js.set(value),
            ModelParam::Tox => {
                if value < 0.0 {
                    return Err(Error::bad_parameter("tox", "must not be negative"));
                }
                self.tox.set(value);
            }
            ModelParam::Ld => self.ld.set(value),
            ModelParam::Uo => self.uo.set(value),
            ModelParam::Fc => {
                if value >= 1.0 {
                    return Err(Error::bad_parameter("fc", "must be below 1"));
                }
                self.fc.set(value);
            }
            ModelParam::Nsub => self.nsub.set(value),
            ModelParam::Tpg => self.tpg.set(value),
            ModelParam::Nss => self.nss.set(value),
            ModelParam::Nfs => self.nfs.set(value),
            ModelParam::Delta => self.delta.set(value),
            ModelParam::Uexp => self.uexp.set(value),
            ModelParam::Ucrit => self.ucrit.set(value),
            ModelParam::Vmax => self.vmax.set(value),
            ModelParam::Xj => self.xj.set(value),
            ModelParam::Neff => self.neff.set(value),
            ModelParam::Eta => self.eta.set(value),
            ModelParam::Theta => self.theta.set(value),
            ModelParam::Kappa => self.kappa.set(value),
            ModelParam::Tnom => {
                if value <= 0.0 {
                    return Err(Error::bad_parameter("tnom", "must be positive (K)"));
                }
                self.tnom.set(value);
            }
            ModelParam::Kv => self.kv.set(value),
            ModelParam::Nv => self.nv.set(value),
            ModelParam::Kc => self.kc.set(value),
            ModelParam::Nc => self.nc.set(value),
            ModelParam::Gamma1 => self.gamma1.set(value),
            ModelParam::Sigma => self.sigma.set(value),
            ModelParam::Lambda0 => self.lambda0.set(value),
            ModelParam::Lambda1 => self.lambda1.set(value),
        }
        Ok(())
    }

    /// Set a parameter by card name.
    pub fn set_by_name(&mut self, name: &str, value: f64) -> Result<()> {
        self.set(ModelParam::from_name(name)?, value)
    }

    /// Read a parameter by identifier.
    pub fn get(&self, param: ModelParam) -> f64 {
        match param {
            ModelParam::Type => self.polarity.get().sign(),
            ModelParam::Level => self.level.get().number() as f64,
            ModelParam::Vto => self.vto.get(),
            ModelParam::Kp => self.kp.get(),
            ModelParam::Gamma => self.gamma.get(),
            ModelParam::Phi => self.phi.get(),
            ModelParam::Lambda => self.lambda.get(),
            ModelParam::Rd => self.rd.get(),
            ModelParam::Rs => self.rs.get(),
            ModelParam::Cbd => self.cbd.get(),
            ModelParam::Cbs => self.cbs.get(),
            ModelParam::Is => self.is.get(),
            ModelParam::Pb => self.pb.get(),
            ModelParam::Cgso => self.cgso.get(),
            ModelParam::Cgdo => self.cgdo.get(),
            ModelParam::Cgbo => self.cgbo.get(),
            ModelParam::Rsh => self.rsh.get(),
            ModelParam::Cj => self.cj.get(),
            ModelParam::Mj => self.mj.get(),
            ModelParam::Cjsw => self.cjsw.get(),
            ModelParam::Mjsw => self.mjsw.get(),
            ModelParam::Js => self.js.get(),
            ModelParam::Tox => self.tox.get(),
            ModelParam::Ld => self.ld.get(),
            ModelParam::Uo => self.uo.get(),
            ModelParam::Fc => self.fc.get(),
            ModelParam::Nsub => self.nsub.get(),
            ModelParam::Tpg => self.tpg.get(),
            ModelParam::Nss => self.nss.get(),
            ModelParam::Nfs => self.nfs.get(),
            ModelParam::Delta => self.delta.get(),
            ModelParam::Uexp => self.uexp.get(),
            ModelParam::Ucrit => self.ucrit.get(),
            ModelParam::Vmax => self.vmax.get(),
            ModelParam::Xj => self.xj.get(),
            ModelParam::Neff => self.neff.get(),
            ModelParam::Eta => self.eta.get(),
            ModelParam::Theta => self.theta.get(),
            ModelParam::Kappa => self.kappa.get(),
            ModelParam::Tnom => self.tnom.get(),
            ModelParam::Kv => self.kv.get(),
            ModelParam::Nv => self.nv.get(),
            ModelParam::Kc => self.kc.get(),
            ModelParam::Nc => self.nc.get(),
            ModelParam::Gamma1 => self.gamma1.get(),
            ModelParam::Sigma => self.sigma.get(),
            ModelParam::Lambda0 => self.lambda0.get(),
            ModelParam::Lambda1 => self.lambda1.get(),
        }
    }

    /// Whether a parameter was supplied on the card.
    pub fn is_given(&self, param: ModelParam) -> bool {
        match param {
            ModelParam::Type => self.polarity.is_given(),
            ModelParam::Level => self.level.is_given(),
            ModelParam::Vto => self.vto.is_given(),
            ModelParam::Kp => self.kp.is_given(),
            ModelParam::Gamma => self.gamma.is_given(),
            ModelParam::Phi => self.phi.is_given(),
            ModelParam::Lambda => self.lambda.is_given(),
            ModelParam::Rd => self.rd.is_given(),
            ModelParam::Rs => self.rs.is_given(),
            ModelParam::Cbd => self.cbd.is_given(),
            ModelParam::Cbs => self.cbs.is_given(),
            ModelParam::Is => self.is.is_given(),
            ModelParam::Pb => self.pb.is_given(),
            ModelParam::Cgso => self.cgso.is_given(),
            ModelParam::Cgdo => self.cgdo.is_given(),
            ModelParam::Cgbo => self.cgbo.is_given(),
            ModelParam::Rsh => self.rsh.is_given(),
            ModelParam::Cj => self.cj.is_given(),
            ModelParam::Mj => self.mj.is_given(),
            ModelParam::Cjsw => self.cjsw.is_given(),
            ModelParam::Mjsw => self.mjsw.is_given(),
            ModelParam::Js => self.js.is_given(),
            ModelParam::Tox => self.tox.is_given(),
            ModelParam::Ld => self.ld.is_given(),
            ModelParam::Uo => self.uo.is_given(),
            ModelParam::Fc => self.fc.is_given(),
            ModelParam::Nsub => self.nsub.is_given(),
            ModelParam::Tpg => self.tpg.is_given(),
            ModelParam::Nss => self.nss.is_given(),
            ModelParam::Nfs => self.nfs.is_given(),
            ModelParam::Delta => self.delta.is_given(),
            ModelParam::Uexp => self.uexp.is_given(),
            ModelParam::Ucrit => self.ucrit.is_given(),
            ModelParam::Vmax => self.vmax.is_given(),
            ModelParam::Xj => self.xj.is_given(),
            ModelParam::Neff => self.neff.is_given(),
            ModelParam::Eta => self.eta.is_given(),
            ModelParam::Theta => self.theta.is_given(),
            ModelParam::Kappa => self.kappa.is_given(),
            ModelParam::Tnom => self.tnom.is_given(),
            ModelParam::Kv => self.kv.is_given(),
            ModelParam::Nv => self.nv.is_given(),
            ModelParam::Kc => self.kc.is_given(),
            ModelParam::Nc => self.nc.is_given(),
            ModelParam::Gamma1 => self.gamma1.is_given(),
            ModelParam::Sigma => self.sigma.is_given(),
            ModelParam::Lambda0 => self.lambda0.is_given(),
            ModelParam::Lambda1 => self.lambda1.is_given(),
        }
    }
}
