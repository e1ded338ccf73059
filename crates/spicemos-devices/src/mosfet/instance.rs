//! The MOSFET instance and its `Device` implementation.

use std::sync::Arc;

use num_complex::Complex64;
use spicemos_core::{NodeId, SimContext, SimOptions};

use super::defs::{ConductionMode, MosState};
use super::disto::DistortionCoefficients;
use super::model::MosModel;
use super::params::{Given, InstanceParam};
use super::setup::Handles;
use super::temperature::{Geometry, InstanceDerived, ModelDerived};
use crate::device::{BackupMode, Device};
use crate::error::{Error, Result};

/// External terminals in card order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminals {
    pub drain: NodeId,
    pub gate: NodeId,
    pub source: NodeId,
    pub bulk: NodeId,
}

/// User-settable instance parameters.
#[derive(Debug, Clone)]
pub(crate) struct InstanceParams {
    pub l: Given<f64>,
    pub w: Given<f64>,
    pub ad: Given<f64>,
    pub as_: Given<f64>,
    pub pd: Given<f64>,
    pub ps: Given<f64>,
    pub nrd: Given<f64>,
    pub nrs: Given<f64>,
    pub m: Given<f64>,
    pub temp: Given<f64>,
    pub off: bool,
    pub ic_vds: Given<f64>,
    pub ic_vgs: Given<f64>,
    pub ic_vbs: Given<f64>,
}

impl Default for InstanceParams {
    fn default() -> Self {
        Self {
            l: Given::default_value(1e-4),
            w: Given::default_value(1e-4),
            ad: Given::default_value(0.0),
            as_: Given::default_value(0.0),
            pd: Given::default_value(0.0),
            ps: Given::default_value(0.0),
            nrd: Given::default_value(1.0),
            nrs: Given::default_value(1.0),
            m: Given::default_value(1.0),
            temp: Given::default_value(300.15),
            off: false,
            ic_vds: Given::default_value(0.0),
            ic_vgs: Given::default_value(0.0),
            ic_vbs: Given::default_value(0.0),
        }
    }
}

impl InstanceParams {
    /// Take unset geometry from the circuit options.
    pub fn apply_defaults(&mut self, options: &SimOptions) {
        self.l.set_default(options.default_l);
        self.w.set_default(options.default_w);
        self.ad.set_default(options.default_ad);
        self.as_.set_default(options.default_as);
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            l: self.l.get(),
            w: self.w.get(),
            ad: self.ad.get(),
            as_: self.as_.get(),
            pd: self.pd.get(),
            ps: self.ps.get(),
            nrd: self.nrd.get(),
            nrs: self.nrs.get(),
            m: self.m.get(),
        }
    }
}

/// Operating point of the last evaluation, per unit device and in
/// polarity-normalized orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct OperatingPoint {
    pub mode: ConductionMode,
    /// Drain terminal current, junction included.
    pub cd: f64,
    /// Channel current in local coordinates.
    pub cdrain: f64,
    pub cbs: f64,
    pub cbd: f64,
    pub gm: f64,
    pub gds: f64,
    pub gmbs: f64,
    pub gbd: f64,
    pub gbs: f64,
    pub capbd: f64,
    pub capbs: f64,
    /// Turn-on voltage, terminal orientation.
    pub von: f64,
    /// Saturation voltage, terminal orientation.
    pub vdsat: f64,
}

/// Temperature-corrected model and instance constants.
#[derive(Debug, Clone)]
pub(crate) struct Derived {
    pub model: ModelDerived,
    pub inst: InstanceDerived,
}

/// Everything `backup` saves and restores.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    params: InstanceParams,
    op: OperatingPoint,
    derived: Option<Box<Derived>>,
    fresh: bool,
    distortion: Option<Box<DistortionCoefficients>>,
}

/// A MOSFET instance.
///
/// The model card is shared between instances. Temperature-derived model
/// constants are resolved per instance so that a shared card is never
/// mutated.
#[derive(Debug, Clone)]
pub struct Mosfet {
    pub(crate) name: String,
    pub(crate) model: Arc<MosModel>,
    pub(crate) terminals: Terminals,
    /// Internal drain node, or the external drain when there is no series
    /// resistance.
    pub(crate) drain_prime: NodeId,
    /// Internal source node, or the external source when there is no series
    /// resistance.
    pub(crate) source_prime: NodeId,
    pub(crate) handles: Option<Handles>,
    pub(crate) state_base: Option<usize>,
    pub(crate) params: InstanceParams,
    pub(crate) op: OperatingPoint,
    pub(crate) derived: Option<Box<Derived>>,
    /// No load has completed since setup.
    pub(crate) fresh: bool,
    pub(crate) distortion: Option<Box<DistortionCoefficients>>,
    backup: Option<Box<Snapshot>>,
}

impl Mosfet {
    pub fn new(
        name: impl Into<String>,
        model: Arc<MosModel>,
        drain: NodeId,
        gate: NodeId,
        source: NodeId,
        bulk: NodeId,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            terminals: Terminals {
                drain,
                gate,
                source,
                bulk,
            },
            drain_prime: drain,
            source_prime: source,
            handles: None,
            state_base: None,
            params: InstanceParams::default(),
            op: OperatingPoint::default(),
            derived: None,
            fresh: true,
            distortion: None,
            backup: None,
        }
    }

    pub fn model(&self) -> &MosModel {
        &self.model
    }

    pub fn terminals(&self) -> Terminals {
        self.terminals
    }

    /// Internal drain and source nodes (equal to the external ones when
    /// no series resistance is present).
    pub fn prime_nodes(&self) -> (NodeId, NodeId) {
        (self.drain_prime, self.source_prime)
    }

    /// Builder-style parameter assignment.
    pub fn with(mut self, param: InstanceParam, value: f64) -> Result<Self> {
        self.set(param, value)?;
        Ok(self)
    }

    /// Set an instance parameter.
    pub fn set(&mut self, param: InstanceParam, value: f64) -> Result<()> {
        let positive = |v: f64| {
            if v > 0.0 {
                Ok(v)
            } else {
                Err(Error::bad_parameter(param.name(), format!("{v} must be positive")))
            }
        };
        let non_negative = |v: f64| {
            if v >= 0.0 {
                Ok(v)
            } else {
                Err(Error::bad_parameter(param.name(), format!("{v} is negative")))
            }
        };
        let p = &mut self.params;
        match param {
            InstanceParam::L => p.l.set(positive(value)?),
            InstanceParam::W => p.w.set(positive(value)?),
            InstanceParam::Ad => p.ad.set(non_negative(value)?),
            InstanceParam::As => p.as_.set(non_negative(value)?),
            InstanceParam::Pd => p.pd.set(non_negative(value)?),
            InstanceParam::Ps => p.ps.set(non_negative(value)?),
            InstanceParam::Nrd => p.nrd.set(non_negative(value)?),
            InstanceParam::Nrs => p.nrs.set(non_negative(value)?),
            InstanceParam::M => p.m.set(positive(value)?),
            InstanceParam::Temp => p.temp.set(positive(value)?),
            InstanceParam::Off => p.off = value != 0.0,
            InstanceParam::IcVds => p.ic_vds.set(value),
            InstanceParam::IcVgs => p.ic_vgs.set(value),
            InstanceParam::IcVbs => p.ic_vbs.set(value),
        }
        Ok(())
    }

    /// Set an instance parameter by card name.
    pub fn set_by_name(&mut self, name: &str, value: f64) -> Result<()> {
        self.set(InstanceParam::from_name(name)?, value)
    }

    /// Present value of an instance parameter.
    pub fn get(&self, param: InstanceParam) -> f64 {
        let p = &self.params;
        match param {
            InstanceParam::L => p.l.get(),
            InstanceParam::W => p.w.get(),
            InstanceParam::Ad => p.ad.get(),
            InstanceParam::As => p.as_.get(),
            InstanceParam::Pd => p.pd.get(),
            InstanceParam::Ps => p.ps.get(),
            InstanceParam::Nrd => p.nrd.get(),
            InstanceParam::Nrs => p.nrs.get(),
            InstanceParam::M => p.m.get(),
            InstanceParam::Temp => p.temp.get(),
            InstanceParam::Off => {
                if p.off {
                    1.0
                } else {
                    0.0
                }
            }
            InstanceParam::IcVds => p.ic_vds.get(),
            InstanceParam::IcVgs => p.ic_vgs.get(),
            InstanceParam::IcVbs => p.ic_vbs.get(),
        }
    }

    pub fn is_given(&self, param: InstanceParam) -> bool {
        let p = &self.params;
        match param {
            InstanceParam::L => p.l.is_given(),
            InstanceParam::W => p.w.is_given(),
            InstanceParam::Ad => p.ad.is_given(),
            InstanceParam::As => p.as_.is_given(),
            InstanceParam::Pd => p.pd.is_given(),
            InstanceParam::Ps => p.ps.is_given(),
            InstanceParam::Nrd => p.nrd.is_given(),
            InstanceParam::Nrs => p.nrs.is_given(),
            InstanceParam::M => p.m.is_given(),
            InstanceParam::Temp => p.temp.is_given(),
            InstanceParam::Off => p.off,
            InstanceParam::IcVds => p.ic_vds.is_given(),
            InstanceParam::IcVgs => p.ic_vgs.is_given(),
            InstanceParam::IcVbs => p.ic_vbs.is_given(),
        }
    }

    /// Present conduction mode.
    pub fn conduction_mode(&self) -> ConductionMode {
        self.op.mode
    }

    pub(crate) fn derived(&self) -> Result<&Derived> {
        self.derived
            .as_deref()
            .ok_or_else(|| Error::NotSetup(self.name.clone()))
    }

    pub(crate) fn base(&self) -> Result<usize> {
        self.state_base
            .ok_or_else(|| Error::NotSetup(self.name.clone()))
    }

    /// Absolute state index of a slot, given the instance base.
    #[inline]
    pub(crate) fn slot(base: usize, state: MosState) -> usize {
        base + state.offset()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            params: self.params.clone(),
            op: self.op,
            derived: self.derived.clone(),
            fresh: self.fresh,
            distortion: self.distortion.clone(),
        }
    }
}

impl Device for Mosfet {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.setup_instance(ctx)
    }

    fn unsetup(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.unsetup_instance(ctx)
    }

    fn resetup(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.bind_handles(ctx);
        Ok(())
    }

    fn temperature(&mut self, ctx: &SimContext) -> Result<()> {
        let model = ModelDerived::from_model(&self.model, ctx.options.tnom)?;
        let temp = self.params.temp.or(ctx.options.temp);
        let inst =
            InstanceDerived::from_params_at_temp(&self.name, &model, &self.params.geometry(), temp);
        self.derived = Some(Box::new(Derived { model, inst }));
        // stored currents predate the new parameters
        self.fresh = true;
        Ok(())
    }

    fn load(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.load_instance(ctx)
    }

    fn ac_load(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.ac_load_instance(ctx)
    }

    fn pz_load(&mut self, ctx: &mut SimContext, s: Complex64) -> Result<()> {
        self.pz_load_instance(ctx, s)
    }

    fn conv_test(&mut self, ctx: &mut SimContext) -> bool {
        self.converged(ctx)
    }

    fn trunc(&self, ctx: &SimContext, timestep: &mut f64) {
        self.truncate_step(ctx, timestep);
    }

    fn getic(&mut self, ctx: &SimContext) {
        self.initial_conditions(ctx);
    }

    fn backup(&mut self, mode: BackupMode) {
        match mode {
            BackupMode::Save => self.backup = Some(Box::new(self.snapshot())),
            BackupMode::Restore => {
                if let Some(saved) = self.backup.as_deref().cloned() {
                    self.params = saved.params;
                    self.op = saved.op;
                    self.derived = saved.derived;
                    self.fresh = saved.fresh;
                    self.distortion = saved.distortion;
                }
            }
            BackupMode::Clear => self.backup = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosfet::defs::MosLevel;

    fn device() -> Mosfet {
        let n = |i| NodeId::new(i);
        Mosfet::new(
            "m1",
            Arc::new(MosModel::nmos("nch", MosLevel::One)),
            n(1),
            n(2),
            n(0),
            n(0),
        )
    }

    #[test]
    fn test_instance_param_round_trip() {
        let mut m = device();
        for (i, &param) in InstanceParam::ALL.iter().enumerate() {
            let value = if param == InstanceParam::Off { 1.0 } else { 1.0 + i as f64 };
            m.set(param, value).unwrap();
            assert_eq!(m.get(param), value, "{}", param.name());
            assert!(m.is_given(param));
        }
    }

    #[test]
    fn test_instance_param_validation() {
        let mut m = device();
        assert!(m.set(InstanceParam::M, 0.0).is_err());
        assert!(m.set(InstanceParam::W, -1e-6).is_err());
        assert!(m.set(InstanceParam::Ad, -1.0).is_err());
        assert!(m.set_by_name("bogus", 1.0).is_err());
        m.set_by_name("L", 2e-6).unwrap();
        assert_eq!(m.get(InstanceParam::L), 2e-6);
    }

    #[test]
    fn test_defaults_from_options() {
        let mut m = device();
        m.set(InstanceParam::W, 5e-6).unwrap();
        let options = SimOptions {
            default_l: 3e-6,
            default_w: 7e-6,
            ..SimOptions::default()
        };
        m.params.apply_defaults(&options);
        assert_eq!(m.get(InstanceParam::L), 3e-6);
        assert_eq!(m.get(InstanceParam::W), 5e-6);
        assert!(!m.is_given(InstanceParam::L));
    }

    #[test]
    fn test_backup_restore_clear() {
        let mut m = device();
        m.op.cd = 1.0;
        m.backup(BackupMode::Save);
        m.op.cd = 2.0;
        m.set(InstanceParam::M, 4.0).unwrap();
        m.backup(BackupMode::Restore);
        assert_eq!(m.op.cd, 1.0);
        assert_eq!(m.get(InstanceParam::M), 1.0);

        m.backup(BackupMode::Clear);
        m.op.cd = 3.0;
        m.backup(BackupMode::Restore);
        assert_eq!(m.op.cd, 3.0);
    }
}
