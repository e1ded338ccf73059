//! Linear elements for building test circuits around a MOSFET.

use num_complex::Complex64;
use spicemos_core::{ElementHandle, NodeId, SimContext};
use spicemos_devices::{BackupMode, Device, Error as DeviceError};

type DeviceResult<T> = spicemos_devices::Result<T>;

/// Source waveform.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    /// Constant value.
    Dc(f64),
    /// Piecewise-linear `(time, value)` points, held constant outside them.
    Pwl(Vec<(f64, f64)>),
}

impl Waveform {
    /// Value at `time`.
    pub fn value_at(&self, time: f64) -> f64 {
        match self {
            Waveform::Dc(v) => *v,
            Waveform::Pwl(points) => {
                let Some(&(t0, v0)) = points.first() else {
                    return 0.0;
                };
                if time <= t0 {
                    return v0;
                }
                for pair in points.windows(2) {
                    let ((ta, va), (tb, vb)) = (pair[0], pair[1]);
                    if time <= tb {
                        if tb == ta {
                            return vb;
                        }
                        return va + (vb - va) * (time - ta) / (tb - ta);
                    }
                }
                points.last().map_or(v0, |&(_, v)| v)
            }
        }
    }

    /// Value used by DC analyses.
    pub fn dc_value(&self) -> f64 {
        self.value_at(0.0)
    }
}

/// Two-terminal linear resistor.
#[derive(Debug, Clone)]
pub struct Resistor {
    name: String,
    pos: NodeId,
    neg: NodeId,
    conductance: f64,
    handles: [ElementHandle; 4],
}

impl Resistor {
    pub fn new(name: impl Into<String>, pos: NodeId, neg: NodeId, resistance: f64) -> DeviceResult<Self> {
        let name = name.into();
        if resistance.is_nan() || resistance <= 0.0 {
            return Err(DeviceError::bad_parameter("r", format!("{resistance} must be positive")));
        }
        Ok(Self {
            name,
            pos,
            neg,
            conductance: 1.0 / resistance,
            handles: [ElementHandle::DISCARD; 4],
        })
    }

    fn stamp(&self, ctx: &mut SimContext) {
        let g = self.conductance;
        let [pp, pn, np, nn] = self.handles;
        ctx.matrix.add(pp, g);
        ctx.matrix.add(pn, -g);
        ctx.matrix.add(np, -g);
        ctx.matrix.add(nn, g);
    }
}

impl Device for Resistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        self.resetup(ctx)
    }

    fn unsetup(&mut self, _ctx: &mut SimContext) -> DeviceResult<()> {
        self.handles = [ElementHandle::DISCARD; 4];
        Ok(())
    }

    fn resetup(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        let (p, n) = (self.pos, self.neg);
        let m = &mut ctx.matrix;
        self.handles = [m.element(p, p), m.element(p, n), m.element(n, p), m.element(n, n)];
        Ok(())
    }

    fn temperature(&mut self, _ctx: &SimContext) -> DeviceResult<()> {
        Ok(())
    }

    fn load(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        self.stamp(ctx);
        Ok(())
    }

    fn ac_load(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        self.stamp(ctx);
        Ok(())
    }

    fn pz_load(&mut self, ctx: &mut SimContext, _s: Complex64) -> DeviceResult<()> {
        self.stamp(ctx);
        Ok(())
    }

    fn conv_test(&mut self, _ctx: &mut SimContext) -> bool {
        true
    }

    fn trunc(&self, _ctx: &SimContext, _timestep: &mut f64) {}

    fn getic(&mut self, _ctx: &SimContext) {}

    fn backup(&mut self, _mode: BackupMode) {}
}

/// Independent voltage source with a branch-current unknown.
///
/// The branch current flows from `pos` through the source to `neg`.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    name: String,
    pos: NodeId,
    neg: NodeId,
    waveform: Waveform,
    ac_magnitude: f64,
    branch: Option<NodeId>,
    handles: [ElementHandle; 4],
}

impl VoltageSource {
    pub fn new(name: impl Into<String>, pos: NodeId, neg: NodeId, waveform: Waveform) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            waveform,
            ac_magnitude: 0.0,
            branch: None,
            handles: [ElementHandle::DISCARD; 4],
        }
    }

    pub fn dc(name: impl Into<String>, pos: NodeId, neg: NodeId, value: f64) -> Self {
        Self::new(name, pos, neg, Waveform::Dc(value))
    }

    /// Small-signal magnitude for AC analysis.
    pub fn with_ac(mut self, magnitude: f64) -> Self {
        self.ac_magnitude = magnitude;
        self
    }

    /// Change the DC level, e.g. between sweep points.
    pub fn set_dc(&mut self, value: f64) {
        self.waveform = Waveform::Dc(value);
    }

    /// The branch-current unknown, once set up.
    pub fn branch(&self) -> Option<NodeId> {
        self.branch
    }

    fn branch_or_err(&self) -> DeviceResult<NodeId> {
        self.branch
            .ok_or_else(|| DeviceError::NotSetup(self.name.clone()))
    }

    fn stamp_incidence(&self, ctx: &mut SimContext) {
        let [pb, nb, bp, bn] = self.handles;
        ctx.matrix.add(pb, 1.0);
        ctx.matrix.add(nb, -1.0);
        ctx.matrix.add(bp, 1.0);
        ctx.matrix.add(bn, -1.0);
    }
}

impl Device for VoltageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        if self.branch.is_none() {
            self.branch = Some(ctx.nodes.create_internal(&self.name, "branch")?);
        }
        self.resetup(ctx)
    }

    fn unsetup(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        if let Some(branch) = self.branch.take() {
            ctx.nodes.remove(branch)?;
        }
        self.handles = [ElementHandle::DISCARD; 4];
        Ok(())
    }

    fn resetup(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        let b = self.branch_or_err()?;
        let (p, n) = (self.pos, self.neg);
        let m = &mut ctx.matrix;
        self.handles = [m.element(p, b), m.element(n, b), m.element(b, p), m.element(b, n)];
        Ok(())
    }

    fn temperature(&mut self, _ctx: &SimContext) -> DeviceResult<()> {
        Ok(())
    }

    fn load(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        let b = self.branch_or_err()?;
        self.stamp_incidence(ctx);
        let value = self.waveform.value_at(ctx.time);
        ctx.rhs.add(b, value);
        Ok(())
    }

    fn ac_load(&mut self, ctx: &mut SimContext) -> DeviceResult<()> {
        let b = self.branch_or_err()?;
        self.stamp_incidence(ctx);
        ctx.rhs.add(b, self.ac_magnitude);
        Ok(())
    }

    fn pz_load(&mut self, ctx: &mut SimContext, _s: Complex64) -> DeviceResult<()> {
        self.stamp_incidence(ctx);
        Ok(())
    }

    fn conv_test(&mut self, _ctx: &mut SimContext) -> bool {
        true
    }

    fn trunc(&self, _ctx: &SimContext, _timestep: &mut f64) {}

    fn getic(&mut self, _ctx: &SimContext) {}

    fn backup(&mut self, _mode: BackupMode) {}
}
