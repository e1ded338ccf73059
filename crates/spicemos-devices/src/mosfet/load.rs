//! Newton load: limiting, bypass, junctions, channel, charges and stamps.
//!
//! Quantities are computed per unit device; the multiplicity `m` is applied
//! only when stamping and when filling the query slots.

use spicemos_core::{Mode, SimContext, StateVector};

use super::defs::{ConductionMode, MosState};
use super::eval::{ChannelBias, ChannelEval, evaluate_channel};
use super::instance::{Derived, Mosfet, OperatingPoint};
use super::junction::{JunctionCaps, junction_current};
use super::limit::{fetlim, limvds, pnjlim};
use super::meyer::{MeyerCaps, meyer};
use super::setup::{Handles, NodeIdSet};
use crate::error::{Error, Result};

/// Terminal voltages in polarity-normalized orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Bias {
    pub vbs: f64,
    pub vgs: f64,
    pub vds: f64,
}

impl Bias {
    #[inline]
    pub fn vbd(self) -> f64 {
        self.vbs - self.vds
    }

    #[inline]
    pub fn vgd(self) -> f64 {
        self.vgs - self.vds
    }

    #[inline]
    pub fn vgb(self) -> f64 {
        self.vgs - self.vbs
    }

    /// Voltages of the present iterate.
    pub fn from_iterate(ctx: &SimContext, nodes: &NodeIdSet, ty: f64) -> Self {
        let v = |n| ctx.rhs_old.get(n);
        Self {
            vbs: ty * (v(nodes.b) - v(nodes.sp)),
            vgs: ty * (v(nodes.g) - v(nodes.sp)),
            vds: ty * (v(nodes.dp) - v(nodes.sp)),
        }
    }

    /// Local channel coordinates for the given conduction mode.
    pub fn channel(self, mode: ConductionMode) -> ChannelBias {
        match mode {
            ConductionMode::Normal => ChannelBias {
                vgs: self.vgs,
                vds: self.vds,
                vbs: self.vbs,
            },
            ConductionMode::Inverse => ChannelBias {
                vgs: self.vgd(),
                vds: -self.vds,
                vbs: self.vbd(),
            },
        }
    }
}

/// Junction and terminal voltages saved by the last load.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StoredBias {
    pub vbs: f64,
    pub vbd: f64,
    pub vgs: f64,
    pub vds: f64,
}

impl StoredBias {
    pub fn read(states: &StateVector, base: usize) -> Self {
        let s0 = |s: MosState| states.get(0, Mosfet::slot(base, s));
        Self {
            vbs: s0(MosState::Vbs),
            vbd: s0(MosState::Vbd),
            vgs: s0(MosState::Vgs),
            vds: s0(MosState::Vds),
        }
    }

    pub fn bias(self) -> Bias {
        Bias {
            vbs: self.vbs,
            vgs: self.vgs,
            vds: self.vds,
        }
    }
}

/// Voltage changes since the last load and the linearly predicted currents.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Increment {
    pub delvbs: f64,
    pub delvbd: f64,
    pub delvgs: f64,
    pub delvds: f64,
    pub delvgd: f64,
    pub cdhat: f64,
    pub cbhat: f64,
}

impl Increment {
    pub fn new(op: &OperatingPoint, new: Bias, old: StoredBias) -> Self {
        let vgdo = old.vgs - old.vds;
        let delvbs = new.vbs - old.vbs;
        let delvbd = new.vbd() - old.vbd;
        let delvgs = new.vgs - old.vgs;
        let delvds = new.vds - old.vds;
        let delvgd = new.vgd() - vgdo;
        let cdhat = match op.mode {
            ConductionMode::Normal => {
                op.cd - op.gbd * delvbd + op.gmbs * delvbs + op.gm * delvgs + op.gds * delvds
            }
            ConductionMode::Inverse => {
                op.cd - (op.gbd - op.gmbs) * delvbd - op.gm * delvgd + op.gds * delvds
            }
        };
        let cbhat = op.cbs + op.cbd + op.gbd * delvbd + op.gbs * delvbs;
        Self {
            delvbs,
            delvbd,
            delvgs,
            delvds,
            delvgd,
            cdhat,
            cbhat,
        }
    }

    /// Whether the bias moved so little that the last linearization can be
    /// reused as is.
    fn within_bypass_tolerance(
        &self,
        op: &OperatingPoint,
        new: Bias,
        old: StoredBias,
        reltol: f64,
        abstol: f64,
        vntol: f64,
    ) -> bool {
        let cb = op.cbs + op.cbd;
        let tempv = self.cbhat.abs().max(cb.abs()) + abstol;
        let small = |del: f64, v: f64, v0: f64| del.abs() < reltol * v.abs().max(v0.abs()) + vntol;
        (self.cbhat - cb).abs() < reltol * tempv
            && small(self.delvbs, new.vbs, old.vbs)
            && small(self.delvbd, new.vbd(), old.vbd)
            && small(self.delvgs, new.vgs, old.vgs)
            && small(self.delvds, new.vds, old.vds)
            && (self.cdhat - op.cd).abs()
                < reltol * self.cdhat.abs().max(op.cd.abs()) + abstol
    }
}

/// Gate charge companion conductances and currents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct GateCompanion {
    pub gcgs: f64,
    pub gcgd: f64,
    pub gcgb: f64,
    pub ceqgs: f64,
    pub ceqgd: f64,
    pub ceqgb: f64,
}

/// The linearized instance, per unit device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Linearized {
    pub gdrain: f64,
    pub gsource: f64,
    pub gds: f64,
    pub gm: f64,
    pub gmbs: f64,
    pub gbd: f64,
    pub gbs: f64,
    pub cdreq: f64,
    pub ceqbs: f64,
    pub ceqbd: f64,
    pub gate: Option<GateCompanion>,
}

impl Linearized {
    pub fn new(
        op: &OperatingPoint,
        derived: &Derived,
        bias: Bias,
        gate: Option<GateCompanion>,
    ) -> Self {
        let ty = derived.model.ty;
        let (vbs, vbd, vgs, vgd, vds) = (bias.vbs, bias.vbd(), bias.vgs, bias.vgd(), bias.vds);
        let cdreq = match op.mode {
            ConductionMode::Normal => {
                ty * (op.cdrain - op.gds * vds - op.gm * vgs - op.gmbs * vbs)
            }
            ConductionMode::Inverse => {
                -ty * (op.cdrain - op.gds * (-vds) - op.gm * vgd - op.gmbs * vbd)
            }
        };
        Self {
            gdrain: derived.inst.drain_conductance,
            gsource: derived.inst.source_conductance,
            gds: op.gds,
            gm: op.gm,
            gmbs: op.gmbs,
            gbd: op.gbd,
            gbs: op.gbs,
            cdreq,
            ceqbs: ty * (op.cbs - op.gbs * vbs),
            ceqbd: ty * (op.cbd - op.gbd * vbd),
            gate,
        }
    }
}

/// Drain and source junction capacitance descriptions.
pub(crate) fn junction_caps(derived: &Derived) -> (JunctionCaps, JunctionCaps) {
    let (md, inst) = (&derived.model, &derived.inst);
    let common = |bottom, side, f2, f3, f4| JunctionCaps {
        bottom,
        side,
        mj: md.mj,
        mjsw: md.mjsw,
        bulk_pot: inst.t_bulk_pot,
        dep_cap: inst.t_dep_cap,
        f2,
        f3,
        f4,
    };
    (
        common(inst.cbd, inst.cbdsw, inst.f2d, inst.f3d, inst.f4d),
        common(inst.cbs, inst.cbssw, inst.f2s, inst.f3s, inst.f4s),
    )
}

/// Channel evaluation at a terminal bias.
pub(crate) fn channel_at(derived: &Derived, bias: Bias) -> (ConductionMode, ChannelEval) {
    let mode = ConductionMode::from_vds(bias.vds);
    let eval = evaluate_channel(&derived.model, &derived.inst, bias.channel(mode));
    (mode, eval)
}

/// Meyer half-capacitances in terminal orientation. `eval` carries the
/// local-coordinate turn-on and saturation voltages.
pub(crate) fn meyer_at(
    derived: &Derived,
    bias: Bias,
    mode: ConductionMode,
    eval: &ChannelEval,
) -> MeyerCaps {
    let inst = &derived.inst;
    match mode {
        ConductionMode::Normal => meyer(
            bias.vgs,
            bias.vgd(),
            eval.von,
            eval.vdsat,
            inst.t_phi,
            inst.oxide_cap,
        ),
        ConductionMode::Inverse => {
            let caps = meyer(
                bias.vgd(),
                bias.vgs,
                eval.von,
                eval.vdsat,
                inst.t_phi,
                inst.oxide_cap,
            );
            MeyerCaps {
                cgs: caps.cgd,
                cgd: caps.cgs,
                cgb: caps.cgb,
            }
        }
    }
}

/// Extrapolation factor for the predictor step.
fn predictor_factor(ctx: &SimContext) -> f64 {
    if ctx.delta_old[1] != 0.0 {
        ctx.delta / ctx.delta_old[1]
    } else {
        0.0
    }
}

/// Limit a Newton step on the terminal voltages. The gate step is limited
/// on the source side in normal mode and on the drain side in inverse mode;
/// the junction step on the forward-biased junction. The flag reports a
/// clamped junction.
pub(crate) fn limit_step(
    predicted: Bias,
    old: StoredBias,
    von: f64,
    vt: f64,
    (source_vcrit, drain_vcrit): (f64, f64),
    fix_limit: bool,
) -> (Bias, bool) {
    let vgdo = old.vgs - old.vds;
    let vgd = predicted.vgd();
    let (vgs, vds) = if old.vds >= 0.0 {
        let vgs = fetlim(predicted.vgs, old.vgs, von);
        (vgs, limvds(vgs - vgd, old.vds))
    } else {
        let vgd = fetlim(vgd, vgdo, von);
        let mut vds = predicted.vgs - vgd;
        if !fix_limit {
            vds = -limvds(-vds, -old.vds);
        }
        (vgd + vds, vds)
    };
    let (vbs, hit) = if vds >= 0.0 {
        pnjlim(predicted.vbs, old.vbs, vt, source_vcrit)
    } else {
        let (vbd, hit) = pnjlim(predicted.vbd(), old.vbd, vt, drain_vcrit);
        (vbd + vds, hit)
    };
    (Bias { vbs, vgs, vds }, hit)
}

impl Mosfet {
    pub(crate) fn load_instance(&mut self, ctx: &mut SimContext) -> Result<()> {
        let base = self.base()?;
        let handles = self
            .handles
            .ok_or_else(|| Error::NotSetup(self.name.clone()))?;
        let nodes = self.node_set();
        let derived = self
            .derived
            .as_deref()
            .ok_or_else(|| Error::NotSetup(self.name.clone()))?;
        let (md, inst) = (&derived.model, &derived.inst);
        let ty = md.ty;
        let vt = inst.vt;
        let off = self.params.off;
        let m = self.params.m.get();
        let mode = ctx.mode;
        let opts = ctx.options.clone();
        let slot = |s: MosState| Mosfet::slot(base, s);

        let caps_active = mode.intersects(Mode::TRAN | Mode::TRANOP | Mode::INITSMSIG);
        let mut limited = false;
        let mut bypassed = false;

        let bias = if mode
            .intersects(Mode::INITFLOAT | Mode::INITPRED | Mode::INITSMSIG | Mode::INITTRAN)
            || (mode.contains(Mode::INITFIX) && !off)
        {
            let predicted = if mode.contains(Mode::INITPRED) {
                let xfact = predictor_factor(ctx);
                let states = &mut ctx.states;
                let mut extrapolate = |s: MosState| {
                    let s1 = states.get(1, slot(s));
                    let s2 = states.get(2, slot(s));
                    states.set(0, slot(s), s1);
                    (1.0 + xfact) * s1 - xfact * s2
                };
                let bias = Bias {
                    vbs: extrapolate(MosState::Vbs),
                    vgs: extrapolate(MosState::Vgs),
                    vds: extrapolate(MosState::Vds),
                };
                let vbd = states.get(0, slot(MosState::Vbs)) - states.get(0, slot(MosState::Vds));
                states.set(0, slot(MosState::Vbd), vbd);
                bias
            } else {
                Bias::from_iterate(ctx, &nodes, ty)
            };

            let old = StoredBias::read(&ctx.states, base);
            let inc = Increment::new(&self.op, predicted, old);

            if opts.bypass
                && !self.fresh
                && !mode.intersects(Mode::INITPRED | Mode::INITTRAN | Mode::INITSMSIG)
                && inc.within_bypass_tolerance(
                    &self.op,
                    predicted,
                    old,
                    opts.reltol,
                    opts.abstol,
                    opts.vntol,
                )
            {
                bypassed = true;
                old.bias()
            } else {
                let (bias, hit) = limit_step(
                    predicted,
                    old,
                    ty * self.op.von,
                    vt,
                    (inst.source_vcrit, inst.drain_vcrit),
                    opts.fix_limit,
                );
                limited = hit;
                bias
            }
        } else if mode.contains(Mode::INITJCT) && !off {
            let ic = Bias {
                vbs: ty * self.params.ic_vbs.get(),
                vgs: ty * self.params.ic_vgs.get(),
                vds: ty * self.params.ic_vds.get(),
            };
            if ic == Bias::default()
                && (mode.intersects(Mode::TRAN | Mode::DCOP | Mode::DCTRANCURVE)
                    || !mode.contains(Mode::UIC))
            {
                Bias {
                    vbs: -1.0,
                    vgs: ty * inst.t_vto,
                    vds: 0.0,
                }
            } else {
                ic
            }
        } else {
            Bias::default()
        };

        let (vgs, vgd, vgb) = (bias.vgs, bias.vgd(), bias.vgb());
        let overlap = MeyerCaps {
            cgs: inst.gate_source_overlap,
            cgd: inst.gate_drain_overlap,
            cgb: inst.gate_bulk_overlap,
        };
        let s0 = |states: &StateVector, s: MosState| states.get(0, slot(s));
        let s1 = |states: &StateVector, s: MosState| states.get(1, slot(s));
        let mut gate_caps = None;

        if bypassed {
            if mode.intersects(Mode::TRAN | Mode::TRANOP) {
                let st = &ctx.states;
                gate_caps = Some(MeyerCaps {
                    cgs: s0(st, MosState::Capgs) + s1(st, MosState::Capgs) + overlap.cgs,
                    cgd: s0(st, MosState::Capgd) + s1(st, MosState::Capgd) + overlap.cgd,
                    cgb: s0(st, MosState::Capgb) + s1(st, MosState::Capgb) + overlap.cgb,
                });
            }
        } else {
            let vbd = bias.vbd();
            let js = junction_current(bias.vbs, inst.source_sat_cur, vt, opts.gmin);
            let jd = junction_current(vbd, inst.drain_sat_cur, vt, opts.gmin);
            let (cmode, ch) = channel_at(derived, bias);
            let mut op = OperatingPoint {
                mode: cmode,
                cd: cmode.sign() * ch.cdrain - jd.current,
                cdrain: ch.cdrain,
                cbs: js.current,
                cbd: jd.current,
                gm: ch.gm,
                gds: ch.gds,
                gmbs: ch.gmbs,
                gbd: jd.conductance,
                gbs: js.conductance,
                capbd: self.op.capbd,
                capbs: self.op.capbs,
                von: ty * ch.von,
                vdsat: ty * ch.vdsat,
            };

            if caps_active {
                let (drain_caps, source_caps) = junction_caps(derived);
                let (qbs, capbs) = if source_caps.is_zero() {
                    (0.0, 0.0)
                } else {
                    source_caps.charge(bias.vbs)
                };
                let (qbd, capbd) = if drain_caps.is_zero() {
                    (0.0, 0.0)
                } else {
                    drain_caps.charge(vbd)
                };
                ctx.states.set(0, slot(MosState::Qbs), qbs);
                ctx.states.set(0, slot(MosState::Qbd), qbd);
                op.capbs = capbs;
                op.capbd = capbd;
            }

            if mode.contains(Mode::TRAN) || (mode.contains(Mode::INITTRAN) && !mode.contains(Mode::UIC))
            {
                let (geq, _) = ctx
                    .integrator
                    .integrate(&mut ctx.states, op.capbd, slot(MosState::Qbd));
                let cq = ctx.states.get(0, slot(MosState::Cqbd));
                op.gbd += geq;
                op.cbd += cq;
                op.cd -= cq;
                let (geq, _) = ctx
                    .integrator
                    .integrate(&mut ctx.states, op.capbs, slot(MosState::Qbs));
                op.gbs += geq;
                op.cbs += ctx.states.get(0, slot(MosState::Cqbs));
            }

            if limited && !(off && mode.intersects(Mode::INITFIX | Mode::INITSMSIG)) {
                log::trace!("{}: junction voltage limited", self.name);
                ctx.flag_nonconvergence(&self.name);
            }

            let st = &mut ctx.states;
            st.set(0, slot(MosState::Vbs), bias.vbs);
            st.set(0, slot(MosState::Vbd), vbd);
            st.set(0, slot(MosState::Vgs), bias.vgs);
            st.set(0, slot(MosState::Vds), bias.vds);

            if caps_active {
                let half = meyer_at(derived, bias, cmode, &ch);
                st.set(0, slot(MosState::Capgs), half.cgs);
                st.set(0, slot(MosState::Capgd), half.cgd);
                st.set(0, slot(MosState::Capgb), half.cgb);
                let st: &StateVector = st;

                let vgs1 = s1(st, MosState::Vgs);
                let vgd1 = vgs1 - s1(st, MosState::Vds);
                let vgb1 = vgs1 - s1(st, MosState::Vbs);
                let total = |s: MosState, ov: f64| {
                    if mode.intersects(Mode::TRANOP | Mode::INITSMSIG) {
                        2.0 * s0(st, s) + ov
                    } else {
                        s0(st, s) + s1(st, s) + ov
                    }
                };
                let caps = MeyerCaps {
                    cgs: total(MosState::Capgs, overlap.cgs),
                    cgd: total(MosState::Capgd, overlap.cgd),
                    cgb: total(MosState::Capgb, overlap.cgb),
                };

                let charges = [
                    (MosState::Qgs, vgs, vgs1, caps.cgs),
                    (MosState::Qgd, vgd, vgd1, caps.cgd),
                    (MosState::Qgb, vgb, vgb1, caps.cgb),
                ];
                if mode.intersects(Mode::INITPRED | Mode::INITTRAN) {
                    let xfact = predictor_factor(ctx);
                    let st = &mut ctx.states;
                    for (q, ..) in charges {
                        let q1 = st.get(1, slot(q));
                        let q2 = st.get(2, slot(q));
                        st.set(0, slot(q), (1.0 + xfact) * q1 - xfact * q2);
                    }
                } else if mode.contains(Mode::TRAN) {
                    for (q, v, v1, cap) in charges {
                        let q1 = ctx.states.get(1, slot(q));
                        ctx.states.set(0, slot(q), (v - v1) * cap + q1);
                    }
                } else {
                    for (q, v, _, cap) in charges {
                        ctx.states.set(0, slot(q), v * cap);
                    }
                }
                gate_caps = Some(caps);
            }

            self.op = op;
        }

        let gate = match gate_caps {
            Some(caps) if mode.contains(Mode::TRAN) && !mode.contains(Mode::INITTRAN) => {
                let ag0 = ctx.ag0();
                let mut companion = |cap: f64, q: MosState, cq: MosState, v: f64| {
                    if cap == 0.0 {
                        ctx.states.set(0, slot(cq), 0.0);
                    }
                    let (g, ceq) = ctx.integrator.integrate(&mut ctx.states, cap, slot(q));
                    (g, ceq - g * v + ag0 * ctx.states.get(0, slot(q)))
                };
                let (gcgs, ceqgs) = companion(caps.cgs, MosState::Qgs, MosState::Cqgs, vgs);
                let (gcgd, ceqgd) = companion(caps.cgd, MosState::Qgd, MosState::Cqgd, vgd);
                let (gcgb, ceqgb) = companion(caps.cgb, MosState::Qgb, MosState::Cqgb, vgb);
                Some(GateCompanion {
                    gcgs,
                    gcgd,
                    gcgb,
                    ceqgs,
                    ceqgd,
                    ceqgb,
                })
            }
            _ => None,
        };

        let lin = Linearized::new(&self.op, derived, bias, gate);
        stamp(ctx, &handles, &nodes, &lin, self.op.mode, ty, m);
        record_queries(&mut ctx.states, base, &self.op, gate_caps, gate.is_some(), m);
        self.fresh = false;

        log::trace!(
            "{}: vgs={:.6} vds={:.6} vbs={:.6} id={:.6e} {}",
            self.name,
            bias.vgs,
            bias.vds,
            bias.vbs,
            self.op.cd,
            if bypassed { "bypass" } else { "eval" }
        );
        Ok(())
    }
}

/// Fill the query slots of timepoint 0, scaled by `m`.
fn record_queries(
    states: &mut StateVector,
    base: usize,
    op: &OperatingPoint,
    gate_caps: Option<MeyerCaps>,
    gate_current: bool,
    m: f64,
) {
    let slot = |s: MosState| Mosfet::slot(base, s);
    let (cqgs, cqgd, cqgb) = if gate_current {
        (
            states.get(0, slot(MosState::Cqgs)),
            states.get(0, slot(MosState::Cqgd)),
            states.get(0, slot(MosState::Cqgb)),
        )
    } else {
        (0.0, 0.0, 0.0)
    };
    let mut put = |s: MosState, v: f64| states.set(0, slot(s), v);
    put(MosState::AskCd, m * op.cd);
    put(MosState::AskCbs, m * op.cbs);
    put(MosState::AskCbd, m * op.cbd);
    put(MosState::AskCg, m * (cqgs + cqgd + cqgb));
    put(MosState::AskCb, m * (op.cbd + op.cbs - cqgb));
    put(MosState::AskGm, m * op.gm);
    put(MosState::AskGds, m * op.gds);
    put(MosState::AskGmbs, m * op.gmbs);
    put(MosState::AskGbd, m * op.gbd);
    put(MosState::AskGbs, m * op.gbs);
    put(MosState::AskCapbd, m * op.capbd);
    put(MosState::AskCapbs, m * op.capbs);
    if let Some(caps) = gate_caps {
        put(MosState::AskCapgs, m * caps.cgs);
        put(MosState::AskCapgd, m * caps.cgd);
        put(MosState::AskCapgb, m * caps.cgb);
    }
    put(MosState::AskVon, op.von);
    put(MosState::AskVdsat, op.vdsat);
    put(MosState::AskMode, op.mode.sign());
}

/// Stamp the linearized instance. The gate companion, when present, is
/// the transient part; without it this is the DC stamp.
pub(crate) fn stamp(
    ctx: &mut SimContext,
    h: &Handles,
    n: &NodeIdSet,
    lin: &Linearized,
    mode: ConductionMode,
    ty: f64,
    m: f64,
) {
    stamp_terminals(ctx, h, n, lin, m);
    match mode {
        ConductionMode::Normal => stamp_normal(ctx, h, lin, m),
        ConductionMode::Inverse => stamp_inverse(ctx, h, lin, m),
    }
    if let Some(gate) = &lin.gate {
        stamp_gate(ctx, h, n, gate, ty, m);
    }
}

/// Series resistances, junctions and the right-hand side.
fn stamp_terminals(
    ctx: &mut SimContext,
    h: &Handles,
    n: &NodeIdSet,
    lin: &Linearized,
    m: f64,
) {
    ctx.rhs.add(n.b, -m * (lin.ceqbs + lin.ceqbd));
    ctx.rhs.add(n.dp, m * (lin.ceqbd - lin.cdreq));
    ctx.rhs.add(n.sp, m * (lin.cdreq + lin.ceqbs));

    let a = &mut ctx.matrix;
    a.add(h.dd, m * lin.gdrain);
    a.add(h.ss, m * lin.gsource);
    a.add(h.bb, m * (lin.gbd + lin.gbs));
    a.add(h.ddp, -m * lin.gdrain);
    a.add(h.ssp, -m * lin.gsource);
    a.add(h.dpd, -m * lin.gdrain);
    a.add(h.sps, -m * lin.gsource);
    a.add(h.bdp, -m * lin.gbd);
    a.add(h.bsp, -m * lin.gbs);
    a.add(h.dpb, -m * lin.gbd);
    a.add(h.spb, -m * lin.gbs);
    a.add(h.dpdp, m * (lin.gdrain + lin.gds + lin.gbd));
    a.add(h.spsp, m * (lin.gsource + lin.gds + lin.gbs));
    a.add(h.dpsp, -m * lin.gds);
    a.add(h.spdp, -m * lin.gds);
}

/// Transconductances with the internal source acting as source.
fn stamp_normal(ctx: &mut SimContext, h: &Handles, lin: &Linearized, m: f64) {
    let a = &mut ctx.matrix;
    a.add(h.spsp, m * (lin.gm + lin.gmbs));
    a.add(h.dpg, m * lin.gm);
    a.add(h.dpb, m * lin.gmbs);
    a.add(h.dpsp, -m * (lin.gm + lin.gmbs));
    a.add(h.spg, -m * lin.gm);
    a.add(h.spb, -m * lin.gmbs);
}

/// Transconductances with the internal drain acting as source.
fn stamp_inverse(ctx: &mut SimContext, h: &Handles, lin: &Linearized, m: f64) {
    let a = &mut ctx.matrix;
    a.add(h.dpdp, m * (lin.gm + lin.gmbs));
    a.add(h.dpg, -m * lin.gm);
    a.add(h.dpb, -m * lin.gmbs);
    a.add(h.spg, m * lin.gm);
    a.add(h.spb, m * lin.gmbs);
    a.add(h.spdp, -m * (lin.gm + lin.gmbs));
}

/// Gate charge companions.
fn stamp_gate(
    ctx: &mut SimContext,
    h: &Handles,
    n: &NodeIdSet,
    gate: &GateCompanion,
    ty: f64,
    m: f64,
) {
    ctx.rhs.add(n.g, -m * ty * (gate.ceqgs + gate.ceqgb + gate.ceqgd));
    ctx.rhs.add(n.b, m * ty * gate.ceqgb);
    ctx.rhs.add(n.dp, m * ty * gate.ceqgd);
    ctx.rhs.add(n.sp, m * ty * gate.ceqgs);

    let a = &mut ctx.matrix;
    a.add(h.gg, m * (gate.gcgd + gate.gcgs + gate.gcgb));
    a.add(h.bb, m * gate.gcgb);
    a.add(h.dpdp, m * gate.gcgd);
    a.add(h.spsp, m * gate.gcgs);
    a.add(h.gb, -m * gate.gcgb);
    a.add(h.gdp, -m * gate.gcgd);
    a.add(h.gsp, -m * gate.gcgs);
    a.add(h.bg, -m * gate.gcgb);
    a.add(h.dpg, -m * gate.gcgd);
    a.add(h.spg, -m * gate.gcgs);
}

#[cfg(test)]
mod tests {
    use super::*;

    const VT: f64 = 0.025864;
    const VCRIT: f64 = 0.7;

    fn stored(vbs: f64, vgs: f64, vds: f64) -> StoredBias {
        StoredBias {
            vbs,
            vbd: vbs - vds,
            vgs,
            vds,
        }
    }

    #[test]
    fn test_inverse_step_limits_raw_drain_junction() {
        let old = stored(-1.0, 0.0, -0.5);
        let predicted = Bias {
            vbs: -1.0,
            vgs: 0.0,
            vds: -10.0,
        };
        let (bias, hit) = limit_step(predicted, old, 0.7, VT, (VCRIT, VCRIT), false);
        // gate-drain clamped just above threshold
        assert!((bias.vds + 1.2).abs() < 1e-12, "vds = {}", bias.vds);
        // the junction sees the unlimited vbd = 9 V
        let (vbd, expect_hit) = pnjlim(9.0, -0.5, VT, VCRIT);
        assert!(hit && expect_hit);
        assert!((bias.vbd() - vbd).abs() < 1e-12, "vbd = {}", bias.vbd());
        assert!((bias.vbs - (vbd - 1.2)).abs() < 1e-12, "vbs = {}", bias.vbs);
    }

    #[test]
    fn test_normal_step_limits_source_junction() {
        let old = stored(0.0, 2.0, 1.0);
        let predicted = Bias {
            vbs: 5.0,
            vgs: 2.0,
            vds: 1.0,
        };
        let (bias, hit) = limit_step(predicted, old, 0.7, VT, (VCRIT, VCRIT), false);
        assert!(hit);
        assert_eq!(bias.vgs, 2.0);
        assert_eq!(bias.vds, 1.0);
        assert_eq!(bias.vbs, pnjlim(5.0, 0.0, VT, VCRIT).0);
    }

    #[test]
    fn test_small_step_passes_through() {
        let old = stored(-1.0, 2.0, -1.0);
        let predicted = Bias {
            vbs: -1.01,
            vgs: 2.01,
            vds: -1.01,
        };
        let (bias, hit) = limit_step(predicted, old, 0.7, VT, (VCRIT, VCRIT), false);
        assert!(!hit);
        assert!((bias.vbs - predicted.vbs).abs() < 1e-12);
        assert!((bias.vgs - predicted.vgs).abs() < 1e-12);
        assert!((bias.vds - predicted.vds).abs() < 1e-12);
    }
}
