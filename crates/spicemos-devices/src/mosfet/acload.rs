//! Small-signal AC and pole-zero loads.

use num_complex::Complex64;
use spicemos_core::{ElementHandle, SimContext, SparseMatrix};

use super::defs::{ConductionMode, MosState};
use super::instance::Mosfet;
use super::setup::Handles;
use crate::error::{Error, Result};

/// Capacitances of the small-signal model, multiplicity included.
#[derive(Debug, Clone, Copy)]
struct SmallSignalCaps {
    gs: f64,
    gd: f64,
    gb: f64,
    bd: f64,
    bs: f64,
}

/// Conductances of the small-signal model, multiplicity included.
#[derive(Debug, Clone, Copy)]
struct SmallSignalConductances {
    gdrain: f64,
    gsource: f64,
    gds: f64,
    gm: f64,
    gmbs: f64,
    gbd: f64,
    gbs: f64,
    xnrm: f64,
    xrev: f64,
}

impl Mosfet {
    fn small_signal(
        &self,
        ctx: &SimContext,
    ) -> Result<(Handles, SmallSignalCaps, SmallSignalConductances)> {
        let base = self.base()?;
        let handles = self
            .handles
            .ok_or_else(|| Error::NotSetup(self.name.clone()))?;
        let inst = &self.derived()?.inst;
        let m = self.params.m.get();
        let s0 = |s: MosState| ctx.states.get(0, Mosfet::slot(base, s));
        let caps = SmallSignalCaps {
            gs: m * (2.0 * s0(MosState::Capgs) + inst.gate_source_overlap),
            gd: m * (2.0 * s0(MosState::Capgd) + inst.gate_drain_overlap),
            gb: m * (2.0 * s0(MosState::Capgb) + inst.gate_bulk_overlap),
            bd: m * self.op.capbd,
            bs: m * self.op.capbs,
        };
        let (xnrm, xrev) = match self.op.mode {
            ConductionMode::Normal => (1.0, 0.0),
            ConductionMode::Inverse => (0.0, 1.0),
        };
        let g = SmallSignalConductances {
            gdrain: m * inst.drain_conductance,
            gsource: m * inst.source_conductance,
            gds: m * self.op.gds,
            gm: m * self.op.gm,
            gmbs: m * self.op.gmbs,
            gbd: m * self.op.gbd,
            gbs: m * self.op.gbs,
            xnrm,
            xrev,
        };
        Ok((handles, caps, g))
    }

    pub(crate) fn ac_load_instance(&mut self, ctx: &mut SimContext) -> Result<()> {
        let (h, c, g) = self.small_signal(ctx)?;
        let omega = ctx.omega;
        stamp_reactive(ctx, &h, &c, |a, handle, x| a.add_imag(handle, x * omega));
        stamp_real(ctx, &h, &g);
        Ok(())
    }

    pub(crate) fn pz_load_instance(&mut self, ctx: &mut SimContext, s: Complex64) -> Result<()> {
        let (h, c, g) = self.small_signal(ctx)?;
        stamp_reactive(ctx, &h, &c, |a, handle, x| {
            a.add(handle, x * s.re);
            a.add_imag(handle, x * s.im);
        });
        stamp_real(ctx, &h, &g);
        Ok(())
    }
}

/// Stamp every capacitance through `put`, which scales it by the
/// frequency in whatever form the analysis needs.
fn stamp_reactive<F>(ctx: &mut SimContext, h: &Handles, c: &SmallSignalCaps, mut put: F)
where
    F: FnMut(&mut SparseMatrix, ElementHandle, f64),
{
    let a = &mut ctx.matrix;
    put(a, h.gg, c.gd + c.gs + c.gb);
    put(a, h.bb, c.gb + c.bd + c.bs);
    put(a, h.dpdp, c.gd + c.bd);
    put(a, h.spsp, c.gs + c.bs);
    put(a, h.gb, -c.gb);
    put(a, h.gdp, -c.gd);
    put(a, h.gsp, -c.gs);
    put(a, h.bg, -c.gb);
    put(a, h.bdp, -c.bd);
    put(a, h.bsp, -c.bs);
    put(a, h.dpg, -c.gd);
    put(a, h.dpb, -c.bd);
    put(a, h.spg, -c.gs);
    put(a, h.spb, -c.bs);
}

fn stamp_real(ctx: &mut SimContext, h: &Handles, g: &SmallSignalConductances) {
    let a = &mut ctx.matrix;
    let (xnrm, xrev) = (g.xnrm, g.xrev);
    a.add(h.dd, g.gdrain);
    a.add(h.ss, g.gsource);
    a.add(h.bb, g.gbd + g.gbs);
    a.add(h.dpdp, g.gdrain + g.gds + g.gbd + xrev * (g.gm + g.gmbs));
    a.add(h.spsp, g.gsource + g.gds + g.gbs + xnrm * (g.gm + g.gmbs));
    a.add(h.ddp, -g.gdrain);
    a.add(h.ssp, -g.gsource);
    a.add(h.bdp, -g.gbd);
    a.add(h.bsp, -g.gbs);
    a.add(h.dpd, -g.gdrain);
    a.add(h.dpg, (xnrm - xrev) * g.gm);
    a.add(h.dpb, -g.gbd + (xnrm - xrev) * g.gmbs);
    a.add(h.dpsp, -g.gds - xnrm * (g.gm + g.gmbs));
    a.add(h.spg, -(xnrm - xrev) * g.gm);
    a.add(h.sps, -g.gsource);
    a.add(h.spb, -g.gbs - (xnrm - xrev) * g.gmbs);
    a.add(h.spdp, -g.gds - xrev * (g.gm + g.gmbs));
}
