//! Setup: internal nodes, history slots and matrix element handles.

use spicemos_core::{ElementHandle, NodeId, SimContext};

use super::defs::NUM_STATES;
use super::instance::Mosfet;
use crate::error::Result;

/// Matrix element handles, named row-column by node: D/G/S/B are the
/// external terminals, DP/SP the internal drain and source.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Handles {
    pub dd: ElementHandle,
    pub gg: ElementHandle,
    pub ss: ElementHandle,
    pub bb: ElementHandle,
    pub dpdp: ElementHandle,
    pub spsp: ElementHandle,
    pub ddp: ElementHandle,
    pub gb: ElementHandle,
    pub gdp: ElementHandle,
    pub gsp: ElementHandle,
    pub ssp: ElementHandle,
    pub bdp: ElementHandle,
    pub bsp: ElementHandle,
    pub dpsp: ElementHandle,
    pub dpd: ElementHandle,
    pub bg: ElementHandle,
    pub dpg: ElementHandle,
    pub spg: ElementHandle,
    pub sps: ElementHandle,
    pub dpb: ElementHandle,
    pub spb: ElementHandle,
    pub spdp: ElementHandle,
}

impl Mosfet {
    /// Whether the model or geometry calls for a drain series resistance.
    fn has_drain_resistance(&self) -> bool {
        let rd = self.model.rd.get();
        let rsh = self.model.rsh.get();
        rd != 0.0 || (rsh != 0.0 && self.params.nrd.get() != 0.0)
    }

    fn has_source_resistance(&self) -> bool {
        let rs = self.model.rs.get();
        let rsh = self.model.rsh.get();
        rs != 0.0 || (rsh != 0.0 && self.params.nrs.get() != 0.0)
    }

    pub(crate) fn setup_instance(&mut self, ctx: &mut SimContext) -> Result<()> {
        log::trace!(
            "{}: model {} level {} {}",
            self.name,
            self.model.name,
            self.model.level().number(),
            self.model.polarity().name()
        );
        self.params.apply_defaults(&ctx.options);

        if self.state_base.is_none() {
            self.state_base = Some(ctx.states.allocate(NUM_STATES));
        }

        if self.has_drain_resistance() {
            if self.drain_prime == self.terminals.drain {
                self.drain_prime = ctx.nodes.create_internal(&self.name, "drain")?;
            }
        } else {
            self.drain_prime = self.terminals.drain;
        }
        if self.has_source_resistance() {
            if self.source_prime == self.terminals.source {
                self.source_prime = ctx.nodes.create_internal(&self.name, "source")?;
            }
        } else {
            self.source_prime = self.terminals.source;
        }

        self.bind_handles(ctx);
        self.fresh = true;
        log::debug!(
            "{}: setup d'={} s'={} states@{:?}",
            self.name,
            self.drain_prime,
            self.source_prime,
            self.state_base
        );
        Ok(())
    }

    pub(crate) fn bind_handles(&mut self, ctx: &mut SimContext) {
        let NodeIdSet { d, g, s, b, dp, sp } = self.node_set();
        let m = &mut ctx.matrix;
        self.handles = Some(Handles {
            dd: m.element(d, d),
            gg: m.element(g, g),
            ss: m.element(s, s),
            bb: m.element(b, b),
            dpdp: m.element(dp, dp),
            spsp: m.element(sp, sp),
            ddp: m.element(d, dp),
            gb: m.element(g, b),
            gdp: m.element(g, dp),
            gsp: m.element(g, sp),
            ssp: m.element(s, sp),
            bdp: m.element(b, dp),
            bsp: m.element(b, sp),
            dpsp: m.element(dp, sp),
            dpd: m.element(dp, d),
            bg: m.element(b, g),
            dpg: m.element(dp, g),
            spg: m.element(sp, g),
            sps: m.element(sp, s),
            dpb: m.element(dp, b),
            spb: m.element(sp, b),
            spdp: m.element(sp, dp),
        });
    }

    pub(crate) fn unsetup_instance(&mut self, ctx: &mut SimContext) -> Result<()> {
        if self.source_prime != self.terminals.source {
            ctx.nodes.remove(self.source_prime)?;
            self.source_prime = self.terminals.source;
        }
        if self.drain_prime != self.terminals.drain {
            ctx.nodes.remove(self.drain_prime)?;
            self.drain_prime = self.terminals.drain;
        }
        self.handles = None;
        Ok(())
    }

    pub(crate) fn node_set(&self) -> NodeIdSet {
        NodeIdSet {
            d: self.terminals.drain,
            g: self.terminals.gate,
            s: self.terminals.source,
            b: self.terminals.bulk,
            dp: self.drain_prime,
            sp: self.source_prime,
        }
    }
}

/// All six nodes an instance touches.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeIdSet {
    pub d: NodeId,
    pub g: NodeId,
    pub s: NodeId,
    pub b: NodeId,
    pub dp: NodeId,
    pub sp: NodeId,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use spicemos_core::{NodeKind, SimOptions};

    use super::*;
    use crate::device::Device;
    use crate::mosfet::defs::MosLevel;
    use crate::mosfet::model::MosModel;
    use crate::mosfet::params::ModelParam;

    fn build(rd: f64, rs: f64) -> (SimContext, Mosfet) {
        let mut ctx = SimContext::new(SimOptions::default());
        let d = ctx.nodes.node("d");
        let g = ctx.nodes.node("g");
        let s = ctx.nodes.node("s");
        let b = ctx.nodes.node("0");
        let mut model = MosModel::nmos("nch", MosLevel::One);
        model.set(ModelParam::Rd, rd).unwrap();
        model.set(ModelParam::Rs, rs).unwrap();
        let m = Mosfet::new("m1", Arc::new(model), d, g, s, b);
        (ctx, m)
    }

    #[test]
    fn test_no_resistance_no_internal_nodes() {
        let (mut ctx, mut m) = build(0.0, 0.0);
        m.setup(&mut ctx).unwrap();
        assert_eq!(m.prime_nodes(), (m.terminals.drain, m.terminals.source));
        assert_eq!(ctx.nodes.len(), 3);
    }

    #[test]
    fn test_internal_nodes_created_and_removed() {
        let (mut ctx, mut m) = build(10.0, 5.0);
        m.setup(&mut ctx).unwrap();
        let (dp, sp) = m.prime_nodes();
        assert_ne!(dp, m.terminals.drain);
        assert_ne!(sp, m.terminals.source);
        assert_eq!(ctx.nodes.kind(dp), Some(NodeKind::Internal));
        assert_eq!(ctx.nodes.kind(sp), Some(NodeKind::Internal));

        // A second setup reuses the nodes.
        m.setup(&mut ctx).unwrap();
        assert_eq!(m.prime_nodes(), (dp, sp));

        m.unsetup(&mut ctx).unwrap();
        assert_eq!(m.prime_nodes(), (m.terminals.drain, m.terminals.source));
        assert!(!ctx.nodes.contains(dp));
        assert!(!ctx.nodes.contains(sp));
    }

    #[test]
    fn test_ground_handles_discarded() {
        let (mut ctx, mut m) = build(0.0, 0.0);
        m.setup(&mut ctx).unwrap();
        let h = m.handles.unwrap();
        assert!(h.bb.is_discard());
        assert!(h.gb.is_discard());
        assert!(!h.gg.is_discard());
        assert!(!h.dpsp.is_discard());
    }

    #[test]
    fn test_unbound_handles_discard() {
        let h = Handles::default();
        assert_eq!(h.dd, ElementHandle::DISCARD);
        assert!(h.spdp.is_discard());
    }

    #[test]
    fn test_state_reserved_once() {
        let (mut ctx, mut m) = build(0.0, 0.0);
        m.setup(&mut ctx).unwrap();
        let base = m.state_base;
        m.setup(&mut ctx).unwrap();
        assert_eq!(m.state_base, base);
        assert_eq!(ctx.states.len(), NUM_STATES);
    }
}
