//! Read-only operating-point queries.

use spicemos_core::SimContext;

use super::defs::MosState;
use super::instance::Mosfet;
use super::params::InstanceQuery;
use crate::error::Result;

impl Mosfet {
    /// Operating-point value from the last load.
    ///
    /// Currents and voltages are reported in polarity-normalized
    /// orientation: an N device and its P mirror report the same values.
    /// Currents, conductances, capacitances and charges include the
    /// multiplicity.
    pub fn query(&self, ctx: &SimContext, query: InstanceQuery) -> Result<f64> {
        let base = self.base()?;
        let derived = self.derived()?;
        let m = self.params.m.get();
        let s0 = |s: MosState| ctx.states.get(0, Mosfet::slot(base, s));
        let value = match query {
            InstanceQuery::Id => s0(MosState::AskCd),
            InstanceQuery::Ibs => s0(MosState::AskCbs),
            InstanceQuery::Ibd => s0(MosState::AskCbd),
            InstanceQuery::Ig => s0(MosState::AskCg),
            InstanceQuery::Ib => s0(MosState::AskCb),
            InstanceQuery::Is => {
                -(s0(MosState::AskCd) + s0(MosState::AskCg) + s0(MosState::AskCb))
            }
            InstanceQuery::Gm => s0(MosState::AskGm),
            InstanceQuery::Gds => s0(MosState::AskGds),
            InstanceQuery::Gmbs => s0(MosState::AskGmbs),
            InstanceQuery::Gbd => s0(MosState::AskGbd),
            InstanceQuery::Gbs => s0(MosState::AskGbs),
            InstanceQuery::Capbd => s0(MosState::AskCapbd),
            InstanceQuery::Capbs => s0(MosState::AskCapbs),
            InstanceQuery::Capgs => s0(MosState::AskCapgs),
            InstanceQuery::Capgd => s0(MosState::AskCapgd),
            InstanceQuery::Capgb => s0(MosState::AskCapgb),
            InstanceQuery::Qgs => m * s0(MosState::Qgs),
            InstanceQuery::Qgd => m * s0(MosState::Qgd),
            InstanceQuery::Qgb => m * s0(MosState::Qgb),
            InstanceQuery::Qbd => m * s0(MosState::Qbd),
            InstanceQuery::Qbs => m * s0(MosState::Qbs),
            InstanceQuery::Von => s0(MosState::AskVon),
            InstanceQuery::Vdsat => s0(MosState::AskVdsat),
            InstanceQuery::Vgs => s0(MosState::Vgs),
            InstanceQuery::Vds => s0(MosState::Vds),
            InstanceQuery::Vbs => s0(MosState::Vbs),
            InstanceQuery::Mode => s0(MosState::AskMode),
            InstanceQuery::Power => {
                s0(MosState::AskCd) * s0(MosState::Vds)
                    + s0(MosState::AskCg) * s0(MosState::Vgs)
                    + s0(MosState::AskCb) * s0(MosState::Vbs)
            }
            InstanceQuery::DrainConductance => m * derived.inst.drain_conductance,
            InstanceQuery::SourceConductance => m * derived.inst.source_conductance,
            InstanceQuery::Leff => derived.inst.leff,
        };
        Ok(value)
    }

    /// Query by name, e.g. `"gm"` or `"cgs"`.
    pub fn query_by_name(&self, ctx: &SimContext, name: &str) -> Result<f64> {
        self.query(ctx, InstanceQuery::from_name(name)?)
    }
}
