//! Convergence test, truncation error and initial conditions.

use spicemos_core::SimContext;

use super::defs::MosState;
use super::instance::Mosfet;
use super::load::{Bias, Increment, StoredBias};

impl Mosfet {
    /// Compare the currents predicted from the last linearization against
    /// the last evaluation at the present iterate.
    pub(crate) fn converged(&mut self, ctx: &mut SimContext) -> bool {
        let (Some(base), Some(derived)) = (self.state_base, self.derived.as_deref()) else {
            return true;
        };
        let nodes = self.node_set();
        let bias = Bias::from_iterate(ctx, &nodes, derived.model.ty);
        let old = StoredBias::read(&ctx.states, base);
        let inc = Increment::new(&self.op, bias, old);
        let reltol = ctx.options.reltol;
        let abstol = ctx.options.abstol;

        let op = &self.op;
        let tol = reltol * inc.cdhat.abs().max(op.cd.abs()) + abstol;
        let ok = if (inc.cdhat - op.cd).abs() >= tol {
            false
        } else {
            let cb = op.cbs + op.cbd;
            let tol = reltol * inc.cbhat.abs().max(cb.abs()) + abstol;
            (inc.cbhat - cb).abs() <= tol
        };
        if !ok {
            log::trace!(
                "{}: not converged, cdhat={:e} cd={:e}",
                self.name,
                inc.cdhat,
                op.cd
            );
            ctx.flag_nonconvergence(&self.name);
        }
        ok
    }

    /// Limit `timestep` by the truncation error of the three gate charges.
    pub(crate) fn truncate_step(&self, ctx: &SimContext, timestep: &mut f64) {
        let Some(base) = self.state_base else {
            return;
        };
        let inputs = ctx.truncation_inputs();
        for q in [MosState::Qgs, MosState::Qgd, MosState::Qgb] {
            let limit = ctx
                .integrator
                .truncation(&ctx.states, Mosfet::slot(base, q), &inputs);
            *timestep = timestep.min(limit);
        }
    }

    /// Fill unset initial conditions from the present solution.
    pub(crate) fn initial_conditions(&mut self, ctx: &SimContext) {
        let v = |n| ctx.rhs_old.get(n);
        let t = self.terminals;
        let p = &mut self.params;
        p.ic_vbs.set_default(v(t.bulk) - v(t.source));
        p.ic_vds.set_default(v(t.drain) - v(t.source));
        p.ic_vgs.set_default(v(t.gate) - v(t.source));
    }
}
