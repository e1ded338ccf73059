//! Level 6: Sakurai-Newton n-th power law.

use super::eval::{ChannelBias, ChannelEval, body_sqrt};
use super::temperature::{InstanceDerived, ModelDerived};

pub fn evaluate(model: &ModelDerived, inst: &InstanceDerived, bias: ChannelBias) -> ChannelEval {
    let ChannelBias { vgs, vds, vbs } = bias;
    let sarg = body_sqrt(inst.t_phi, vbs);
    let von = inst.t_vbi * model.ty + model.gamma * sarg - model.gamma1 * vbs - model.sigma * vds;
    let vgon = vgs - von;
    if vgon <= 0.0 {
        return ChannelEval::off(von, 0.0);
    }

    let vonbm = if vbs <= 0.0 {
        model.gamma1 + model.gamma / (sarg + sarg)
    } else {
        model.gamma1 + model.gamma / 2.0 / inst.t_phi.sqrt()
    };
    let ln_vgon = vgon.ln();
    let vdsat = model.kv * (ln_vgon * model.nv).exp();
    let betac = inst.t_kc * inst.w / inst.leff;
    let idsat = betac * (ln_vgon * model.nc).exp();
    let lambda = model.lambda0 - model.lambda1 * vbs;

    let mut cdrain = idsat * (1.0 + lambda * vds);
    let mut gm = model.nc * cdrain / vgon;
    let mut gds = gm * model.sigma + idsat * lambda;
    let mut gmbs = gm * vonbm - idsat * model.lambda1 * vds;

    if vdsat > vds {
        // linear region
        let vdst = vds / vdsat;
        let vdst2 = (2.0 - vdst) * vdst;
        let vdstg = -vdst * model.nv / vgon;
        let ivdst1 = cdrain * (2.0 - vdst - vdst);
        cdrain *= vdst2;
        gm = gm * vdst2 + ivdst1 * vdstg;
        gds = gds * vdst2 + ivdst1 * (1.0 / vdsat + vdstg * model.sigma);
        gmbs = gmbs * vdst2 + ivdst1 * vdstg * vonbm;
    }

    ChannelEval {
        cdrain,
        gm,
        gds,
        gmbs,
        von,
        vdsat,
    }
}
