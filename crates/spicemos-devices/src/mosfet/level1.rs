//! Level 1: Shichman-Hodges square law.

use super::eval::{ChannelBias, ChannelEval, body_sqrt};
use super::temperature::{InstanceDerived, ModelDerived};

pub fn evaluate(model: &ModelDerived, inst: &InstanceDerived, bias: ChannelBias) -> ChannelEval {
    let ChannelBias { vgs, vds, vbs } = bias;
    let sarg = body_sqrt(inst.t_phi, vbs);
    let von = inst.t_vbi * model.ty + model.gamma * sarg;
    let vgst = vgs - von;
    let vdsat = vgst.max(0.0);
    let arg = if sarg <= 0.0 {
        0.0
    } else {
        model.gamma / (sarg + sarg)
    };

    if vgst <= 0.0 {
        // cutoff
        return ChannelEval::off(von, vdsat);
    }

    let beta = inst.beta;
    let betap = beta * (1.0 + model.lambda * vds);
    let (cdrain, gm, gds) = if vgst <= vds {
        // saturation
        (
            betap * vgst * vgst * 0.5,
            betap * vgst,
            model.lambda * beta * vgst * vgst * 0.5,
        )
    } else {
        // linear
        (
            betap * vds * (vgst - 0.5 * vds),
            betap * vds,
            betap * (vgst - vds) + model.lambda * beta * vds * (vgst - 0.5 * vds),
        )
    };
    ChannelEval {
        cdrain,
        gm,
        gds,
        gmbs: gm * arg,
        von,
        vdsat,
    }
}
