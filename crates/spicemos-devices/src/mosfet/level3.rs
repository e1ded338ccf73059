//! Level 3: semi-empirical short-channel model.

use super::defs::CHARGE;
use super::eval::{ChannelBias, ChannelEval};
use super::temperature::{InstanceDerived, ModelDerived};

const COEFF0: f64 = 0.0631353;
const COEFF1: f64 = 0.8013292;
const COEFF2: f64 = -0.01110777;

pub fn evaluate(model: &ModelDerived, inst: &InstanceDerived, bias: ChannelBias) -> ChannelEval {
    let ChannelBias {
        vgs: lvgs,
        vds: lvds,
        vbs: lvbs,
    } = bias;
    let leff = inst.leff;
    let w = inst.w;
    let vt = inst.vt;
    let t_phi = inst.t_phi;
    let coxf = model.oxide_cap_factor;

    let oneoverxl = 1.0 / leff;
    let eta = if coxf != 0.0 {
        model.eta * 8.15e-22 / (coxf * leff * leff * leff)
    } else {
        0.0
    };

    // square root term
    let (phibs, sqphbs, dsqdvb) = if lvbs <= 0.0 {
        let phibs = t_phi - lvbs;
        let sqphbs = phibs.sqrt();
        (phibs, sqphbs, -0.5 / sqphbs)
    } else {
        let sqphis = t_phi.sqrt();
        let sqphs3 = t_phi * sqphis;
        let sqphbs = sqphis / (1.0 + lvbs / (t_phi + t_phi));
        let phibs = sqphbs * sqphbs;
        (phibs, sqphbs, -phibs / (sqphs3 + sqphs3))
    };

    // short channel effect factor
    let (fshort, dfsdvb) = if model.xj != 0.0 && model.coeff_dep_lay_width != 0.0 {
        let wps = model.coeff_dep_lay_width * sqphbs;
        let oneoverxj = 1.0 / model.xj;
        let xjonxl = model.xj * oneoverxl;
        let djonxj = model.ld * oneoverxj;
        let wponxj = wps * oneoverxj;
        let wconxj = COEFF0 + COEFF1 * wponxj + COEFF2 * wponxj * wponxj;
        let arga = wconxj + djonxj;
        let argc = wponxj / (1.0 + wponxj);
        let argb = (1.0 - argc * argc).sqrt();
        let fshort = 1.0 - xjonxl * (arga * argb - djonxj);
        let dwpdvb = model.coeff_dep_lay_width * dsqdvb;
        let dadvb = (COEFF1 + COEFF2 * (wponxj + wponxj)) * dwpdvb * oneoverxj;
        let dbdvb = -argc * argc * (1.0 - argc) * dwpdvb / (argb * wps);
        (fshort, -xjonxl * (dadvb * argb + arga * dbdvb))
    } else {
        (1.0, 0.0)
    };

    // body effect
    let gammas = model.gamma * fshort;
    let fbodys = 0.5 * gammas / (sqphbs + sqphbs);
    let fbody = fbodys + model.narrow_factor / w;
    let onfbdy = 1.0 / (1.0 + fbody);
    let dfbdvb = -fbodys * dsqdvb / sqphbs + fbodys * dfsdvb / fshort;
    let qbonco = gammas * sqphbs + model.narrow_factor * phibs / w;
    let dqbdvb = gammas * dsqdvb + model.gamma * dfsdvb * sqphbs - model.narrow_factor / w;

    // static feedback
    let vbix = inst.t_vbi * model.ty - eta * lvds;
    let vth = vbix + qbonco;
    let dvtdvd = -eta;
    let dvtdvb = dqbdvb;

    // weak/strong inversion join
    let has_ss = model.nfs != 0.0;
    let mut von = vth;
    let mut xn = 1.0;
    let mut dxndvb = 0.0;
    let mut dvodvd = 0.0;
    let mut dvodvb = 0.0;
    if has_ss {
        let csonco = if coxf != 0.0 {
            CHARGE * model.nfs * 1e4 / coxf
        } else {
            0.0
        };
        let cdonco = qbonco / (phibs + phibs);
        xn = 1.0 + csonco + cdonco;
        von = vth + vt * xn;
        dxndvb = dqbdvb / (phibs + phibs) - qbonco * dsqdvb / (phibs * sqphbs);
        dvodvd = dvtdvd;
        dvodvb = dvtdvb + vt * dxndvb;
    } else if lvgs <= von {
        return ChannelEval::off(von, 0.0);
    }

    // device is on
    let vgsx = lvgs.max(von);
    let onfg = 1.0 + model.theta * (vgsx - vth);
    let fgate = 1.0 / onfg;
    let us = inst.t_surf_mob * 1e-4 * fgate;
    let dfgdvg = -model.theta * fgate * fgate;
    let dfgdvd = -dfgdvg * dvtdvd;
    let dfgdvb = -dfgdvg * dvtdvb;

    // saturation voltage
    let mut vdsat = (vgsx - vth) * onfbdy;
    let mut onvdsc = 0.0;
    let (dvsdvg, dvsdvd, dvsdvb);
    if model.vmax <= 0.0 {
        dvsdvg = onfbdy;
        dvsdvd = -dvsdvg * dvtdvd;
        dvsdvb = -dvsdvg * dvtdvb - vdsat * dfbdvb * onfbdy;
    } else {
        let vdsc = leff * model.vmax / us;
        onvdsc = 1.0 / vdsc;
        let arga = (vgsx - vth) * onfbdy;
        let argb = (arga * arga + vdsc * vdsc).sqrt();
        vdsat = arga + vdsc - argb;
        let dvsdga = (1.0 - arga / argb) * onfbdy;
        dvsdvg = dvsdga - (1.0 - vdsc / argb) * vdsc * dfgdvg * onfg;
        dvsdvd = -dvsdvg * dvtdvd;
        dvsdvb = -dvsdvg * dvtdvb - arga * dvsdga * dfbdvb;
    }

    let saturated = lvds > vdsat;
    let vdsx = lvds.min(vdsat);
    if vdsx == 0.0 {
        // vds = 0: conductance only
        let mut gds = inst.beta * fgate * (vgsx - vth);
        if has_ss && lvgs < von {
            gds *= ((lvgs - von) / (vt * xn)).exp();
        }
        return ChannelEval {
            gds,
            ..ChannelEval::off(von, vdsat)
        };
    }

    // current factors; partials at fixed vdsx, gdx along vdsx
    let cdo = vgsx - vth - 0.5 * (1.0 + fbody) * vdsx;
    let dcodvb = -dvtdvb - 0.5 * dfbdvb * vdsx;
    let cdnorm = cdo * vdsx;
    let mut gm = vdsx;
    let mut gds = -dvtdvd * vdsx;
    let mut gmbs = dcodvb * vdsx;
    let mut gdx = vgsx - vth - (1.0 + fbody) * vdsx;

    // mobility modulation
    let beta0 = inst.beta;
    let cd1 = beta0 * cdnorm;
    let beta = beta0 * fgate;
    let mut cdrain = beta * cdnorm;
    gm = beta * gm + dfgdvg * cd1;
    gds = beta * gds + dfgdvd * cd1;
    gmbs = beta * gmbs + dfgdvb * cd1;
    gdx *= beta;

    // velocity saturation
    let mut fdrain = 1.0;
    let mut dfddvg = 0.0;
    let mut dfddvd = 0.0;
    let mut dfddvb = 0.0;
    let mut dfddvx = 0.0;
    if model.vmax > 0.0 {
        fdrain = 1.0 / (1.0 + vdsx * onvdsc);
        let fd2 = fdrain * fdrain;
        let arga = fd2 * vdsx * onvdsc * onfg;
        dfddvg = -dfgdvg * arga;
        dfddvd = -dfgdvd * arga;
        dfddvb = -dfgdvb * arga;
        dfddvx = -fd2 * onvdsc;
        gm = fdrain * gm + dfddvg * cdrain;
        gds = fdrain * gds + dfddvd * cdrain;
        gmbs = fdrain * gmbs + dfddvb * cdrain;
        gdx = fdrain * gdx + dfddvx * cdrain;
        cdrain *= fdrain;
    }

    // vdsx follows vds in the linear region and vdsat beyond it
    if saturated {
        gm += gdx * dvsdvg;
        gds += gdx * dvsdvd;
        gmbs += gdx * dvsdvb;
        dfddvg += dfddvx * dvsdvg;
        dfddvd += dfddvx * dvsdvd;
        dfddvb += dfddvx * dvsdvb;
    } else {
        gds += gdx;
        dfddvd += dfddvx;
    }

    // channel length modulation
    if saturated {
        let clm = if model.vmax > 0.0 {
            if model.alpha == 0.0 {
                None
            } else {
                let cdsat = cdrain;
                let gdraw = cdsat * (1.0 - fdrain) * onvdsc;
                let gdsat = gdraw.max(1.0e-12);
                let (dgdvg, dgdvd, dgdvb) = if gdraw > 1.0e-12 {
                    let gdoncd = gdsat / cdsat;
                    let gdonfd = gdsat / (1.0 - fdrain);
                    let gdonfg = gdsat * onfg;
                    (
                        gdoncd * gm - gdonfd * dfddvg + gdonfg * dfgdvg,
                        gdoncd * gds - gdonfd * dfddvd + gdonfg * dfgdvd,
                        gdoncd * gmbs - gdonfd * dfddvb + gdonfg * dfgdvb,
                    )
                } else {
                    (0.0, 0.0, 0.0)
                };

                let emax = model.kappa * cdsat * oneoverxl / gdsat;
                let emoncd = emax / cdsat;
                let emongd = emax / gdsat;
                let demdvg = emoncd * gm - emongd * dgdvg;
                let demdvd = emoncd * gds - emongd * dgdvd;
                let demdvb = emoncd * gmbs - emongd * dgdvb;

                let arga = 0.5 * emax * model.alpha;
                let argc = model.kappa * model.alpha;
                let argb = (arga * arga + argc * (lvds - vdsat)).sqrt();
                let delxl = argb - arga;
                let dldvd = argc / (argb + argb);
                let dldem = 0.5 * (arga / argb - 1.0) * model.alpha;
                Some((
                    delxl,
                    dldem * demdvg - dldvd * dvsdvg,
                    dldem * demdvd + dldvd * (1.0 - dvsdvd),
                    dldem * demdvb - dldvd * dvsdvb,
                ))
            }
        } else {
            let delxl = (model.kappa * (lvds - vdsat) * model.alpha).sqrt();
            let dldvd = 0.5 * delxl / (lvds - vdsat);
            Some((
                delxl,
                -dldvd * dvsdvg,
                dldvd * (1.0 - dvsdvd),
                -dldvd * dvsdvb,
            ))
        };

        if let Some((mut delxl, mut ddldvg, mut ddldvd, mut ddldvb)) = clm {
            // punch-through
            if delxl > 0.5 * leff {
                delxl = leff - leff * leff / (4.0 * delxl);
                let arga = 4.0 * (leff - delxl) * (leff - delxl) / (leff * leff);
                ddldvg *= arga;
                ddldvd *= arga;
                ddldvb *= arga;
            }
            let xlfact = 1.0 / (1.0 - delxl * oneoverxl);
            cdrain *= xlfact;
            let diddl = cdrain / (leff - delxl);
            gm = gm * xlfact + diddl * ddldvg;
            gds = gds * xlfact + diddl * ddldvd;
            gmbs = gmbs * xlfact + diddl * ddldvb;
        }
    }

    if lvgs < von {
        // weak inversion
        let onxn = 1.0 / xn;
        let ondvt = onxn / vt;
        let wfact = ((lvgs - von) * ondvt).exp();
        cdrain *= wfact;
        let gms = gm * wfact;
        let gmw = cdrain * ondvt;
        gm = gmw;
        gds = gds * wfact + (gms - gmw) * dvodvd;
        gmbs = gmbs * wfact + (gms - gmw) * dvodvb - gmw * (lvgs - von) * onxn * dxndvb;
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
