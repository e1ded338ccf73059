//! Level 2: Grove-Frohman analytical model with velocity saturation,
//! channel-length modulation and subthreshold conduction.

use super::defs::{CHARGE, EPSSIL};
use super::eval::{ChannelBias, ChannelEval};
use super::temperature::{InstanceDerived, ModelDerived};

const SIG1: [f64; 4] = [1.0, -1.0, 1.0, -1.0];
const SIG2: [f64; 4] = [1.0, 1.0, -1.0, -1.0];

/// Smallest positive root of the scattering-velocity quartic
/// `x^4 + a1 x^3 + b1 x^2 + c1 x + d1`, solved through its resolvent cubic.
fn quartic_vdsat_root(a1: f64, b1: f64, c1: f64, d1: f64) -> Option<f64> {
    let a = -b1;
    let b = a1 * c1 - 4.0 * d1;
    let c = -d1 * (a1 * a1 - 4.0 * b1) - c1 * c1;
    let r = -a * a / 3.0 + b;
    let s = 2.0 * a * a * a / 27.0 - a * b / 3.0 + c;
    let r3 = r * r * r;
    let s2 = s * s;
    let p = s2 / 4.0 + r3 / 27.0;
    let p0 = p.abs();
    let p2 = p0.sqrt();
    let y3 = if p < 0.0 {
        let ro = ((s2 / 4.0 + p0).sqrt().ln() / 3.0).exp();
        let fi = (-2.0 * p2 / s).atan();
        2.0 * ro * (fi / 3.0).cos() - a / 3.0
    } else {
        let p3 = ((-s / 2.0 + p2).abs().ln() / 3.0).exp();
        let p4 = ((-s / 2.0 - p2).abs().ln() / 3.0).exp();
        p3 + p4 - a / 3.0
    };

    let a3 = (a1 * a1 / 4.0 - b1 + y3).sqrt();
    let b3 = (y3 * y3 / 4.0 - d1).sqrt();
    let mut roots = [0.0; 8];
    let mut count = 0;
    for i in 0..4 {
        let a4 = a1 / 2.0 + SIG1[i] * a3;
        let b4 = y3 / 2.0 + SIG2[i] * b3;
        let delta4 = a4 * a4 / 4.0 - b4;
        if delta4 < 0.0 {
            continue;
        }
        let tmp = delta4.sqrt();
        roots[count] = -a4 / 2.0 + tmp;
        roots[count + 1] = -a4 / 2.0 - tmp;
        count += 2;
    }

    let poly = |x: f64| (((x + a1) * x + b1) * x + c1) * x + d1;
    let root = roots[..count]
        .iter()
        .copied()
        .filter(|&x| x > 0.0)
        .filter(|&x| poly(x).abs() <= 1.0e-6)
        .fold(None, |best: Option<f64>, x| match best {
            Some(b) if b <= x => Some(b),
            _ => Some(x),
        })?;

    // Newton polish; the closed form loses digits to cancellation
    let mut x = root;
    for _ in 0..2 {
        let slope = ((4.0 * x + 3.0 * a1) * x + 2.0 * b1) * x + c1;
        if slope == 0.0 {
            break;
        }
        x -= poly(x) / slope;
    }
    Some(if (x - root).abs() <= 1.0e-6 * root.max(1.0) { x } else { root })
}

pub fn evaluate(model: &ModelDerived, inst: &InstanceDerived, bias: ChannelBias) -> ChannelEval {
    let ChannelBias {
        vgs: lvgs,
        vds: lvds,
        vbs: lvbs,
    } = bias;
    let leff = inst.leff;
    let t_phi = inst.t_phi;
    let vt = inst.vt;
    let coxf = model.oxide_cap_factor;
    let has_ss = model.nfs != 0.0 && coxf != 0.0;

    let phi_min_vbs = t_phi - lvbs;
    let (sarg, dsrgdb, d2sdb2) = if lvbs <= 0.0 {
        let sarg = phi_min_vbs.sqrt();
        let dsrgdb = -0.5 / sarg;
        (sarg, dsrgdb, 0.5 * dsrgdb / phi_min_vbs)
    } else {
        let sphi = t_phi.sqrt();
        let sphi3 = t_phi * sphi;
        let sarg = sphi / (1.0 + 0.5 * lvbs / t_phi);
        let tmp = sarg / sphi3;
        let dsrgdb = -0.5 * sarg * tmp;
        (sarg, dsrgdb, -dsrgdb * tmp)
    };
    let (barg, dbrgdb, d2bdb2) = if lvds - lvbs >= 0.0 {
        let barg = (phi_min_vbs + lvds).sqrt();
        let dbrgdb = -0.5 / barg;
        (barg, dbrgdb, 0.5 * dbrgdb / (phi_min_vbs + lvds))
    } else {
        let sphi = t_phi.sqrt();
        let sphi3 = t_phi * sphi;
        let barg = sphi / (1.0 + 0.5 * (lvbs - lvds) / t_phi);
        let tmp = barg / sphi3;
        let dbrgdb = -0.5 * barg * tmp;
        (barg, dbrgdb, -dbrgdb * tmp)
    };

    // narrow channel
    let factor = if coxf != 0.0 {
        0.125 * model.delta * 2.0 * std::f64::consts::PI * EPSSIL / (coxf * inst.w)
    } else {
        0.0
    };
    let eta = 1.0 + factor;
    let vbin = inst.t_vbi * model.ty + factor * phi_min_vbs;

    // short channel
    let gamma = model.gamma;
    let xd = model.xd;
    let xj = model.xj;
    let (gamasd, dgddvb, dgdvds, dgddb2, dgddvd) = if gamma > 0.0 || model.nsub > 0.0 {
        let xwd = xd * barg;
        let xws = xd * sarg;
        let mut argss = 0.0;
        let mut argsd = 0.0;
        let mut dbargs = 0.0;
        let mut dbargd = 0.0;
        let mut dgdvds = 0.0;
        let mut dgddb2 = 0.0;
        let mut dgddvd = 0.0;
        if xj > 0.0 {
            let tmp = 2.0 / xj;
            let argxs = 1.0 + xws * tmp;
            let argxd = 1.0 + xwd * tmp;
            let args = argxs.sqrt();
            let argd = argxd.sqrt();
            let tmp = 0.5 * xj / leff;
            argss = tmp * (args - 1.0);
            argsd = tmp * (argd - 1.0);

            let dbxwd = xd * dbrgdb;
            let dbxws = xd * dsrgdb;
            let tmp = 0.5 / leff;
            dbargs = tmp * dbxws / args;
            dbargd = tmp * dbxwd / argd;
            // dbargs and dbargd along vbs; dbargd moves against vds
            let dasdb2 = tmp * xd * (d2sdb2 - xd * dsrgdb * dsrgdb / (xj * argxs)) / args;
            let daddb2 = tmp * xd * (d2bdb2 - xd * dbrgdb * dbrgdb / (xj * argxd)) / argd;
            dgddb2 = -gamma * (dasdb2 + daddb2);
            dgddvd = gamma * daddb2;
            dgdvds = gamma * dbargd;
        }
        let gamasd = gamma * (1.0 - argss - argsd);
        let dgddvb = -gamma * (dbargs + dbargd);
        (gamasd, dgddvb, dgdvds, dgddb2, dgddvd)
    } else {
        (gamma, 0.0, 0.0, 0.0, 0.0)
    };

    let mut von = vbin + gamasd * sarg;
    let mut xn = 1.0;
    let mut argg = 0.0;
    if has_ss {
        let cfs = CHARGE * model.nfs * 1e4;
        let cdonco = -(gamasd * dsrgdb + dgddvb * sarg) + factor;
        xn = 1.0 + cfs / coxf + cdonco;
        let tmp = vt * xn;
        von += tmp;
        argg = 1.0 / tmp;
    } else if lvgs <= von {
        return ChannelEval::off(von, 0.0);
    }
    let vgst = lvgs - von;
    let subthreshold = has_ss && lvgs <= von;

    let sarg3 = sarg * sarg * sarg;
    let sbiarg = inst.t_bulk_pot.sqrt();
    let dgdvbs = dgddvb;
    let body = barg * barg * barg - sarg3;
    let gdbdv = 2.0 * gamasd * (barg * barg * dbrgdb - sarg * sarg * dsrgdb);
    let mut dodvbs = -factor + dgdvbs * sarg + gamasd * dsrgdb;
    let mut dodvds = dgdvds * sarg;
    let mut dxndvb = 0.0;
    let mut dxndvd = 0.0;
    if has_ss {
        // xn carries -(gamasd * dsrgdb + dgddvb * sarg)
        dxndvb = -(2.0 * dgdvbs * dsrgdb + gamasd * d2sdb2 + dgddb2 * sarg);
        dodvbs += vt * dxndvb;
        dxndvd = -(dgdvds * dsrgdb + dgddvd * sarg);
        dodvds += vt * dxndvd;
    }

    // effective mobility
    let mut ufact = 1.0;
    let mut ueff = model.uo * 1e-4;
    let mut dudvgs = 0.0;
    let mut dudvds = 0.0;
    let mut dudvbs = 0.0;
    if coxf > 0.0 {
        let udenom = vgst;
        let tmp = model.ucrit * 100.0 * EPSSIL / coxf;
        if udenom > tmp {
            ufact = (model.uexp * (tmp / udenom).ln()).exp();
            ueff = model.uo * 1e-4 * ufact;
            dudvgs = -ufact * model.uexp / udenom;
            dudvds = model.uexp * ufact * dodvds / vgst;
            dudvbs = model.uexp * ufact * dodvbs / vgst;
        }
    }

    // Grove-Frohman saturation voltage; partials along vgsx, then vds and
    // vbs at fixed vgsx
    let vgsx = if has_ss { lvgs.max(von) } else { lvgs };
    let gammad = gamasd / eta;
    let (mut vdsat, mut dsdvgx, mut dsdvds, mut dsdvbs) = if gammad > 0.0 {
        let gammd2 = gammad * gammad;
        let argv = (vgsx - vbin) / eta + phi_min_vbs;
        let arg = (1.0 + 4.0 * argv / gammd2).sqrt();
        let vdsat = (vgsx - vbin) / eta + gammd2 * (1.0 - arg) / 2.0;
        if argv <= 0.0 || vdsat <= 0.0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let dsdvgx = (1.0 - 1.0 / arg) / eta;
            let dsdgam = gammad * (1.0 - arg) + 2.0 * argv / (gammad * arg);
            (
                vdsat,
                dsdvgx,
                dsdgam * dgdvds / eta,
                dsdgam * dgdvbs / eta + 1.0 / arg + factor * dsdvgx,
            )
        }
    } else {
        let vdsat = (vgsx - vbin) / eta;
        if vdsat <= 0.0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            (vdsat, 1.0 / eta, 0.0, factor / eta)
        }
    };

    let mut velocity_limited = false;
    if model.vmax > 0.0 {
        // scattering-limited saturation voltage
        let v1 = (vgsx - vbin) / eta + phi_min_vbs;
        let v2 = phi_min_vbs;
        let xv = model.vmax * leff / ueff;
        let a1 = gammad / 0.75;
        let b1 = -2.0 * (v1 + xv);
        let c1 = -2.0 * gammad * xv;
        let d1 = 2.0 * v1 * (v2 + xv) - v2 * v2 - 4.0 / 3.0 * gammad * sarg3;
        if let Some(xvalid) = quartic_vdsat_root(a1, b1, c1, d1) {
            vdsat = xvalid * xvalid - phi_min_vbs;
            velocity_limited = true;
        }
    }

    // body charge at the saturation point
    let (bsarg, dbsrdb) = if lvbs - vdsat <= 0.0 {
        let bsarg = (vdsat + phi_min_vbs).sqrt();
        (bsarg, -0.5 / bsarg)
    } else {
        let sphi = t_phi.sqrt();
        let sphi3 = t_phi * sphi;
        let bsarg = sphi / (1.0 + 0.5 * (lvbs - vdsat) / t_phi);
        (bsarg, -0.5 * bsarg * bsarg / sphi3)
    };
    let bodys = bsarg * bsarg * bsarg - sarg3;
    let gdbdvs = 2.0 * gamasd * (bsarg * bsarg * dbsrdb - sarg * sarg * dsrgdb);

    if velocity_limited {
        // implicit partials of the velocity-saturation condition
        // ueff * I(vdsat) = vmax * leff * Q(vdsat)
        let vl = model.vmax * leff;
        let du = model.uo * 1e-4;
        let argv = (vgsx - vbin) / eta - vdsat;
        let vqchan = argv - gammad * bsarg;
        let dqdsat = -1.0 + gammad * dbsrdb;
        let inorm = ((vgsx - vbin) / eta - 0.5 * vdsat) * vdsat - gammad * bodys / 1.5;
        let dfunds = vl * dqdsat - ueff * vqchan;
        let dfundg = (vl - ueff * vdsat) / eta - du * dudvgs * inorm;
        let dfundd = (ueff * bodys / 1.5 - vl * bsarg) * dgdvds / eta - du * dudvds * inorm;
        let dfundb = vl * (factor / eta - gammad * dbsrdb - dgdvbs * bsarg / eta)
            - ueff * (factor * vdsat - gdbdvs - dgdvbs * bodys / 1.5) / eta
            - du * dudvbs * inorm;
        dsdvgx = -dfundg / dfunds;
        dsdvds = -dfundd / dfunds;
        dsdvbs = -dfundb / dfunds;
    }

    // below threshold vgsx sits at von
    let (dxg, dxd, dxb) = if subthreshold {
        (0.0, dodvds, dodvbs)
    } else {
        (1.0, 0.0, 0.0)
    };
    let vdsat_g = dsdvgx * dxg;
    let vdsat_d = dsdvds + dsdvgx * dxd;
    let vdsat_b = dsdvbs + dsdvgx * dxb;

    // channel length modulation: clfact and its total partials
    let xlamda = model.lambda;
    let (mut clfact, mut dldvgs, mut dldvds, mut dldvbs) =
        if lvds == 0.0 || model.nsub == 0.0 || xlamda > 0.0 {
            (1.0 - xlamda * lvds, 0.0, -xlamda, 0.0)
        } else if model.vmax <= 0.0 {
            let argv = (lvds - vdsat) / 4.0;
            let sargv = (1.0 + argv * argv).sqrt();
            let arg = (argv + sargv).sqrt();
            let xlfact = xd / leff;
            let dldsat = xlfact * arg / (8.0 * sargv);
            (
                1.0 - xlfact * arg,
                dldsat * vdsat_g,
                dldsat * (vdsat_d - 1.0),
                dldsat * vdsat_b,
            )
        } else if lvds > vdsat {
            let xdv = xd / model.neff.sqrt();
            let xlv = model.vmax * xdv / (2.0 * ueff);
            let xls = (xlv * xlv + lvds - vdsat).sqrt();
            let xlfact = xdv / leff;
            let dldsat = xlfact / (2.0 * xls);
            // xlv scales with 1 / ueff
            let dldxlv = -xlfact * (xlv / xls - 1.0);
            let dxlv = |dufact: f64| -xlv * model.uo * 1e-4 * dufact / ueff;
            (
                1.0 - xlfact * (xls - xlv),
                dldsat * vdsat_g + dldxlv * dxlv(dudvgs),
                dldsat * (vdsat_d - 1.0) + dldxlv * dxlv(dudvds),
                dldsat * vdsat_b + dldxlv * dxlv(dudvbs),
            )
        } else {
            (1.0, 0.0, 0.0, 0.0)
        };

    // punch-through limit on channel shortening
    let mut xwb = xd * sbiarg;
    let xld = leff - xwb;
    if model.nsub == 0.0 {
        xwb = 0.25e-6;
    }
    if leff * clfact < xwb {
        let deltal = leff * (1.0 - clfact);
        let xleff = xwb / (1.0 + (deltal - xld) / xwb);
        clfact = xleff / leff;
        let dfact = xleff * xleff / (xwb * xwb);
        dldvgs *= dfact;
        dldvds *= dfact;
        dldvbs *= dfact;
    }

    let beta1 = inst.beta * ufact / clfact;

    if lvds <= 1.0e-10 {
        let gds = if lvgs <= von {
            if has_ss {
                beta1 * (von - vbin - gamasd * sarg) * (argg * (lvgs - von)).exp()
            } else {
                0.0
            }
        } else {
            beta1 * (lvgs - vbin - gamasd * sarg)
        };
        return ChannelEval {
            gds,
            ..ChannelEval::off(von, vdsat)
        };
    }

    if subthreshold {
        if vdsat <= 0.0 {
            return ChannelEval::off(von, vdsat);
        }
        // current at vgs = von, either side of vdsat
        let saturated = lvds > vdsat;
        let (vdson, bx, bodyx, gdbdx, dvg, dvd, dvb) = if saturated {
            (vdsat, bsarg, bodys, gdbdvs, vdsat_g, vdsat_d, vdsat_b)
        } else {
            (lvds, barg, body, gdbdv, 0.0, 1.0, 0.0)
        };
        let cdson = beta1 * ((von - vbin - eta * vdson * 0.5) * vdson - gamasd * bodyx / 1.5);
        let didvds = beta1 * (von - vbin - eta * vdson - gamasd * bx);
        let gmson = cdson * (dudvgs / ufact - dldvgs / clfact) + didvds * dvg;
        let gdson = cdson * (dudvds / ufact - dldvds / clfact)
            + beta1 * (vdson * dodvds - dgdvds * bodyx / 1.5)
            + didvds * dvd;
        let gbson = cdson * (dudvbs / ufact - dldvbs / clfact)
            + beta1 * (vdson * (dodvbs + factor) - dgdvbs * bodyx / 1.5 - gdbdx)
            + didvds * dvb;
        let expg = (argg * (lvgs - von)).exp();
        let cdrain = cdson * expg;
        let gmw = cdrain * argg;
        let tmp = gmw * (lvgs - von) / xn;
        return ChannelEval {
            cdrain,
            gm: gmson * expg + gmw,
            gds: gdson * expg - gmw * dodvds - tmp * dxndvd,
            gmbs: gbson * expg - gmw * dodvbs - tmp * dxndvb,
            von,
            vdsat,
        };
    }

    let (cdrain, gm, gds, gmbs) = if lvds <= vdsat {
        // linear
        let cdrain = beta1 * ((lvgs - vbin - eta * lvds / 2.0) * lvds - gamasd * body / 1.5);
        let gm = cdrain * (dudvgs / ufact - dldvgs / clfact) + beta1 * lvds;
        let gds = cdrain * (dudvds / ufact - dldvds / clfact)
            + beta1 * (lvgs - vbin - eta * lvds - gamasd * barg - dgdvds * body / 1.5);
        let gmbs = cdrain * (dudvbs / ufact - dldvbs / clfact)
            - beta1 * (gdbdv + dgdvbs * body / 1.5 - factor * lvds);
        (cdrain, gm, gds, gmbs)
    } else {
        // saturation
        let cdrain =
            beta1 * ((lvgs - vbin - eta * vdsat / 2.0) * vdsat - gamasd * bodys / 1.5);
        let drive = lvgs - vbin - eta * vdsat - gamasd * bsarg;
        let gm = cdrain * (dudvgs / ufact - dldvgs / clfact)
            + beta1 * vdsat
            + beta1 * drive * vdsat_g;
        let gds = cdrain * (dudvds / ufact - dldvds / clfact) - beta1 * dgdvds * bodys / 1.5
            + beta1 * drive * vdsat_d;
        let gmbs = cdrain * (dudvbs / ufact - dldvbs / clfact)
            - beta1 * (gdbdvs + dgdvbs * bodys / 1.5 - factor * vdsat)
            + beta1 * drive * vdsat_b;
        (cdrain, gm, gds, gmbs)
    };

    ChannelEval {
        cdrain,
        gm,
        gds,
        gmbs,
        von,
        vdsat,
    }
}
