//! Channel current dispatch.
//!
//! All level equations work in local coordinates: voltages are multiplied by
//! the polarity sign and, in inverse mode, drain and source are exchanged so
//! that `vds >= 0`.

use super::defs::MosLevel;
use super::temperature::{InstanceDerived, ModelDerived};
use super::{level1, level2, level3, level6};

/// Local-coordinate terminal voltages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelBias {
    pub vgs: f64,
    pub vds: f64,
    pub vbs: f64,
}

/// Drain current and its derivatives in local coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelEval {
    pub cdrain: f64,
    pub gm: f64,
    pub gds: f64,
    pub gmbs: f64,
    /// Turn-on voltage, local coordinates.
    pub von: f64,
    /// Saturation voltage, local coordinates.
    pub vdsat: f64,
}

impl ChannelEval {
    /// Zero current with the given threshold and saturation voltages.
    pub(crate) fn off(von: f64, vdsat: f64) -> Self {
        Self {
            von,
            vdsat,
            ..Self::default()
        }
    }
}

/// Evaluate the channel current for the model's level.
pub fn evaluate_channel(
    model: &ModelDerived,
    inst: &InstanceDerived,
    bias: ChannelBias,
) -> ChannelEval {
    match model.level {
        MosLevel::One => level1::evaluate(model, inst, bias),
        MosLevel::Two => level2::evaluate(model, inst, bias),
        MosLevel::Three => level3::evaluate(model, inst, bias),
        MosLevel::Six => level6::evaluate(model, inst, bias),
    }
}

/// Square-root body term shared by levels 1 and 6, linearised for forward
/// bias and floored at zero.
pub(crate) fn body_sqrt(t_phi: f64, vbs: f64) -> f64 {
    if vbs <= 0.0 {
        (t_phi - vbs).sqrt()
    } else {
        let sphi = t_phi.sqrt();
        (sphi - vbs / (sphi + sphi)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosfet::model::MosModel;
    use crate::mosfet::params::ModelParam;
    use crate::mosfet::temperature::Geometry;

    const LEVELS: [MosLevel; 4] = [MosLevel::One, MosLevel::Two, MosLevel::Three, MosLevel::Six];

    fn derived_with(
        level: MosLevel,
        extra: &[(ModelParam, f64)],
        l: f64,
    ) -> (ModelDerived, InstanceDerived) {
        let mut model = MosModel::nmos("nch", level);
        model.set(ModelParam::Vto, 0.7).unwrap();
        model.set(ModelParam::Kp, 2e-5).unwrap();
        model.set(ModelParam::Gamma, 0.4).unwrap();
        if matches!(level, MosLevel::One | MosLevel::Two | MosLevel::Six) {
            model.set(ModelParam::Lambda, 0.02).unwrap();
        }
        for &(param, value) in extra {
            model.set(param, value).unwrap();
        }
        let geometry = Geometry {
            l,
            w: 10e-6,
            ad: 0.0,
            as_: 0.0,
            pd: 0.0,
            ps: 0.0,
            nrd: 1.0,
            nrs: 1.0,
            m: 1.0,
        };
        let md = ModelDerived::from_model(&model, 300.15).unwrap();
        let inst = InstanceDerived::from_params_at_temp("m1", &md, &geometry, 300.15);
        (md, inst)
    }

    fn derived(level: MosLevel) -> (ModelDerived, InstanceDerived) {
        derived_with(level, &[], 10e-6)
    }

    fn bias(vgs: f64, vds: f64, vbs: f64) -> ChannelBias {
        ChannelBias { vgs, vds, vbs }
    }

    /// Largest deviation of the analytic partials from central differences
    /// of `cdrain`, relative to the largest partial.
    fn partial_error(md: &ModelDerived, inst: &InstanceDerived, at: ChannelBias) -> f64 {
        let cd = |b: ChannelBias| evaluate_channel(md, inst, b).cdrain;
        let e = evaluate_channel(md, inst, at);
        let h = 1e-6;
        let fd = |f: &dyn Fn(f64) -> ChannelBias| (cd(f(h)) - cd(f(-h))) / (2.0 * h);
        let gm = fd(&|d| ChannelBias { vgs: at.vgs + d, ..at });
        let gds = fd(&|d| ChannelBias { vds: at.vds + d, ..at });
        let gmbs = fd(&|d| ChannelBias { vbs: at.vbs + d, ..at });
        let scale = e.gm.abs().max(e.gds.abs()).max(e.gmbs.abs());
        [(e.gm, gm), (e.gds, gds), (e.gmbs, gmbs)]
            .iter()
            .map(|(analytic, numeric)| (analytic - numeric).abs())
            .fold(0.0, f64::max)
            / scale
    }

    fn check_partials(md: &ModelDerived, inst: &InstanceDerived, at: ChannelBias, rel: f64) {
        let e = evaluate_channel(md, inst, at);
        assert!(e.cdrain > 0.0, "{:?} at {at:?}", md.level);
        let err = partial_error(md, inst, at);
        assert!(
            err <= rel,
            "{:?} at {at:?}: partials off by {err} ({e:?})",
            md.level
        );
    }

    #[test]
    fn test_partials_match_finite_differences() {
        for level in LEVELS {
            let (md, inst) = derived(level);
            check_partials(&md, &inst, bias(3.0, 0.5, -1.0), 1e-4);
            check_partials(&md, &inst, bias(2.0, 4.0, -0.5), 1e-4);
        }
    }

    #[test]
    fn test_cutoff_gives_zero_current() {
        for level in LEVELS {
            let (md, inst) = derived(level);
            let e = evaluate_channel(&md, &inst, bias(0.0, 1.0, 0.0));
            assert_eq!(e.cdrain, 0.0, "{level:?}");
            assert!(e.von > 0.5, "{level:?}: von = {}", e.von);
        }
    }

    #[test]
    fn test_level2_off_up_to_turn_on() {
        let (md, inst) = derived(MosLevel::Two);
        for vgs in [0.3, 0.45, 0.6, 0.69, 0.699] {
            let e = evaluate_channel(&md, &inst, bias(vgs, 1.0, 0.0));
            assert!((e.von - 0.7).abs() < 1e-9, "von = {}", e.von);
            assert_eq!(e.cdrain, 0.0, "vgs = {vgs}");
            assert_eq!((e.gm, e.gds, e.gmbs), (0.0, 0.0, 0.0), "vgs = {vgs}");
        }
        // just past turn-on the current starts from zero
        let e = evaluate_channel(&md, &inst, bias(0.7 + 1e-3, 1.0, 0.0));
        assert!(e.cdrain > 0.0 && e.cdrain < 1e-10, "cdrain = {}", e.cdrain);
        assert!(e.gm > 0.0);
    }

    #[test]
    fn test_weak_inversion_partials() {
        let ss = [(ModelParam::Nfs, 1e11)];
        let ss_doped = [(ModelParam::Nfs, 1e11), (ModelParam::Nsub, 1e15)];
        let ss_junction = [
            (ModelParam::Nfs, 1e11),
            (ModelParam::Nsub, 1e15),
            (ModelParam::Xj, 0.3e-6),
        ];
        for (level, extra) in [
            (MosLevel::Two, &ss[..]),
            (MosLevel::Two, &ss_junction[..]),
            (MosLevel::Three, &ss[..]),
            (MosLevel::Three, &ss_doped[..]),
        ] {
            let (md, inst) = derived_with(level, extra, 10e-6);
            for vds in [0.01, 1.0] {
                let at = bias(0.7, vds, -0.5);
                let e = evaluate_channel(&md, &inst, at);
                assert!(at.vgs < e.von, "{level:?}: von = {}", e.von);
                assert_eq!(vds < e.vdsat, vds == 0.01, "{level:?}: vdsat = {}", e.vdsat);
                check_partials(&md, &inst, at, 1e-4);
            }
            // strong inversion with the same model
            check_partials(&md, &inst, bias(2.0, 0.5, -0.5), 1e-4);
            check_partials(&md, &inst, bias(2.0, 3.0, -0.5), 1e-4);
        }
    }

    #[test]
    fn test_velocity_saturation_partials() {
        let (plain, plain_inst) = derived_with(MosLevel::Two, &[], 2e-6);
        let (md, inst) = derived_with(MosLevel::Two, &[(ModelParam::Vmax, 5e4)], 2e-6);
        let saturated = bias(3.0, 4.0, -0.5);
        let limited = evaluate_channel(&md, &inst, saturated);
        let unlimited = evaluate_channel(&plain, &plain_inst, saturated);
        assert!(
            limited.vdsat < unlimited.vdsat,
            "{} vs {}",
            limited.vdsat,
            unlimited.vdsat
        );
        check_partials(&md, &inst, saturated, 1e-4);
        check_partials(&md, &inst, bias(3.0, 0.3, -0.5), 1e-4);

        // zero lambda leaves length modulation to the depletion width
        let doped = [
            (ModelParam::Vmax, 1e5),
            (ModelParam::Nsub, 1e15),
            (ModelParam::Lambda, 0.0),
        ];
        for level in [MosLevel::Two, MosLevel::Three] {
            let (md, inst) = derived_with(level, &doped, 2e-6);
            check_partials(&md, &inst, saturated, 1e-4);
        }
    }

    #[test]
    fn test_length_modulation_and_punch_through_partials() {
        let doped = [(ModelParam::Nsub, 1e15), (ModelParam::Lambda, 0.0)];
        for (level, short, vds) in [(MosLevel::Two, 2e-6, 5.0), (MosLevel::Three, 1e-6, 4.0)] {
            // modulated without and with punch-through
            for l in [10e-6, short] {
                let (md, inst) = derived_with(level, &doped, l);
                check_partials(&md, &inst, bias(2.0, vds, -0.5), 1e-4);
                check_partials(&md, &inst, bias(2.0, 0.5, -0.5), 1e-4);
            }
            // punch-through lifts the output conductance
            let (long, long_inst) = derived_with(level, &doped, 10e-6);
            let (md, inst) = derived_with(level, &doped, short);
            let at = bias(2.0, vds, -0.5);
            let ratio = |m: &ModelDerived, i: &InstanceDerived| {
                let e = evaluate_channel(m, i, at);
                e.gds / e.cdrain
            };
            assert!(ratio(&md, &inst) > ratio(&long, &long_inst), "{level:?}");
        }
    }

    /// Dense sweep through cutoff, the turn-on edge and the saturation edge.
    #[test]
    fn test_sweep_is_continuous_with_consistent_partials() {
        let ss = [(ModelParam::Nfs, 1e11)];
        let mut configs: Vec<(MosLevel, &[(ModelParam, f64)])> =
            LEVELS.iter().map(|&level| (level, &[][..])).collect();
        configs.push((MosLevel::Two, &ss[..]));
        configs.push((MosLevel::Three, &ss[..]));

        let steps = |lo: f64, n: usize| (0..n).map(move |i| lo + 0.05 * i as f64);
        for (level, extra) in configs {
            let (md, inst) = derived_with(level, extra, 10e-6);
            for vbs in [-1.0, -0.4] {
                for vgs in steps(0.2, 57) {
                    for vds in steps(0.05, 60) {
                        let at = bias(vgs, vds, vbs);
                        let e = evaluate_channel(&md, &inst, at);
                        if e.cdrain == 0.0 {
                            assert_eq!((e.gm, e.gds, e.gmbs), (0.0, 0.0, 0.0), "{level:?} {at:?}");
                            continue;
                        }
                        if (vgs - e.von).abs() < 1e-3 || (vds - e.vdsat).abs() < 1e-3 {
                            continue;
                        }
                        let err = partial_error(&md, &inst, at);
                        assert!(err <= 1e-4, "{level:?} {extra:?} at {at:?}: {err}");
                    }
                }

                // current is continuous across both region edges
                for vds in [0.1, 1.0, 3.0] {
                    let von = evaluate_channel(&md, &inst, bias(0.0, vds, vbs)).von;
                    let below = evaluate_channel(&md, &inst, bias(von - 1e-7, vds, vbs));
                    let above = evaluate_channel(&md, &inst, bias(von + 1e-7, vds, vbs));
                    let bound = 4e-7 * (below.gm.abs() + above.gm.abs()) + 1e-15;
                    assert!(
                        (above.cdrain - below.cdrain).abs() <= bound,
                        "{level:?} {extra:?} turn-on at vds {vds}: {} vs {}",
                        below.cdrain,
                        above.cdrain
                    );
                }
                let vgs = evaluate_channel(&md, &inst, bias(0.0, 1.0, vbs)).von + 1.0;
                let vdsat = evaluate_channel(&md, &inst, bias(vgs, 1.0, vbs)).vdsat;
                let lin = evaluate_channel(&md, &inst, bias(vgs, vdsat - 1e-7, vbs));
                let sat = evaluate_channel(&md, &inst, bias(vgs, vdsat + 1e-7, vbs));
                let bound = 4e-7 * (lin.gds.abs() + sat.gds.abs()) + 1e-15;
                assert!(
                    (sat.cdrain - lin.cdrain).abs() <= bound,
                    "{level:?} {extra:?} saturation edge: {} vs {}",
                    lin.cdrain,
                    sat.cdrain
                );
            }
        }
    }

    #[test]
    fn test_body_sqrt_is_continuous_at_zero() {
        let below = body_sqrt(0.6, -1e-12);
        let above = body_sqrt(0.6, 1e-12);
        assert!((below - above).abs() < 1e-9);
        assert_eq!(body_sqrt(0.6, 10.0), 0.0);
    }
}
