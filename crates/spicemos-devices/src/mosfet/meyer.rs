//! Meyer intrinsic gate capacitances.

/// Half of the Meyer gate-source, gate-drain and gate-bulk capacitances.
///
/// Callers store these per iteration and sum two consecutive values, so each
/// returned value is half the physical capacitance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeyerCaps {
    pub cgs: f64,
    pub cgd: f64,
    pub cgb: f64,
}

/// Evaluate the Meyer model. `von` and `vdsat` are in the same (local)
/// coordinates as the voltages.
pub fn meyer(vgs: f64, vgd: f64, von: f64, vdsat: f64, phi: f64, cox: f64) -> MeyerCaps {
    let vgst = vgs - von;
    let mut caps = MeyerCaps::default();
    if vgst <= -phi {
        caps.cgb = cox / 2.0;
    } else if vgst <= -phi / 2.0 {
        caps.cgb = -vgst * cox / (2.0 * phi);
    } else if vgst <= 0.0 {
        caps.cgb = -vgst * cox / (2.0 * phi);
        caps.cgs = vgst * cox / (1.5 * phi) + cox / 3.0;
    } else {
        let vds = vgs - vgd;
        if vdsat <= vds {
            caps.cgs = cox / 3.0;
        } else {
            let vddif = 2.0 * vdsat - vds;
            let vddif1 = vdsat - vds;
            let vddif2 = vddif * vddif;
            caps.cgd = cox * (1.0 - vdsat * vdsat / vddif2) / 3.0;
            caps.cgs = cox * (1.0 - vddif1 * vddif1 / vddif2) / 3.0;
        }
    }
    caps
}
