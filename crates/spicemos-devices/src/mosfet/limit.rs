//! Newton step limiting for gate, drain and junction voltages.

/// Limit a gate voltage step relative to the threshold `vto`.
pub fn fetlim(vnew: f64, vold: f64, vto: f64) -> f64 {
    let vtsthi = (2.0 * (vold - vto)).abs() + 2.0;
    let vtstlo = vtsthi / 2.0 + 2.0;
    let vtox = vto + 3.5;
    let delv = vnew - vold;
    let mut vnew = vnew;

    if vold >= vto {
        if vold >= vtox {
            if delv <= 0.0 {
                // going off
                if vnew >= vtox {
                    if -delv > vtstlo {
                        vnew = vold - vtstlo;
                    }
                } else {
                    vnew = vnew.max(vto + 2.0);
                }
            } else if delv >= vtsthi {
                // staying on
                vnew = vold + vtsthi;
            }
        } else if delv <= 0.0 {
            // middle region, going off
            vnew = vnew.max(vto - 0.5);
        } else {
            // middle region, going on
            vnew = vnew.min(vto + 4.0);
        }
    } else if delv <= 0.0 {
        if -delv > vtsthi {
            vnew = vold - vtsthi;
        }
    } else {
        let vtemp = vto + 0.5;
        if vnew <= vtemp {
            if delv > vtstlo {
                vnew = vold + vtstlo;
            }
        } else {
            vnew = vtemp;
        }
    }
    vnew
}

/// Limit a drain-source voltage step.
pub fn limvds(vnew: f64, vold: f64) -> f64 {
    if vold >= 3.5 {
        if vnew > vold {
            vnew.min(3.0 * vold + 2.0)
        } else if vnew < 3.5 {
            vnew.max(2.0)
        } else {
            vnew
        }
    } else if vnew > vold {
        vnew.min(4.0)
    } else {
        vnew.max(-0.5)
    }
}

/// Limit a pn-junction voltage step.
///
/// Returns the limited voltage and whether limiting was applied.
pub fn pnjlim(vnew: f64, vold: f64, vt: f64, vcrit: f64) -> (f64, bool) {
    if vnew > vcrit && (vnew - vold).abs() > vt + vt {
        let limited = if vold > 0.0 {
            let arg = 1.0 + (vnew - vold) / vt;
            if arg > 0.0 { vold + vt * arg.ln() } else { vcrit }
        } else {
            vt * (vnew / vt).ln()
        };
        (limited, true)
    } else {
        (vnew, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetlim_off_to_on_clamped() {
        // From cutoff, a large positive step stops just above threshold.
        let v = fetlim(10.0, 0.0, 1.0);
        assert!((v - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_fetlim_small_step_untouched() {
        assert_eq!(fetlim(5.1, 5.0, 1.0), 5.1);
        assert_eq!(fetlim(0.1, 0.0, 1.0), 0.1);
    }

    #[test]
    fn test_fetlim_strong_on_large_step() {
        // vold = 6, vto = 1: vtsthi = 12.
        let v = fetlim(30.0, 6.0, 1.0);
        assert!((v - 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_fetlim_going_off_from_strong() {
        // Drops below vto + 3.5 are held at vto + 2.
        let v = fetlim(0.0, 6.0, 1.0);
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fetlim_middle_region() {
        assert!((fetlim(10.0, 2.0, 1.0) - 5.0).abs() < 1e-12);
        assert!((fetlim(-10.0, 2.0, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_limvds() {
        assert_eq!(limvds(10.0, 1.0), 4.0);
        assert_eq!(limvds(-10.0, 1.0), -0.5);
        assert_eq!(limvds(100.0, 5.0), 17.0);
        assert_eq!(limvds(0.0, 5.0), 2.0);
        assert_eq!(limvds(4.0, 5.0), 4.0);
    }

    #[test]
    fn test_pnjlim() {
        let vt = 0.025852;
        let (v, limited) = pnjlim(0.3, 0.2, vt, 0.6);
        assert_eq!(v, 0.3);
        assert!(!limited);

        let (v, limited) = pnjlim(5.0, 0.7, vt, 0.6);
        assert!(limited);
        assert!((v - (0.7 + vt * (1.0 + 4.3 / vt).ln())).abs() < 1e-12);

        let (v, limited) = pnjlim(5.0, -1.0, vt, 0.6);
        assert!(limited);
        assert!((v - vt * (5.0 / vt).ln()).abs() < 1e-12);
    }
}
