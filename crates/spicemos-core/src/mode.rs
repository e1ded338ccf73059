//! Analysis mode bits.
//!
//! The outer solver owns the mode and sets it before every call into a
//! device. Devices only test bits.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask describing the analysis in progress and the iteration phase.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mode(u32);

impl Mode {
    pub const NONE: Mode = Mode(0);

    // Analysis kind.
    pub const TRAN: Mode = Mode(0x1);
    pub const AC: Mode = Mode(0x2);
    pub const DCOP: Mode = Mode(0x10);
    pub const TRANOP: Mode = Mode(0x20);
    pub const DCTRANCURVE: Mode = Mode(0x40);

    // Iteration phase.
    pub const INITFLOAT: Mode = Mode(0x100);
    pub const INITJCT: Mode = Mode(0x200);
    pub const INITFIX: Mode = Mode(0x400);
    pub const INITSMSIG: Mode = Mode(0x800);
    pub const INITTRAN: Mode = Mode(0x1000);
    pub const INITPRED: Mode = Mode(0x2000);

    /// Use initial conditions instead of solving for an operating point.
    pub const UIC: Mode = Mode(0x10000);

    /// Every iteration-phase bit.
    pub const INIT_MASK: Mode = Mode(0x3f00);
    /// Every analysis-kind bit.
    pub const ANALYSIS_MASK: Mode = Mode(0x73);

    /// Raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set.
    #[inline]
    pub fn contains(self, other: Mode) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    #[inline]
    pub fn intersects(self, other: Mode) -> bool {
        self.0 & other.0 != 0
    }

    /// Copy with the iteration phase replaced.
    pub fn with_init(self, init: Mode) -> Mode {
        Mode((self.0 & !Self::INIT_MASK.0) | (init.0 & Self::INIT_MASK.0))
    }

    /// Copy with the analysis kind replaced.
    pub fn with_analysis(self, analysis: Mode) -> Mode {
        Mode((self.0 & !Self::ANALYSIS_MASK.0) | (analysis.0 & Self::ANALYSIS_MASK.0))
    }

    /// Copy with the bits of `other` cleared.
    pub fn without(self, other: Mode) -> Mode {
        Mode(self.0 & !other.0)
    }
}

impl BitOr for Mode {
    type Output = Mode;

    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mode {
    fn bitor_assign(&mut self, rhs: Mode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Mode, &str); 12] = [
            (Mode::TRAN, "TRAN"),
            (Mode::AC, "AC"),
            (Mode::DCOP, "DCOP"),
            (Mode::TRANOP, "TRANOP"),
            (Mode::DCTRANCURVE, "DCTRANCURVE"),
            (Mode::INITFLOAT, "INITFLOAT"),
            (Mode::INITJCT, "INITJCT"),
            (Mode::INITFIX, "INITFIX"),
            (Mode::INITSMSIG, "INITSMSIG"),
            (Mode::INITTRAN, "INITTRAN"),
            (Mode::INITPRED, "INITPRED"),
            (Mode::UIC, "UIC"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Mode({})", set.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_init_replaces_phase_only() {
        let m = Mode::DCOP | Mode::INITJCT;
        let m = m.with_init(Mode::INITFIX);
        assert!(m.contains(Mode::DCOP));
        assert!(m.contains(Mode::INITFIX));
        assert!(!m.contains(Mode::INITJCT));
    }

    #[test]
    fn test_intersects() {
        let m = Mode::TRAN | Mode::INITPRED;
        assert!(m.intersects(Mode::INITPRED | Mode::INITTRAN));
        assert!(!m.intersects(Mode::AC | Mode::DCOP));
    }

    #[test]
    fn test_debug_lists_bits() {
        let s = format!("{:?}", Mode::TRANOP | Mode::INITSMSIG);
        assert_eq!(s, "Mode(TRANOP|INITSMSIG)");
    }
}
