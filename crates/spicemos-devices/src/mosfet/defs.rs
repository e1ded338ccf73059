//! Physical constants, enums and the history slot layout.

/// Reference temperature for bandgap correction (K).
pub const REFTEMP: f64 = 300.15;
/// Boltzmann constant (J/K).
pub const BOLTZ: f64 = 1.380_622_6e-23;
/// Electron charge (C).
pub const CHARGE: f64 = 1.602_191_8e-19;
/// k/q (V/K).
pub const KOVERQ: f64 = BOLTZ / CHARGE;
/// Vacuum permittivity (F/m).
pub const EPS0: f64 = 8.854_214_871e-12;
/// Silicon permittivity (F/m).
pub const EPSSIL: f64 = 11.7 * EPS0;
/// Oxide permittivity (F/m).
pub const EPSOX: f64 = 3.9 * EPS0;
/// Intrinsic carrier concentration of silicon (m^-3).
pub const NI: f64 = 1.45e16;
/// Largest argument passed to `exp` before clamping.
pub const MAX_EXP_ARG: f64 = 709.0;

/// Channel polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    N,
    P,
}

impl Polarity {
    /// +1 for N-channel, -1 for P-channel.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Polarity::N => 1.0,
            Polarity::P => -1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Polarity::N => "nmos",
            Polarity::P => "pmos",
        }
    }
}

/// Model level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MosLevel {
    /// Shichman-Hodges.
    #[default]
    One,
    /// Grove-Frohman analytic model.
    Two,
    /// Semi-empirical short-channel model.
    Three,
    /// n-th power law model.
    Six,
}

impl MosLevel {
    /// Level for a numeric card value; anything unsupported is `None`.
    pub fn from_number(level: i64) -> Option<Self> {
        match level {
            1 => Some(MosLevel::One),
            2 => Some(MosLevel::Two),
            3 => Some(MosLevel::Three),
            6 => Some(MosLevel::Six),
            _ => None,
        }
    }

    pub fn number(self) -> i64 {
        match self {
            MosLevel::One => 1,
            MosLevel::Two => 2,
            MosLevel::Three => 3,
            MosLevel::Six => 6,
        }
    }
}

/// Which physical terminal plays the drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConductionMode {
    /// Vds >= 0: terminals used as labeled.
    #[default]
    Normal,
    /// Vds < 0: drain and source swap roles.
    Inverse,
}

impl ConductionMode {
    /// Mode for a (type-normalized) drain-source voltage.
    #[inline]
    pub fn from_vds(vds: f64) -> Self {
        if vds >= 0.0 {
            ConductionMode::Normal
        } else {
            ConductionMode::Inverse
        }
    }

    /// +1 normal, -1 inverse.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            ConductionMode::Normal => 1.0,
            ConductionMode::Inverse => -1.0,
        }
    }
}

/// Named history slots, one block of [`NUM_STATES`] per instance.
///
/// The first 17 slots hold present/previous voltages, Meyer capacitances,
/// gate and junction charges and their companion currents. The rest mirror
/// the multiplicity-scaled operating point for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum MosState {
    Vbd,
    Vbs,
    Vgs,
    Vds,
    Capgs,
    Qgs,
    Cqgs,
    Capgd,
    Qgd,
    Cqgd,
    Capgb,
    Qgb,
    Cqgb,
    Qbd,
    Cqbd,
    Qbs,
    Cqbs,
    AskCd,
    AskCbs,
    AskCbd,
    AskCg,
    AskCb,
    AskGm,
    AskGds,
    AskGmbs,
    AskGbd,
    AskGbs,
    AskCapbd,
    AskCapbs,
    AskCapgs,
    AskCapgd,
    AskCapgb,
    AskVon,
    AskVdsat,
    AskMode,
}

/// Number of history slots per instance.
pub const NUM_STATES: usize = MosState::AskMode as usize + 1;

impl MosState {
    /// Offset within the instance block.
    #[inline]
    pub const fn offset(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_layout() {
        assert_eq!(NUM_STATES, 35);
        // Companion currents sit right after their charges.
        assert_eq!(MosState::Cqgs.offset(), MosState::Qgs.offset() + 1);
        assert_eq!(MosState::Cqgd.offset(), MosState::Qgd.offset() + 1);
        assert_eq!(MosState::Cqgb.offset(), MosState::Qgb.offset() + 1);
        assert_eq!(MosState::Cqbd.offset(), MosState::Qbd.offset() + 1);
        assert_eq!(MosState::Cqbs.offset(), MosState::Qbs.offset() + 1);
    }

    #[test]
    fn test_level_numbers() {
        for n in [1, 2, 3, 6] {
            assert_eq!(MosLevel::from_number(n).map(MosLevel::number), Some(n));
        }
        assert_eq!(MosLevel::from_number(4), None);
    }

    #[test]
    fn test_conduction_mode_boundary() {
        assert_eq!(ConductionMode::from_vds(0.0), ConductionMode::Normal);
        assert_eq!(ConductionMode::from_vds(-1e-300), ConductionMode::Inverse);
    }
}
