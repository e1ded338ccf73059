//! Parameter identifiers and the given-flag wrapper.
//!
//! Every settable model and instance field has a stable enum identifier
//! with a SPICE card name. Read-only operating-point values have their own
//! [`InstanceQuery`] identifiers.

use crate::error::{Error, Result};

/// A parameter value plus whether the user supplied it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Given<T> {
    value: T,
    given: bool,
}

impl<T: Copy> Given<T> {
    /// An unset parameter holding its default.
    pub const fn default_value(value: T) -> Self {
        Self {
            value,
            given: false,
        }
    }

    /// Set the value and mark it given.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.given = true;
    }

    /// Replace the value without marking it given.
    pub fn set_default(&mut self, value: T) {
        if !self.given {
            self.value = value;
        }
    }

    /// Current value, given or defaulted.
    #[inline]
    pub fn get(self) -> T {
        self.value
    }

    /// Whether the user supplied the value.
    #[inline]
    pub fn is_given(self) -> bool {
        self.given
    }

    /// The given value, or `fallback` if unset.
    #[inline]
    pub fn or(self, fallback: T) -> T {
        if self.given { self.value } else { fallback }
    }
}

macro_rules! named_params {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $key:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every identifier, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Card name of the parameter.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            fn lookup(key: &str) -> Option<Self> {
                match key {
                    $($key => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

named_params! {
    /// Model card parameters.
    pub enum ModelParam {
        /// Polarity: positive for N-channel, negative for P-channel.
        Type => "type",
        Level => "level",
        Vto => "vto",
        Kp => "kp",
        Gamma => "gamma",
        Phi => "phi",
        Lambda => "lambda",
        Rd => "rd",
        Rs => "rs",
        Cbd => "cbd",
        Cbs => "cbs",
        Is => "is",
        Pb => "pb",
        Cgso => "cgso",
        Cgdo => "cgdo",
        Cgbo => "cgbo",
        Rsh => "rsh",
        Cj => "cj",
        Mj => "mj",
        Cjsw => "cjsw",
        Mjsw => "mjsw",
        Js => "js",
        Tox => "tox",
        Ld => "ld",
        Uo => "uo",
        Fc => "fc",
        Nsub => "nsub",
        Tpg => "tpg",
        Nss => "nss",
        Nfs => "nfs",
        Delta => "delta",
        Uexp => "uexp",
        Ucrit => "ucrit",
        Vmax => "vmax",
        Xj => "xj",
        Neff => "neff",
        Eta => "eta",
        Theta => "theta",
        Kappa => "kappa",
        Tnom => "tnom",
        Kv => "kv",
        Nv => "nv",
        Kc => "kc",
        Nc => "nc",
        Gamma1 => "gamma1",
        Sigma => "sigma",
        Lambda0 => "lambda0",
        Lambda1 => "lambda1",
    }
}

impl ModelParam {
    /// Look up a model parameter by card name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        let key = name.to_ascii_lowercase();
        let key = match key.as_str() {
            "vt0" => "vto",
            "u0" => "uo",
            "nmos" | "pmos" => "type",
            other => other,
        };
        Self::lookup(key).ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }
}

named_params! {
    /// Instance parameters.
    pub enum InstanceParam {
        L => "l",
        W => "w",
        Ad => "ad",
        As => "as",
        Pd => "pd",
        Ps => "ps",
        Nrd => "nrd",
        Nrs => "nrs",
        M => "m",
        Temp => "temp",
        /// Nonzero marks the device off for the initial operating point.
        Off => "off",
        IcVds => "icvds",
        IcVgs => "icvgs",
        IcVbs => "icvbs",
    }
}

impl InstanceParam {
    /// Look up an instance parameter by card name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        Self::lookup(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }
}

named_params! {
    /// Read-only operating-point quantities.
    pub enum InstanceQuery {
        Id => "id",
        Ibs => "ibs",
        Ibd => "ibd",
        Ig => "ig",
        Ib => "ib",
        Is => "is",
        Gm => "gm",
        Gds => "gds",
        Gmbs => "gmbs",
        Gbd => "gbd",
        Gbs => "gbs",
        Capbd => "cbd",
        Capbs => "cbs",
        Capgs => "cgs",
        Capgd => "cgd",
        Capgb => "cgb",
        Qgs => "qgs",
        Qgd => "qgd",
        Qgb => "qgb",
        Qbd => "qbd",
        Qbs => "qbs",
        Von => "von",
        Vdsat => "vdsat",
        Vgs => "vgs",
        Vds => "vds",
        Vbs => "vbs",
        Mode => "mode",
        Power => "p",
        DrainConductance => "gdrain",
        SourceConductance => "gsource",
        Leff => "leff",
    }
}

impl InstanceQuery {
    /// Look up a query by name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        let key = name.to_ascii_lowercase();
        let key = match key.as_str() {
            "cd" => "id",
            "cg" => "ig",
            "cb" => "ib",
            other => other,
        };
        Self::lookup(key).ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_given_flag() {
        let mut p = Given::default_value(0.6);
        assert!(!p.is_given());
        assert_eq!(p.or(0.7), 0.7);
        p.set_default(0.8);
        assert_eq!(p.get(), 0.8);
        p.set(0.9);
        assert!(p.is_given());
        p.set_default(1.0);
        assert_eq!(p.get(), 0.9);
    }

    #[test]
    fn test_names_round_trip() {
        for &p in ModelParam::ALL {
            assert_eq!(ModelParam::from_name(p.name()).unwrap(), p);
        }
        for &p in InstanceParam::ALL {
            assert_eq!(InstanceParam::from_name(p.name()).unwrap(), p);
        }
        for &q in InstanceQuery::ALL {
            assert_eq!(InstanceQuery::from_name(q.name()).unwrap(), q);
        }
    }

    #[test]
    fn test_aliases_and_case() {
        assert_eq!(ModelParam::from_name("VT0").unwrap(), ModelParam::Vto);
        assert_eq!(ModelParam::from_name("U0").unwrap(), ModelParam::Uo);
        assert_eq!(InstanceQuery::from_name("cd").unwrap(), InstanceQuery::Id);
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            ModelParam::from_name("bogus"),
            Err(Error::UnknownParameter(_))
        ));
        assert!(InstanceParam::from_name("vto").is_err());
    }
}
