//! Small-integer enumerations stored as `i8` fields.
//!
//! Each enumeration is an open set: values written by a newer schema that this
//! code does not know are preserved as-is and simply have no name.

use serde::{Deserialize, Serialize};

macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, {
            $($variant:ident = $value:expr => $text:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i8);

        #[allow(non_upper_case_globals)]
        impl $name {
            $(pub const $variant: $name = $name($value);)*

            /// Every named value, in ascending order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Human-readable name, or `None` for a value this version does not know.
            pub fn name(self) -> Option<&'static str> {
                match self.0 {
                    $(v if v == $value => Some($text),)*
                    _ => None,
                }
            }

            /// Parses a name as produced by [`Self::name`], ignoring ASCII case.
            pub fn from_name(name: &str) -> Option<$name> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            }

            pub fn is_known(self) -> bool {
                self.name().is_some()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.name() {
                    Some(name) => write!(f, "{}::{}", stringify!($name), name),
                    None => write!(f, "{}({})", stringify!($name), self.0),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.name() {
                    Some(name) => f.write_str(name),
                    None => write!(f, "{}", self.0),
                }
            }
        }
    };
}

open_enum! {
    /// Security level of a star system.
    SecurityLevel, default = Medium, {
        None = 0 => "None",
        Anarchy = 1 => "Anarchy",
        Low = 2 => "Low",
        Medium = 3 => "Medium",
        High = 4 => "High",
    }
}

open_enum! {
    /// Form of government controlling a system or facility.
    Government, default = Corporate, {
        None = 0 => "None",
        Anarchy = 1 => "Anarchy",
        Communism = 2 => "Communism",
        Confederacy = 3 => "Confederacy",
        Cooperative = 4 => "Cooperative",
        Corporate = 5 => "Corporate",
        Democracy = 6 => "Democracy",
        Dictatorship = 7 => "Dictatorship",
        Feudal = 8 => "Feudal",
        Patronage = 9 => "Patronage",
        Prison = 10 => "Prison",
        PrisonColony = 11 => "Prison Colony",
        Theocracy = 12 => "Theocracy",
        Engineer = 13 => "Engineer",
    }
}

open_enum! {
    /// Superpower a system or facility is aligned with.
    Allegiance, default = Independent, {
        None = 0 => "None",
        Alliance = 1 => "Alliance",
        Empire = 2 => "Empire",
        Federation = 3 => "Federation",
        Independent = 4 => "Independent",
        PilotsFederation = 5 => "Pilots Federation",
    }
}
