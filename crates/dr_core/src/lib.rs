//! dr_core: core types, parameter domains, and step directives.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! engine (`dr_algo`, `dr_io`, `dr_pipeline`, `dr_report`, `dr_cli`).
//!
//! - Keys: `RegionId`, `IndicatorCode`, `CategoryCode`
//! - Data: `IndicatorMatrix`, `WeightSpec`, `IdealSolution`, `DistanceResult`
//! - Grading vocabulary: `Level`, `LevelScheme`, `GradeResult`, `CohortStats`
//! - Run parameters: `EvalParams`, `Strategy`
//! - TOPSIS step directives (`@TOPSIS_POSITIVE:a,b,c`)
//!
//! Serialization derives are gated behind the `serde` feature.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod errors {
    use alloc::string::String;
    use core::fmt;

    /// Error set for core-domain validation & parsing.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidId(&'static str),
        InvalidToken(String),
        UnknownToken { kind: &'static str, token: String },
        DomainOutOfRange(&'static str),
        BadDirective(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidId(kind) => write!(f, "invalid {kind}"),
                CoreError::InvalidToken(t) => write!(f, "invalid token: {t:?}"),
                CoreError::UnknownToken { kind, token } => write!(f, "unknown {kind}: {token:?}"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
                CoreError::BadDirective(why) => write!(f, "bad TOPSIS directive: {why}"),
            }
        }
    }

    #[cfg(feature = "std")]
    impl std::error::Error for CoreError {}
}

/// Closed string-token enums with stable wire names.
macro_rules! token_enum {
    ($(#[$m:meta])* $name:ident => { $($(#[$vm:meta])* $variant:ident = $token:expr),+ $(,)? }) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $(
                $(#[$vm])*
                #[cfg_attr(feature = "serde", serde(rename = $token))]
                $variant,
            )+
        }

        impl $name {
            /// Wire token.
            pub const fn as_str(self) -> &'static str {
                match self { $( $name::$variant => $token, )+ }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = $crate::errors::CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $token => Ok($name::$variant), )+
                    other => Err($crate::errors::CoreError::UnknownToken {
                        kind: stringify!($name),
                        token: alloc::string::String::from(other),
                    }),
                }
            }
        }
    };
}

pub mod ids;
pub mod entities;
pub mod variables;
pub mod directive;

pub use errors::CoreError;
pub use ids::{CategoryCode, IndicatorCode, RegionId};
pub use entities::{
    CohortStats, DistanceResult, GradeResult, IdealSolution, IndicatorMatrix, Level, LevelScheme,
    WeightSpec,
};
pub use variables::{EvalParams, Strategy};
pub use directive::{DistanceOutput, TopsisDirective};
