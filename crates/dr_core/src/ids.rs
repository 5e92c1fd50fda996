//! crates/dr_core/src/ids.rs
//! Keys of the evaluation matrix: regions, indicators, primary categories.
//! Shapes are checked on construction and on deserialization; no I/O.

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use crate::errors::CoreError;

const REGION_MAX_CHARS: usize = 128;
const TOKEN_MAX_LEN: usize = 64;

/// Indicator/category token: ^[A-Za-z0-9_.:-]{1,64}$ (ASCII only)
#[inline]
pub fn is_valid_token(s: &str) -> bool {
    let len = s.len();
    if len == 0 || len > TOKEN_MAX_LEN {
        return false;
    }
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-'))
}

/// Region names come from administrative registers and may be non-ASCII
/// (township and community names). Reject empty, padded, or control-char input.
#[inline]
pub fn is_valid_region(s: &str) -> bool {
    !s.is_empty()
        && s.trim() == s
        && s.chars().count() <= REGION_MAX_CHARS
        && !s.chars().any(char::is_control)
}

macro_rules! key_newtype {
    ($(#[$m:meta])* $name:ident, $check:path, $kind:literal) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Result<Self, CoreError> {
                let s = s.into();
                if $check(&s) { Ok(Self(s)) } else { Err(CoreError::InvalidId($kind)) }
            }
            #[inline] pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s.to_string()) }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;
            fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String { v.0 }
        }

        impl core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str { &self.0 }
        }
    };
}

key_newtype!(
    /// Township or community identifier.
    RegionId, is_valid_region, "region id"
);
key_newtype!(
    /// Secondary indicator code (matrix column).
    IndicatorCode, is_valid_token, "indicator code"
);
key_newtype!(
    /// Primary category code owning a group of indicators.
    CategoryCode, is_valid_token, "category code"
);
