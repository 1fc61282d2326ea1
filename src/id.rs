use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

macro_rules! num_id {
    ($id:ident, $t:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $id($t);

        impl $id {
            /// Creates the id from a raw value.
            pub const fn new_with_value(v: $t) -> Self {
                $id(v)
            }
        }

        impl Deref for $id {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$t> for $id {
            fn from(v: $t) -> Self {
                $id(v)
            }
        }

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

num_id!(Pt, u8);
num_id!(Ssrc, u32);

/// Highest payload type number RTP can carry (7 bits).
pub const MAX_PT: u8 = 127;

impl Pt {
    /// Whether the number lies in the RFC 3551 dynamic range `96..=127`.
    pub fn is_dynamic(&self) -> bool {
        self.0 >= 96 && self.0 <= MAX_PT
    }

    /// Parse a format identifier from an m-line, i.e. `"96"`.
    ///
    /// Anything that is not a number in `0..=127` is `None`.
    pub fn from_format(format: &str) -> Option<Pt> {
        if format.is_empty() || !format.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let v: u8 = format.parse().ok()?;
        (v <= MAX_PT).then_some(Pt(v))
    }
}
