//! Identifier newtypes.
//!
//! All identifiers are plain `u32` values. `0` is reserved for [`AntId`],
//! [`SpaceId`] and [`ZoneId`]; `ZoneId(0)` doubles as "outside of any zone".

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Raw value.
            #[inline]
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            #[inline]
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "{}"), self.0)
            }
        }
    };
}

macro_rules! reserve_zero {
    ($name:ident) => {
        impl $name {
            /// Builds the identifier, refusing the reserved value `0`.
            #[inline]
            pub const fn new(value: u32) -> Option<Self> {
                if value == 0 {
                    None
                } else {
                    Some(Self(value))
                }
            }

            /// `false` for the reserved value `0`.
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }
    };
}

define_id!(
    /// A tracked individual.
    AntId,
    "ant#"
);
define_id!(
    /// A fiducial marker as reported by the detector.
    TagId,
    "tag#"
);
define_id!(
    /// An independently tracked area with its own frame stream.
    SpaceId,
    "space#"
);
define_id!(
    /// A time-valid sub-region of a space.
    ZoneId,
    "zone#"
);
define_id!(
    /// Arena key of an identification owned by an identifier.
    IdentificationId,
    "identification#"
);

reserve_zero!(AntId);
reserve_zero!(SpaceId);
reserve_zero!(ZoneId);

impl ZoneId {
    /// Position outside of every zone.
    pub const NONE: ZoneId = ZoneId(0);
}

/// Sequence number of a frame within one space.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl FrameId {
    /// Raw value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// `true` when `next` directly follows `self`.
    #[inline]
    pub fn is_followed_by(self, next: FrameId) -> bool {
        self.0.checked_add(1) == Some(next.0)
    }
}

impl From<u64> for FrameId {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_reserved_zero() {
        assert_eq!(AntId::new(0), None);
        assert_eq!(AntId::new(3), Some(AntId(3)));
        assert!(!SpaceId(0).is_valid());
        assert!(!ZoneId::NONE.is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(AntId(12).to_string(), "ant#12");
        assert_eq!(FrameId(7).to_string(), "frame#7");
    }

    #[test]
    fn test_hashmap_key() {
        let mut map: HashMap<TagId, i32> = HashMap::new();
        map.insert(TagId(1), 1);
        map.insert(2.into(), 2);
        assert_eq!(map.get(&TagId(2)), Some(&2));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&SpaceId(4)).unwrap();
        assert_eq!(json, "4");
        let parsed: SpaceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SpaceId(4));
    }

    #[test]
    fn test_frame_followed_by() {
        assert!(FrameId(4).is_followed_by(FrameId(5)));
        assert!(!FrameId(4).is_followed_by(FrameId(6)));
        assert!(!FrameId(u64::MAX).is_followed_by(FrameId(0)));
    }
}
