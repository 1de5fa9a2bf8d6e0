//! Address Catalog
//!
//! Closed enumeration of every event name that may cross a transport
//! boundary. Wire strings are matched exactly; membership in the catalog is
//! the only notion of validity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! address_catalog {
    ($( $(#[$meta:meta])* $variant:ident => $wire:literal ),+ $(,)?) => {
        /// A catalog address.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Address {
            $( $(#[$meta])* $variant, )+
        }

        impl Address {
            /// Every address in the catalog, in declaration order.
            pub const ALL: &'static [Address] = &[ $( Address::$variant, )+ ];

            /// Wire representation, e.g. `/cubeConnected`.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Address::$variant => $wire, )+
                }
            }

            /// Look up a wire string in the catalog.
            pub fn parse(wire: &str) -> Option<Address> {
                match wire {
                    $( $wire => Some(Address::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

address_catalog! {
    /// Hub is up (OSC, outbound)
    ServerConnected => "/serverConnected",
    /// Hub is going down (OSC, outbound)
    ServerDisconnected => "/serverDisconnected",

    OfConnected => "/OFConnected",
    OfDisconnected => "/OFDisconnected",
    /// openFrameworks status pushed to the web renderer
    OfStatusChange => "/OFStatusChange",

    KinectConnected => "/kinectConnected",
    KinectDisconnected => "/kinectDisconnected",
    /// Kinect status pushed to the web renderer
    KinectStatusChange => "/KStatusChange",

    WebRenderConnected => "/webRenderConnected",
    WebRenderDisconnected => "/webRenderDisconnected",
    /// Raised internally whenever the web-renderer role flips
    WebRenderStatusChange => "/webRenderStatusChange",
    /// Raised internally whenever the gallery role flips
    GalleryStatusChange => "/galleryStatusChange",

    CubeConnected => "/cubeConnected",
    CubeDisconnected => "/cubeDisconnected",
    CubeTouched => "/cubeTouched",
    CubeDragged => "/cubeDragged",
    CubeDragOut => "/cubeDragOut",
    PlayCube => "/playCube",

    BraceletConnected => "/braceletConnected",
    BraceletDisconnected => "/braceletDisconnected",
    NotePlayed => "/notePlayed",
    /// Motor speed command relayed to the bracelet hardware
    BraceletMotor => "/braceletMotor",

    NewComposition => "/newComposition",
    UpdateComposition => "/updateComposition",
    /// Full list of saved compositions, sent to the gallery
    Compositions => "/compositions",
}

impl Address {
    /// Catalog membership test for a raw wire string.
    pub fn is_valid(wire: &str) -> bool {
        Self::parse(wire).is_some()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a catalog address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("address not in catalog: {0}")]
pub struct UnknownAddress(pub String);

impl FromStr for Address {
    type Err = UnknownAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s).ok_or_else(|| UnknownAddress(s.to_string()))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = String::deserialize(deserializer)?;
        Address::parse(&wire).ok_or_else(|| serde::de::Error::custom(UnknownAddress(wire)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_every_address_round_trips_through_wire_form() {
        for address in Address::ALL {
            assert_eq!(Address::parse(address.as_str()), Some(*address));
            assert!(Address::is_valid(address.as_str()));
        }
    }

    #[test]
    fn test_wire_strings_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for address in Address::ALL {
            assert!(seen.insert(address.as_str()), "duplicate {}", address);
        }
    }

    #[test]
    fn test_matching_is_exact() {
        assert!(Address::is_valid("/cubeConnected"));
        assert!(!Address::is_valid("/cubeconnected"));
        assert!(!Address::is_valid("cubeConnected"));
        assert!(!Address::is_valid("/cubeConnected/"));
        assert!(!Address::is_valid(""));
    }

    #[test]
    fn test_serde_uses_wire_form() {
        let json = serde_json::to_string(&Address::PlayCube).unwrap();
        assert_eq!(json, "\"/playCube\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Address::PlayCube);
        assert!(serde_json::from_str::<Address>("\"/nope\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_iff_enumerated(wire in "/?[a-zA-Z]{0,24}") {
            let enumerated = Address::ALL.iter().any(|a| a.as_str() == wire);
            prop_assert_eq!(Address::is_valid(&wire), enumerated);
        }

        #[test]
        fn prop_catalog_strings_always_valid(index in 0usize..Address::ALL.len()) {
            prop_assert!(Address::is_valid(Address::ALL[index].as_str()));
        }
    }
}
