use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Services and properties of a facility, stored as a `u32` bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FacilityFeatures: u32 {
        const MARKET = 1 << 0;
        const BLACK_MARKET = 1 << 1;
        const COMMODITIES = 1 << 2;
        const DOCKING = 1 << 3;
        const FLEET = 1 << 4;
        const LARGE_PAD = 1 << 5;
        const MEDIUM_PAD = 1 << 6;
        const OUTFITTING = 1 << 7;
        const PLANETARY = 1 << 8;
        const REARM = 1 << 9;
        const REFUEL = 1 << 10;
        const REPAIR = 1 << 11;
        const SHIPYARD = 1 << 12;
        const SMALL_PAD = 1 << 13;
    }
}

impl FacilityFeatures {
    /// Returns `true` if every feature in `mask` is present. An empty mask
    /// matches only a facility with no features at all.
    pub fn has_features(self, mask: FacilityFeatures) -> bool {
        if mask.is_empty() {
            return self.is_empty();
        }
        self.contains(mask)
    }

    /// Returns `true` if a ship needing a pad of `size` can dock. A larger pad
    /// serves smaller ships. `size` must be one of the pad flags.
    pub fn supports_pad_size(self, size: FacilityFeatures) -> bool {
        let acceptable = if size == Self::LARGE_PAD {
            Self::LARGE_PAD
        } else if size == Self::MEDIUM_PAD {
            Self::MEDIUM_PAD | Self::LARGE_PAD
        } else if size == Self::SMALL_PAD {
            Self::SMALL_PAD | Self::MEDIUM_PAD | Self::LARGE_PAD
        } else {
            return false;
        };
        self.intersects(acceptable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_features() {
        let features = FacilityFeatures::MARKET | FacilityFeatures::REFUEL;
        assert!(features.has_features(FacilityFeatures::MARKET));
        assert!(features.has_features(FacilityFeatures::MARKET | FacilityFeatures::REFUEL));
        assert!(!features.has_features(FacilityFeatures::MARKET | FacilityFeatures::REPAIR));
        assert!(!features.has_features(FacilityFeatures::empty()));
        assert!(FacilityFeatures::empty().has_features(FacilityFeatures::empty()));
    }

    #[test]
    fn test_pad_sizes() {
        let medium = FacilityFeatures::MEDIUM_PAD;
        assert!(medium.supports_pad_size(FacilityFeatures::SMALL_PAD));
        assert!(medium.supports_pad_size(FacilityFeatures::MEDIUM_PAD));
        assert!(!medium.supports_pad_size(FacilityFeatures::LARGE_PAD));
        assert!(FacilityFeatures::LARGE_PAD.supports_pad_size(FacilityFeatures::SMALL_PAD));
        assert!(!FacilityFeatures::SMALL_PAD.supports_pad_size(FacilityFeatures::MEDIUM_PAD));
        assert!(!medium.supports_pad_size(FacilityFeatures::MARKET));
    }

    #[test]
    fn test_bit_order() {
        assert_eq!(FacilityFeatures::MARKET.bits(), 1);
        assert_eq!(FacilityFeatures::SMALL_PAD.bits(), 1 << 13);
        assert_eq!(FacilityFeatures::all().bits(), (1 << 14) - 1);
    }
}
