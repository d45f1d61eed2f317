//! The ten onboarding stages

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the ten fixed onboarding steps
///
/// The discriminant is the stage ordinal used by clients (1..=10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Property attributes (address, layout, capacity)
    Property = 1,
    /// Owner identity and contact
    Owner = 2,
    /// Contractual terms
    Contract = 3,
    /// Payout banking details
    Banking = 4,
    /// Distribution-channel credentials
    Credentials = 5,
    /// Uploaded documents
    Documents = 6,
    /// Staff members
    Staff = 7,
    /// Amenity checklist
    Amenities = 8,
    /// Photos and media
    Photos = 9,
    /// Final review acknowledgement
    Review = 10,
}

impl Stage {
    /// Number of stages
    pub const COUNT: usize = 10;

    /// All stages in ordinal order
    pub const ALL: [Stage; Self::COUNT] = [
        Stage::Property,
        Stage::Owner,
        Stage::Contract,
        Stage::Banking,
        Stage::Credentials,
        Stage::Documents,
        Stage::Staff,
        Stage::Amenities,
        Stage::Photos,
        Stage::Review,
    ];

    /// Client-facing ordinal (1..=10)
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Zero-based index, for fixed-size per-stage arrays
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Stable snake_case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Stage::Property => "property",
            Stage::Owner => "owner",
            Stage::Contract => "contract",
            Stage::Banking => "banking",
            Stage::Credentials => "credentials",
            Stage::Documents => "documents",
            Stage::Staff => "staff",
            Stage::Amenities => "amenities",
            Stage::Photos => "photos",
            Stage::Review => "review",
        }
    }

    /// Whether the stage holds one-to-many child entities instead of scalars
    #[inline]
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(
            self,
            Stage::Credentials | Stage::Documents | Stage::Staff | Stage::Amenities | Stage::Photos
        )
    }

    /// Look up a stage by ordinal
    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal).checked_sub(1)?).copied()
    }
}

impl TryFrom<u8> for Stage {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_ordinal(value).ok_or(ModelError::InvalidStageOrdinal(i64::from(value)))
    }
}

impl TryFrom<i64> for Stage {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::from_ordinal)
            .ok_or(ModelError::InvalidStageOrdinal(value))
    }
}

impl FromStr for Stage {
    type Err = ModelError;

    /// Accepts either the stage name or its ordinal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<i64>() {
            return Self::try_from(ordinal);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ModelError::UnknownStage(trimmed.to_string()))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ordinals_are_one_based_and_contiguous() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(usize::from(stage.ordinal()), i + 1);
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn collection_stages_are_five_through_nine() {
        let collections: Vec<u8> = Stage::ALL
            .iter()
            .filter(|s| s.is_collection())
            .map(|s| s.ordinal())
            .collect();
        assert_eq!(collections, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn parse_by_name_or_ordinal() {
        assert_eq!("staff".parse::<Stage>().unwrap(), Stage::Staff);
        assert_eq!("Review".parse::<Stage>().unwrap(), Stage::Review);
        assert_eq!("3".parse::<Stage>().unwrap(), Stage::Contract);
        assert!(matches!(
            "11".parse::<Stage>(),
            Err(ModelError::InvalidStageOrdinal(11))
        ));
        assert!(matches!(
            "lobby".parse::<Stage>(),
            Err(ModelError::UnknownStage(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_out_of_range_ordinals_rejected(n in prop_oneof![Just(0i64), 11i64..1000, -1000i64..0]) {
            prop_assert!(Stage::try_from(n).is_err());
        }
    }
}
