//! Mapping of the public 0-100 quality knob onto backend quality scales.
//!
//! The public quality value is not validated. Each backend applies its own
//! clamping to whatever it is given.

use serde::{Deserialize, Serialize};

/// Quality for the primary encoder, which has a native 1-100 scale.
///
/// Values are passed through; anything outside the encoder's range is
/// clamped to it.
#[inline]
pub fn primary_quality(quality: i32) -> u8 {
    quality.clamp(1, 100) as u8
}

/// The coarse quality setting of the fallback encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum QualityTier {
    /// Reference quantization tables.
    Low = 1,
    /// Reference tables divided by ten.
    Medium = 2,
    /// All-ones tables.
    High = 3,
}

impl QualityTier {
    /// Quantize a 0-100 quality value into one of three tiers.
    ///
    /// * below 34 - `Low`
    /// * 34 to 66 - `Medium`
    /// * 67 and above - `High`
    pub fn from_quality(quality: i32) -> Self {
        if quality < 34 {
            QualityTier::Low
        } else if quality < 67 {
            QualityTier::Medium
        } else {
            QualityTier::High
        }
    }

    /// The tier number, 1 (lowest) to 3 (highest).
    #[inline]
    pub fn level(self) -> u8 {
        self as u8
    }

    /// The libjpeg-style quality that scales the reference tables the same
    /// way this tier does (50 keeps them, 95 divides by ten, 100 yields ones).
    #[inline]
    pub fn table_quality(self) -> u8 {
        match self {
            QualityTier::Low => 50,
            QualityTier::Medium => 95,
            QualityTier::High => 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let tiers: Vec<u8> = [0, 33, 34, 66, 67, 100]
            .into_iter()
            .map(|q| QualityTier::from_quality(q).level())
            .collect();
        assert_eq!(tiers, vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_tier_out_of_range_values() {
        assert_eq!(QualityTier::from_quality(-20), QualityTier::Low);
        assert_eq!(QualityTier::from_quality(500), QualityTier::High);
    }

    #[test]
    fn test_primary_quality_passthrough() {
        assert_eq!(primary_quality(0), 1);
        assert_eq!(primary_quality(1), 1);
        assert_eq!(primary_quality(75), 75);
        assert_eq!(primary_quality(100), 100);
        assert_eq!(primary_quality(1000), 100);
        assert_eq!(primary_quality(-5), 1);
    }

    #[test]
    fn test_table_quality_increases_with_tier() {
        assert!(QualityTier::Low.table_quality() < QualityTier::Medium.table_quality());
        assert!(QualityTier::Medium.table_quality() < QualityTier::High.table_quality());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
