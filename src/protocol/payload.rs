use super::{FEATURES_LEN, SCORE_LEN, be_u16, be_u32};
use crate::error::ProtocolError;
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FeatureSnapshot {
    pub ofi: i32,
    /// Top-of-book imbalance, Q1.15.
    pub imbalance: i16,
    pub reserved: u16,
    /// Decayed arrival intensity, Q16.16.
    pub burst: u32,
    /// Decayed micro-volatility of the mid price, Q16.16.
    pub volatility: u32,
}

impl FeatureSnapshot {
    pub fn encode(&self) -> [u8; FEATURES_LEN] {
        let mut out = [0u8; FEATURES_LEN];
        out[0..4].copy_from_slice(&self.ofi.to_be_bytes());
        out[4..6].copy_from_slice(&self.imbalance.to_be_bytes());
        out[6..8].copy_from_slice(&self.reserved.to_be_bytes());
        out[8..12].copy_from_slice(&self.burst.to_be_bytes());
        out[12..16].copy_from_slice(&self.volatility.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<FeatureSnapshot, ProtocolError> {
        if bytes.len() < FEATURES_LEN {
            return Err(ProtocolError::Truncated {
                needed: FEATURES_LEN,
                actual: bytes.len(),
            });
        }
        Ok(FeatureSnapshot {
            ofi: be_u32(bytes, 0) as i32,
            imbalance: be_u16(bytes, 4) as i16,
            reserved: be_u16(bytes, 6),
            burst: be_u32(bytes, 8),
            volatility: be_u32(bytes, 12),
        })
    }
}

/// Signed Q16.16 model score produced by the inference lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(pub i32);

impl Score {
    pub const FRAC_BITS: u32 = 16;

    #[inline(always)]
    pub fn from_raw(raw: u32) -> Score {
        Score(raw as i32)
    }

    #[inline(always)]
    pub fn to_raw(self) -> u32 {
        self.0 as u32
    }

    /// Whole units, saturating at the Q16.16 range.
    pub fn from_units(units: i32) -> Score {
        let raw = (units as i64) << Self::FRAC_BITS;
        Score(raw.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    pub fn encode(self) -> [u8; SCORE_LEN] {
        self.to_raw().to_be_bytes()
    }
}
