use super::TRAILER_LEN;
use bytemuck::{Pod, Zeroable};

/// Per-packet stage timestamps appended to FEATURES_WITH_TIMING replies.
///
/// Stages that did not run (e.g. the accelerator on a fallback) stay at zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TimingTrailer {
    pub t_rx_ns: u64,
    pub t_accel_start_ns: u64,
    pub t_feature_done_ns: u64,
    pub t_score_done_ns: u64,
    pub t_reflex_done_ns: u64,
    pub t_tx_ns: u64,
    pub reflex_act: u32,
    /// Q16.16 score word, raw.
    pub score: u32,
}

impl TimingTrailer {
    pub fn encode(&self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        let stamps = [
            self.t_rx_ns,
            self.t_accel_start_ns,
            self.t_feature_done_ns,
            self.t_score_done_ns,
            self.t_reflex_done_ns,
            self.t_tx_ns,
        ];
        for (i, stamp) in stamps.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&stamp.to_be_bytes());
        }
        out[48..52].copy_from_slice(&self.reflex_act.to_be_bytes());
        out[52..56].copy_from_slice(&self.score.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_layout() {
        let trailer = TimingTrailer {
            t_rx_ns: 1,
            t_tx_ns: 6,
            reflex_act: 2,
            score: 0x0001_8000,
            ..Default::default()
        };
        let bytes = trailer.encode();
        assert_eq!(bytes.len(), 56);
        assert_eq!(&bytes[0..8], &1u64.to_be_bytes());
        assert_eq!(&bytes[40..48], &6u64.to_be_bytes());
        assert_eq!(&bytes[48..52], &2u32.to_be_bytes());
        assert_eq!(&bytes[52..56], &[0x00, 0x01, 0x80, 0x00]);
    }
}
