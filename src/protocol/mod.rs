mod delta;
mod header;
mod payload;
mod trailer;

pub use delta::{Action, DeltaIter, DeltaRecord, Side, decode_deltas};
pub use header::{MsgType, PacketHeader, decode_header};
pub use payload::{FeatureSnapshot, Score};
pub use trailer::TimingTrailer;

use crate::clock;

pub const MAGIC: [u8; 4] = *b"LOB1";
pub const VERSION: u8 = 1;

pub const HEADER_LEN: usize = 32;
pub const DELTA_LEN: usize = 16;
pub const FEATURES_LEN: usize = 16;
pub const SCORE_LEN: usize = 4;
pub const TRAILER_LEN: usize = 56;

/// Largest reply the processor ever builds (header + features + score).
pub const MAX_REPLY_LEN: usize = HEADER_LEN + FEATURES_LEN + SCORE_LEN;

pub const FLAG_RESET: u16 = 1 << 15;
pub const FLAGS_COUNT_MASK: u16 = 0x7FFF;

/// A PING reply drops `payload` and gets `t_ingress_ns` stamped right before encoding.
///
/// # Panics
/// Panics if `out` is too small for the reply.
pub fn encode_reply(header: &PacketHeader, payload: &[u8], out: &mut [u8]) -> usize {
    let mut header = *header;
    let payload = if header.msg_type == MsgType::Ping as u8 {
        header.t_ingress_ns = clock::now_ns();
        &[][..]
    } else {
        payload
    };

    let total = HEADER_LEN + payload.len();
    assert!(
        out.len() >= total,
        "Reply buffer too small. Capacity: {}, Reply: {}",
        out.len(),
        total
    );
    out[..HEADER_LEN].copy_from_slice(&header.encode());
    out[HEADER_LEN..total].copy_from_slice(payload);
    total
}

/// # Panics
/// Panics if `deltas` holds more records than the 15-bit count field can declare.
pub fn encode_delta_batch(sequence: u32, t_send_ns: u64, reset: bool, deltas: &[DeltaRecord]) -> Vec<u8> {
    assert!(
        deltas.len() <= FLAGS_COUNT_MASK as usize,
        "Too many deltas for one batch. Max: {}, Got: {}",
        FLAGS_COUNT_MASK,
        deltas.len()
    );
    let header = PacketHeader::delta_batch(sequence, t_send_ns, reset, deltas.len() as u16);
    let mut out = Vec::with_capacity(HEADER_LEN + deltas.len() * DELTA_LEN);
    out.extend_from_slice(&header.encode());
    for delta in deltas {
        out.extend_from_slice(&delta.encode());
    }
    out
}

#[inline(always)]
pub(crate) fn be_u16(b: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([b[at], b[at + 1]])
}

#[inline(always)]
pub(crate) fn be_u32(b: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

#[inline(always)]
pub(crate) fn be_u64(b: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[at..at + 8]);
    u64::from_be_bytes(raw)
}
