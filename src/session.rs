use crate::book::OrderBookEngine;
use crate::features::FeatureExtractor;
use crate::protocol::{FeatureSnapshot, HEADER_LEN, PacketHeader, decode_deltas};

/// A book plus the decay state derived from it. Owned by exactly one processor.
#[derive(Debug, Default, Clone)]
pub struct Session<B: OrderBookEngine> {
    pub book: B,
    pub extractor: FeatureExtractor,
    /// Deltas applied over the session's lifetime, including those before a reset.
    pub applied_deltas: u64,
}

impl<B: OrderBookEngine> Session<B> {
    pub fn new(book: B) -> Self {
        Self {
            book,
            extractor: FeatureExtractor::new(),
            applied_deltas: 0,
        }
    }

    pub fn reset(&mut self) {
        self.book.reset();
        self.extractor.reset();
    }

    /// A reset flag clears the book and decay state before any delta of the same batch.
    /// At most `min(declared, available / 16)` deltas are applied.
    #[inline(always)]
    pub fn apply_batch(&mut self, header: &PacketHeader, packet: &[u8]) -> FeatureSnapshot {
        if header.is_reset() {
            self.reset();
        }
        let body = packet.get(HEADER_LEN..).unwrap_or(&[]);
        for delta in decode_deltas(body, header.delta_count()) {
            self.book.apply(&delta);
            self.extractor.on_delta(&delta);
            self.applied_deltas += 1;
        }
        self.extractor.on_batch(&self.book.top_of_book(), header.t_send_ns)
    }
}
