use super::{DELTA_LEN, be_u16, be_u32};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid = 0,
    Ask = 1,
}

impl Side {
    /// Only the low bit is significant on the wire.
    #[inline(always)]
    pub fn from_wire(raw: u8) -> Side {
        if raw & 1 == 0 { Side::Bid } else { Side::Ask }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Set = 0,
    Add = 1,
    Update = 2,
    Remove = 3,
}

impl Action {
    /// Only the low two bits are significant on the wire.
    #[inline(always)]
    pub fn from_wire(raw: u8) -> Action {
        match raw & 0b11 {
            0 => Action::Set,
            1 => Action::Add,
            2 => Action::Update,
            _ => Action::Remove,
        }
    }

    /// ADD and UPDATE both add a signed quantity; nothing else distinguishes them.
    #[inline(always)]
    pub fn is_additive(self) -> bool {
        matches!(self, Action::Add | Action::Update)
    }
}

/// One incremental order-book mutation (16 bytes on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaRecord {
    pub price_ticks: i32,
    pub qty: i32,
    pub level: u16,
    pub side: Side,
    pub action: Action,
    pub reserved: u32,
}

impl DeltaRecord {
    pub fn new(side: Side, action: Action, level: u16, price_ticks: i32, qty: i32) -> Self {
        Self {
            price_ticks,
            qty,
            level,
            side,
            action,
            reserved: 0,
        }
    }

    #[inline(always)]
    pub fn decode(b: &[u8]) -> DeltaRecord {
        DeltaRecord {
            price_ticks: be_u32(b, 0) as i32,
            qty: be_u32(b, 4) as i32,
            level: be_u16(b, 8),
            side: Side::from_wire(b[10]),
            action: Action::from_wire(b[11]),
            reserved: be_u32(b, 12),
        }
    }

    pub fn encode(&self) -> [u8; DELTA_LEN] {
        let mut out = [0u8; DELTA_LEN];
        out[0..4].copy_from_slice(&self.price_ticks.to_be_bytes());
        out[4..8].copy_from_slice(&self.qty.to_be_bytes());
        out[8..10].copy_from_slice(&self.level.to_be_bytes());
        out[10] = self.side as u8;
        out[11] = self.action as u8;
        out[12..16].copy_from_slice(&self.reserved.to_be_bytes());
        out
    }
}

/// Lazily decodes up to `count` deltas. Stops early, without error, at a truncated tail.
pub struct DeltaIter<'a> {
    buf: &'a [u8],
    remaining: usize,
}

/// `bytes` is the delta region that follows the header.
pub fn decode_deltas(bytes: &[u8], count: usize) -> DeltaIter<'_> {
    DeltaIter {
        buf: bytes,
        remaining: count,
    }
}

impl Iterator for DeltaIter<'_> {
    type Item = DeltaRecord;

    #[inline(always)]
    fn next(&mut self) -> Option<DeltaRecord> {
        if self.remaining == 0 || self.buf.len() < DELTA_LEN {
            return None;
        }
        let (record, rest) = self.buf.split_at(DELTA_LEN);
        self.buf = rest;
        self.remaining -= 1;
        Some(DeltaRecord::decode(record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.min(self.buf.len() / DELTA_LEN);
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_negative_qty() {
        let delta = DeltaRecord::new(Side::Bid, Action::Update, 2, -7, -25);
        let decoded = DeltaRecord::decode(&delta.encode());
        assert_eq!(decoded, delta);
    }

    #[test]
    fn test_wire_masking() {
        let mut raw = DeltaRecord::new(Side::Bid, Action::Set, 0, 1, 1).encode();
        raw[10] = 0xFF;
        raw[11] = 0x06;
        let decoded = DeltaRecord::decode(&raw);
        assert_eq!(decoded.side, Side::Ask);
        assert_eq!(decoded.action, Action::Update);
    }

    #[test]
    fn test_iter_stops_at_truncated_tail() {
        let a = DeltaRecord::new(Side::Bid, Action::Add, 0, 100, 1);
        let b = DeltaRecord::new(Side::Ask, Action::Add, 0, 101, 2);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&a.encode());
        bytes.extend_from_slice(&b.encode());
        bytes.truncate(DELTA_LEN + 9);

        let decoded: Vec<_> = decode_deltas(&bytes, 5).collect();
        assert_eq!(decoded, vec![a]);
    }

    #[test]
    fn test_iter_respects_declared_count() {
        let a = DeltaRecord::new(Side::Bid, Action::Add, 0, 100, 1);
        let bytes: Vec<u8> = (0..4).flat_map(|_| a.encode()).collect();

        let iter = decode_deltas(&bytes, 2);
        assert_eq!(iter.size_hint(), (2, Some(2)));
        assert_eq!(iter.count(), 2);
        assert_eq!(decode_deltas(&bytes, 0).count(), 0);
    }
}
