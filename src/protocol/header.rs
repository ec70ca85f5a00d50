use super::{FLAG_RESET, FLAGS_COUNT_MASK, HEADER_LEN, MAGIC, VERSION, be_u16, be_u32, be_u64};
use crate::clock;
use crate::error::ProtocolError;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    Ping = 0,
    DeltaBatch = 1,
    Features = 2,
    FeaturesWithScore = 3,
    FeaturesWithTiming = 4,
}

impl TryFrom<u8> for MsgType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MsgType::Ping),
            1 => Ok(MsgType::DeltaBatch),
            2 => Ok(MsgType::Features),
            3 => Ok(MsgType::FeaturesWithScore),
            4 => Ok(MsgType::FeaturesWithTiming),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

/// `msg_type` is kept raw so that a header with an unknown type still decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub msg_type: u8,
    /// For DELTA_BATCH: bit 15 is the reset flag, bits 14..0 the delta count.
    pub flags: u16,
    pub header_len: u16,
    pub sequence: u32,
    pub t_send_ns: u64,
    pub t_ingress_ns: u64,
    pub reserved: u16,
}

pub fn decode_header(bytes: &[u8]) -> Result<PacketHeader, ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            needed: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if magic != MAGIC {
        return Err(ProtocolError::BadMagic(magic));
    }

    Ok(PacketHeader {
        magic,
        version: bytes[4],
        msg_type: bytes[5],
        flags: be_u16(bytes, 6),
        header_len: be_u16(bytes, 8),
        sequence: be_u32(bytes, 10),
        t_send_ns: be_u64(bytes, 14),
        t_ingress_ns: be_u64(bytes, 22),
        reserved: be_u16(bytes, 30),
    })
}

impl PacketHeader {
    pub fn delta_batch(sequence: u32, t_send_ns: u64, reset: bool, count: u16) -> Self {
        let mut flags = count & FLAGS_COUNT_MASK;
        if reset {
            flags |= FLAG_RESET;
        }
        Self {
            magic: MAGIC,
            version: VERSION,
            msg_type: MsgType::DeltaBatch as u8,
            flags,
            header_len: HEADER_LEN as u16,
            sequence,
            t_send_ns,
            t_ingress_ns: 0,
            reserved: 0,
        }
    }

    pub fn ping(sequence: u32, t_send_ns: u64) -> Self {
        Self {
            msg_type: MsgType::Ping as u8,
            ..Self::delta_batch(sequence, t_send_ns, false, 0)
        }
    }

    pub fn kind(&self) -> Result<MsgType, ProtocolError> {
        MsgType::try_from(self.msg_type)
    }

    #[inline(always)]
    pub fn is_reset(&self) -> bool {
        self.flags & FLAG_RESET != 0
    }

    #[inline(always)]
    pub fn delta_count(&self) -> usize {
        (self.flags & FLAGS_COUNT_MASK) as usize
    }

    /// Header for a reply to this request. Flags, sequence and `t_send_ns` are echoed back.
    pub fn reply(&self, msg_type: MsgType) -> PacketHeader {
        PacketHeader {
            magic: MAGIC,
            version: VERSION,
            msg_type: msg_type as u8,
            flags: self.flags,
            header_len: HEADER_LEN as u16,
            sequence: self.sequence,
            t_send_ns: self.t_send_ns,
            t_ingress_ns: clock::now_ns(),
            reserved: 0,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic);
        out[4] = self.version;
        out[5] = self.msg_type;
        out[6..8].copy_from_slice(&self.flags.to_be_bytes());
        out[8..10].copy_from_slice(&self.header_len.to_be_bytes());
        out[10..14].copy_from_slice(&self.sequence.to_be_bytes());
        out[14..22].copy_from_slice(&self.t_send_ns.to_be_bytes());
        out[22..30].copy_from_slice(&self.t_ingress_ns.to_be_bytes());
        out[30..32].copy_from_slice(&self.reserved.to_be_bytes());
        out
    }
}
