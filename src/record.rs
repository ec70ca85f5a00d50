use crate::protocol::{MAX_REPLY_LEN, TimingTrailer};
use bytemuck::{Pod, Zeroable};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Largest datagram the receiver accepts. Longer datagrams are truncated by the socket.
pub const MAX_DATAGRAM: usize = 4096;

/// Reply bytes an [`Outbound`] can hold, trailer excluded.
pub const REPLY_CAPACITY: usize = 64;

const _: () = assert!(MAX_REPLY_LEN <= REPLY_CAPACITY);

/// A `SocketAddr` flattened into plain bytes so it can live in a ring slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PeerAddr {
    ip: [u8; 16],
    port: u16,
    is_v6: u8,
    _pad: [u8; 5],
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        let (ip, is_v6) = match addr.ip() {
            IpAddr::V4(v4) => (v4.to_ipv6_mapped().octets(), 0),
            IpAddr::V6(v6) => (v6.octets(), 1),
        };
        PeerAddr {
            ip,
            port: addr.port(),
            is_v6,
            _pad: [0; 5],
        }
    }
}

impl From<PeerAddr> for SocketAddr {
    fn from(peer: PeerAddr) -> Self {
        let v6 = Ipv6Addr::from(peer.ip);
        let ip = match v6.to_ipv4_mapped() {
            Some(v4) if peer.is_v6 == 0 => IpAddr::V4(v4),
            _ if peer.is_v6 == 0 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            _ => IpAddr::V6(v6),
        };
        SocketAddr::new(ip, peer.port)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Inbound {
    pub rx_ns: u64,
    pub peer: PeerAddr,
    pub len: u32,
    _pad: u32,
    pub bytes: [u8; MAX_DATAGRAM],
}

impl Inbound {
    pub fn new(rx_ns: u64, peer: SocketAddr, payload: &[u8]) -> Self {
        let mut inbound = Inbound::zeroed();
        let len = payload.len().min(MAX_DATAGRAM);
        inbound.bytes[..len].copy_from_slice(&payload[..len]);
        inbound.len = len as u32;
        inbound.rx_ns = rx_ns;
        inbound.peer = peer.into();
        inbound
    }

    #[inline(always)]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[..(self.len as usize).min(MAX_DATAGRAM)]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Outbound {
    pub timing: TimingTrailer,
    pub peer: PeerAddr,
    pub len: u32,
    /// Non-zero when the sender must append the timing trailer.
    pub has_timing: u32,
    pub bytes: [u8; REPLY_CAPACITY],
}

impl Outbound {
    #[inline(always)]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[..(self.len as usize).min(REPLY_CAPACITY)]
    }

    #[inline(always)]
    pub fn wants_timing(&self) -> bool {
        self.has_timing != 0
    }
}
