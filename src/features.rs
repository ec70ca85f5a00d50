use crate::book::TopOfBook;
use crate::protocol::{DeltaRecord, FeatureSnapshot, Side};

pub const Q16_ONE: u32 = 1 << 16;
pub const TAU_BURST_NS: u64 = 200_000;
pub const TAU_VOL_NS: u64 = 2_000_000;

/// State carried from one batch to the next. Cleared by a reset-flagged batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecayState {
    pub ofi: i32,
    pub burst: u32,
    pub volatility: u32,
    pub mid_prev: i64,
    pub last_t_ns: Option<u64>,
}

#[derive(Debug, Default, Clone)]
pub struct FeatureExtractor {
    state: DecayState,
    last: FeatureSnapshot,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state = DecayState::default();
        self.last = FeatureSnapshot::default();
    }

    pub fn state(&self) -> &DecayState {
        &self.state
    }

    /// The snapshot produced by the most recent batch.
    pub fn snapshot(&self) -> FeatureSnapshot {
        self.last
    }

    /// OFI counts ADD/UPDATE only: bid flow adds, ask flow subtracts, saturating at i32 bounds.
    #[inline(always)]
    pub fn on_delta(&mut self, delta: &DeltaRecord) {
        if !delta.action.is_additive() {
            return;
        }
        self.state.ofi = match delta.side {
            Side::Bid => self.state.ofi.saturating_add(delta.qty),
            Side::Ask => self.state.ofi.saturating_sub(delta.qty),
        };
    }

    /// Closes a batch: advances the decay clock to `t_send_ns` and recomputes every feature
    /// from the updated top of book.
    pub fn on_batch(&mut self, top: &TopOfBook, t_send_ns: u64) -> FeatureSnapshot {
        let dt = match self.state.last_t_ns {
            Some(last) => t_send_ns.saturating_sub(last),
            None => 0,
        };
        self.state.last_t_ns = Some(t_send_ns);
        // The hardware multiplier is 32 bits wide on dt.
        let dt = dt.min(u32::MAX as u64);

        self.state.burst = burst_step(self.state.burst, dt);

        let mid = mid_price(top);
        let dp = (mid - self.state.mid_prev).unsigned_abs();
        self.state.mid_prev = mid;
        self.state.volatility = volatility_step(self.state.volatility, dp, dt);

        self.last = FeatureSnapshot {
            ofi: self.state.ofi,
            imbalance: imbalance_q15(top.bid_qty, top.ask_qty),
            reserved: 0,
            burst: self.state.burst,
            volatility: self.state.volatility,
        };
        self.last
    }
}

/// Top-of-book imbalance in Q1.15, truncating toward zero like hardware integer division.
#[inline(always)]
pub fn imbalance_q15(bid_qty: i32, ask_qty: i32) -> i16 {
    let den = bid_qty as i64 + ask_qty as i64;
    if den == 0 {
        return 0;
    }
    let num = (bid_qty as i64 - ask_qty as i64) * 32768;
    (num / den).clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// `burst - floor(burst * dt / tau) + 1.0`, clamped to the u32 range.
#[inline(always)]
pub fn burst_step(burst: u32, dt_ns: u64) -> u32 {
    let decay = (burst as u128 * dt_ns as u128 / TAU_BURST_NS as u128) as i128;
    let next = burst as i128 - decay + Q16_ONE as i128;
    next.clamp(0, u32::MAX as i128) as u32
}

/// EWMA of `|Δmid|` in Q16.16: `vol + floor(((dp << 16) - vol) * dt / tau)`, clamped.
#[inline(always)]
pub fn volatility_step(vol: u32, dp: u64, dt_ns: u64) -> u32 {
    let target = (dp as i128) << 16;
    let step = ((target - vol as i128) * dt_ns as i128).div_euclid(TAU_VOL_NS as i128);
    (vol as i128 + step).clamp(0, u32::MAX as i128) as u32
}

/// Integer mid, rounded toward negative infinity.
#[inline(always)]
pub fn mid_price(top: &TopOfBook) -> i64 {
    (top.bid_price as i64 + top.ask_price as i64).div_euclid(2)
}
