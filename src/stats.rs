use crate::arbiter::Decision;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub rx_pkts: AtomicU64,
    pub tx_pkts: AtomicU64,
    /// Datagrams discarded by the codec: short, bad magic, or not a request type.
    pub dropped: AtomicU64,
    pub pings: AtomicU64,
    pub batches: AtomicU64,
    pub accel_used: AtomicU64,
    pub accel_done: AtomicU64,
    pub accel_timeouts: AtomicU64,
    pub accel_errors: AtomicU64,
    pub accel_fallbacks: AtomicU64,
    pub scores_drained: AtomicU64,
    decisions: [AtomicU64; 4],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub rx_pkts: u64,
    pub tx_pkts: u64,
    pub dropped: u64,
    pub pings: u64,
    pub batches: u64,
    pub accel_used: u64,
    pub accel_done: u64,
    pub accel_timeouts: u64,
    pub accel_errors: u64,
    pub accel_fallbacks: u64,
    pub scores_drained: u64,
    /// Indexed by `Decision as usize`.
    pub decisions: [u64; 4],
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Relaxed);
    }

    #[inline(always)]
    pub fn record_decision(&self, decision: Decision) {
        self.decisions[decision as usize].fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rx_pkts: self.rx_pkts.load(Relaxed),
            tx_pkts: self.tx_pkts.load(Relaxed),
            dropped: self.dropped.load(Relaxed),
            pings: self.pings.load(Relaxed),
            batches: self.batches.load(Relaxed),
            accel_used: self.accel_used.load(Relaxed),
            accel_done: self.accel_done.load(Relaxed),
            accel_timeouts: self.accel_timeouts.load(Relaxed),
            accel_errors: self.accel_errors.load(Relaxed),
            accel_fallbacks: self.accel_fallbacks.load(Relaxed),
            scores_drained: self.scores_drained.load(Relaxed),
            decisions: self.decisions.each_ref().map(|d| d.load(Relaxed)),
        }
    }
}

impl StatsSnapshot {
    pub fn decisions(&self, decision: Decision) -> u64 {
        self.decisions[decision as usize]
    }

    /// One-line summary for the periodic log.
    pub fn format_kpi(&self, rx_queue: usize, tx_queue: usize) -> String {
        format!(
            "KPI rx={} tx={} dropped={} pings={} batches={} accel_used={} accel_done={} \
             fallbacks={} timeouts={} errors={} drained={} hold={} buy={} sell={} cancel={} \
             rx_q={} tx_q={}",
            self.rx_pkts,
            self.tx_pkts,
            self.dropped,
            self.pings,
            self.batches,
            self.accel_used,
            self.accel_done,
            self.accel_fallbacks,
            self.accel_timeouts,
            self.accel_errors,
            self.scores_drained,
            self.decisions(Decision::Hold),
            self.decisions(Decision::Buy),
            self.decisions(Decision::Sell),
            self.decisions(Decision::Cancel),
            rx_queue,
            tx_queue,
        )
    }
}
