use crate::accel::SharedAccelerator;
use crate::arbiter::{Arbiter, Decision};
use crate::book::OrderBookEngine;
use crate::clock;
use crate::config::{EngineConfig, FallbackPolicy, ReplyKind};
use crate::error::AccelError;
use crate::protocol::{
    FEATURES_LEN, FeatureSnapshot, MsgType, PacketHeader, SCORE_LEN, Score, TimingTrailer,
    decode_header, encode_reply,
};
use crate::record::{Inbound, Outbound};
use crate::reflex::{InventoryHandle, ReflexAction, ReflexEngine};
use crate::session::Session;
use crate::stage::{OutputCollector, Stage};
use crate::stats::PipelineStats;
use bytemuck::Zeroable;
use spdlog::warn;
use std::sync::Arc;
use std::time::Duration;

/// Accelerator failures of each kind that get a log line before going quiet.
const WARN_LIMIT: u64 = 5;

/// Owns the session state for one stream and turns inbound datagrams into replies.
pub struct Processor<B: OrderBookEngine> {
    session: Session<B>,
    reflex: ReflexEngine,
    arbiter: Arbiter,
    reply_kind: ReplyKind,
    fallback_policy: FallbackPolicy,
    accel: Option<SharedAccelerator>,
    accel_timeout: Duration,
    inventory: InventoryHandle,
    stats: Arc<PipelineStats>,
    last_accel_features: Option<FeatureSnapshot>,
    last_reflex: ReflexAction,
    last_decision: Decision,
}

impl<B: OrderBookEngine> Processor<B> {
    pub fn new(
        book: B,
        config: &EngineConfig,
        accel: Option<SharedAccelerator>,
        inventory: InventoryHandle,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            session: Session::new(book),
            reflex: config.reflex_engine(),
            arbiter: config.arbiter(),
            reply_kind: config.reply_kind,
            fallback_policy: config.fallback_policy,
            accel,
            accel_timeout: config.accel_timeout(),
            inventory,
            stats,
            last_accel_features: None,
            last_reflex: ReflexAction::None,
            last_decision: Decision::Hold,
        }
    }

    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    pub fn last_reflex(&self) -> ReflexAction {
        self.last_reflex
    }

    pub fn last_decision(&self) -> Decision {
        self.last_decision
    }

    #[inline(always)]
    fn on_ping(&mut self, header: &PacketHeader, data: &Inbound) -> Outbound {
        PipelineStats::incr(&self.stats.pings);
        let mut out = Outbound::zeroed();
        out.peer = data.peer;
        out.timing.t_rx_ns = data.rx_ns;
        out.len = encode_reply(&header.reply(MsgType::Ping), &[], &mut out.bytes) as u32;
        out
    }

    #[inline(always)]
    fn on_batch(&mut self, header: &PacketHeader, data: &Inbound) -> Outbound {
        PipelineStats::incr(&self.stats.batches);
        let packet = data.payload();
        if header.is_reset() {
            self.last_accel_features = None;
        }

        let software = self.session.apply_batch(header, packet);
        let reflex = self.reflex.evaluate(&self.session.book, self.inventory.get());

        let mut timing = TimingTrailer {
            t_rx_ns: data.rx_ns,
            t_reflex_done_ns: clock::now_ns(),
            reflex_act: reflex.code(),
            ..TimingTrailer::zeroed()
        };

        let (features, score) = self.offload(packet, software, &mut timing);
        let decision = self.arbiter.decide(reflex, score, &self.session.book.top_of_book());
        self.stats.record_decision(decision);
        self.last_reflex = reflex;
        self.last_decision = decision;
        timing.score = score.map_or(0, Score::to_raw);

        let mut payload = [0u8; FEATURES_LEN + SCORE_LEN];
        payload[..FEATURES_LEN].copy_from_slice(&features.encode());
        let payload_len = if self.reply_kind == ReplyKind::FeaturesWithScore {
            payload[FEATURES_LEN..].copy_from_slice(&score.unwrap_or_default().encode());
            FEATURES_LEN + SCORE_LEN
        } else {
            FEATURES_LEN
        };

        let mut out = Outbound::zeroed();
        out.peer = data.peer;
        out.timing = timing;
        out.has_timing = (self.reply_kind == ReplyKind::FeaturesWithTiming) as u32;
        out.len = encode_reply(
            &header.reply(self.reply_kind.msg_type()),
            &payload[..payload_len],
            &mut out.bytes,
        ) as u32;
        out
    }

    /// Runs the accelerator lane if one is attached. Returns the features to reply with and
    /// the score, which only exists when the device delivered.
    #[inline(always)]
    fn offload(
        &mut self,
        packet: &[u8],
        software: FeatureSnapshot,
        timing: &mut TimingTrailer,
    ) -> (FeatureSnapshot, Option<Score>) {
        let Some(accel) = &self.accel else {
            return (software, None);
        };

        PipelineStats::incr(&self.stats.accel_used);
        let outcome = accel.offload(packet, self.accel_timeout);
        timing.t_accel_start_ns = outcome.t_start_ns;
        timing.t_feature_done_ns = outcome.t_feature_done_ns;
        timing.t_score_done_ns = outcome.t_score_done_ns;
        if outcome.score_drained {
            PipelineStats::incr(&self.stats.scores_drained);
        }

        match outcome.features {
            Ok(features) => {
                PipelineStats::incr(&self.stats.accel_done);
                self.last_accel_features = Some(features);
                (features, outcome.score)
            }
            Err(e) => {
                let counter = match e {
                    AccelError::Timeout(_) => &self.stats.accel_timeouts,
                    _ => &self.stats.accel_errors,
                };
                let seen = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                PipelineStats::incr(&self.stats.accel_fallbacks);
                if seen < WARN_LIMIT {
                    warn!("[Processor] accelerator fallback: {}", e);
                }
                let features = match self.fallback_policy {
                    FallbackPolicy::Recompute => software,
                    FallbackPolicy::ReuseLast => self.last_accel_features.unwrap_or(software),
                };
                (features, None)
            }
        }
    }
}

impl<B: OrderBookEngine> Stage<Inbound, Outbound> for Processor<B> {
    /// Malformed datagrams and non-request message types are dropped without a reply.
    #[inline(always)]
    fn process<C>(&mut self, data: &Inbound, collector: &mut C)
    where
        C: OutputCollector<Outbound>,
    {
        let Ok(header) = decode_header(data.payload()) else {
            PipelineStats::incr(&self.stats.dropped);
            return;
        };
        let out = match header.kind() {
            Ok(MsgType::Ping) => self.on_ping(&header, data),
            Ok(MsgType::DeltaBatch) => self.on_batch(&header, data),
            _ => {
                PipelineStats::incr(&self.stats.dropped);
                return;
            }
        };
        collector.push(&out);
    }
}
