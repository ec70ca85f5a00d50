use crate::arbiter::{Arbiter, TakeLiquidityPolicy};
use crate::error::ConfigError;
use crate::protocol::MsgType;
use crate::reflex::ReflexEngine;
use std::net::SocketAddr;
use std::time::Duration;

/// Which reply the processor sends for a DELTA_BATCH.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReplyKind {
    /// Header + 16-byte features (msg_type 2).
    #[default]
    Features,
    /// Header + features + Q16.16 score (msg_type 3).
    FeaturesWithScore,
    /// Header + features, with the timing trailer appended by the sender (msg_type 4).
    FeaturesWithTiming,
}

impl ReplyKind {
    pub fn msg_type(self) -> MsgType {
        match self {
            ReplyKind::Features => MsgType::Features,
            ReplyKind::FeaturesWithScore => MsgType::FeaturesWithScore,
            ReplyKind::FeaturesWithTiming => MsgType::FeaturesWithTiming,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BookKind {
    /// Fixed 16-level arrays, the layout the accelerator mirrors.
    #[default]
    Levels,
    /// Price-keyed maps with cached best prices.
    PriceMap,
}

/// Features used for the reply when the accelerator does not deliver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FallbackPolicy {
    /// The processor's own computation for this batch.
    #[default]
    Recompute,
    /// The last features the accelerator delivered; the software result if it never has.
    ReuseLast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AcceleratorKind {
    /// Software lane only.
    #[default]
    None,
    /// In-process software model of the device.
    Emulated,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub bind: SocketAddr,
    pub rx_queue_size: usize,
    pub tx_queue_size: usize,
    pub accel_timeout_us: u64,
    pub reply_kind: ReplyKind,
    pub book_kind: BookKind,
    pub fallback_policy: FallbackPolicy,
    pub take_liquidity: TakeLiquidityPolicy,
    pub max_inventory: i64,
    pub spread_limit_ticks: i64,
    /// Whole score units.
    pub score_threshold: i32,
    pub pin_cores: bool,
    pub latency_stats: bool,
    /// Requested SO_RCVBUF / SO_SNDBUF. Zero leaves the OS default.
    pub socket_buffer_bytes: usize,
    /// How long the receiver blocks in one recv before rechecking the running flag.
    pub poll_interval: Duration,
    pub log_interval: Duration,
    pub accelerator: AcceleratorKind,
    /// Completion latency of the emulated device.
    pub emulated_latency_us: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 4000)),
            rx_queue_size: 1000,
            tx_queue_size: 1000,
            accel_timeout_us: 2000,
            reply_kind: ReplyKind::Features,
            book_kind: BookKind::Levels,
            fallback_policy: FallbackPolicy::Recompute,
            take_liquidity: TakeLiquidityPolicy::AlwaysBuy,
            max_inventory: 100,
            spread_limit_ticks: 1000,
            score_threshold: 200,
            pin_cores: false,
            latency_stats: false,
            socket_buffer_bytes: 8 << 20,
            poll_interval: Duration::from_millis(50),
            log_interval: Duration::from_secs(1),
            accelerator: AcceleratorKind::None,
            emulated_latency_us: 0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("rx_queue_size", self.rx_queue_size as u64),
            ("tx_queue_size", self.tx_queue_size as u64),
            ("accel_timeout_us", self.accel_timeout_us),
            ("poll_interval", self.poll_interval.as_nanos() as u64),
            ("log_interval", self.log_interval.as_nanos() as u64),
        ];
        if let Some(&(name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero { name });
        }
        if self.max_inventory < 0 {
            return Err(ConfigError::Invalid {
                name: "max_inventory",
                value: self.max_inventory.to_string(),
            });
        }
        if self.spread_limit_ticks < 0 {
            return Err(ConfigError::Invalid {
                name: "spread_limit_ticks",
                value: self.spread_limit_ticks.to_string(),
            });
        }
        if self.score_threshold < 0 {
            return Err(ConfigError::Invalid {
                name: "score_threshold",
                value: self.score_threshold.to_string(),
            });
        }
        Ok(())
    }

    pub fn accel_timeout(&self) -> Duration {
        Duration::from_micros(self.accel_timeout_us)
    }

    pub fn reflex_engine(&self) -> ReflexEngine {
        ReflexEngine::new(self.spread_limit_ticks, self.max_inventory)
    }

    pub fn arbiter(&self) -> Arbiter {
        Arbiter::new(self.score_threshold, self.take_liquidity)
    }
}
