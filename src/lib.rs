pub mod accel;
pub mod arbiter;
pub mod book;
pub mod clock;
pub mod config;
mod engine;
pub mod error;
pub mod features;
mod macros;
pub mod measure;
mod op_counter;
mod pipe;
pub mod pipeline;
pub mod processor;
pub mod protocol;
pub mod record;
pub mod reflex;
pub mod ring;
pub mod session;
pub mod stage;
pub mod stats;
mod storage;

pub use crate::accel::{Accelerator, EmulatedAccelerator, SharedAccelerator};
pub use crate::arbiter::{Arbiter, Decision, TakeLiquidityPolicy};
pub use crate::book::{LevelBook, OrderBookEngine, PriceMapBook};
pub use crate::config::EngineConfig;
pub use crate::engine::WorkerEngine;
pub use crate::error::{AccelError, ConfigError, PipelineError, ProtocolError};
pub use crate::features::FeatureExtractor;
pub use crate::op_counter::OpCounter;
pub use crate::pipe::*;
pub use crate::pipeline::Pipeline;
pub use crate::processor::Processor;
pub use crate::reflex::{InventoryHandle, ReflexAction, ReflexEngine};
pub use crate::session::Session;
pub use crate::stage::{OutputCollector, Stage, StageExt};
pub use crate::stats::{PipelineStats, StatsSnapshot};
