use clap::Parser;
use lob_reflex::accel::{EmulatedAccelerator, SharedAccelerator};
use lob_reflex::config::{AcceleratorKind, BookKind, EngineConfig, FallbackPolicy, ReplyKind};
use lob_reflex::pipeline::{Pipeline, set_socket_buffers};
use lob_reflex::{InventoryHandle, TakeLiquidityPolicy};
use spdlog::prelude::*;
use std::net::{SocketAddr, UdpSocket};
use std::thread::sleep;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(about = "LOB1 feature engine: book, fixed-point features, reflex and inference lanes")]
struct Args {
    #[arg(long, default_value = "0.0.0.0:4000")]
    bind: SocketAddr,

    #[arg(long, default_value_t = 1000)]
    rx_queue: usize,

    #[arg(long, default_value_t = 1000)]
    tx_queue: usize,

    #[arg(long, value_enum, default_value_t = ReplyKind::Features)]
    reply: ReplyKind,

    #[arg(long, value_enum, default_value_t = BookKind::Levels)]
    book: BookKind,

    #[arg(long, value_enum, default_value_t = AcceleratorKind::None)]
    accelerator: AcceleratorKind,

    #[arg(long, default_value_t = 2000)]
    accel_timeout_us: u64,

    /// Completion latency of the emulated accelerator.
    #[arg(long, default_value_t = 0)]
    emulated_latency_us: u64,

    #[arg(long, value_enum, default_value_t = FallbackPolicy::Recompute)]
    fallback: FallbackPolicy,

    #[arg(long, value_enum, default_value_t = TakeLiquidityPolicy::AlwaysBuy)]
    take_liquidity: TakeLiquidityPolicy,

    #[arg(long, default_value_t = 100)]
    max_inventory: i64,

    /// Starting net position.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    inventory: i64,

    #[arg(long, default_value_t = 1000)]
    spread_limit: i64,

    #[arg(long, default_value_t = 200)]
    score_threshold: i32,

    #[arg(long, default_value_t = 8 << 20)]
    socket_buffer: usize,

    #[arg(long)]
    pin_cores: bool,

    #[arg(long)]
    latency_stats: bool,

    #[arg(long, default_value_t = 1000)]
    log_interval_ms: u64,

    /// Exit after this many seconds instead of running until a worker fails.
    #[arg(long)]
    run_for_secs: Option<u64>,
}

impl Args {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            bind: self.bind,
            rx_queue_size: self.rx_queue,
            tx_queue_size: self.tx_queue,
            accel_timeout_us: self.accel_timeout_us,
            reply_kind: self.reply,
            book_kind: self.book,
            fallback_policy: self.fallback,
            take_liquidity: self.take_liquidity,
            max_inventory: self.max_inventory,
            spread_limit_ticks: self.spread_limit,
            score_threshold: self.score_threshold,
            pin_cores: self.pin_cores,
            latency_stats: self.latency_stats,
            socket_buffer_bytes: self.socket_buffer,
            log_interval: Duration::from_millis(self.log_interval_ms),
            accelerator: self.accelerator,
            emulated_latency_us: self.emulated_latency_us,
            ..EngineConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.config();
    config.validate()?;

    info!("[System] Booting lob-reflex on {}...", config.bind);
    let socket = UdpSocket::bind(config.bind)?;
    if config.socket_buffer_bytes > 0
        && let Err(e) = set_socket_buffers(&socket, config.socket_buffer_bytes)
    {
        warn!("[System] Could not size socket buffers: {}", e);
    }

    let accel = match config.accelerator {
        AcceleratorKind::None => None,
        AcceleratorKind::Emulated => Some(SharedAccelerator::new(
            EmulatedAccelerator::new()
                .with_latency(Duration::from_micros(config.emulated_latency_us)),
        )),
    };

    let pipeline = Pipeline::start(&config, socket, accel, InventoryHandle::new(args.inventory))?;

    let started = Instant::now();
    let deadline = args.run_for_secs.map(Duration::from_secs);
    while pipeline.is_healthy() {
        sleep(config.log_interval);
        let (rx_q, tx_q) = pipeline.queue_depths();
        info!("{}", pipeline.stats().format_kpi(rx_q, tx_q));
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            let stats = pipeline.stop();
            info!("[System] Done! {}", stats.format_kpi(0, 0));
            return Ok(());
        }
    }

    error!("[System] A pipeline worker stopped, shutting down");
    Err("pipeline worker stopped".into())
}
