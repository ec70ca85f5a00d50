use crate::accel::SharedAccelerator;
use crate::book::{LevelBook, OrderBookEngine, PriceMapBook};
use crate::clock;
use crate::config::{BookKind, EngineConfig};
use crate::engine::WorkerEngine;
use crate::error::PipelineError;
use crate::measure::LatencyMeasurer;
use crate::processor::Processor;
use crate::protocol::{TRAILER_LEN, TimingTrailer};
use crate::record::{Inbound, MAX_DATAGRAM, Outbound, REPLY_CAPACITY};
use crate::reflex::InventoryHandle;
use crate::ring::{RingConsumer, RingGauge, RingOptions, RingProducer};
use crate::stage::Stage;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::{latency, pipe, progress};
use bytemuck::Zeroable;
use spdlog::info;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

const PROGRESS_INTERVAL: usize = 1_000_000;
const LATENCY_SAMPLE_RATE: u64 = 100;

/// The running three-worker pipeline. Dropping it stops and joins every worker.
pub struct Pipeline {
    engine: WorkerEngine,
    stats: Arc<PipelineStats>,
    rx_gauge: RingGauge,
    tx_gauge: RingGauge,
    local_addr: SocketAddr,
}

impl Pipeline {
    /// Spawns the receiver, processor and sender on `socket`.
    ///
    /// The socket gets a read timeout of `config.poll_interval` so the receiver notices
    /// shutdown; replies go out through a clone of the same socket.
    pub fn start(
        config: &EngineConfig,
        socket: UdpSocket,
        accel: Option<SharedAccelerator>,
        inventory: InventoryHandle,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        socket.set_read_timeout(Some(config.poll_interval))?;
        let local_addr = socket.local_addr()?;
        let send_socket = socket.try_clone()?;

        let mut engine = WorkerEngine::new();
        engine.set_pin_cores(config.pin_cores);
        engine.enable_latency_stats(config.latency_stats);
        let stats = Arc::new(PipelineStats::new());

        let (rx_producer, rx_consumer, rx_gauge) = engine.new_ring::<Inbound>(RingOptions {
            name: "rx",
            capacity: config.rx_queue_size,
        })?;
        let (tx_producer, tx_consumer, tx_gauge) = engine.new_ring::<Outbound>(RingOptions {
            name: "tx",
            capacity: config.tx_queue_size,
        })?;

        spawn_receiver(&mut engine, socket, rx_producer, stats.clone());
        match config.book_kind {
            BookKind::Levels => spawn_processor(
                &mut engine,
                Processor::new(LevelBook::new(), config, accel, inventory, stats.clone()),
                rx_consumer,
                tx_producer,
            ),
            BookKind::PriceMap => spawn_processor(
                &mut engine,
                Processor::new(PriceMapBook::new(), config, accel, inventory, stats.clone()),
                rx_consumer,
                tx_producer,
            ),
        }
        spawn_sender(
            &mut engine,
            send_socket,
            tx_consumer,
            stats.clone(),
            config.latency_stats,
        );

        info!(
            "[Pipeline] Listening on {} (book: {:?}, reply: {:?}, clock: {:?})",
            local_addr,
            config.book_kind,
            config.reply_kind,
            clock::source()
        );

        Ok(Self {
            engine,
            stats,
            rx_gauge,
            tx_gauge,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn queue_depths(&self) -> (usize, usize) {
        (self.rx_gauge.len(), self.tx_gauge.len())
    }

    /// False once any worker has exited on a fatal error.
    pub fn is_healthy(&self) -> bool {
        !self.engine.is_any_worker_stopped()
    }

    pub fn await_idle(&self, timeout: Duration) {
        self.engine.await_idle(timeout);
    }

    pub fn stop(mut self) -> StatsSnapshot {
        self.engine.stop();
        self.stats.snapshot()
    }
}

fn spawn_receiver(
    engine: &mut WorkerEngine,
    socket: UdpSocket,
    mut rx: RingProducer<Inbound>,
    stats: Arc<PipelineStats>,
) {
    let mut scratch = Box::new(Inbound::zeroed());
    engine.run_worker("Receiver", move || match socket.recv_from(&mut scratch.bytes) {
        Ok((len, peer)) => {
            scratch.rx_ns = clock::now_ns();
            scratch.len = len.min(MAX_DATAGRAM) as u32;
            scratch.peer = peer.into();
            PipelineStats::incr(&stats.rx_pkts);
            rx.push(&scratch);
            Ok(true)
        }
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
            ) =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    });
}

fn spawn_processor<B>(
    engine: &mut WorkerEngine,
    processor: Processor<B>,
    mut rx: RingConsumer<Inbound>,
    mut tx: RingProducer<Outbound>,
) where
    B: OrderBookEngine + Send + 'static,
{
    let mut stage = pipe![
        progress::<Inbound>("Processor", PROGRESS_INTERVAL),
        latency::<Inbound, Outbound, _>(
            "Processor",
            PROGRESS_INTERVAL,
            LATENCY_SAMPLE_RATE,
            processor
        )
    ];
    engine.run_worker("Processor", move || {
        let processed = rx.try_pop_with(|inbound| {
            stage.process(inbound, &mut |out: &Outbound| {
                tx.push(out);
            })
        });
        Ok(processed.is_some())
    });
}

/// Receive-to-send latency of every reply, logged when the sender exits.
struct WireLatency(Option<LatencyMeasurer>);

impl Drop for WireLatency {
    fn drop(&mut self) {
        if let Some(measurer) = &self.0 {
            info!("[Latency/Wire]{}", measurer.format_stats());
        }
    }
}

fn spawn_sender(
    engine: &mut WorkerEngine,
    socket: UdpSocket,
    mut tx: RingConsumer<Outbound>,
    stats: Arc<PipelineStats>,
    latency_stats: bool,
) {
    let mut wire_latency = WireLatency(latency_stats.then(|| LatencyMeasurer::new(1)));
    engine.run_worker("Sender", move || {
        let sent = tx.try_pop_with(|out| {
            let mut datagram = [0u8; REPLY_CAPACITY + TRAILER_LEN];
            let mut len = out.payload().len();
            datagram[..len].copy_from_slice(out.payload());

            let t_tx_ns = clock::now_ns();
            if out.wants_timing() {
                let trailer = TimingTrailer {
                    t_tx_ns,
                    ..out.timing
                };
                datagram[len..len + TRAILER_LEN].copy_from_slice(&trailer.encode());
                len += TRAILER_LEN;
            }

            socket.send_to(&datagram[..len], SocketAddr::from(out.peer))?;
            PipelineStats::incr(&stats.tx_pkts);
            if let Some(measurer) = wire_latency.0.as_mut() {
                measurer.measure_span(out.timing.t_rx_ns, t_tx_ns);
            }
            Ok::<_, std::io::Error>(())
        });
        match sent {
            None => Ok(false),
            Some(Ok(())) => Ok(true),
            Some(Err(e)) => Err(e.into()),
        }
    });
}

#[cfg(unix)]
pub fn set_socket_buffers(socket: &UdpSocket, bytes: usize) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let value = libc::c_int::try_from(bytes).unwrap_or(libc::c_int::MAX);
    for option in [libc::SO_RCVBUF, libc::SO_SNDBUF] {
        // SAFETY: `value` lives across the call and the length passed is its exact size.
        // The fd stays open for as long as `socket` is borrowed.
        let rc = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_SOCKET,
                option,
                (&value as *const libc::c_int).cast(),
                size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn set_socket_buffers(_socket: &UdpSocket, _bytes: usize) -> std::io::Result<()> {
    Ok(())
}
