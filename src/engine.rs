use crate::error::PipelineError;
use crate::measure::LatencyMeasurer;
use crate::op_counter::OpCounter;
use crate::ring::{RingConsumer, RingGauge, RingOptions, RingProducer, ring};
use bytemuck::Pod;
use spdlog::{error, info};
use std::hint::spin_loop;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Runs pipeline workers on dedicated threads and owns the shared running flag.
///
/// Dropping the engine stops every worker and joins it.
pub struct WorkerEngine {
    running: Arc<AtomicBool>,
    enable_latency_stats: bool,
    worker_handlers: Vec<(&'static str, thread::JoinHandle<()>)>,
    op_counter: Arc<OpCounter>,
    pin_cores: bool,
}

impl WorkerEngine {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            enable_latency_stats: false,
            worker_handlers: vec![],
            op_counter: OpCounter::new(),
            pin_cores: false,
        }
    }

    pub fn set_pin_cores(&mut self, pin_cores: bool) {
        self.pin_cores = pin_cores;
    }

    pub fn enable_latency_stats(&mut self, enable: bool) {
        self.enable_latency_stats = enable;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawns a worker that calls `runnable` until the engine stops.
    ///
    /// `Ok(true)` means the step did work, `Ok(false)` that it was idle. An `Err` is fatal for
    /// this worker only: it is logged and the thread exits.
    pub fn run_worker(
        &mut self,
        name: &'static str,
        mut runnable: impl FnMut() -> Result<bool, PipelineError> + Send + 'static,
    ) {
        let worker_id = self.worker_handlers.len();
        let running = self.running.clone();
        let enable_latency_stats = self.enable_latency_stats;
        let pin_cores = self.pin_cores;
        let handler = thread::spawn(move || {
            if pin_cores
                && let Some(core_ids) = core_affinity::get_core_ids()
                && let Some(core_id) = core_ids.get(worker_id % core_ids.len())
            {
                core_affinity::set_for_current(*core_id);
            }

            let mut measurer = enable_latency_stats.then(|| LatencyMeasurer::new(1000));
            let mut idle_steps = 0u32;
            while running.load(Ordering::Relaxed) {
                let instant = Instant::now();
                match runnable() {
                    Ok(true) => idle_steps = 0,
                    Ok(false) => idle_steps = idle_steps.saturating_add(1),
                    Err(e) => {
                        error!("[Worker:{}] stopped: {}", name, e);
                        break;
                    }
                }
                if idle_steps > 1000 {
                    thread::yield_now();
                } else if idle_steps > 10 {
                    spin_loop();
                }
                if let Some(measurer) = measurer.as_mut() {
                    measurer.measure(instant.elapsed());
                }
            }
            if let Some(measurer) = measurer {
                info!("[Latency/Worker:{}]{}", name, measurer.format_stats());
            }
        });
        self.worker_handlers.push((name, handler));
    }

    pub fn new_ring<T: Pod + Send>(
        &self,
        options: RingOptions,
    ) -> Result<(RingProducer<T>, RingConsumer<T>, RingGauge), PipelineError> {
        ring(options, self.running.clone(), &self.op_counter).map_err(PipelineError::Storage)
    }

    /// Waits until no ring consumer has made progress for 1ms, or `timeout` elapses.
    pub fn await_idle(&self, timeout: Duration) {
        let start = Instant::now();
        let mut last_op_count = self.op_counter.total_op_count();
        loop {
            sleep(Duration::from_millis(1));
            let new_op_count = self.op_counter.total_op_count();
            if new_op_count == last_op_count {
                break;
            }
            if start.elapsed() > timeout {
                break;
            }
            last_op_count = new_op_count;
        }
    }

    /// True if some worker has exited while the engine is still meant to be running.
    pub fn is_any_worker_stopped(&self) -> bool {
        self.is_running()
            && self
                .worker_handlers
                .iter()
                .any(|(_, handler)| handler.is_finished())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if self.worker_handlers.is_empty() {
            return;
        }
        for (name, handler) in self.worker_handlers.drain(..) {
            if handler.join().is_err() {
                error!("[Worker:{}] panicked", name);
            }
        }
        for (name, count) in self.op_counter.counts() {
            info!("[Ring:{}] {} items consumed", name, count);
        }
    }
}

impl Default for WorkerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
