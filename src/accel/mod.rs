mod emulated;

pub use emulated::{EmulatedAccelerator, LinearModel, SCORE_FIFO_DEPTH};

use crate::clock;
use crate::error::AccelError;
use crate::protocol::{FeatureSnapshot, Score};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccelHandle(pub u64);

pub trait Accelerator: Send {
    fn submit(&mut self, input: &[u8]) -> Result<AccelHandle, AccelError>;

    /// Blocks until the feature transfer for `handle` completes or `timeout` expires.
    /// A timed-out transfer is not retried; device-level recovery owns it from then on.
    fn wait(&mut self, handle: AccelHandle, timeout: Duration) -> Result<FeatureSnapshot, AccelError>;

    fn has_score_channel(&self) -> bool;

    /// Pulls one score word out of the device. Must run after every transfer, consumed or
    /// not, or the device's score buffer fills and stalls the whole feature pipeline.
    fn drain_score(&mut self) -> Option<Score>;
}

/// What one offload attempt produced. Timestamps are zero for stages that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffloadOutcome {
    pub features: Result<FeatureSnapshot, AccelError>,
    /// Only present when the feature transfer succeeded.
    pub score: Option<Score>,
    /// A score word was pulled from the device, whether or not it was used.
    pub score_drained: bool,
    pub t_start_ns: u64,
    pub t_feature_done_ns: u64,
    pub t_score_done_ns: u64,
}

/// Cloneable handle to the single accelerator. All access goes through one lock.
#[derive(Clone)]
pub struct SharedAccelerator {
    inner: Arc<Mutex<Box<dyn Accelerator>>>,
}

impl SharedAccelerator {
    pub fn new(accelerator: impl Accelerator + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(accelerator))),
        }
    }

    /// Runs one submit / wait / drain cycle under the accelerator lock.
    pub fn offload(&self, input: &[u8], timeout: Duration) -> OffloadOutcome {
        // A panic inside a previous transaction leaves device state to device-level recovery.
        let mut device = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let t_start_ns = clock::now_ns();
        let features = device
            .submit(input)
            .and_then(|handle| device.wait(handle, timeout));
        let t_feature_done_ns = if features.is_ok() { clock::now_ns() } else { 0 };

        let mut score = None;
        let mut score_drained = false;
        let mut t_score_done_ns = 0;
        if device.has_score_channel() {
            let drained = device.drain_score();
            score_drained = drained.is_some();
            if score_drained {
                t_score_done_ns = clock::now_ns();
            }
            if features.is_ok() {
                score = drained;
            }
        }

        OffloadOutcome {
            features,
            score,
            score_drained,
            t_start_ns,
            t_feature_done_ns,
            t_score_done_ns,
        }
    }

    /// Direct access for device-level maintenance. Holds the transaction lock.
    pub fn with<R>(&self, handler: impl FnOnce(&mut dyn Accelerator) -> R) -> R {
        let mut device = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        handler(device.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted device: replays one outcome per submit and counts drains.
    struct Scripted {
        outcomes: VecDeque<Result<FeatureSnapshot, AccelError>>,
        scores: bool,
        drains: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<FeatureSnapshot, AccelError>>, scores: bool) -> (Self, Arc<AtomicUsize>) {
            let drains = Arc::new(AtomicUsize::new(0));
            let device = Self {
                outcomes: outcomes.into(),
                scores,
                drains: drains.clone(),
            };
            (device, drains)
        }
    }

    impl Accelerator for Scripted {
        fn submit(&mut self, _input: &[u8]) -> Result<AccelHandle, AccelError> {
            Ok(AccelHandle(1))
        }

        fn wait(&mut self, _h: AccelHandle, _t: Duration) -> Result<FeatureSnapshot, AccelError> {
            self.outcomes.pop_front().unwrap_or(Err(AccelError::Unavailable))
        }

        fn has_score_channel(&self) -> bool {
            self.scores
        }

        fn drain_score(&mut self) -> Option<Score> {
            self.drains.fetch_add(1, Ordering::Relaxed);
            Some(Score::from_units(7))
        }
    }

    #[test]
    fn test_drain_runs_on_success_and_failure() {
        let (device, drains) = Scripted::new(
            vec![
                Ok(FeatureSnapshot::default()),
                Err(AccelError::Timeout(Duration::from_micros(5))),
                Err(AccelError::Device("dma halted".into())),
            ],
            true,
        );
        let shared = SharedAccelerator::new(device);

        let ok = shared.offload(&[], Duration::from_millis(1));
        assert!(ok.features.is_ok());
        assert_eq!(ok.score, Some(Score::from_units(7)));
        assert!(ok.t_feature_done_ns >= ok.t_start_ns);

        let timed_out = shared.offload(&[], Duration::from_millis(1));
        assert!(matches!(timed_out.features, Err(AccelError::Timeout(_))));
        assert_eq!(timed_out.score, None);
        assert!(timed_out.score_drained);
        assert_eq!(timed_out.t_feature_done_ns, 0);

        let failed = shared.offload(&[], Duration::from_millis(1));
        assert!(matches!(failed.features, Err(AccelError::Device(_))));

        assert_eq!(drains.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_no_score_channel_means_no_drain() {
        let (device, drains) = Scripted::new(vec![Ok(FeatureSnapshot::default())], false);
        let shared = SharedAccelerator::new(device);
        let outcome = shared.offload(&[], Duration::from_millis(1));
        assert!(outcome.features.is_ok());
        assert_eq!(outcome.score, None);
        assert!(!outcome.score_drained);
        assert_eq!(outcome.t_score_done_ns, 0);
        assert_eq!(drains.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_offload_is_single_flight_across_threads() {
        struct Exclusive(Arc<AtomicUsize>);

        impl Accelerator for Exclusive {
            fn submit(&mut self, _input: &[u8]) -> Result<AccelHandle, AccelError> {
                assert_eq!(self.0.fetch_add(1, Ordering::SeqCst), 0, "overlapping transactions");
                Ok(AccelHandle(0))
            }

            fn wait(&mut self, _h: AccelHandle, _t: Duration) -> Result<FeatureSnapshot, AccelError> {
                std::thread::sleep(Duration::from_micros(200));
                self.0.fetch_sub(1, Ordering::SeqCst);
                Ok(FeatureSnapshot::default())
            }

            fn has_score_channel(&self) -> bool {
                false
            }

            fn drain_score(&mut self) -> Option<Score> {
                None
            }
        }

        let shared = SharedAccelerator::new(Exclusive(Arc::new(AtomicUsize::new(0))));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        assert!(shared.offload(&[], Duration::from_millis(5)).features.is_ok());
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
    }
}
