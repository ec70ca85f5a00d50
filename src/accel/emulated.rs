use super::{AccelHandle, Accelerator};
use crate::book::LevelBook;
use crate::error::AccelError;
use crate::protocol::{FeatureSnapshot, MsgType, Score, decode_header};
use crate::session::Session;
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

/// Score words the device buffers before it stops accepting transfers.
pub const SCORE_FIFO_DEPTH: usize = 16;

/// Linear head over the feature vector. Weights are Q16.16 and inputs are lifted to Q16.16
/// first, so a weight of `1 << 16` passes a feature through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearModel {
    pub ofi: i32,
    pub imbalance: i32,
    pub burst: i32,
    pub volatility: i32,
    pub bias: i32,
}

impl Default for LinearModel {
    fn default() -> Self {
        Self {
            ofi: 1 << 16,
            imbalance: 0,
            burst: 0,
            volatility: 0,
            bias: 0,
        }
    }
}

impl LinearModel {
    #[inline(always)]
    pub fn score(&self, features: &FeatureSnapshot) -> Score {
        let inputs = [
            ((features.ofi as i128) << 16, self.ofi),
            ((features.imbalance as i128) << 1, self.imbalance),
            (features.burst as i128, self.burst),
            (features.volatility as i128, self.volatility),
        ];
        let acc: i128 = inputs
            .iter()
            .map(|&(input, weight)| input * weight as i128)
            .sum();
        let raw = (acc >> 16) + self.bias as i128;
        Score(raw.clamp(i32::MIN as i128, i32::MAX as i128) as i32)
    }
}

/// Software stand-in for the feature/inference device.
///
/// Scores queue in a bounded FIFO. Once it is full every submit fails with
/// [`AccelError::Busy`] until the host drains it.
pub struct EmulatedAccelerator {
    session: Session<LevelBook>,
    model: LinearModel,
    latency: Duration,
    pending: Option<(AccelHandle, FeatureSnapshot)>,
    scores: VecDeque<Score>,
    next_handle: u64,
}

impl EmulatedAccelerator {
    pub fn new() -> Self {
        Self {
            session: Session::new(LevelBook::new()),
            model: LinearModel::default(),
            latency: Duration::ZERO,
            pending: None,
            scores: VecDeque::with_capacity(SCORE_FIFO_DEPTH),
            next_handle: 0,
        }
    }

    pub fn with_model(mut self, model: LinearModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn session(&self) -> &Session<LevelBook> {
        &self.session
    }

    pub fn queued_scores(&self) -> usize {
        self.scores.len()
    }
}

impl Default for EmulatedAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accelerator for EmulatedAccelerator {
    fn submit(&mut self, input: &[u8]) -> Result<AccelHandle, AccelError> {
        if self.scores.len() >= SCORE_FIFO_DEPTH {
            return Err(AccelError::Busy);
        }
        // A transfer abandoned after a timeout is dropped here.
        self.pending = None;

        let header = decode_header(input).map_err(|e| AccelError::Device(e.to_string()))?;
        if header.kind() != Ok(MsgType::DeltaBatch) {
            return Err(AccelError::Device(format!(
                "unsupported message type {}",
                header.msg_type
            )));
        }

        let features = self.session.apply_batch(&header, input);
        self.scores.push_back(self.model.score(&features));

        let handle = AccelHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.pending = Some((handle, features));
        Ok(handle)
    }

    fn wait(&mut self, handle: AccelHandle, timeout: Duration) -> Result<FeatureSnapshot, AccelError> {
        let features = match self.pending.take() {
            Some((pending, features)) if pending == handle => features,
            _ => return Err(AccelError::Device(format!("no transfer for {handle:?}"))),
        };

        if self.latency > timeout {
            thread::sleep(timeout);
            return Err(AccelError::Timeout(timeout));
        }
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        Ok(features)
    }

    fn has_score_channel(&self) -> bool {
        true
    }

    fn drain_score(&mut self) -> Option<Score> {
        self.scores.pop_front()
    }
}
