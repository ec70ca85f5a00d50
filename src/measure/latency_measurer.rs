use hdrhistogram::Histogram;
use std::time::{Duration, Instant};

const MAX_TRACKABLE_NS: u64 = 1_000_000_000_000;

/// Statistics for latency measurements.
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    pub count: u64,
    /// Nanoseconds, as are the other latency fields.
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub p9999: u64,
}

pub struct LatencyMeasurerGuard<'a> {
    measurer: &'a mut LatencyMeasurer,
    start: Option<Instant>,
}

impl Drop for LatencyMeasurerGuard<'_> {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            self.measurer.record_nanos(start.elapsed().as_nanos() as u64);
        }
    }
}

/// A high-precision latency measurer using HdrHistogram.
///
/// Only every `sample_rate`-th call is recorded, which keeps the overhead off the packet path.
pub struct LatencyMeasurer {
    histogram: Histogram<u64>,
    sample_rate: u64,
    step: u64,
}

impl LatencyMeasurer {
    pub fn new(sample_rate: u64) -> Self {
        assert!(sample_rate > 0, "sample_rate must be positive");
        // 1ns to 1,000s, 3 significant figures.
        let histogram = match Histogram::<u64>::new_with_bounds(1, MAX_TRACKABLE_NS, 3) {
            Ok(histogram) => histogram,
            Err(e) => unreachable!("constant histogram bounds rejected: {e}"),
        };
        Self {
            histogram,
            sample_rate,
            step: 0,
        }
    }

    #[inline(always)]
    fn should_sample(&mut self) -> bool {
        self.step += 1;
        self.step.is_multiple_of(self.sample_rate)
    }

    pub fn measure(&mut self, duration: Duration) {
        if self.should_sample() {
            self.record_nanos(duration.as_nanos() as u64);
        }
    }

    /// Records the span between two clock readings in nanoseconds, subject to sampling.
    pub fn measure_span(&mut self, start_ns: u64, end_ns: u64) {
        if self.should_sample() {
            self.record_nanos(end_ns.saturating_sub(start_ns));
        }
    }

    fn record_nanos(&mut self, nanos: u64) {
        self.histogram
            .saturating_record(nanos.clamp(1, MAX_TRACKABLE_NS));
    }

    pub fn measure_with_guard(&mut self) -> LatencyMeasurerGuard<'_> {
        let start = self.should_sample().then(Instant::now);
        LatencyMeasurerGuard {
            measurer: self,
            start,
        }
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
    }

    pub fn get_stats(&self) -> LatencyStats {
        let count = self.histogram.len();
        if count == 0 {
            return LatencyStats::default();
        }

        LatencyStats {
            count,
            min: self.histogram.min(),
            max: self.histogram.max(),
            mean: self.histogram.mean(),
            p50: self.histogram.value_at_quantile(0.5),
            p90: self.histogram.value_at_quantile(0.9),
            p99: self.histogram.value_at_quantile(0.99),
            p999: self.histogram.value_at_quantile(0.999),
            p9999: self.histogram.value_at_quantile(0.9999),
        }
    }

    pub fn format_stats(&self) -> String {
        let stats = self.get_stats();
        if stats.count == 0 {
            return "No stats collected yet".into();
        }

        format!(
            "\tn={},\tmin={},\tmax={},\tmean={},\tp50={},\tp90={},\tp99={},\tp999={},\tp9999={}",
            stats.count,
            format_duration(stats.min as f64),
            format_duration(stats.max as f64),
            format_duration(stats.mean),
            format_duration(stats.p50 as f64),
            format_duration(stats.p90 as f64),
            format_duration(stats.p99 as f64),
            format_duration(stats.p999 as f64),
            format_duration(stats.p9999 as f64),
        )
    }
}

pub(crate) fn format_duration(nanos: f64) -> String {
    if nanos < 1000.0 {
        format!("{:.1}ns", nanos)
    } else if nanos < 1_000_000.0 {
        format!("{:.1}us", nanos / 1000.0)
    } else if nanos < 1_000_000_000.0 {
        format!("{:.1}ms", nanos / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos / 1_000_000_000.0)
    }
}
