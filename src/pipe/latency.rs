use crate::measure::LatencyMeasurer;
use crate::stage::{OutputCollector, Stage};
use bytemuck::Pod;
use spdlog::info;
use std::marker::PhantomData;

/// Wraps a stage and records how long each `process` call takes, downstream pushes included.
pub struct Latency<In, Out, S> {
    name: String,
    report_interval: usize,
    stage: S,
    measurer: LatencyMeasurer,
    count: usize,
    _phantom: PhantomData<(In, Out)>,
}

impl<In, Out, S> Latency<In, Out, S>
where
    In: Pod + Send,
    Out: Pod + Send,
    S: Stage<In, Out>,
{
    pub fn new(name: impl Into<String>, report_interval: usize, sample_rate: u64, stage: S) -> Self {
        assert!(report_interval > 0, "report_interval must be greater than 0");
        Latency {
            name: name.into(),
            report_interval,
            stage,
            measurer: LatencyMeasurer::new(sample_rate),
            count: 0,
            _phantom: PhantomData,
        }
    }

    pub fn inner(&self) -> &S {
        &self.stage
    }

    pub fn measurer(&self) -> &LatencyMeasurer {
        &self.measurer
    }
}

impl<In, Out, S> Stage<In, Out> for Latency<In, Out, S>
where
    In: Pod + Send,
    Out: Pod + Send,
    S: Stage<In, Out>,
{
    #[inline(always)]
    fn process<C>(&mut self, data: &In, collector: &mut C)
    where
        C: OutputCollector<Out>,
    {
        {
            let _guard = self.measurer.measure_with_guard();
            self.stage.process(data, collector);
        }
        self.count += 1;
        if self.count.is_multiple_of(self.report_interval) {
            info!("[{}] Latency: {}", self.name, self.measurer.format_stats());
        }
    }
}

/// `latency("Processor", 100_000, 100, stage)` logs every 100k packets, sampling 1 in 100.
pub fn latency<In, Out, S>(
    name: impl Into<String>,
    report_interval: usize,
    sample_rate: u64,
    stage: S,
) -> Latency<In, Out, S>
where
    In: Pod + Send,
    Out: Pod + Send,
    S: Stage<In, Out>,
{
    Latency::new(name, report_interval, sample_rate, stage)
}
