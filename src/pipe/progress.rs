use crate::stage::{OutputCollector, Stage};
use bytemuck::Pod;
use spdlog::info;
use std::marker::PhantomData;
use std::time::Instant;

/// Pass-through stage that logs throughput every `interval` records.
pub struct Progress<T> {
    name: String,
    interval: usize,
    count: usize,
    last_instant: Instant,
    start_instant: Instant,
    _phantom: PhantomData<T>,
}

impl<T: Pod + Send> Progress<T> {
    pub fn new(name: impl Into<String>, interval: usize) -> Self {
        assert!(interval > 0, "interval must be greater than 0");
        let now = Instant::now();
        Self {
            name: name.into(),
            interval,
            count: 0,
            last_instant: now,
            start_instant: now,
            _phantom: PhantomData,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl<T: Pod + Send> Stage<T, T> for Progress<T> {
    #[inline(always)]
    fn process<C>(&mut self, data: &T, collector: &mut C)
    where
        C: OutputCollector<T>,
    {
        self.count += 1;
        if self.count.is_multiple_of(self.interval) {
            let now = Instant::now();
            let rate = self.interval as f64 / now.duration_since(self.last_instant).as_secs_f64();
            let avg = self.count as f64 / now.duration_since(self.start_instant).as_secs_f64();
            info!(
                "[{}] Processed {} packets, Rate: {} pkt/s, Avg: {} pkt/s",
                self.name,
                format_count(self.count as f64),
                format_count(rate),
                format_count(avg)
            );
            self.last_instant = now;
        }
        collector.push(data);
    }
}

pub fn progress<T: Pod + Send>(name: impl Into<String>, interval: usize) -> Progress<T> {
    Progress::new(name, interval)
}

pub(crate) fn format_count(val: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "t"), (1e9, "b"), (1e6, "m"), (1e3, "k")];
    for (scale, suffix) in UNITS {
        if val >= scale {
            return format!("{:.2}{}", val / scale, suffix);
        }
    }
    if val == val.floor() {
        format!("{:.0}", val)
    } else {
        format!("{:.2}", val)
    }
}
