mod latency;
mod progress;

pub use latency::{Latency, latency};
pub use progress::{Progress, progress};
