use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    Tai,
    MonotonicRaw,
    WallClock,
}

static SOURCE: LazyLock<ClockSource> = LazyLock::new(detect);

/// The source every `now_ns` call reads from.
pub fn source() -> ClockSource {
    *SOURCE
}

#[inline(always)]
pub fn now_ns() -> u64 {
    match *SOURCE {
        ClockSource::Tai => read_tai().unwrap_or_else(wall_clock_ns),
        ClockSource::MonotonicRaw => read_monotonic_raw().unwrap_or_else(wall_clock_ns),
        ClockSource::WallClock => wall_clock_ns(),
    }
}

// CLOCK_TAI, then CLOCK_MONOTONIC_RAW, then wall-clock time.
fn detect() -> ClockSource {
    if read_tai().is_some() {
        ClockSource::Tai
    } else if read_monotonic_raw().is_some() {
        ClockSource::MonotonicRaw
    } else {
        ClockSource::WallClock
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios"))]
#[inline(always)]
fn read(clock: libc::clockid_t) -> Option<u64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(clock, &mut ts) };
    if rc != 0 {
        return None;
    }
    Some(ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64)
}

#[cfg(target_os = "linux")]
#[inline(always)]
fn read_tai() -> Option<u64> {
    read(libc::CLOCK_TAI)
}

#[cfg(not(target_os = "linux"))]
#[inline(always)]
fn read_tai() -> Option<u64> {
    None
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios"))]
#[inline(always)]
fn read_monotonic_raw() -> Option<u64> {
    read(libc::CLOCK_MONOTONIC_RAW)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios")))]
#[inline(always)]
fn read_monotonic_raw() -> Option<u64> {
    None
}

fn wall_clock_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
