use crate::op_counter::OpCounter;
use crate::storage::ring_mmap::RingMmap;
use bytemuck::Pod;
use crossbeam_utils::{Backoff, CachePadded};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize};

pub struct RingOptions {
    pub name: &'static str,
    pub capacity: usize,
}

struct RingIndices {
    /// Next slot the producer writes. Only the producer stores it.
    head: CachePadded<AtomicUsize>,
    /// Next slot the consumer reads. Only the consumer stores it.
    tail: CachePadded<AtomicUsize>,
    capacity: usize,
}

impl RingIndices {
    #[inline(always)]
    fn len(&self) -> usize {
        let tail = self.tail.load(Acquire);
        self.head.load(Acquire).wrapping_sub(tail)
    }
}

pub struct RingProducer<T: Pod + Send> {
    storage: RingMmap,
    indices: Arc<RingIndices>,
    running: Arc<AtomicBool>,
    cached_tail: usize,
    _marker: PhantomData<T>,
}

pub struct RingConsumer<T: Pod + Send> {
    storage: RingMmap,
    indices: Arc<RingIndices>,
    cached_head: usize,
    op_count: Arc<AtomicU64>,
    _marker: PhantomData<T>,
}

/// Read-only view of a ring's fill level.
#[derive(Clone)]
pub struct RingGauge {
    name: &'static str,
    indices: Arc<RingIndices>,
}

/// Creates both ends of a ring. A blocking `push` gives up once `running` is cleared.
pub fn ring<T: Pod + Send>(
    options: RingOptions,
    running: Arc<AtomicBool>,
    op_counter: &OpCounter,
) -> Result<(RingProducer<T>, RingConsumer<T>, RingGauge), std::io::Error> {
    assert!(options.capacity > 0, "ring capacity must be greater than 0");
    let storage = RingMmap::new(options.capacity * size_of::<T>())?;
    let indices = Arc::new(RingIndices {
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
        capacity: options.capacity,
    });

    let consumer = RingConsumer {
        storage: storage.share(),
        indices: indices.clone(),
        cached_head: 0,
        op_count: op_counter.new_counter(options.name),
        _marker: PhantomData,
    };
    let gauge = RingGauge {
        name: options.name,
        indices: indices.clone(),
    };
    let producer = RingProducer {
        storage,
        indices,
        running,
        cached_tail: 0,
        _marker: PhantomData,
    };
    Ok((producer, consumer, gauge))
}

#[inline(always)]
fn slot_offset<T>(index: usize, capacity: usize) -> usize {
    (index % capacity) * size_of::<T>()
}

impl<T: Pod + Send> RingProducer<T> {
    /// Returns false if the ring is full.
    #[inline(always)]
    pub fn try_push(&mut self, item: &T) -> bool {
        let capacity = self.indices.capacity;
        let head = self.indices.head.load(Relaxed);
        if head.wrapping_sub(self.cached_tail) >= capacity {
            self.cached_tail = self.indices.tail.load(Acquire);
            if head.wrapping_sub(self.cached_tail) >= capacity {
                return false;
            }
        }
        self.storage.write(slot_offset::<T>(head, capacity), item);
        self.indices.head.store(head.wrapping_add(1), Release);
        true
    }

    /// Blocks while the ring is full. Returns false only if the engine stopped first.
    #[inline(always)]
    pub fn push(&mut self, item: &T) -> bool {
        let backoff = Backoff::new();
        loop {
            if self.try_push(item) {
                return true;
            }
            if !self.running.load(Relaxed) {
                return false;
            }
            backoff.snooze();
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.indices.capacity
    }
}

impl<T: Pod + Send> RingConsumer<T> {
    /// Hands the oldest item to `handler` in place and releases its slot afterwards.
    #[inline(always)]
    pub fn try_pop_with<R>(&mut self, handler: impl FnOnce(&T) -> R) -> Option<R> {
        let tail = self.indices.tail.load(Relaxed);
        if tail == self.cached_head {
            self.cached_head = self.indices.head.load(Acquire);
            if tail == self.cached_head {
                return None;
            }
        }
        let result = handler(
            self.storage
                .read(slot_offset::<T>(tail, self.indices.capacity)),
        );
        self.indices.tail.store(tail.wrapping_add(1), Release);
        self.op_count.fetch_add(1, Relaxed);
        Some(result)
    }

    #[inline(always)]
    pub fn try_pop(&mut self) -> Option<T> {
        self.try_pop_with(|item| *item)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RingGauge {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.indices.capacity
    }
}
