use assert_no_alloc::*;
use lob_reflex::accel::{EmulatedAccelerator, SharedAccelerator};
use lob_reflex::book::{LevelBook, OrderBookEngine};
use lob_reflex::clock;
use lob_reflex::config::{EngineConfig, ReplyKind};
use lob_reflex::protocol::{Action, DeltaRecord, Side, decode_header, encode_delta_batch};
use lob_reflex::record::{Inbound, Outbound};
use lob_reflex::{InventoryHandle, PipelineStats, Processor, Session, Stage, WorkerEngine};
use lob_reflex::ring::RingOptions;
use std::sync::Arc;

#[cfg(debug_assertions)]
#[global_allocator]
static ALLOC: AllocDisabler = AllocDisabler;

fn packet(seq: u32) -> Vec<u8> {
    encode_delta_batch(
        seq,
        seq as u64 * 10_000,
        seq == 0,
        &[
            DeltaRecord::new(Side::Bid, Action::Add, 0, 99_990, 7),
            DeltaRecord::new(Side::Ask, Action::Update, 0, 100_010, 3),
            DeltaRecord::new(Side::Bid, Action::Set, 1, 99_980, 40),
        ],
    )
}

fn inbound(seq: u32) -> Inbound {
    Inbound::new(clock::now_ns(), "127.0.0.1:9000".parse().unwrap(), &packet(seq))
}

fn processor(reply_kind: ReplyKind, accel: Option<SharedAccelerator>) -> Processor<LevelBook> {
    let config = EngineConfig {
        reply_kind,
        ..Default::default()
    };
    Processor::new(
        LevelBook::new(),
        &config,
        accel,
        InventoryHandle::default(),
        Arc::new(PipelineStats::new()),
    )
}

#[test]
fn test_book_apply_no_alloc() {
    let mut book = LevelBook::new();
    let delta = DeltaRecord::new(Side::Bid, Action::Add, 0, 100, 5);

    assert_no_alloc(|| {
        book.apply(&delta);
        let _ = book.top_of_book();
    });
}

#[test]
fn test_session_batch_no_alloc() {
    let mut session = Session::new(LevelBook::new());
    let bytes = packet(1);
    let header = decode_header(&bytes).unwrap();

    assert_no_alloc(|| {
        session.apply_batch(&header, &bytes);
    });
}

#[test]
fn test_processor_no_alloc() {
    let mut processor = processor(ReplyKind::FeaturesWithTiming, None);
    let warmup = inbound(0);
    let data = inbound(1);
    let mut replies = 0usize;
    processor.process(&warmup, &mut |_: &Outbound| replies += 1);

    assert_no_alloc(|| {
        processor.process(&data, &mut |_: &Outbound| replies += 1);
    });
    assert_eq!(replies, 2);
}

#[test]
fn test_processor_with_emulated_accelerator_no_alloc() {
    let accel = SharedAccelerator::new(EmulatedAccelerator::new());
    let mut processor = processor(ReplyKind::FeaturesWithScore, Some(accel));
    let warmup = inbound(0);
    let data = inbound(1);
    let mut replies = 0usize;
    processor.process(&warmup, &mut |_: &Outbound| replies += 1);

    assert_no_alloc(|| {
        processor.process(&data, &mut |_: &Outbound| replies += 1);
    });
    assert_eq!(replies, 2);
}

#[test]
fn test_ring_push_pop_no_alloc() {
    let engine = WorkerEngine::new();
    let (mut producer, mut consumer, _gauge) = engine
        .new_ring::<u64>(RingOptions {
            name: "no_alloc_ring",
            capacity: 64,
        })
        .unwrap();

    assert_no_alloc(|| {
        for i in 0..128u64 {
            producer.try_push(&i);
            consumer.try_pop_with(|v| *v);
        }
    });
}
