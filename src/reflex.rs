use crate::book::OrderBookEngine;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReflexAction {
    #[default]
    None = 0,
    CancelAll = 1,
    TakeLiquidity = 2,
    WidenSpreads = 3,
}

impl ReflexAction {
    pub fn code(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflexEngine {
    pub spread_limit_ticks: i64,
    pub max_inventory: i64,
}

impl Default for ReflexEngine {
    fn default() -> Self {
        Self {
            spread_limit_ticks: 1000,
            max_inventory: 100,
        }
    }
}

impl ReflexEngine {
    pub fn new(spread_limit_ticks: i64, max_inventory: i64) -> Self {
        Self {
            spread_limit_ticks,
            max_inventory,
        }
    }

    /// First matching rule wins: crossed book, then spread blow-out, then inventory limit.
    #[inline(always)]
    pub fn evaluate<B: OrderBookEngine + ?Sized>(&self, book: &B, inventory: i64) -> ReflexAction {
        if book.is_crossed() {
            return ReflexAction::TakeLiquidity;
        }
        if book.spread().is_some_and(|spread| spread > self.spread_limit_ticks) {
            return ReflexAction::WidenSpreads;
        }
        if inventory.unsigned_abs() > self.max_inventory.unsigned_abs() {
            return ReflexAction::CancelAll;
        }
        ReflexAction::None
    }
}

/// Net position fed in from outside the pipeline (fills, risk system) and read per batch.
#[derive(Debug, Clone, Default)]
pub struct InventoryHandle(Arc<AtomicI64>);

impl InventoryHandle {
    pub fn new(initial: i64) -> Self {
        Self(Arc::new(AtomicI64::new(initial)))
    }

    #[inline(always)]
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, position: i64) {
        self.0.store(position, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{LevelBook, PriceMapBook};
    use crate::protocol::{Action, DeltaRecord, Side};

    fn book(bid: i32, ask: i32) -> LevelBook {
        let mut book = LevelBook::new();
        book.apply(&DeltaRecord::new(Side::Bid, Action::Set, 0, bid, 10));
        book.apply(&DeltaRecord::new(Side::Ask, Action::Set, 0, ask, 10));
        book
    }

    #[test]
    fn test_crossed_takes_liquidity() {
        let engine = ReflexEngine::default();
        assert_eq!(engine.evaluate(&book(101, 100), 0), ReflexAction::TakeLiquidity);
        assert_eq!(engine.evaluate(&book(100, 100), 0), ReflexAction::TakeLiquidity);
    }

    #[test]
    fn test_crossed_beats_inventory() {
        let engine = ReflexEngine::default();
        assert_eq!(engine.evaluate(&book(101, 100), 1_000), ReflexAction::TakeLiquidity);
    }

    #[test]
    fn test_wide_spread() {
        let engine = ReflexEngine::default();
        assert_eq!(engine.evaluate(&book(100, 1_101), 0), ReflexAction::WidenSpreads);
        assert_eq!(engine.evaluate(&book(100, 1_100), 0), ReflexAction::None);
        assert_eq!(engine.evaluate(&book(100, 1_101), 500), ReflexAction::WidenSpreads);
    }

    #[test]
    fn test_inventory_limit() {
        let engine = ReflexEngine::default();
        assert_eq!(engine.evaluate(&book(100, 101), 101), ReflexAction::CancelAll);
        assert_eq!(engine.evaluate(&book(100, 101), -101), ReflexAction::CancelAll);
        assert_eq!(engine.evaluate(&book(100, 101), 100), ReflexAction::None);
    }

    #[test]
    fn test_empty_book_is_none() {
        let engine = ReflexEngine::default();
        assert_eq!(engine.evaluate(&PriceMapBook::new(), 0), ReflexAction::None);
    }

    #[test]
    fn test_inventory_handle_shared() {
        let handle = InventoryHandle::new(5);
        let other = handle.clone();
        other.set(-2);
        assert_eq!(handle.get(), -2);
        handle.set(0);
        assert_eq!(other.get(), 0);
    }
}
