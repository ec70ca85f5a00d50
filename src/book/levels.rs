use super::{OrderBookEngine, Quote, TopOfBook};
use crate::protocol::{Action, DeltaRecord, Side};
use bytemuck::{Pod, Zeroable};

/// Levels kept per side. Deltas addressing a deeper level are ignored.
pub const BOOK_DEPTH: usize = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Level {
    pub price: i32,
    pub qty: i32,
}

/// Level-indexed book. Slot 0 is the best level on each side, so BBO reads are O(1).
///
/// This is the representation the accelerator mirrors, so top-of-book inputs are taken
/// straight from slot 0 (including a stale price on an emptied slot).
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct LevelBook {
    bids: [Level; BOOK_DEPTH],
    asks: [Level; BOOK_DEPTH],
}

impl LevelBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bids(&self) -> &[Level; BOOK_DEPTH] {
        &self.bids
    }

    pub fn asks(&self) -> &[Level; BOOK_DEPTH] {
        &self.asks
    }

    pub fn level(&self, side: Side, index: usize) -> Option<Level> {
        match side {
            Side::Bid => self.bids.get(index).copied(),
            Side::Ask => self.asks.get(index).copied(),
        }
    }

    #[inline(always)]
    fn quote(level: &Level) -> Option<Quote> {
        if level.qty > 0 {
            Some(Quote {
                price: level.price,
                qty: level.qty,
            })
        } else {
            None
        }
    }
}

impl OrderBookEngine for LevelBook {
    #[inline(always)]
    fn apply(&mut self, delta: &DeltaRecord) {
        let levels = match delta.side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        let Some(slot) = levels.get_mut(delta.level as usize) else {
            return;
        };

        match delta.action {
            Action::Set => {
                slot.price = delta.price_ticks;
                slot.qty = delta.qty;
            }
            Action::Add | Action::Update => {
                // An empty slot takes the price of the order that opens it.
                if slot.qty == 0 && delta.qty > 0 {
                    slot.price = delta.price_ticks;
                }
                slot.qty = slot.qty.saturating_add(delta.qty);
            }
            Action::Remove => slot.qty = 0,
        }

        if slot.qty < 0 {
            slot.qty = 0;
        }
    }

    fn reset(&mut self) {
        self.bids = [Level::default(); BOOK_DEPTH];
        self.asks = [Level::default(); BOOK_DEPTH];
    }

    #[inline(always)]
    fn best_bid(&self) -> Option<Quote> {
        Self::quote(&self.bids[0])
    }

    #[inline(always)]
    fn best_ask(&self) -> Option<Quote> {
        Self::quote(&self.asks[0])
    }

    #[inline(always)]
    fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            bid_price: self.bids[0].price,
            bid_qty: self.bids[0].qty,
            ask_price: self.asks[0].price,
            ask_qty: self.asks[0].qty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(side: Side, action: Action, level: u16, price: i32, qty: i32) -> DeltaRecord {
        DeltaRecord::new(side, action, level, price, qty)
    }

    #[test]
    fn test_set_replaces_unconditionally() {
        let mut book = LevelBook::new();
        book.apply(&delta(Side::Bid, Action::Set, 0, 100, 10));
        book.apply(&delta(Side::Bid, Action::Set, 0, 99, 3));
        assert_eq!(book.best_bid(), Some(Quote { price: 99, qty: 3 }));
    }

    #[test]
    fn test_add_and_update_are_identical() {
        let mut a = LevelBook::new();
        let mut b = LevelBook::new();
        a.apply(&delta(Side::Ask, Action::Add, 1, 105, 10));
        a.apply(&delta(Side::Ask, Action::Add, 1, 105, -4));
        b.apply(&delta(Side::Ask, Action::Update, 1, 105, 10));
        b.apply(&delta(Side::Ask, Action::Update, 1, 105, -4));
        assert_eq!(a.level(Side::Ask, 1), b.level(Side::Ask, 1));
        assert_eq!(a.level(Side::Ask, 1), Some(Level { price: 105, qty: 6 }));
    }

    #[test]
    fn test_add_on_empty_slot_takes_price() {
        let mut book = LevelBook::new();
        book.apply(&delta(Side::Bid, Action::Add, 0, 100_000, 100));
        assert_eq!(
            book.best_bid(),
            Some(Quote {
                price: 100_000,
                qty: 100
            })
        );
        // Adding to a live slot keeps its price.
        book.apply(&delta(Side::Bid, Action::Add, 0, 99_000, 5));
        assert_eq!(book.best_bid().map(|q| q.price), Some(100_000));
    }

    #[test]
    fn test_remove_and_clamp() {
        let mut book = LevelBook::new();
        book.apply(&delta(Side::Bid, Action::Set, 0, 100, 10));
        book.apply(&delta(Side::Bid, Action::Update, 0, 100, -50));
        assert_eq!(book.level(Side::Bid, 0).map(|l| l.qty), Some(0));
        assert_eq!(book.best_bid(), None);

        book.apply(&delta(Side::Bid, Action::Set, 0, 100, -3));
        assert_eq!(book.level(Side::Bid, 0).map(|l| l.qty), Some(0));

        book.apply(&delta(Side::Ask, Action::Set, 2, 110, 7));
        book.apply(&delta(Side::Ask, Action::Remove, 2, 0, 0));
        assert_eq!(book.level(Side::Ask, 2), Some(Level { price: 110, qty: 0 }));
    }

    #[test]
    fn test_out_of_range_level_ignored() {
        let mut book = LevelBook::new();
        book.apply(&delta(Side::Bid, Action::Set, BOOK_DEPTH as u16, 100, 10));
        assert!(book.bids().iter().all(|l| *l == Level::default()));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut book = LevelBook::new();
        book.apply(&delta(Side::Bid, Action::Set, 0, 100, 10));
        book.apply(&delta(Side::Ask, Action::Set, 3, 101, 10));
        book.reset();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.top_of_book(), TopOfBook::default());
    }
}
