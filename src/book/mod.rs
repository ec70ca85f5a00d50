mod levels;
mod price_map;

pub use levels::{BOOK_DEPTH, Level, LevelBook};
pub use price_map::PriceMapBook;

use crate::protocol::DeltaRecord;

/// Best price on one side together with the quantity resting there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quote {
    pub price: i32,
    pub qty: i32,
}

/// Raw top-of-book inputs for the feature math. Absent sides read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopOfBook {
    pub bid_price: i32,
    pub bid_qty: i32,
    pub ask_price: i32,
    pub ask_qty: i32,
}

pub trait OrderBookEngine {
    /// Applies one delta. Quantities never go below zero afterwards.
    fn apply(&mut self, delta: &DeltaRecord);

    /// Clears both sides; no quote remains.
    fn reset(&mut self);

    fn best_bid(&self) -> Option<Quote>;

    fn best_ask(&self) -> Option<Quote>;

    fn top_of_book(&self) -> TopOfBook;

    /// Both sides quoted and the bid at or through the ask.
    fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price as i64 - bid.price as i64),
            _ => None,
        }
    }
}
