use super::{OrderBookEngine, Quote, TopOfBook};
use crate::protocol::{Action, DeltaRecord, Side};
use fxhash::FxHashMap;

/// Price-keyed book with a cached BBO. Removing the cached best rescans that side.
/// The delta's `level` field is ignored.
#[derive(Debug, Default, Clone)]
pub struct PriceMapBook {
    bids: FxHashMap<i32, i32>,
    asks: FxHashMap<i32, i32>,
    best_bid: Option<i32>,
    best_ask: Option<i32>,
}

impl PriceMapBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole book. Entries without positive quantity are skipped.
    pub fn load_snapshot(&mut self, bids: &[(i32, i32)], asks: &[(i32, i32)]) {
        self.bids = bids.iter().copied().filter(|(_, q)| *q > 0).collect();
        self.asks = asks.iter().copied().filter(|(_, q)| *q > 0).collect();
        self.best_bid = self.bids.keys().copied().max();
        self.best_ask = self.asks.keys().copied().min();
    }

    pub fn qty_at(&self, side: Side, price: i32) -> i32 {
        self.side(side).get(&price).copied().unwrap_or(0)
    }

    pub fn levels(&self, side: Side) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.side(side).iter().map(|(p, q)| (*p, *q))
    }

    pub fn depth(&self, side: Side) -> usize {
        self.side(side).len()
    }

    fn side(&self, side: Side) -> &FxHashMap<i32, i32> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn store(&mut self, side: Side, price: i32, qty: i32) {
        if qty <= 0 {
            self.remove(side, price);
            return;
        }
        match side {
            Side::Bid => {
                self.bids.insert(price, qty);
                if self.best_bid.is_none_or(|best| price > best) {
                    self.best_bid = Some(price);
                }
            }
            Side::Ask => {
                self.asks.insert(price, qty);
                if self.best_ask.is_none_or(|best| price < best) {
                    self.best_ask = Some(price);
                }
            }
        }
    }

    fn remove(&mut self, side: Side, price: i32) {
        match side {
            Side::Bid => {
                if self.bids.remove(&price).is_some() && self.best_bid == Some(price) {
                    self.best_bid = self.bids.keys().copied().max();
                }
            }
            Side::Ask => {
                if self.asks.remove(&price).is_some() && self.best_ask == Some(price) {
                    self.best_ask = self.asks.keys().copied().min();
                }
            }
        }
    }

    fn quote(&self, side: Side, best: Option<i32>) -> Option<Quote> {
        best.map(|price| Quote {
            price,
            qty: self.qty_at(side, price),
        })
    }
}

impl OrderBookEngine for PriceMapBook {
    fn apply(&mut self, delta: &DeltaRecord) {
        let price = delta.price_ticks;
        match delta.action {
            Action::Set => self.store(delta.side, price, delta.qty),
            Action::Add | Action::Update => {
                let qty = self.qty_at(delta.side, price).saturating_add(delta.qty);
                self.store(delta.side, price, qty);
            }
            Action::Remove => self.remove(delta.side, price),
        }
    }

    fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.best_bid = None;
        self.best_ask = None;
    }

    fn best_bid(&self) -> Option<Quote> {
        self.quote(Side::Bid, self.best_bid)
    }

    fn best_ask(&self) -> Option<Quote> {
        self.quote(Side::Ask, self.best_ask)
    }

    fn top_of_book(&self) -> TopOfBook {
        let bid = self.best_bid().unwrap_or_default();
        let ask = self.best_ask().unwrap_or_default();
        TopOfBook {
            bid_price: bid.price,
            bid_qty: bid.qty,
            ask_price: ask.price,
            ask_qty: ask.qty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(side: Side, price: i32, qty: i32) -> DeltaRecord {
        DeltaRecord::new(side, Action::Add, 0, price, qty)
    }

    #[test]
    fn test_insert_improves_best() {
        let mut book = PriceMapBook::new();
        book.apply(&add(Side::Bid, 100, 5));
        book.apply(&add(Side::Bid, 98, 5));
        book.apply(&add(Side::Bid, 101, 1));
        assert_eq!(book.best_bid(), Some(Quote { price: 101, qty: 1 }));

        book.apply(&add(Side::Ask, 110, 5));
        book.apply(&add(Side::Ask, 108, 2));
        assert_eq!(book.best_ask(), Some(Quote { price: 108, qty: 2 }));
    }

    #[test]
    fn test_removing_best_rescans() {
        let mut book = PriceMapBook::new();
        book.apply(&add(Side::Bid, 100, 5));
        book.apply(&add(Side::Bid, 98, 5));
        book.apply(&add(Side::Bid, 101, 1));

        book.apply(&DeltaRecord::new(Side::Bid, Action::Remove, 0, 101, 0));
        assert_eq!(book.best_bid().map(|q| q.price), Some(100));

        book.apply(&DeltaRecord::new(Side::Bid, Action::Update, 0, 100, -5));
        assert_eq!(book.best_bid().map(|q| q.price), Some(98));
        assert_eq!(book.depth(Side::Bid), 1);

        book.apply(&DeltaRecord::new(Side::Bid, Action::Set, 0, 98, 0));
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_removing_non_best_keeps_cache() {
        let mut book = PriceMapBook::new();
        book.apply(&add(Side::Ask, 105, 5));
        book.apply(&add(Side::Ask, 107, 5));
        book.apply(&DeltaRecord::new(Side::Ask, Action::Remove, 0, 107, 0));
        assert_eq!(book.best_ask(), Some(Quote { price: 105, qty: 5 }));
    }

    #[test]
    fn test_load_snapshot() {
        let mut book = PriceMapBook::new();
        book.apply(&add(Side::Bid, 1, 1));
        book.load_snapshot(&[(100, 5), (99, 7), (101, 0)], &[(103, 2), (102, 9)]);
        assert_eq!(book.best_bid(), Some(Quote { price: 100, qty: 5 }));
        assert_eq!(book.best_ask(), Some(Quote { price: 102, qty: 9 }));
        assert_eq!(book.qty_at(Side::Bid, 1), 0);
        assert_eq!(book.spread(), Some(2));
    }

    #[test]
    fn test_reset() {
        let mut book = PriceMapBook::new();
        book.load_snapshot(&[(100, 5)], &[(101, 5)]);
        book.reset();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.top_of_book(), TopOfBook::default());
    }
}
