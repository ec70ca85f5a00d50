use crate::book::TopOfBook;
use crate::features::imbalance_q15;
use crate::protocol::Score;
use crate::reflex::ReflexAction;

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Decision {
    #[default]
    Hold = 0,
    Buy = 1,
    Sell = 2,
    Cancel = 3,
}

/// How a TAKE_LIQUIDITY reflex is turned into a direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TakeLiquidityPolicy {
    /// Always lift the offer.
    #[default]
    AlwaysBuy,
    /// Take the heavier side of the current top of book: a bid-heavy book sells into the
    /// bid, otherwise the offer is lifted.
    FromBook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arbiter {
    /// Whole score units; compared against the Q16.16 score.
    pub threshold: i32,
    pub take_liquidity: TakeLiquidityPolicy,
}

impl Default for Arbiter {
    fn default() -> Self {
        Self {
            threshold: 200,
            take_liquidity: TakeLiquidityPolicy::AlwaysBuy,
        }
    }
}

impl Arbiter {
    pub fn new(threshold: i32, take_liquidity: TakeLiquidityPolicy) -> Self {
        Self {
            threshold,
            take_liquidity,
        }
    }

    /// Reflex safety rules override the score. Without a score the neural lane abstains.
    ///
    /// `top` is the book the reflex was evaluated on, not the features sent in the reply.
    #[inline(always)]
    pub fn decide(&self, reflex: ReflexAction, score: Option<Score>, top: &TopOfBook) -> Decision {
        match reflex {
            ReflexAction::CancelAll => return Decision::Cancel,
            ReflexAction::TakeLiquidity => {
                return match self.take_liquidity {
                    TakeLiquidityPolicy::AlwaysBuy => Decision::Buy,
                    TakeLiquidityPolicy::FromBook if imbalance_q15(top.bid_qty, top.ask_qty) > 0 => {
                        Decision::Sell
                    }
                    TakeLiquidityPolicy::FromBook => Decision::Buy,
                };
            }
            ReflexAction::None | ReflexAction::WidenSpreads => {}
        }

        let Some(score) = score else {
            return Decision::Hold;
        };
        let limit = (self.threshold as i64) << Score::FRAC_BITS;
        let score = score.0 as i64;
        if score > limit {
            Decision::Buy
        } else if score < -limit {
            Decision::Sell
        } else {
            Decision::Hold
        }
    }
}
