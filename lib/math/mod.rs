//! Market math.

pub mod curve;

pub use curve::{
    CurveError, PRICE_SCALE, buy_output, redemption_payout, scaled_price,
    sell_payout,
};
