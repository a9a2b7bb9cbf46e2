//! State errors

use thiserror::Error;

use crate::{
    math::curve::CurveError,
    state::markets::{MarketId, MarketState, Side},
};

/// Everything a mutating or read operation can fail with. Every failure
/// aborts the whole operation; no variant is ever paired with a partial
/// ledger mutation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("Caller is not the market owner")]
    NotOwner,

    #[error("Market already initialized (state: {state})")]
    AlreadyInitialized { state: MarketState },

    #[error("Initial deposit must be nonzero")]
    ZeroDeposit,

    #[error("Market is not open for trading (state: {state})")]
    NotOpen { state: MarketState },

    #[error("Market already resolved")]
    AlreadyResolved,

    #[error("Market is not resolved")]
    NotResolved,

    #[error("Insufficient {side} balance: have {have}, need {need}")]
    InsufficientBalance { side: Side, have: u64, need: u64 },

    #[error("Computed output rounds to zero")]
    DustAmount,

    #[error("Slippage exceeded: output {out} below minimum {min_out}")]
    SlippageExceeded { out: u64, min_out: u64 },

    #[error(
        "Insufficient liquidity: reserve {reserve} cannot cover payout {payout}"
    )]
    InsufficientLiquidity { reserve: u64, payout: u64 },

    #[error("Payout of {amount} could not be credited")]
    PayoutFailed { amount: u64 },

    #[error("No winning shares to redeem")]
    NothingToRedeem,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Arithmetic underflow")]
    ArithmeticUnderflow,

    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },

    #[error("Market not found: {id}")]
    MarketNotFound { id: MarketId },

    #[error("Duplicate market id: {id}")]
    DuplicateMarket { id: MarketId },
}

impl From<CurveError> for Error {
    fn from(err: CurveError) -> Self {
        match err {
            CurveError::Overflow => Self::ArithmeticOverflow,
            CurveError::Dust => Self::DustAmount,
        }
    }
}
