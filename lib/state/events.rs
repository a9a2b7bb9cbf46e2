//! Notification events emitted by the state facade.

use serde::{Deserialize, Serialize};

use crate::{
    state::markets::{MarketId, Side},
    types::Address,
};

/// One event per successful mutating operation, carrying the acting account
/// and the quantitative result. Failed operations emit nothing.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum MarketEvent {
    MarketCreated {
        market: MarketId,
        owner: Address,
    },
    MarketInitialized {
        market: MarketId,
        owner: Address,
        deposit: u64,
        pool_per_side: u64,
    },
    SharesBought {
        market: MarketId,
        buyer: Address,
        side: Side,
        payment: u64,
        shares_out: u64,
    },
    SharesSold {
        market: MarketId,
        seller: Address,
        side: Side,
        shares_in: u64,
        payout: u64,
    },
    MarketResolved {
        market: MarketId,
        owner: Address,
        outcome: Side,
    },
    SharesRedeemed {
        market: MarketId,
        redeemer: Address,
        shares_in: u64,
        payout: u64,
    },
    CollateralDeposited {
        account: Address,
        amount: u64,
        balance: u64,
    },
    CollateralWithdrawn {
        account: Address,
        amount: u64,
        balance: u64,
    },
}
