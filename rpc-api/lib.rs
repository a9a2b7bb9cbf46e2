//! RPC API

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use predmarket::{
    state::{MarketId, MarketState, Side},
    types::Address,
};
use serde::{Deserialize, Serialize};

/// One row of `list_markets`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MarketSummary {
    pub market_id: MarketId,
    pub question: String,
    pub state: MarketState,
    pub collateral_reserve: u64,
    pub yes_pool: u64,
    pub no_pool: u64,
    pub created_at: u64,
}

/// Full view of a single market.
///
/// Prices are scaled integers rendered as decimal strings; they are
/// absent while a pool is empty.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MarketDetails {
    pub market_id: MarketId,
    pub owner: Address,
    pub state: MarketState,
    pub outcome: Option<Side>,
    pub question: String,
    pub description: String,
    pub collateral_reserve: u64,
    pub yes_pool: u64,
    pub no_pool: u64,
    pub total_yes_supply: u64,
    pub total_no_supply: u64,
    pub yes_price: Option<String>,
    pub no_price: Option<String>,
    pub created_at: u64,
}

/// Result of redeeming winning shares.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RedemptionInfo {
    pub shares_redeemed: u64,
    pub payout: u64,
}

#[rpc(client, server)]
pub trait Rpc {
    /// Buy outcome shares at the current pool ratio.
    /// Returns the number of shares received.
    #[method(name = "buy_shares")]
    async fn buy_shares(
        &self,
        market_id: String,
        buyer: Address,
        side: Side,
        payment: u64,
        min_shares_out: u64,
    ) -> RpcResult<u64>;

    /// Free collateral balance of an account
    #[method(name = "collateral_balance")]
    async fn collateral_balance(&self, account: Address) -> RpcResult<u64>;

    /// Create a new market. Returns the market ID
    #[method(name = "create_market")]
    async fn create_market(
        &self,
        owner: Address,
        question: String,
        description: String,
    ) -> RpcResult<String>;

    /// Credit collateral to an account. Returns the new balance
    #[method(name = "deposit")]
    async fn deposit(&self, account: Address, amount: u64) -> RpcResult<u64>;

    /// View a single market
    #[method(name = "get_market")]
    async fn get_market(&self, market_id: String) -> RpcResult<MarketDetails>;

    /// Seed a market's pools from the owner's collateral and open trading.
    /// Returns the per-side pool seed.
    #[method(name = "initialize_market")]
    async fn initialize_market(
        &self,
        market_id: String,
        owner: Address,
        deposit: u64,
    ) -> RpcResult<u64>;

    /// List all markets in creation order
    #[method(name = "list_markets")]
    async fn list_markets(&self) -> RpcResult<Vec<MarketSummary>>;

    /// Number of markets ever created
    #[method(name = "market_count")]
    async fn market_count(&self) -> RpcResult<u64>;

    /// Redeem the caller's winning shares for a pro-rata slice of the
    /// market reserve
    #[method(name = "redeem_shares")]
    async fn redeem_shares(
        &self,
        market_id: String,
        redeemer: Address,
    ) -> RpcResult<RedemptionInfo>;

    /// Settle a market on the given outcome. Owner-only and final
    #[method(name = "resolve_market")]
    async fn resolve_market(
        &self,
        market_id: String,
        owner: Address,
        outcome: Side,
    ) -> RpcResult<()>;

    /// Sell outcome shares back to the market at the current pool ratio.
    /// Returns the collateral payout.
    #[method(name = "sell_shares")]
    async fn sell_shares(
        &self,
        market_id: String,
        seller: Address,
        side: Side,
        shares_in: u64,
        min_payment_out: u64,
    ) -> RpcResult<u64>;

    /// Outcome share balance of an account in a market
    #[method(name = "share_balance")]
    async fn share_balance(
        &self,
        market_id: String,
        side: Side,
        account: Address,
    ) -> RpcResult<u64>;

    /// Scaled price of acquiring a side, as a decimal string
    #[method(name = "spot_price")]
    async fn spot_price(
        &self,
        market_id: String,
        side: Side,
    ) -> RpcResult<String>;

    /// Stop the node
    #[method(name = "stop")]
    async fn stop(&self);

    /// Debit collateral from an account. Returns the new balance
    #[method(name = "withdraw")]
    async fn withdraw(&self, account: Address, amount: u64) -> RpcResult<u64>;
}
