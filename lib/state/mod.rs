use tokio::sync::broadcast;

use crate::types::Address;

pub mod collateral;
pub mod error;
pub mod events;
pub mod markets;

pub use collateral::CollateralLedger;
pub use error::Error;
pub use events::MarketEvent;
pub use markets::{Market, MarketId, MarketState, Markets, Side};

/// Events buffered per subscriber before the oldest are dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Root of all market and collateral state, plus the event fanout.
///
/// Every mutation flows through a method on this type, so wrapping one
/// instance in a lock gives each operation atomicity for free: an
/// operation either completes and emits its event, or leaves no trace.
#[derive(Debug)]
pub struct State {
    markets: Markets,
    collateral: CollateralLedger,
    events: broadcast::Sender<MarketEvent>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            markets: Markets::new(),
            collateral: CollateralLedger::new(),
            events,
        }
    }

    pub fn markets(&self) -> &Markets {
        &self.markets
    }

    pub fn collateral(&self) -> &CollateralLedger {
        &self.collateral
    }

    /// Subscribe to the event stream. A fresh receiver sees only events
    /// emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.events.subscribe()
    }

    /// Receivers that lag past the channel capacity lose the oldest
    /// events; emission never blocks or fails the operation behind it.
    fn emit(&self, event: MarketEvent) {
        self.events.send(event).ok();
    }

    pub fn market(&self, id: &MarketId) -> Result<&Market, Error> {
        self.markets.get(id).ok_or(Error::MarketNotFound { id: *id })
    }

    pub fn market_count(&self) -> usize {
        self.markets.count()
    }

    pub fn collateral_balance(&self, account: &Address) -> u64 {
        self.collateral.balance(account)
    }

    pub fn share_balance(
        &self,
        id: &MarketId,
        side: Side,
        account: &Address,
    ) -> Result<u64, Error> {
        Ok(self.market(id)?.share_balance(side, account))
    }

    pub fn spot_price(
        &self,
        id: &MarketId,
        side: Side,
    ) -> Result<u128, Error> {
        self.market(id)?.spot_price(side)
    }

    /// Credit `amount` to `account`'s free collateral. Returns the new
    /// balance.
    pub fn deposit(
        &mut self,
        account: Address,
        amount: u64,
    ) -> Result<u64, Error> {
        let balance = self.collateral.deposit(account, amount)?;
        tracing::info!(account = %account, amount, balance, "Collateral deposited");
        self.emit(MarketEvent::CollateralDeposited {
            account,
            amount,
            balance,
        });
        Ok(balance)
    }

    /// Debit `amount` from `account`'s free collateral. Returns the new
    /// balance.
    pub fn withdraw(
        &mut self,
        account: Address,
        amount: u64,
    ) -> Result<u64, Error> {
        let balance = self.collateral.withdraw(&account, amount)?;
        tracing::info!(account = %account, amount, balance, "Collateral withdrawn");
        self.emit(MarketEvent::CollateralWithdrawn {
            account,
            amount,
            balance,
        });
        Ok(balance)
    }

    /// Register a new market owned by `owner`, stamped with the current
    /// wall-clock time. The market starts Uninitialized.
    pub fn create_market(
        &mut self,
        owner: Address,
        question: String,
        description: String,
    ) -> Result<MarketId, Error> {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let id =
            self.markets.create(owner, question, description, created_at)?;
        tracing::info!(market = %id, owner = %owner, "Market created");
        self.emit(MarketEvent::MarketCreated { market: id, owner });
        Ok(id)
    }

    /// Seed a market's pools from the owner's free collateral and open
    /// trading. Returns the per-side pool seed.
    pub fn initialize_market(
        &mut self,
        id: MarketId,
        caller: Address,
        deposit: u64,
    ) -> Result<u64, Error> {
        let market = self
            .markets
            .get_mut(&id)
            .ok_or(Error::MarketNotFound { id })?;
        let pool_per_side =
            market.initialize(caller, deposit, &mut self.collateral)?;
        tracing::info!(
            market = %id, owner = %caller, deposit, pool_per_side,
            "Market initialized"
        );
        self.emit(MarketEvent::MarketInitialized {
            market: id,
            owner: caller,
            deposit,
            pool_per_side,
        });
        Ok(pool_per_side)
    }

    /// Spend `payment` collateral on `side` shares at the current pool
    /// ratio. Returns the shares received.
    pub fn buy_shares(
        &mut self,
        id: MarketId,
        buyer: Address,
        side: Side,
        payment: u64,
        min_shares_out: u64,
    ) -> Result<u64, Error> {
        let market = self
            .markets
            .get_mut(&id)
            .ok_or(Error::MarketNotFound { id })?;
        let shares_out =
            market.buy(buyer, side, payment, min_shares_out, &mut self.collateral)?;
        tracing::info!(
            market = %id, buyer = %buyer, %side, payment, shares_out,
            "Shares bought"
        );
        self.emit(MarketEvent::SharesBought {
            market: id,
            buyer,
            side,
            payment,
            shares_out,
        });
        Ok(shares_out)
    }

    /// Sell `shares_in` of `side` back to the market. Returns the
    /// collateral payout.
    pub fn sell_shares(
        &mut self,
        id: MarketId,
        seller: Address,
        side: Side,
        shares_in: u64,
        min_payment_out: u64,
    ) -> Result<u64, Error> {
        let market = self
            .markets
            .get_mut(&id)
            .ok_or(Error::MarketNotFound { id })?;
        let payout = market.sell(
            seller,
            side,
            shares_in,
            min_payment_out,
            &mut self.collateral,
        )?;
        tracing::info!(
            market = %id, seller = %seller, %side, shares_in, payout,
            "Shares sold"
        );
        self.emit(MarketEvent::SharesSold {
            market: id,
            seller,
            side,
            shares_in,
            payout,
        });
        Ok(payout)
    }

    /// Settle a market on `outcome`. Owner-only and final.
    pub fn resolve_market(
        &mut self,
        id: MarketId,
        caller: Address,
        outcome: Side,
    ) -> Result<(), Error> {
        let market = self
            .markets
            .get_mut(&id)
            .ok_or(Error::MarketNotFound { id })?;
        market.resolve(caller, outcome)?;
        tracing::info!(market = %id, %outcome, "Market resolved");
        self.emit(MarketEvent::MarketResolved {
            market: id,
            owner: caller,
            outcome,
        });
        Ok(())
    }

    /// Redeem the caller's winning shares for a pro-rata slice of the
    /// reserve. Returns the shares consumed and the payout.
    pub fn redeem_shares(
        &mut self,
        id: MarketId,
        redeemer: Address,
    ) -> Result<(u64, u64), Error> {
        let market = self
            .markets
            .get_mut(&id)
            .ok_or(Error::MarketNotFound { id })?;
        let (shares_in, payout) =
            market.redeem(redeemer, &mut self.collateral)?;
        tracing::info!(
            market = %id, redeemer = %redeemer, shares_in, payout,
            "Shares redeemed"
        );
        self.emit(MarketEvent::SharesRedeemed {
            market: id,
            redeemer,
            shares_in,
            payout,
        });
        Ok((shares_in, payout))
    }
}
