use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use thiserror::Error as ThisError;

use crate::math::curve;
use crate::state::collateral::CollateralLedger;
use crate::state::error::Error;
use crate::types::Address;

pub const MARKET_ID_BYTES: usize = 6;

#[derive(Debug, ThisError)]
pub enum MarketIdParseError {
    #[error("failed to decode market id hex")]
    Hex(#[from] hex::FromHexError),
    #[error(
        "wrong market id length: expected {MARKET_ID_BYTES} bytes, got {0}"
    )]
    WrongLength(usize),
}

/// Content-derived market identifier, rendered as hex.
#[serde_as]
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct MarketId(
    #[serde_as(as = "serde_with::hex::Hex")] pub [u8; MARKET_ID_BYTES],
);

impl MarketId {
    pub fn new(data: [u8; MARKET_ID_BYTES]) -> Self {
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8; MARKET_ID_BYTES] {
        &self.0
    }

    /// Generate a market ID from the immutable creation data. The creation
    /// counter feeds the hash, so identical content never collides.
    fn derive(
        owner: &Address,
        question: &str,
        description: &str,
        seq: u64,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(owner.as_bytes());
        hasher.update(question.as_bytes());
        hasher.update(description.as_bytes());
        hasher.update(&seq.to_le_bytes());
        let hash = hasher.finalize();
        let mut id_bytes = [0u8; MARKET_ID_BYTES];
        id_bytes.copy_from_slice(&hash.as_bytes()[0..MARKET_ID_BYTES]);
        Self(id_bytes)
    }
}

impl std::fmt::Display for MarketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for MarketId {
    type Err = MarketIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != MARKET_ID_BYTES {
            return Err(MarketIdParseError::WrongLength(bytes.len()));
        }
        let mut array = [0u8; MARKET_ID_BYTES];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }
}

/// One of the two outcomes a binary market can settle on.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "UPPERCASE")]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// The side whose pool sits opposite this one in the pricing ratio.
    pub fn other(self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display,
)]
pub enum MarketState {
    Uninitialized,
    Open,
    Resolved,
}

impl MarketState {
    pub fn can_transition_to(&self, new_state: MarketState) -> bool {
        match self {
            // Seeding the pools opens the market, exactly once
            MarketState::Uninitialized => new_state == MarketState::Open,
            // Resolution is the only exit from trading
            MarketState::Open => new_state == MarketState::Resolved,
            // Resolved is final
            MarketState::Resolved => false,
        }
    }

    pub fn allows_trading(&self) -> bool {
        matches!(self, MarketState::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MarketState::Resolved)
    }
}

/// A single binary-outcome market: per-side share pools, per-account share
/// balances, and the collateral reserve that funds payouts.
///
/// The pools count issued shares, not collateral custody. The reserve is the
/// ground truth for payouts; the only reconciliation between the two is the
/// reserve floor check before a payout leaves the market.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Market {
    id: MarketId,
    owner: Address,
    state: MarketState,
    outcome: Option<Side>,
    collateral_reserve: u64,
    yes_pool: u64,
    no_pool: u64,
    total_yes_supply: u64,
    total_no_supply: u64,
    yes_balances: HashMap<Address, u64>,
    no_balances: HashMap<Address, u64>,
    question: String,
    description: String,
    created_at: u64,
}

impl Market {
    pub(crate) fn new(
        id: MarketId,
        owner: Address,
        question: String,
        description: String,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            owner,
            state: MarketState::Uninitialized,
            outcome: None,
            collateral_reserve: 0,
            yes_pool: 0,
            no_pool: 0,
            total_yes_supply: 0,
            total_no_supply: 0,
            yes_balances: HashMap::new(),
            no_balances: HashMap::new(),
            question,
            description,
            created_at,
        }
    }

    pub fn id(&self) -> MarketId {
        self.id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn state(&self) -> MarketState {
        self.state
    }

    /// The winning side; `None` until resolution.
    pub fn outcome(&self) -> Option<Side> {
        self.outcome
    }

    pub fn collateral_reserve(&self) -> u64 {
        self.collateral_reserve
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Share-issuance counter driving the pricing ratio for `side`.
    pub fn pool(&self, side: Side) -> u64 {
        match side {
            Side::Yes => self.yes_pool,
            Side::No => self.no_pool,
        }
    }

    /// Sum of all outstanding balances on `side`.
    pub fn total_supply(&self, side: Side) -> u64 {
        match side {
            Side::Yes => self.total_yes_supply,
            Side::No => self.total_no_supply,
        }
    }

    pub fn share_balance(&self, side: Side, account: &Address) -> u64 {
        self.balances(side).get(account).copied().unwrap_or(0)
    }

    /// Scaled price of acquiring `side`: the opposite pool over this side's
    /// pool, at [`curve::PRICE_SCALE`]. Fails on a zero pool like the trade
    /// paths.
    pub fn spot_price(&self, side: Side) -> Result<u128, Error> {
        Ok(curve::scaled_price(self.pool(side), self.pool(side.other()))?)
    }

    fn balances(&self, side: Side) -> &HashMap<Address, u64> {
        match side {
            Side::Yes => &self.yes_balances,
            Side::No => &self.no_balances,
        }
    }

    fn set_pool(&mut self, side: Side, value: u64) {
        match side {
            Side::Yes => self.yes_pool = value,
            Side::No => self.no_pool = value,
        }
    }

    fn set_total_supply(&mut self, side: Side, value: u64) {
        match side {
            Side::Yes => self.total_yes_supply = value,
            Side::No => self.total_no_supply = value,
        }
    }

    /// Zeroed balances are removed, so equal ledgers compare equal.
    fn set_balance(&mut self, side: Side, account: Address, value: u64) {
        let balances = match side {
            Side::Yes => &mut self.yes_balances,
            Side::No => &mut self.no_balances,
        };
        if value > 0 {
            balances.insert(account, value);
        } else {
            balances.remove(&account);
        }
    }

    /// Seed the pools from the owner's first deposit and open trading.
    ///
    /// The deposit splits in half by integer division; an odd unit stays in
    /// the reserve without entering either pool. Returns the per-side seed.
    pub fn initialize(
        &mut self,
        caller: Address,
        deposit: u64,
        ledger: &mut CollateralLedger,
    ) -> Result<u64, Error> {
        if caller != self.owner {
            return Err(Error::NotOwner);
        }
        if !self.state.can_transition_to(MarketState::Open) {
            return Err(Error::AlreadyInitialized { state: self.state });
        }
        if deposit == 0 {
            return Err(Error::ZeroDeposit);
        }
        ledger.debit(&caller, deposit)?;
        let half = deposit / 2;
        self.collateral_reserve = deposit;
        self.yes_pool = half;
        self.no_pool = half;
        self.total_yes_supply = half;
        self.total_no_supply = half;
        self.set_balance(Side::Yes, caller, half);
        self.set_balance(Side::No, caller, half);
        self.state = MarketState::Open;
        Ok(half)
    }

    /// Buy `side` with `payment` collateral. Returns the shares received.
    ///
    /// Only the bought side's pool grows; the payment lands in the reserve,
    /// never in the opposite pool, so buying a side monotonically cheapens
    /// it against the other.
    pub fn buy(
        &mut self,
        caller: Address,
        side: Side,
        payment: u64,
        min_out: u64,
        ledger: &mut CollateralLedger,
    ) -> Result<u64, Error> {
        if !self.state.allows_trading() {
            return Err(Error::NotOpen { state: self.state });
        }
        let price_scaled =
            curve::scaled_price(self.pool(side), self.pool(side.other()))?;
        let shares_out = curve::buy_output(payment, price_scaled)?;
        if shares_out < min_out {
            return Err(Error::SlippageExceeded {
                out: shares_out,
                min_out,
            });
        }
        // Every fallible step precedes the first mutation
        let new_pool = self
            .pool(side)
            .checked_add(shares_out)
            .ok_or(Error::ArithmeticOverflow)?;
        let new_supply = self
            .total_supply(side)
            .checked_add(shares_out)
            .ok_or(Error::ArithmeticOverflow)?;
        let new_balance = self
            .share_balance(side, &caller)
            .checked_add(shares_out)
            .ok_or(Error::ArithmeticOverflow)?;
        let new_reserve = self
            .collateral_reserve
            .checked_add(payment)
            .ok_or(Error::ArithmeticOverflow)?;
        ledger.debit(&caller, payment)?;
        self.set_pool(side, new_pool);
        self.set_total_supply(side, new_supply);
        self.set_balance(side, caller, new_balance);
        self.collateral_reserve = new_reserve;
        Ok(shares_out)
    }

    /// Sell `shares_in` of `side` back to the market at the current ratio.
    /// Returns the collateral payout.
    ///
    /// All market mutations land before the payout credit; a rejected credit
    /// restores the pre-call state wholesale.
    pub fn sell(
        &mut self,
        caller: Address,
        side: Side,
        shares_in: u64,
        min_payment_out: u64,
        ledger: &mut CollateralLedger,
    ) -> Result<u64, Error> {
        if !self.state.allows_trading() {
            return Err(Error::NotOpen { state: self.state });
        }
        let have = self.share_balance(side, &caller);
        if shares_in > have {
            return Err(Error::InsufficientBalance {
                side,
                have,
                need: shares_in,
            });
        }
        let price_scaled =
            curve::scaled_price(self.pool(side), self.pool(side.other()))?;
        let payout = curve::sell_payout(shares_in, price_scaled)?;
        if payout > self.collateral_reserve {
            return Err(Error::InsufficientLiquidity {
                reserve: self.collateral_reserve,
                payout,
            });
        }
        if payout < min_payment_out {
            return Err(Error::SlippageExceeded {
                out: payout,
                min_out: min_payment_out,
            });
        }
        let new_pool = self
            .pool(side)
            .checked_sub(shares_in)
            .ok_or(Error::ArithmeticUnderflow)?;
        let new_supply = self
            .total_supply(side)
            .checked_sub(shares_in)
            .ok_or(Error::ArithmeticUnderflow)?;
        let new_balance = have
            .checked_sub(shares_in)
            .ok_or(Error::ArithmeticUnderflow)?;
        let new_reserve = self
            .collateral_reserve
            .checked_sub(payout)
            .ok_or(Error::ArithmeticUnderflow)?;
        let snapshot = self.clone();
        self.set_pool(side, new_pool);
        self.set_total_supply(side, new_supply);
        self.set_balance(side, caller, new_balance);
        self.collateral_reserve = new_reserve;
        if let Err(err) = ledger.credit(caller, payout) {
            *self = snapshot;
            return Err(err);
        }
        Ok(payout)
    }

    /// Fix the winning side. One-way; only the owner may call it.
    pub fn resolve(
        &mut self,
        caller: Address,
        outcome: Side,
    ) -> Result<(), Error> {
        if caller != self.owner {
            return Err(Error::NotOwner);
        }
        if self.state.is_terminal() {
            return Err(Error::AlreadyResolved);
        }
        if !self.state.can_transition_to(MarketState::Resolved) {
            return Err(Error::NotOpen { state: self.state });
        }
        self.outcome = Some(outcome);
        self.state = MarketState::Resolved;
        Ok(())
    }

    /// Convert the caller's winning-side balance into a pro-rata slice of
    /// the reserve. Returns the shares consumed and the payout.
    ///
    /// The payout is `floor(reserve * balance / winning_supply)` against the
    /// values at call time; each call settles independently. A zero payout
    /// still consumes the balance.
    pub fn redeem(
        &mut self,
        caller: Address,
        ledger: &mut CollateralLedger,
    ) -> Result<(u64, u64), Error> {
        if self.state != MarketState::Resolved {
            return Err(Error::NotResolved);
        }
        let Some(outcome) = self.outcome else {
            return Err(Error::NotResolved);
        };
        let balance = self.share_balance(outcome, &caller);
        if balance == 0 {
            return Err(Error::NothingToRedeem);
        }
        let winning_supply = self.total_supply(outcome);
        let payout = curve::redemption_payout(
            self.collateral_reserve,
            balance,
            winning_supply,
        )?;
        let new_supply = winning_supply
            .checked_sub(balance)
            .ok_or(Error::ArithmeticUnderflow)?;
        let new_reserve = self
            .collateral_reserve
            .checked_sub(payout)
            .ok_or(Error::ArithmeticUnderflow)?;
        let snapshot = self.clone();
        self.set_balance(outcome, caller, 0);
        self.set_total_supply(outcome, new_supply);
        self.collateral_reserve = new_reserve;
        if let Err(err) = ledger.credit(caller, payout) {
            *self = snapshot;
            return Err(err);
        }
        Ok((balance, payout))
    }
}

/// Insertion-ordered registry of market engines.
///
/// Owns every engine outright; mutation reaches an engine only through the
/// state facade.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Markets {
    markets: HashMap<MarketId, Market>,
    order: Vec<MarketId>,
    created: u64,
}

impl Markets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new market in state Uninitialized and return its id.
    pub fn create(
        &mut self,
        owner: Address,
        question: String,
        description: String,
        created_at: u64,
    ) -> Result<MarketId, Error> {
        let id =
            MarketId::derive(&owner, &question, &description, self.created);
        if self.markets.contains_key(&id) {
            return Err(Error::DuplicateMarket { id });
        }
        let market = Market::new(id, owner, question, description, created_at);
        self.markets.insert(id, market);
        self.order.push(id);
        self.created += 1;
        Ok(id)
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn get(&self, id: &MarketId) -> Option<&Market> {
        self.markets.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &MarketId) -> Option<&mut Market> {
        self.markets.get_mut(id)
    }

    /// Market at `index` in creation order.
    pub fn by_index(&self, index: usize) -> Option<&Market> {
        self.order.get(index).and_then(|id| self.markets.get(id))
    }

    /// Ids in creation order.
    pub fn ids(&self) -> &[MarketId] {
        &self.order
    }

    /// Markets in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.order.iter().filter_map(|id| self.markets.get(id))
    }
}
