//! End-to-end tests driving the state facade the way the RPC layer does:
//! collateral in, a market's full life, collateral back out.

use predmarket::{
    state::{Error, MarketEvent, MarketState, Side, State},
    types::{ADDRESS_BYTES, Address},
};
use tokio::sync::broadcast::error::TryRecvError;

fn addr(byte: u8) -> Address {
    Address([byte; ADDRESS_BYTES])
}

fn create_market(state: &mut State, owner: Address) -> predmarket::state::MarketId {
    state
        .create_market(
            owner,
            "Will it rain tomorrow?".to_owned(),
            "Settles on the official station reading".to_owned(),
        )
        .unwrap()
}

/// A market's whole life: deposit, create, initialize, trade, resolve,
/// redeem, withdraw. Every unit of collateral returns to a free balance.
#[test]
fn test_market_lifecycle_end_to_end() {
    let alice = addr(0xA1);
    let bob = addr(0xB2);
    let mut state = State::new();

    state.deposit(alice, 100).unwrap();
    state.deposit(bob, 10).unwrap();
    let id = create_market(&mut state, alice);
    assert_eq!(state.market(&id).unwrap().state(), MarketState::Uninitialized);

    assert_eq!(state.initialize_market(id, alice, 100), Ok(50));
    assert_eq!(state.collateral_balance(&alice), 0);
    assert_eq!(state.market(&id).unwrap().collateral_reserve(), 100);

    assert_eq!(state.buy_shares(id, bob, Side::Yes, 10, 0), Ok(10));
    assert_eq!(state.share_balance(&id, Side::Yes, &bob), Ok(10));
    assert_eq!(state.market(&id).unwrap().collateral_reserve(), 110);

    state.resolve_market(id, alice, Side::Yes).unwrap();
    assert_eq!(state.market(&id).unwrap().outcome(), Some(Side::Yes));

    // reserve 110 over a winning supply of 60
    assert_eq!(state.redeem_shares(id, bob), Ok((10, 18)));
    assert_eq!(state.redeem_shares(id, alice), Ok((50, 92)));
    assert_eq!(state.market(&id).unwrap().collateral_reserve(), 0);

    // losing shares stay where they were, worth nothing
    assert_eq!(state.share_balance(&id, Side::No, &alice), Ok(50));
    assert_eq!(state.redeem_shares(id, alice), Err(Error::NothingToRedeem));

    assert_eq!(state.withdraw(bob, 18), Ok(0));
    assert_eq!(state.withdraw(alice, 92), Ok(0));
}

/// Free balances plus the reserve always sum to the collateral deposited.
#[test]
fn test_ledger_conservation_across_trades() {
    let alice = addr(0xA1);
    let bob = addr(0xB2);
    let carol = addr(0xC3);
    let mut state = State::new();

    state.deposit(alice, 1000).unwrap();
    state.deposit(bob, 300).unwrap();
    state.deposit(carol, 200).unwrap();
    let id = create_market(&mut state, alice);
    state.initialize_market(id, alice, 500).unwrap();

    assert_eq!(state.buy_shares(id, bob, Side::Yes, 100, 0), Ok(100));
    assert_eq!(state.buy_shares(id, carol, Side::No, 50, 0), Ok(35));
    assert_eq!(state.sell_shares(id, bob, Side::Yes, 40, 0), Ok(32));

    let reserve = state.market(&id).unwrap().collateral_reserve();
    assert_eq!(reserve, 618);
    let free = state.collateral_balance(&alice)
        + state.collateral_balance(&bob)
        + state.collateral_balance(&carol);
    assert_eq!(free + reserve, 1500);

    assert_eq!(state.collateral_balance(&bob), 232);
    assert_eq!(state.withdraw(carol, 150), Ok(0));
}

/// Trades against one market never touch another.
#[test]
fn test_markets_trade_independently() {
    let alice = addr(0xA1);
    let bob = addr(0xB2);
    let mut state = State::new();

    state.deposit(alice, 160).unwrap();
    state.deposit(bob, 20).unwrap();
    let first = create_market(&mut state, alice);
    let second = state
        .create_market(
            alice,
            "Will the launch slip?".to_owned(),
            "Per the published schedule".to_owned(),
        )
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(state.market_count(), 2);
    assert_eq!(state.markets().ids(), &[first, second]);

    state.initialize_market(first, alice, 100).unwrap();
    state.initialize_market(second, alice, 60).unwrap();
    state.buy_shares(first, bob, Side::Yes, 10, 0).unwrap();

    let untouched = state.market(&second).unwrap();
    assert_eq!(untouched.pool(Side::Yes), 30);
    assert_eq!(untouched.pool(Side::No), 30);
    assert_eq!(untouched.collateral_reserve(), 60);
    assert_eq!(
        state.spot_price(&second, Side::Yes),
        Ok(predmarket::math::curve::PRICE_SCALE)
    );
}

/// Lopsided buying can mint share value the reserve cannot back; the
/// reserve floor check is what stops a sell from draining other people's
/// collateral.
#[test]
fn test_share_value_divergence_blocks_payout() {
    let alice = addr(0xA1);
    let bob = addr(0xB2);
    let mut state = State::new();

    state.deposit(alice, 20).unwrap();
    state.deposit(bob, 200).unwrap();
    let id = create_market(&mut state, alice);
    state.initialize_market(id, alice, 20).unwrap();

    assert_eq!(state.buy_shares(id, bob, Side::No, 100, 0), Ok(100));
    assert_eq!(state.buy_shares(id, bob, Side::No, 100, 0), Ok(1100));
    assert_eq!(state.market(&id).unwrap().collateral_reserve(), 220);

    assert_eq!(
        state.sell_shares(id, alice, Side::Yes, 10, 0),
        Err(Error::InsufficientLiquidity {
            reserve: 220,
            payout: 1210
        })
    );
    // the failed sell left every balance alone
    assert_eq!(state.share_balance(&id, Side::Yes, &alice), Ok(10));
    assert_eq!(state.collateral_balance(&alice), 0);
}

/// Subscribers replay exactly the mutations that succeeded.
#[test]
fn test_event_stream_tracks_mutations() {
    let alice = addr(0xA1);
    let bob = addr(0xB2);
    let mut state = State::new();
    let mut rx = state.subscribe();

    state.deposit(alice, 100).unwrap();
    let id = create_market(&mut state, alice);
    state.initialize_market(id, alice, 100).unwrap();
    // a failed buy sits between two successes and leaves no event
    assert_eq!(
        state.buy_shares(id, bob, Side::Yes, 10, 0),
        Err(Error::InsufficientFunds { have: 0, need: 10 })
    );
    state.deposit(bob, 10).unwrap();
    state.buy_shares(id, bob, Side::Yes, 10, 0).unwrap();

    let expected = [
        MarketEvent::CollateralDeposited {
            account: alice,
            amount: 100,
            balance: 100,
        },
        MarketEvent::MarketCreated {
            market: id,
            owner: alice,
        },
        MarketEvent::MarketInitialized {
            market: id,
            owner: alice,
            deposit: 100,
            pool_per_side: 50,
        },
        MarketEvent::CollateralDeposited {
            account: bob,
            amount: 10,
            balance: 10,
        },
        MarketEvent::SharesBought {
            market: id,
            buyer: bob,
            side: Side::Yes,
            payment: 10,
            shares_out: 10,
        },
    ];
    for event in expected {
        assert_eq!(rx.try_recv(), Ok(event));
    }
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

/// A subscriber that stops draining loses old events instead of stalling
/// the writer.
#[test]
fn test_slow_subscriber_lags_without_blocking() {
    let alice = addr(0xA1);
    let mut state = State::new();
    let mut rx = state.subscribe();

    for _ in 0..300 {
        state.deposit(alice, 1).unwrap();
    }
    // the writer never waited on the full channel
    assert_eq!(state.collateral_balance(&alice), 300);

    assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(_))));
    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert_eq!(
        last,
        Some(MarketEvent::CollateralDeposited {
            account: alice,
            amount: 1,
            balance: 300,
        })
    );
}
