//! End-to-end ledger behavior against the in-memory store

use market_store::{
    CatalogRepository, MemoryStore, NewPlayer, NewUser, PositionFilter, TransactionFilter,
    UserRepository,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use trading_ledger::{LedgerConfig, LedgerError, TradingLedger};

struct Market {
    store: Arc<MemoryStore>,
    ledger: TradingLedger,
    user_id: i64,
    player_id: i64,
}

async fn market(config: LedgerConfig) -> Market {
    let store = Arc::new(MemoryStore::new());
    let user = store
        .create_user(&NewUser {
            name: "Test Trader".to_string(),
            handle: "trader".to_string(),
            email: "trader@example.com".to_string(),
            password_hash: "hash".to_string(),
            currency: Decimal::from(10000),
        })
        .await
        .unwrap();
    let player = store
        .insert_player(&NewPlayer {
            name: "Star Forward".to_string(),
            slug: "star-forward".to_string(),
            value: Decimal::from(50),
            capacity: 10,
        })
        .await;

    let ledger = TradingLedger::new(store.clone(), store.clone(), store.clone(), config);
    Market { store, ledger, user_id: user.id, player_id: player.id }
}

async fn balance(m: &Market) -> Decimal {
    m.store.get_user(m.user_id).await.unwrap().unwrap().currency
}

async fn remaining(m: &Market) -> i64 {
    m.store.get_player(m.player_id).await.unwrap().unwrap().remaining_capacity
}

#[tokio::test]
async fn test_buy_beyond_balance_fails_without_side_effects() {
    let m = market(LedgerConfig::default()).await;

    let err = m.ledger.buy(m.user_id, m.player_id, 300).await.unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
    assert_eq!(balance(&m).await, Decimal::from(10000));
    assert_eq!(m.store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_full_trading_day() {
    let m = market(LedgerConfig::default()).await;

    // Buy 10 at 50
    let buy = m.ledger.buy(m.user_id, m.player_id, 10).await.unwrap();
    assert_eq!(buy.price, Decimal::from(50));
    assert_eq!(balance(&m).await, Decimal::from(9500));
    assert_eq!(remaining(&m).await, 10);
    assert_eq!(m.store.transaction_count().await, 1);

    let position = m.ledger.get_position(m.user_id, m.player_id).await.unwrap().unwrap();
    assert_eq!(position.quantity, 10);
    assert_eq!(position.average_cost, Decimal::from(50));

    // Oversell
    let err = m.ledger.sell(m.user_id, m.player_id, 15).await.unwrap_err();
    assert!(matches!(err, LedgerError::QuantityExceedsPosition { requested: 15, held: 10 }));
    assert_eq!(balance(&m).await, Decimal::from(9500));

    // Price moves, sell everything
    m.store.set_value(m.player_id, Decimal::from(55)).await;
    assert_eq!(m.ledger.get_value(m.player_id).await.unwrap(), Decimal::from(55));

    let proceeds = m.ledger.sell(m.user_id, m.player_id, 10).await.unwrap();
    assert_eq!(proceeds, Decimal::from(550));
    assert_eq!(balance(&m).await, Decimal::from(10050));
    assert_eq!(remaining(&m).await, 20);
    assert!(m.ledger.get_position(m.user_id, m.player_id).await.unwrap().is_none());

    let history = m.ledger.get_transactions(TransactionFilter::User(m.user_id)).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_sell_without_position() {
    let m = market(LedgerConfig::default()).await;

    let err = m.ledger.sell(m.user_id, m.player_id, 1).await.unwrap_err();

    assert_eq!(err.code(), "NO_POSITION");
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_non_positive_quantity_is_rejected_before_the_store() {
    let m = market(LedgerConfig::default()).await;

    let buy = m.ledger.buy(m.user_id, m.player_id, 0).await.unwrap_err();
    let sell = m.ledger.sell(m.user_id, m.player_id, -3).await.unwrap_err();

    assert_eq!(buy.code(), "QUANTITY_INVALID");
    assert_eq!(sell.code(), "QUANTITY_INVALID");
    assert_eq!(m.store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_unknown_user_and_player() {
    let m = market(LedgerConfig::default()).await;

    let no_user = m.ledger.buy(999, m.player_id, 1).await.unwrap_err();
    let no_player = m.ledger.buy(m.user_id, 999, 1).await.unwrap_err();

    assert_eq!(no_user.code(), "USER_NOT_FOUND");
    assert_eq!(no_player.code(), "PLAYER_NOT_FOUND");
    assert!(matches!(m.ledger.get_value(999).await, Err(LedgerError::PlayerNotFound { .. })));
}

#[tokio::test]
async fn test_buy_over_remaining_capacity() {
    let m = market(LedgerConfig::default()).await;

    let err = m.ledger.buy(m.user_id, m.player_id, 11).await.unwrap_err();

    assert!(matches!(err, LedgerError::CapacityExceeded { requested: 11, remaining: 10 }));
}

#[tokio::test]
async fn test_reserved_capacity_follows_holdings() {
    let m = market(LedgerConfig { reserve_capacity_on_buy: true }).await;

    m.ledger.buy(m.user_id, m.player_id, 6).await.unwrap();
    assert_eq!(remaining(&m).await, 4);

    let err = m.ledger.buy(m.user_id, m.player_id, 5).await.unwrap_err();
    assert_eq!(err.code(), "CAPACITY_EXCEEDED");

    m.ledger.sell(m.user_id, m.player_id, 6).await.unwrap();
    assert_eq!(remaining(&m).await, 10);
}

#[tokio::test]
async fn test_average_cost_across_price_changes() {
    let m = market(LedgerConfig::default()).await;

    m.ledger.buy(m.user_id, m.player_id, 4).await.unwrap();
    m.store.set_value(m.player_id, Decimal::from(60)).await;
    m.ledger.buy(m.user_id, m.player_id, 6).await.unwrap();

    // (4*50 + 6*60) / 10
    let position = m.ledger.get_position(m.user_id, m.player_id).await.unwrap().unwrap();
    assert_eq!(position.quantity, 10);
    assert_eq!(position.average_cost, Decimal::from(56));

    m.ledger.sell(m.user_id, m.player_id, 5).await.unwrap();
    let position = m.ledger.get_position(m.user_id, m.player_id).await.unwrap().unwrap();
    assert_eq!(position.quantity, 5);
    assert_eq!(position.average_cost, Decimal::from(56));
}

#[tokio::test]
async fn test_balance_matches_replay_after_mixed_trading() {
    let m = market(LedgerConfig::default()).await;
    let second = m
        .store
        .insert_player(&NewPlayer {
            name: "Bench Center".to_string(),
            slug: "bench-center".to_string(),
            value: Decimal::new(1225, 2),
            capacity: 10,
        })
        .await;

    let steps: [(i64, bool, i64, i64); 8] = [
        (m.player_id, true, 3, 50),
        (second.id, true, 8, 12),
        (m.player_id, true, 2, 47),
        (second.id, false, 5, 15),
        (m.player_id, false, 4, 58),
        (second.id, true, 1, 9),
        (m.player_id, false, 1, 61),
        (second.id, false, 4, 20),
    ];

    let mut starting_cash = Decimal::from(10000);
    for (player_id, is_buy, quantity, price) in steps {
        m.store.set_value(player_id, Decimal::from(price)).await;
        if is_buy {
            let tx = m.ledger.buy(m.user_id, player_id, quantity).await.unwrap();
            starting_cash -= tx.price * Decimal::from(quantity);
        } else {
            starting_cash += m.ledger.sell(m.user_id, player_id, quantity).await.unwrap();
        }
    }

    assert_eq!(balance(&m).await, starting_cash);

    let audit = m.ledger.audit_user(m.user_id, Decimal::from(10000)).await.unwrap();
    assert!(audit.is_consistent());
    assert_eq!(audit.expected_balance, starting_cash);
    assert!(audit.stored_positions.is_empty());
    assert!(m.ledger.get_positions(PositionFilter::User(m.user_id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_player_lookups() {
    let m = market(LedgerConfig::default()).await;

    let by_slug = m.ledger.get_player_by_slug("star-forward").await.unwrap().unwrap();
    assert_eq!(by_slug.id, m.player_id);
    assert!(m.ledger.get_player_by_slug("missing").await.unwrap().is_none());

    let players = m.ledger.get_players(&[999, m.player_id]).await.unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].value, Decimal::from(50));

    let err = m.ledger.get_player(999).await.unwrap_err();
    assert_eq!(err.code(), "PLAYER_NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buys_never_overspend() {
    let m = market(LedgerConfig::default()).await;

    // 250 single-unit buys at 50 against a 10000 balance: exactly 200 can settle
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..250 {
        let ledger = m.ledger.clone();
        let (user_id, player_id) = (m.user_id, m.player_id);
        tasks.spawn(async move { ledger.buy(user_id, player_id, 1).await });
    }

    let mut filled = 0;
    let mut refused = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => filled += 1,
            Err(e) => {
                assert_eq!(e.code(), "INSUFFICIENT_FUNDS");
                refused += 1;
            }
        }
    }

    assert_eq!(filled, 200);
    assert_eq!(refused, 50);
    assert_eq!(balance(&m).await, Decimal::ZERO);
    assert_eq!(m.store.transaction_count().await, 200);

    let position = m.ledger.get_position(m.user_id, m.player_id).await.unwrap().unwrap();
    assert_eq!(position.quantity, 200);

    let audit = m.ledger.audit_user(m.user_id, Decimal::from(10000)).await.unwrap();
    assert!(audit.is_consistent());
    assert_eq!(audit.expected_balance, Decimal::ZERO);
}
