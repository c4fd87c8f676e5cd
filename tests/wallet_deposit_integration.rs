//! Integration tests for wallet deposits and their REAL portfolio mirror
//!
//! To run these tests:
//! ```
//! cargo test --test wallet_deposit_integration
//! ```

mod common;

use common::{build_service, sample_markets};
use cryptotrade_core::common::errors::ExchangeError;
use cryptotrade_core::common::types::DepositKind;
use cryptotrade_core::notify::UserEvent;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

// ============================================================================
// Card Deposits
// ============================================================================

#[tokio::test]
async fn test_card_deposit_credits_wallet_and_real_cash() {
    let harness = build_service(sample_markets());

    let outcome = harness
        .service
        .deposit_card("user-1", 5000.0, Some("VISA-1"))
        .await
        .unwrap();

    assert_eq!(outcome.message, "Deposit successful");
    assert_eq!(outcome.usd, Some(dec!(5000.00)));

    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.usd, dec!(5000.00));
    assert_eq!(summary.transactions.len(), 1);
    assert_eq!(summary.transactions[0].kind, DepositKind::CardDeposit);
    assert_eq!(summary.transactions[0].usd, Some(dec!(5000.00)));
    assert_eq!(summary.transactions[0].reference, "VISA-1");

    let real = harness.service.portfolio("user-1", "REAL").await.unwrap();
    assert_eq!(real.cash_usd, dec!(5000.00));
}

#[tokio::test]
async fn test_real_cash_equals_wallet_after_every_deposit() {
    let harness = build_service(sample_markets());

    for amount in [5000.0, 123.456, 0.01] {
        harness
            .service
            .deposit_card("user-1", amount, None)
            .await
            .unwrap();

        let summary = harness.service.wallet_summary("user-1").await.unwrap();
        let real = harness.service.portfolio("user-1", "REAL").await.unwrap();
        assert_eq!(summary.usd, real.cash_usd);
    }

    // 5000 + 123.46 (rounded) + 0.01
    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.usd, dec!(5123.47));
}

#[tokio::test]
async fn test_card_deposit_sync_is_absolute_not_additive() {
    let harness = build_service(sample_markets());

    harness.service.deposit_card("user-1", 1000.0, None).await.unwrap();
    harness.service.buy("user-1", "REAL", "BTC", 0.01).await.unwrap();

    let real = harness.service.portfolio("user-1", "REAL").await.unwrap();
    assert_eq!(real.cash_usd, dec!(500.00), "0.01 BTC at 50k leaves 500");

    harness.service.deposit_card("user-1", 100.0, None).await.unwrap();

    // REAL cash snaps to the wallet total, overwriting the traded-down balance
    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    let real = harness.service.portfolio("user-1", "REAL").await.unwrap();
    assert_eq!(summary.usd, dec!(1100.00));
    assert_eq!(real.cash_usd, dec!(1100.00));
}

#[tokio::test]
async fn test_card_deposit_defaults_its_reference() {
    let harness = build_service(sample_markets());

    harness.service.deposit_card("user-1", 50.0, None).await.unwrap();
    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.transactions[0].reference, "CARD");
}

// ============================================================================
// Crypto Deposits
// ============================================================================

#[tokio::test]
async fn test_crypto_deposit_credits_wallet_and_real_holdings() {
    let harness = build_service(sample_markets());

    let outcome = harness
        .service
        .deposit_crypto("user-1", "btc", 0.5, Some("0xdeadbeef"))
        .await
        .unwrap();

    assert_eq!(outcome.message, "Crypto deposit successful");
    assert_eq!(outcome.usd, None);

    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.assets.len(), 1);
    assert_eq!(summary.assets[0].symbol, "BTC");
    assert_eq!(summary.assets[0].qty, dec!(0.5));
    assert_eq!(summary.transactions[0].kind, DepositKind::CryptoDeposit);
    assert_eq!(summary.transactions[0].symbol.as_deref(), Some("BTC"));
    assert_eq!(summary.transactions[0].qty, Some(dec!(0.5)));
    assert_eq!(summary.transactions[0].usd, None);
    assert_eq!(summary.transactions[0].reference, "0xdeadbeef");

    // the mirror books the position at the current market price
    let real = harness.service.portfolio("user-1", "REAL").await.unwrap();
    assert_eq!(real.holdings.len(), 1);
    assert_eq!(real.holdings[0].symbol, "BTC");
    assert_eq!(real.holdings[0].qty, dec!(0.5));
    assert_eq!(real.holdings[0].avg_buy, dec!(50000));
    assert_eq!(real.cash_usd, dec!(0));
}

#[tokio::test]
async fn test_crypto_deposit_merges_at_current_price() {
    let harness = build_service(sample_markets());
    harness.service.deposit_crypto("user-1", "BTC", 0.5, None).await.unwrap();

    harness.source.set_price("BTC", dec!(60000));
    harness.service.deposit_crypto("user-1", "BTC", 0.5, None).await.unwrap();

    let real = harness.service.portfolio("user-1", "REAL").await.unwrap();
    assert_eq!(real.holdings[0].qty, dec!(1));
    // (0.5 * 50000 + 0.5 * 60000) / 1
    assert_eq!(real.holdings[0].avg_buy, dec!(55000));

    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.assets[0].qty, dec!(1));
}

#[tokio::test]
async fn test_crypto_deposit_defaults_and_truncates_references() {
    let harness = build_service(sample_markets());

    harness.service.deposit_crypto("user-1", "BTC", 0.1, None).await.unwrap();
    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.transactions[0].reference, "TX");

    let long_hash = "f".repeat(120);
    harness
        .service
        .deposit_crypto("user-1", "BTC", 0.1, Some(&long_hash))
        .await
        .unwrap();
    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.transactions[0].reference.len(), 64);
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_invalid_deposit_amounts_are_rejected() {
    let harness = build_service(sample_markets());

    for amount in [0.0, -5.0, f64::NAN] {
        let err = harness
            .service
            .deposit_card("user-1", amount, None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ExchangeError::InvalidAmount(_)),
            "amount {amount} should be rejected"
        );
    }

    let err = harness
        .service
        .deposit_crypto("user-1", "BTC", 0.0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidAmount(_)));

    // nothing was recorded
    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.usd, dec!(0));
    assert!(summary.transactions.is_empty());
}

#[tokio::test]
async fn test_unknown_deposit_symbol_is_rejected() {
    let harness = build_service(sample_markets());

    let err = harness
        .service
        .deposit_crypto("user-1", "ZZZZ", 1.0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::UnknownAsset(symbol) if symbol == "ZZZZ"));

    let err = harness
        .service
        .deposit_crypto("user-1", "   ", 1.0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidInput(_)));
}

// ============================================================================
// Summary Projection
// ============================================================================

#[tokio::test]
async fn test_fresh_wallet_summary_is_empty() {
    let harness = build_service(sample_markets());

    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.usd, dec!(0));
    assert_eq!(summary.assets_value_usd, dec!(0));
    assert_eq!(summary.total_usd, dec!(0));
    assert!(summary.assets.is_empty());
    assert!(summary.transactions.is_empty());
}

#[tokio::test]
async fn test_summary_prices_assets_and_totals() {
    let harness = build_service(sample_markets());
    harness.service.deposit_card("user-1", 1000.0, None).await.unwrap();
    harness.service.deposit_crypto("user-1", "ETH", 2.0, None).await.unwrap();

    let summary = harness.service.wallet_summary("user-1").await.unwrap();
    assert_eq!(summary.usd, dec!(1000.00));
    assert_eq!(summary.assets[0].price, dec!(3000));
    assert_eq!(summary.assets[0].value_usd, dec!(6000.00));
    assert_eq!(summary.assets_value_usd, dec!(6000.00));
    assert_eq!(summary.total_usd, dec!(7000.00));

    // the transaction log is newest first
    assert_eq!(summary.transactions[0].kind, DepositKind::CryptoDeposit);
    assert_eq!(summary.transactions[1].kind, DepositKind::CardDeposit);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_deposit_pushes_a_wallet_event() {
    let harness = build_service(sample_markets());
    let mut rx = harness.publisher.subscribe_user("user-1").await;

    harness.service.deposit_card("user-1", 250.0, None).await.unwrap();

    match rx.recv().await.unwrap() {
        UserEvent::Wallet(summary) => {
            assert_eq!(summary.usd, dec!(250.00));
            assert_eq!(summary.transactions.len(), 1);
        }
        other => panic!("expected a wallet event, got {other:?}"),
    }
}
