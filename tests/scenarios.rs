//! End-to-end scenarios through a running engine

mod common;

use common::{at, Harness};
use fintrax::models::{BalanceScope, Category, Granularity, PeriodBucket, YoyChange};

#[tokio::test]
async fn income_and_expense_in_one_month() {
    let h = Harness::start(at(2024, 1, 31)).await;
    h.income(100_000, at(2024, 1, 5)).await;
    h.expense(40_000, Category::Housing, at(2024, 1, 6)).await;

    let balance = h.engine.balance().current_balance();
    assert_eq!(balance.scope, BalanceScope::Lifetime);
    assert_eq!(balance.total_income.cents(), 100_000);
    assert_eq!(balance.total_expenses.cents(), 40_000);
    assert_eq!(balance.net_balance.cents(), 60_000);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn deleting_keeps_prior_history() {
    let h = Harness::start(at(2024, 1, 31)).await;
    h.income(100_000, at(2024, 1, 5)).await;
    let rent = h.expense(40_000, Category::Housing, at(2024, 1, 6)).await;
    h.delete(&rent).await;

    assert_eq!(h.engine.balance().current_balance().net_balance.cents(), 100_000);

    let january = PeriodBucket::parse(Granularity::Monthly, "2024-01").unwrap();
    let history = h
        .snapshots
        .history_for(&BalanceScope::Bucket(january))
        .unwrap();
    let nets: Vec<i64> = history.iter().map(|b| b.net_balance.cents()).collect();
    // newest first; append-only
    assert_eq!(nets, vec![100_000, 60_000, 100_000]);

    let monthly = h.engine.balance().history(Granularity::Monthly).unwrap();
    assert!(monthly.iter().any(|b| b.net_balance.cents() == 60_000));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn top_categories_with_non_positive_limits() {
    let h = Harness::start(at(2024, 1, 31)).await;
    h.expense(1_000, Category::Food, at(2024, 1, 10)).await;

    assert!(h.engine.categories().top_categories(0).await.unwrap().is_empty());
    assert!(h.engine.categories().top_categories(-5).await.unwrap().is_empty());
    assert_eq!(h.engine.categories().top_categories(3).await.unwrap().len(), 1);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn year_over_year_undefined_against_zero() {
    let h = Harness::start(at(2024, 6, 15)).await;
    h.income(50_000, at(2024, 2, 1)).await;
    // nets to zero last year within the comparison span
    h.income(10_000, at(2023, 3, 1)).await;
    h.expense(10_000, Category::Other, at(2023, 4, 1)).await;

    let yoy = h.engine.trends().year_over_year_comparison().await.unwrap();
    assert_eq!(yoy.current_net.cents(), 50_000);
    assert!(yoy.previous_net.is_zero());
    assert_eq!(yoy.change, YoyChange::Undefined);
    assert!(yoy.change.to_string().starts_with("undefined"));

    h.engine.shutdown().await;
}
