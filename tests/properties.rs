//! Properties every aggregate must hold against the full-scan oracle

mod common;

use common::{at, changed, wait_until, Harness};
use chrono::{Duration, TimeZone, Utc};
use fintrax::models::{
    BalanceScope, Category, Granularity, Money, Percentage, PeriodBucket, PeriodTotals,
};
use fintrax::services::UpdateTransactionInput;
use fintrax::storage::LedgerStore;

#[tokio::test]
async fn incremental_balance_matches_full_scan() {
    let h = Harness::start(at(2024, 3, 31)).await;

    let mut kept = Vec::new();
    for i in 0..12i64 {
        let day = 1 + (i as u32 % 28);
        let month = 1 + (i as u32 % 3);
        let txn = if i % 3 == 0 {
            h.income(10_000 + i * 137, at(2024, month, day)).await
        } else {
            h.expense(1_000 + i * 59, Category::ALL[(i % 7) as usize], at(2024, month, day))
                .await
        };
        kept.push(txn);
    }
    for txn in kept.iter().step_by(4) {
        h.delete(txn).await;
    }

    let oracle = h.engine.balance().scan_totals().await.unwrap();
    let scanned = PeriodTotals::from_transactions(&h.ledger.scan_all().await.unwrap()).unwrap();
    assert_eq!(oracle, scanned);

    let balance = h.engine.balance().current_balance();
    assert_eq!(balance.totals(), oracle);
    assert_eq!(balance.net_balance, oracle.net());
    assert_eq!(h.engine.balance().incremental_totals(), oracle);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn update_across_boundary_recomputes_both_months() {
    let h = Harness::start(at(2024, 2, 15)).await;
    let taxi = h.expense(2_500, Category::Transportation, at(2024, 1, 31)).await;

    let mut rx = h.engine.balance().watch_current();
    h.engine
        .transactions()
        .update(
            taxi.id,
            UpdateTransactionInput {
                occurred_at: Some(at(2024, 2, 1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    changed(&mut rx).await;

    let jan = PeriodBucket::parse(Granularity::Monthly, "2024-01").unwrap();
    let feb = jan.next().unwrap();
    let jan_latest = h.snapshots.latest(&BalanceScope::Bucket(jan)).unwrap().unwrap();
    let feb_latest = h.snapshots.latest(&BalanceScope::Bucket(feb)).unwrap().unwrap();
    assert!(jan_latest.total_expenses.is_zero());
    assert_eq!(feb_latest.total_expenses.cents(), 2_500);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn breakdown_percentages_sum_to_hundred() {
    let h = Harness::start(at(2024, 5, 31)).await;
    for (cents, category) in [
        (3_333, Category::Food),
        (3_333, Category::Housing),
        (3_334, Category::Utilities),
        (1, Category::Entertainment),
        (777, Category::Healthcare),
    ] {
        h.expense(cents, category, at(2024, 5, 10)).await;
    }

    let may = PeriodBucket::parse(Granularity::Monthly, "2024-05").unwrap();
    let breakdown = h.engine.categories().category_breakdown(may).await.unwrap();
    let sum: Percentage = breakdown.iter().map(|b| b.percentage).sum();
    let tolerance = breakdown.len() as i64;
    assert!((sum.basis_points() - Percentage::HUNDRED.basis_points()).abs() <= tolerance);

    let totals: Vec<Money> = breakdown.iter().map(|b| b.total_amount).collect();
    assert!(totals.windows(2).all(|w| w[0] >= w[1]));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn trend_always_has_requested_length() {
    let h = Harness::start(at(2024, 3, 10)).await;
    h.income(5_000, at(2023, 12, 24)).await;

    for n in 0..=14 {
        let series = h.engine.trends().monthly_trend(n).await.unwrap();
        assert_eq!(series.len(), n);
        assert!(series.windows(2).all(|w| w[0].bucket < w[1].bucket));
        if let Some(last) = series.last() {
            assert_eq!(last.period, "2024-03");
        }
    }

    let series = h.engine.trends().monthly_trend(4).await.unwrap();
    let nets: Vec<i64> = series.iter().map(|t| t.net.cents()).collect();
    assert_eq!(nets, vec![5_000, 0, 0, 0]);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn recomputing_without_mutation_is_identical() {
    let h = Harness::start(at(2024, 4, 20)).await;
    h.income(90_000, at(2024, 4, 1)).await;
    h.expense(12_345, Category::Food, at(2024, 4, 2)).await;

    let april = PeriodBucket::parse(Granularity::Monthly, "2024-04").unwrap();
    let first = h.engine.summary().summary(april).await.unwrap();
    let second = h.engine.summary().summary(april).await.unwrap();
    assert_eq!(first, second);

    let snapshots_before = h.snapshots.len().unwrap();
    let mut rx = h.engine.balance().watch_current();
    rx.borrow_and_update();
    fintrax::services::ChangeSubscriber::rebuild(h.engine.balance())
        .await
        .unwrap();
    assert_eq!(h.snapshots.len().unwrap(), snapshots_before);
    // an unchanged value does not wake subscribers
    assert!(!rx.has_changed().unwrap());

    h.engine.shutdown().await;
}

#[tokio::test]
async fn bucket_start_instant_belongs_to_that_bucket() {
    let h = Harness::start(at(2024, 2, 20)).await;
    let midnight = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    h.income(7_000, midnight).await;
    h.income(100, midnight - Duration::nanoseconds(1)).await;

    let jan = PeriodBucket::parse(Granularity::Monthly, "2024-01").unwrap();
    let feb = jan.next().unwrap();
    assert_eq!(feb.start(), midnight);
    assert_eq!(jan.end(), midnight);

    let feb_summary = h.engine.summary().summary(feb).await.unwrap();
    let jan_summary = h.engine.summary().summary(jan).await.unwrap();
    assert_eq!(feb_summary.total_income.cents(), 7_000);
    assert_eq!(jan_summary.total_income.cents(), 100);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn watched_summary_follows_changes() {
    let h = Harness::start(at(2024, 7, 15)).await;
    let july = PeriodBucket::parse(Granularity::Monthly, "2024-07").unwrap();
    let mut rx = h.engine.summary().watch_summary(july).await.unwrap();
    assert!(rx.borrow().value.is_empty());

    h.expense(2_000, Category::Food, at(2024, 7, 3)).await;
    let seen = wait_until(&mut rx, |agg| agg.value.transaction_count == 1).await;
    assert_eq!(seen.value.net_balance.cents(), -2_000);
    assert!(!seen.stale);

    // changes in neighbouring months leave the July summary alone; the
    // worker applies changes in order, so once August reflects its insert
    // the June change has been fully applied too
    let mut june = h.engine.summary().watch_summary(july.prev().unwrap()).await.unwrap();
    let mut august = h.engine.summary().watch_summary(july.next().unwrap()).await.unwrap();
    rx.borrow_and_update();
    h.income(1_000, at(2024, 6, 3)).await;
    wait_until(&mut june, |agg| agg.value.transaction_count == 1).await;
    h.income(3_000, at(2024, 8, 3)).await;
    wait_until(&mut august, |agg| agg.value.transaction_count == 1).await;
    assert!(!rx.has_changed().unwrap());
    assert_eq!(rx.borrow().value.transaction_count, 1);

    h.engine.shutdown().await;
}
