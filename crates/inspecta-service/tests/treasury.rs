//! Treasury: handovers from closed tills, vault tallies and balance alerts.

mod common;

use chrono::{Duration, Utc};
use tokio::sync::broadcast::error::TryRecvError;

use common::*;
use inspecta_core::{
    CoreError, Denomination, DenominationCount, Money, NotificationStatus, TreasuryCategory,
    TreasuryMethod, TreasuryMovementInput, TreasurySettingsUpdate, MAX_AMOUNT,
};
use inspecta_service::{
    BackOffice, BackOfficeEvent, ErrorKind, OperatorContext, ServiceError, TreasuryMovementFilter,
};

fn payroll(amount: i64) -> TreasuryMovementInput {
    TreasuryMovementInput::new(
        TreasuryCategory::Payroll,
        m(amount),
        TreasuryMethod::Transfer,
        "Nómina quincenal",
    )
}

fn loan(amount: Money) -> TreasuryMovementInput {
    TreasuryMovementInput::new(TreasuryCategory::Loan, amount, TreasuryMethod::Transfer, "Préstamo bancario")
}

async fn stored_movements(office: &BackOffice) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM treasury_movements")
        .fetch_one(office.database().pool())
        .await
        .unwrap()
}

fn count_alerts(events: &mut tokio::sync::broadcast::Receiver<BackOfficeEvent>) -> usize {
    let mut alerts = 0;
    loop {
        match events.try_recv() {
            Ok(BackOfficeEvent::BalanceAlert { .. }) => alerts += 1,
            Ok(_) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return alerts,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

// =============================================================================
// Handover
// =============================================================================

#[tokio::test]
async fn closed_till_is_received_once() {
    let office = office().await;
    let cashier = OperatorContext::cashier("cajero-1");
    let closure = closed_till(&office, &cashier, 50_000, 85_000).await;

    let balance = office.get_treasury_balance(&admin()).await.unwrap();
    assert_eq!(balance.current_balance, m(0));
    assert_eq!(balance.pending_handover, m(135_000));

    let pending = office.pending_handovers(&admin()).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].session_id, closure.session.id);

    let receipt = office
        .receive_handover(&admin(), &closure.notification.id)
        .await
        .unwrap();
    assert_eq!(receipt.notification.status, NotificationStatus::Read);
    let movement = receipt.movement.unwrap();
    assert_eq!(movement.category, TreasuryCategory::SessionTransfer);
    assert_eq!(movement.amount, m(135_000));
    assert_eq!(movement.linked_session_id.as_deref(), Some(closure.session.id.as_str()));

    let balance = office.get_treasury_balance(&admin()).await.unwrap();
    assert_eq!(balance.current_balance, m(135_000));
    assert_eq!(balance.pending_handover, m(0));
    assert!(office.pending_handovers(&admin()).await.unwrap().is_empty());

    let err = office
        .receive_handover(&admin(), &closure.notification.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Core(CoreError::HandoverAlreadyReceived { .. })));

    let inventory = office.denomination_inventory(&admin()).await.unwrap();
    assert_eq!(inventory.value(), m(135_000));
}

#[tokio::test]
async fn manual_transfer_of_received_session_is_rejected() {
    let office = office().await;
    let cashier = OperatorContext::cashier("cajero-1");
    let closure = closed_till(&office, &cashier, 50_000, 85_000).await;
    office.receive_handover(&admin(), &closure.notification.id).await.unwrap();

    let mut input = TreasuryMovementInput::new(
        TreasuryCategory::SessionTransfer,
        m(135_000),
        TreasuryMethod::Cash,
        "Traslado manual de caja",
    );
    input.linked_session_id = Some(closure.session.id.clone());

    let err = office.record_treasury_movement(&admin(), input).await.unwrap_err();
    assert!(matches!(err, ServiceError::Core(CoreError::HandoverAlreadyReceived { .. })));
}

#[tokio::test]
async fn unknown_notification_is_not_found() {
    let office = office().await;
    let err = office.receive_handover(&admin(), "missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn archived_notification_cannot_be_archived_again() {
    let office = office().await;
    let cashier = OperatorContext::cashier("cajero-1");
    let closure = closed_till(&office, &cashier, 50_000, 85_000).await;

    let archived = office
        .archive_notification(&admin(), &closure.notification.id)
        .await
        .unwrap();
    assert_eq!(archived.status, NotificationStatus::Archived);

    let err = office
        .archive_notification(&admin(), &closure.notification.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

// =============================================================================
// Movements and vault
// =============================================================================

#[tokio::test]
async fn cash_expense_must_be_covered_by_the_vault() {
    let office = office().await;
    let cashier = OperatorContext::cashier("cajero-1");
    // 135 000 = 100 000 + 20 000 + 10 000 + 5 000
    let closure = closed_till(&office, &cashier, 50_000, 85_000).await;
    office.receive_handover(&admin(), &closure.notification.id).await.unwrap();

    let fifty = TreasuryMovementInput::new(
        TreasuryCategory::Maintenance,
        m(50_000),
        TreasuryMethod::Cash,
        "Calibración del frenómetro",
    )
    .with_count(DenominationCount::new().with(Denomination::Bill50000, 1));
    let err = office.record_treasury_movement(&admin(), fifty).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reconciliation);
    assert!(matches!(err, ServiceError::Core(CoreError::InsufficientDenominations { .. })));

    let mismatch = TreasuryMovementInput::new(
        TreasuryCategory::Maintenance,
        m(30_000),
        TreasuryMethod::Cash,
        "Calibración del frenómetro",
    )
    .with_count(DenominationCount::new().with(Denomination::Bill20000, 1));
    let err = office.record_treasury_movement(&admin(), mismatch).await.unwrap_err();
    assert!(matches!(err, ServiceError::Core(CoreError::DenominationTotalMismatch { .. })));

    let covered = TreasuryMovementInput::new(
        TreasuryCategory::Maintenance,
        m(30_000),
        TreasuryMethod::Cash,
        "Calibración del frenómetro",
    )
    .with_count(
        DenominationCount::new()
            .with(Denomination::Bill20000, 1)
            .with(Denomination::Bill10000, 1),
    );
    let movement = office.record_treasury_movement(&admin(), covered).await.unwrap();
    assert_eq!(movement.amount, m(-30_000));

    let inventory = office.denomination_inventory(&admin()).await.unwrap();
    assert_eq!(inventory.value(), m(105_000));
    assert_eq!(inventory.available.get(Denomination::Bill20000), 0);
}

#[tokio::test]
async fn oversized_income_is_rejected_before_the_balance_wraps() {
    let office = office().await;
    let half = m(i64::MAX / 2 + 1);

    for _ in 0..2 {
        let err = office.record_treasury_movement(&admin(), loan(half)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert_eq!(stored_movements(&office).await, 0);

    office.record_treasury_movement(&admin(), loan(MAX_AMOUNT)).await.unwrap();
    let balance = office.get_treasury_balance(&admin()).await.unwrap();
    assert_eq!(balance.current_balance, MAX_AMOUNT);
}

#[tokio::test]
async fn non_cash_movement_rejects_a_tally() {
    let office = office().await;
    let input = payroll(900_000).with_count(DenominationCount::new().with(Denomination::Bill100000, 9));
    let err = office.record_treasury_movement(&admin(), input).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn listing_filters_and_orders_newest_first() {
    let office = office().await;
    let now = Utc::now();

    for (days_ago, category, amount) in [
        (3, TreasuryCategory::Loan, 1_000_000),
        (2, TreasuryCategory::Payroll, 400_000),
        (1, TreasuryCategory::Utilities, 80_000),
    ] {
        let input = TreasuryMovementInput::new(category, m(amount), TreasuryMethod::Transfer, "Movimiento de prueba")
            .occurred_at(now - Duration::days(days_ago));
        office.record_treasury_movement(&admin(), input).await.unwrap();
    }

    let all = office
        .list_treasury_movements(&admin(), &TreasuryMovementFilter::default())
        .await
        .unwrap();
    let categories: Vec<_> = all.iter().map(|mv| mv.category).collect();
    assert_eq!(
        categories,
        vec![TreasuryCategory::Utilities, TreasuryCategory::Payroll, TreasuryCategory::Loan]
    );

    let filter = TreasuryMovementFilter {
        category: Some(TreasuryCategory::Payroll),
        ..Default::default()
    };
    let payroll_only = office.list_treasury_movements(&admin(), &filter).await.unwrap();
    assert_eq!(payroll_only.len(), 1);
    assert_eq!(payroll_only[0].amount, m(-400_000));

    let summary = office
        .treasury_summary(&admin(), now - Duration::days(7), now)
        .await
        .unwrap();
    assert_eq!(summary.total_income, m(1_000_000));
    assert_eq!(summary.total_expense, m(480_000));
    assert_eq!(summary.current_balance, m(520_000));

    let stats = office
        .treasury_statistics(&admin(), now - Duration::days(2) - Duration::hours(1), now)
        .await
        .unwrap();
    assert_eq!(stats.opening_balance, m(1_000_000));
    assert_eq!(stats.closing_balance, m(520_000));

    let err = office
        .treasury_summary(&admin(), now, now - Duration::days(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn cash_flow_projection_window_is_validated() {
    let office = office().await;
    office
        .record_treasury_movement(&admin(), payroll(300_000).occurred_at(Utc::now() - Duration::days(1)))
        .await
        .unwrap();

    let projection = office.cash_flow_projection(&admin(), 30).await.unwrap();
    assert_eq!(projection.average_daily_expense, m(10_000));
    assert_eq!(projection.current_balance, m(-300_000));

    let err = office.cash_flow_projection(&admin(), 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// =============================================================================
// Settings and alerts
// =============================================================================

#[tokio::test]
async fn alert_fires_once_when_balance_drops_below_threshold() {
    let office = office().await;
    let cashier = OperatorContext::cashier("cajero-1");
    let closure = closed_till(&office, &cashier, 50_000, 85_000).await;

    let mut events = office.subscribe();
    office.receive_handover(&admin(), &closure.notification.id).await.unwrap();
    assert_eq!(count_alerts(&mut events), 0);

    // 135 000 → 85 000, below the default 100 000 threshold.
    office.record_treasury_movement(&admin(), payroll(50_000)).await.unwrap();
    assert_eq!(count_alerts(&mut events), 1);

    // Still below: no repeat.
    office.record_treasury_movement(&admin(), payroll(10_000)).await.unwrap();
    assert_eq!(count_alerts(&mut events), 0);

    let balance = office.get_treasury_balance(&admin()).await.unwrap();
    assert!(balance.below_threshold);
}

#[tokio::test]
async fn disabled_alerts_stay_silent() {
    let office = office().await;
    let mut events = office.subscribe();

    let update = TreasurySettingsUpdate {
        notify_low_balance: Some(false),
        ..Default::default()
    };
    office.update_treasury_settings(&admin(), update).await.unwrap();

    let loan = TreasuryMovementInput::new(
        TreasuryCategory::Loan,
        m(500_000),
        TreasuryMethod::Transfer,
        "Crédito bancario",
    );
    office.record_treasury_movement(&admin(), loan).await.unwrap();
    office.record_treasury_movement(&admin(), payroll(450_000)).await.unwrap();

    assert_eq!(count_alerts(&mut events), 0);
}

#[tokio::test]
async fn raising_the_threshold_can_trigger_an_alert() {
    let office = office().await;
    let loan = TreasuryMovementInput::new(
        TreasuryCategory::Loan,
        m(150_000),
        TreasuryMethod::Transfer,
        "Crédito bancario",
    );
    office.record_treasury_movement(&admin(), loan).await.unwrap();

    let mut events = office.subscribe();
    let update = TreasurySettingsUpdate {
        alert_threshold: Some(m(200_000)),
        notification_email: Some(Some("tesoreria@example.com".to_string())),
        ..Default::default()
    };
    let settings = office.update_treasury_settings(&admin(), update).await.unwrap();
    assert_eq!(settings.alert_threshold, m(200_000));
    assert_eq!(settings.updated_by.as_deref(), Some("admin-1"));

    match events.try_recv().unwrap() {
        BackOfficeEvent::BalanceAlert {
            current_balance,
            notification_email,
            ..
        } => {
            assert_eq!(current_balance, m(150_000));
            assert_eq!(notification_email.as_deref(), Some("tesoreria@example.com"));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let stored = office.treasury_settings(&admin()).await.unwrap();
    assert_eq!(stored, settings);
}

#[tokio::test]
async fn failed_alert_check_does_not_fail_a_stored_movement() {
    let office = office().await;
    // Settings become unreadable, so the alert check after the insert fails.
    sqlx::query("UPDATE treasury_settings SET updated_at = 'not a timestamp'")
        .execute(office.database().pool())
        .await
        .unwrap();

    let movement = office.record_treasury_movement(&admin(), loan(m(1_000_000))).await.unwrap();
    assert_eq!(movement.amount, m(1_000_000));
    assert_eq!(stored_movements(&office).await, 1);
}

#[tokio::test]
async fn negative_threshold_is_rejected() {
    let office = office().await;
    let update = TreasurySettingsUpdate {
        alert_threshold: Some(m(-1)),
        ..Default::default()
    };
    let err = office.update_treasury_settings(&admin(), update).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// =============================================================================
// Access
// =============================================================================

#[tokio::test]
async fn treasury_is_administrator_only() {
    let office = office().await;
    let cashier = OperatorContext::cashier("cajero-1");

    assert_eq!(
        office.get_treasury_balance(&cashier).await.unwrap_err().kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(
        office.pending_handovers(&cashier).await.unwrap_err().kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(
        office
            .record_treasury_movement(&cashier, payroll(10_000))
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );
}
