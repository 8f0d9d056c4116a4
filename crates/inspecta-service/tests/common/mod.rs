//! Shared fixtures for the back-office integration tests.

#![allow(dead_code)]

use inspecta_core::{
    CloseRequest, Denomination, DenominationCount, Money, MovementInput, MovementKind,
    PaymentMethod, Shift,
};
use inspecta_service::{BackOffice, OperatorContext, ServiceConfig, SessionClosure};

pub fn m(units: i64) -> Money {
    Money::from_units(units)
}

pub async fn office() -> BackOffice {
    BackOffice::new(ServiceConfig::in_memory()).await.unwrap()
}

pub async fn office_with(config: ServiceConfig) -> BackOffice {
    BackOffice::new(config).await.unwrap()
}

pub fn admin() -> OperatorContext {
    OperatorContext::administrator("admin-1")
}

/// Greedy bill/coin tally for an amount that is a multiple of 50.
pub fn count_for(amount: Money) -> DenominationCount {
    let mut rest = amount.units();
    let mut count = DenominationCount::new();
    for denomination in Denomination::ALL {
        let value = denomination.value().units();
        if rest >= value {
            count = count.with(denomination, rest / value);
            rest %= value;
        }
    }
    assert_eq!(rest, 0, "amount must be a multiple of 50");
    count
}

pub fn inspection(amount: i64, method: PaymentMethod) -> MovementInput {
    MovementInput::new(
        MovementKind::VehicleCharge,
        m(amount),
        method,
        "Revisión técnico-mecánica ABC123",
    )
}

pub fn expense(amount: i64, method: PaymentMethod) -> MovementInput {
    MovementInput::new(MovementKind::ManualExpense, m(-amount), method, "Compra de papelería")
}

/// Opens a till for `cashier`, books one cash inspection fee and closes it
/// balanced.
pub async fn closed_till(office: &BackOffice, cashier: &OperatorContext, float: i64, fee: i64) -> SessionClosure {
    let session = office.open_session(cashier, m(float), Shift::Morning).await.unwrap();
    office
        .record_movement(cashier, &session.id, inspection(fee, PaymentMethod::Cash))
        .await
        .unwrap();
    office
        .close_session(cashier, &session.id, CloseRequest::new(count_for(m(float + fee))))
        .await
        .unwrap()
}
