//! # Seed Data Generator
//!
//! Populates a demo database with closed tills, their handovers and some
//! treasury activity.
//!
//! ## Usage
//! ```bash
//! # 14 days of activity (default)
//! cargo run -p inspecta-db --bin seed
//!
//! cargo run -p inspecta-db --bin seed -- --days 30 --db ./data/inspecta.db
//! ```
//!
//! Every generated day has one till per shift. Each till sees a mix of
//! inspection fees and SOAT commissions across payment methods, a couple of
//! expenses, and closes balanced except for an occasional small shortfall.
//! The cash of every close is then received into treasury, and payroll and
//! utilities are paid out at the end of each week.

use chrono::{Duration, Utc};
use std::env;

use inspecta_core::{
    CashSession, CloseRequest, Denomination, DenominationCount, Money, MovementInput,
    MovementKind, MovementLedger, PaymentMethod, ReconciliationEngine, Shift, TreasuryCategory,
    TreasuryMethod, TreasuryMovementInput, TreasurySettings,
};
use inspecta_db::{Database, DbConfig};

const OPERATORS: [(&str, Shift); 3] = [
    ("cajero-manana", Shift::Morning),
    ("cajero-tarde", Shift::Afternoon),
    ("cajero-noche", Shift::Night),
];

const PLATES: &[&str] = &[
    "ABC123", "KLM456", "XYZ789", "HJT302", "BOG911", "MED440", "CAL017", "PER228",
];

const INSPECTION_FEE: i64 = 85_000;
const MOTORCYCLE_FEE: i64 = 60_000;
const OPENING_FLOAT: i64 = 50_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 14;
    let mut db_path = String::from("./inspecta_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(14);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Inspecta Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of activity to generate (default: 14)");
                println!("  -d, --db <PATH>    Database file path (default: ./inspecta_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Inspecta Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.sessions().history(None, 1).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has cash sessions");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    db.treasury().ensure_settings(&TreasurySettings::default()).await?;

    let engine = ReconciliationEngine::default();
    let start = Utc::now() - Duration::days(days);
    let mut sessions = 0usize;
    let mut movements = 0usize;

    for day in 0..days {
        for (slot, (operator, shift)) in OPERATORS.iter().enumerate() {
            let seed = (day as usize) * OPERATORS.len() + slot;
            let opened_at = start + Duration::days(day) + Duration::hours(6 + 8 * slot as i64);

            let mut session =
                CashSession::open(operator, Money::from_units(OPENING_FLOAT), *shift, opened_at)?;
            db.sessions().insert(&session).await?;
            let mut ledger = MovementLedger::new(session.id.clone());

            for (n, input) in day_movements(seed).into_iter().enumerate() {
                let at = opened_at + Duration::minutes(20 * (n as i64 + 1));
                let movement = ledger.append(&session, input, operator, at)?.clone();
                db.movements().append(&movement).await?;
                movements += 1;
            }

            let expected = inspecta_core::balance::summarize(&session, &ledger).expected_physical_cash;
            let mut request = CloseRequest::new(count_for(expected));
            // every seventh till comes up 500 short
            if seed % 7 == 6 {
                let short = count_for(expected - Money::from_units(500));
                request = CloseRequest::new(short);
            }

            let version = session.version;
            session.close(&ledger, &request, &engine, opened_at + Duration::hours(8))?;
            let note = session.close_notification()?;
            db.sessions().close(&session, version, &note).await?;

            let treasury = db.treasury().ledger().await?;
            let handover = treasury.prepare_handover(&note, &session, "admin", note.closed_at)?;
            db.treasury().receive_handover(&note.id, handover.as_ref()).await?;
            sessions += 1;
        }

        if day % 7 == 6 {
            let when = start + Duration::days(day) + Duration::hours(23);
            for input in [
                TreasuryMovementInput::new(
                    TreasuryCategory::Payroll,
                    Money::from_units(900_000),
                    TreasuryMethod::Transfer,
                    "Nómina semanal",
                )
                .occurred_at(when),
                TreasuryMovementInput::new(
                    TreasuryCategory::Utilities,
                    Money::from_units(120_000),
                    TreasuryMethod::Transfer,
                    "Servicios públicos",
                )
                .with_voucher(format!("FAC-{:05}", day))
                .occurred_at(when),
            ] {
                let ledger = db.treasury().ledger().await?;
                let movement = ledger.prepare(input, "admin", Utc::now())?;
                db.treasury().insert(&movement).await?;
            }
        }

        println!("  Day {:>3}: {} sessions, {} movements", day + 1, sessions, movements);
    }

    let ledger = db.treasury().ledger().await?;
    println!();
    println!("✓ Generated {} sessions and {} movements", sessions, movements);
    println!("  Treasury balance: {}", ledger.current_balance());
    println!("  Vault tally value: {}", ledger.inventory().value());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// A deterministic mix of charges and expenses for one till.
fn day_movements(seed: usize) -> Vec<MovementInput> {
    let methods = [
        PaymentMethod::Cash,
        PaymentMethod::Cash,
        PaymentMethod::DebitCard,
        PaymentMethod::CreditCard,
        PaymentMethod::BankTransfer,
        PaymentMethod::CreditLineA,
    ];

    let mut inputs = Vec::new();
    for n in 0..(4 + seed % 5) {
        let plate = PLATES[(seed + n) % PLATES.len()];
        let method = methods[(seed * 3 + n) % methods.len()];
        let fee = if (seed + n) % 4 == 0 { MOTORCYCLE_FEE } else { INSPECTION_FEE };

        inputs.push(
            MovementInput::new(
                MovementKind::VehicleCharge,
                Money::from_units(fee),
                method,
                format!("Revisión técnico-mecánica {}", plate),
            )
            .with_vehicle_ref(format!("veh-{}-{}", seed, n)),
        );

        if (seed + n) % 3 == 0 {
            inputs.push(MovementInput::new(
                MovementKind::SoatSaleCommission,
                Money::from_units(12_000 + 500 * (n as i64 % 4)),
                method,
                format!("Comisión SOAT {}", plate),
            ));
        }
    }

    inputs.push(MovementInput::new(
        MovementKind::ManualExpense,
        Money::from_units(-(3_000 + 1_000 * (seed as i64 % 5))),
        PaymentMethod::Cash,
        "Cafetería y aseo",
    ));

    inputs
}

/// Greedy bill/coin tally for a whole-peso amount (multiple of 50).
fn count_for(amount: Money) -> DenominationCount {
    let mut rest = amount.units();
    let mut count = DenominationCount::new();
    for denomination in Denomination::ALL {
        let value = denomination.value().units();
        let n = rest / value;
        if n > 0 {
            count = count.with(denomination, n);
            rest -= n * value;
        }
    }
    count
}
