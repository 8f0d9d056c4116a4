//! Inbound contract of the vehicle service.
//!
//! The vehicle workflow (registration, inspection lanes) lives elsewhere and
//! only tells the till what to charge. Every message has exactly one shape:
//! a JSON object tagged by `type`, with unknown fields rejected. Bare lists
//! or wrapper objects are errors, never unwrapped.
//!
//! ```json
//! { "type": "charge_confirmed", "vehicle_ref": "veh-42", "plate": "ABC123",
//!   "amount": 85000, "payment_method": "cash" }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::payment::PaymentMethod;
use crate::types::{MovementInput, MovementKind};

/// The inspection fee for a vehicle was paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(deny_unknown_fields)]
pub struct ChargeConfirmed {
    pub vehicle_ref: String,
    pub plate: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub concept: Option<String>,
}

/// A SOAT policy was sold alongside the inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(deny_unknown_fields)]
pub struct SoatCommission {
    pub vehicle_ref: String,
    pub plate: String,
    pub commission: Money,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VehicleServiceMessage {
    ChargeConfirmed(ChargeConfirmed),
    SoatCommission(SoatCommission),
}

impl VehicleServiceMessage {
    /// Parses one message, rejecting any other shape.
    pub fn parse(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ValidationError::InvalidFormat {
                field: "vehicle_message".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub fn vehicle_ref(&self) -> &str {
        match self {
            VehicleServiceMessage::ChargeConfirmed(c) => &c.vehicle_ref,
            VehicleServiceMessage::SoatCommission(c) => &c.vehicle_ref,
        }
    }

    /// Converts into the movement the till records.
    pub fn into_movement_input(self) -> MovementInput {
        match self {
            VehicleServiceMessage::ChargeConfirmed(c) => {
                let concept = c
                    .concept
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| format!("Revisión técnico-mecánica {}", c.plate));
                MovementInput::new(MovementKind::VehicleCharge, c.amount, c.payment_method, concept)
                    .with_vehicle_ref(c.vehicle_ref)
            }
            VehicleServiceMessage::SoatCommission(c) => MovementInput::new(
                MovementKind::SoatSaleCommission,
                c.commission,
                c.payment_method,
                format!("Comisión SOAT {}", c.plate),
            )
            .with_vehicle_ref(c.vehicle_ref),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_parse_charge() {
        let msg = VehicleServiceMessage::parse(
            r#"{"type":"charge_confirmed","vehicle_ref":"veh-42","plate":"ABC123","amount":85000,"payment_method":"cash"}"#,
        )
        .unwrap();
        assert_eq!(msg.vehicle_ref(), "veh-42");

        let input = msg.into_movement_input();
        assert_eq!(input.kind, MovementKind::VehicleCharge);
        assert_eq!(input.amount, Money::from_units(85_000));
        assert_eq!(input.concept, "Revisión técnico-mecánica ABC123");
        assert_eq!(input.vehicle_ref.as_deref(), Some("veh-42"));
    }

    #[test]
    fn test_parse_commission() {
        let msg = VehicleServiceMessage::parse(
            r#"{"type":"soat_commission","vehicle_ref":"veh-7","plate":"XYZ987","commission":18000,"payment_method":"debit_card"}"#,
        )
        .unwrap();
        let input = msg.into_movement_input();
        assert_eq!(input.kind, MovementKind::SoatSaleCommission);
        assert_eq!(input.payment_method, PaymentMethod::DebitCard);
    }

    #[test]
    fn test_rejects_ambiguous_shapes() {
        // bare list
        let list = VehicleServiceMessage::parse(
            r#"[{"type":"charge_confirmed","vehicle_ref":"v","plate":"p","amount":1,"payment_method":"cash"}]"#,
        );
        assert!(matches!(list, Err(CoreError::Validation(_))));

        // wrapped object
        let wrapped = VehicleServiceMessage::parse(
            r#"{"data":{"type":"charge_confirmed","vehicle_ref":"v","plate":"p","amount":1,"payment_method":"cash"}}"#,
        );
        assert!(wrapped.is_err());

        // unknown field
        let extra = VehicleServiceMessage::parse(
            r#"{"type":"charge_confirmed","vehicle_ref":"v","plate":"p","amount":1,"payment_method":"cash","tip":5}"#,
        );
        assert!(extra.is_err());
    }
}
