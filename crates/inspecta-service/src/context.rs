//! Caller identity.
//!
//! Every operation receives an explicit [`OperatorContext`]; there is no
//! ambient "current user". Authentication happens upstream; this crate only
//! checks what an authenticated role may do.

use serde::{Deserialize, Serialize};

use inspecta_core::CashSession;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operates their own till.
    Cashier,
    /// Sees every till and runs treasury.
    Administrator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorContext {
    pub operator_id: String,
    pub role: Role,
}

impl OperatorContext {
    pub fn cashier(operator_id: impl Into<String>) -> Self {
        OperatorContext {
            operator_id: operator_id.into(),
            role: Role::Cashier,
        }
    }

    pub fn administrator(operator_id: impl Into<String>) -> Self {
        OperatorContext {
            operator_id: operator_id.into(),
            role: Role::Administrator,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    pub fn require_admin(&self, action: &str) -> ServiceResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::forbidden(&self.operator_id, action))
        }
    }

    /// Cashiers only reach their own sessions.
    pub fn ensure_can_access(&self, session: &CashSession) -> ServiceResult<()> {
        if self.is_admin() || session.operator_id == self.operator_id {
            Ok(())
        } else {
            Err(ServiceError::forbidden(
                &self.operator_id,
                format!("access session {}", session.id),
            ))
        }
    }
}
