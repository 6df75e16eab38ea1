// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated caller identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TutorError;
use crate::types::Role;

/// The authenticated caller, produced once by the HTTP authentication layer
/// and passed explicitly into every booking-engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Fail with [`TutorError::Forbidden`] unless the principal has `role`.
    pub fn require(&self, role: Role) -> Result<(), TutorError> {
        if self.role == role {
            Ok(())
        } else {
            Err(TutorError::Forbidden(format!(
                "requires the {role} role, caller is {}",
                self.role
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_matches_role() {
        let p = Principal::new(Uuid::new_v4(), Role::Teacher);
        assert!(p.require(Role::Teacher).is_ok());
        let err = p.require(Role::Admin).unwrap_err();
        assert!(matches!(err, TutorError::Forbidden(_)));
        assert!(err.to_string().contains("admin"));
    }
}
