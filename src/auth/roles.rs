use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Canonical account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    Candidate,
    Hr,
    Administrator,
}

/// Accepted registration role tokens and the canonical role each maps to.
/// Anything outside this table is rejected rather than silently defaulted.
const ROLE_MAP: &[(&str, Role)] = &[
    ("candidate", Role::Candidate),
    ("doctor", Role::Candidate),
    ("nurse", Role::Candidate),
    ("hr", Role::Hr),
    ("employer", Role::Hr),
];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Hr => "hr",
            Role::Administrator => "administrator",
        }
    }

    /// Normalize a user-submitted role selector. Registration never yields
    /// an administrator; that role only exists via the break-glass login.
    pub fn from_registration_input(input: &str) -> Result<Role, ApiError> {
        let token = input.trim().to_lowercase();
        ROLE_MAP
            .iter()
            .find(|(accepted, _)| *accepted == token)
            .map(|(_, role)| *role)
            .ok_or_else(|| ApiError::InvalidInput(format!("Unknown role: {input}")))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
