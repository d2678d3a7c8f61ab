use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::roles::Role;

/// Account record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // absent for pure-OAuth accounts
    pub role: Role,
    pub full_name: String,
    pub title: String,
    pub phone: String,
    pub location: String,
    pub oauth_subject: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub recovery_token: Option<String>,
    #[serde(skip_serializing)]
    pub recovery_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Identity joined with the candidate profile fields the login scorer needs.
/// Profile columns are null for hr accounts and for candidates without a
/// profile row.
#[derive(Debug, Clone, FromRow)]
pub struct LoginRow {
    pub id: i64,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub full_name: String,
    pub photo_url: Option<String>,
    pub resume_url: Option<String>,
    pub summary: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
}

/// Role-specific profile data created atomically with the identity.
#[derive(Debug, Clone)]
pub enum NewProfile {
    Candidate {
        qualification: String,
        resume_url: Option<String>,
    },
    Employer {
        organization_name: String,
        organization_category: String,
    },
}

/// Validated registration input, ready for the transactional insert.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    pub title: String,
    pub phone: String,
    pub location: String,
    pub profile: NewProfile,
}
