use serde::{Deserialize, Serialize};

use crate::auth::repo_types::Identity;
use crate::auth::roles::Role;

/// Request body for registration. Multipart registrations carry the same
/// fields as form parts plus an optional `resume` file part.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub title: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    #[serde(default)]
    pub location: String,
    pub role: String,
    // candidate fields
    #[serde(default)]
    pub qualification: Option<String>,
    // employer fields
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub organization_category: Option<String>,
}

/// Registration succeeds without a session; the account logs in separately.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub id: i64,
    pub role: Role,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Third-party login carries the provider-issued identity assertion.
#[derive(Debug, Deserialize)]
pub struct OAuthLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
    /// Candidate profile-completion percentage; always 100 for other roles.
    pub profile_completion: u8,
}

/// Display-safe part of the account returned to clients. Never carries the
/// password hash or recovery fields.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub photo_url: Option<String>,
}

impl From<&Identity> for PublicUser {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            full_name: identity.full_name.clone(),
            role: identity.role,
            photo_url: identity.photo_url.clone(),
        }
    }
}

/// The guard-refreshed identity echoed back on `/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn public_user_never_serializes_secrets() {
        let identity = Identity {
            id: 9,
            email: "jane@example.com".into(),
            password_hash: Some("$2b$12$secret".into()),
            role: Role::Candidate,
            full_name: "Jane Doe".into(),
            title: "Ms".into(),
            phone: "5551234567".into(),
            location: "Austin".into(),
            oauth_subject: None,
            photo_url: None,
            email_verified: false,
            recovery_token: Some("tok".into()),
            recovery_token_expires_at: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(&identity)).unwrap();
        assert!(json.contains("jane@example.com"));
        assert!(!json.contains("secret"));
        assert!(!json.contains("tok"));

        // The row type itself also skips secrets when serialized directly.
        let row_json = serde_json::to_string(&identity).unwrap();
        assert!(!row_json.contains("secret"));
        assert!(!row_json.contains("recovery_token"));
    }
}
