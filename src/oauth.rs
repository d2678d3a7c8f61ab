use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::error::ApiError;

/// Claims extracted from a verified third-party identity assertion.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Validates an externally issued identity assertion against the configured
/// audience and yields the verified claims.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, ApiError>;
}

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: String,
    // Google reports this as the string "true"/"false".
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Verifies Google ID tokens via the tokeninfo endpoint.
pub struct GoogleVerifier {
    client: reqwest::Client,
    audience: String,
    endpoint: String,
}

impl GoogleVerifier {
    pub fn new(audience: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            audience,
            endpoint: TOKENINFO_URL.to_string(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, ApiError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", assertion)])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "tokeninfo request failed");
                ApiError::ThirdPartyVerificationFailed
            })?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "tokeninfo rejected assertion");
            return Err(ApiError::ThirdPartyVerificationFailed);
        }
        let info: TokenInfo = response.json().await.map_err(|e| {
            warn!(error = %e, "tokeninfo response malformed");
            ApiError::ThirdPartyVerificationFailed
        })?;
        if info.aud != self.audience {
            warn!(aud = %info.aud, "tokeninfo audience mismatch");
            return Err(ApiError::ThirdPartyVerificationFailed);
        }
        if info.email_verified.as_deref() != Some("true") {
            warn!(email = %info.email, "third-party email not verified");
            return Err(ApiError::ThirdPartyVerificationFailed);
        }
        Ok(VerifiedIdentity {
            subject: info.sub,
            email: info.email,
            name: info.name.unwrap_or_default(),
            picture: info.picture,
        })
    }
}

/// Stands in when no OAuth client id is configured.
pub struct DisabledVerifier;

#[async_trait]
impl IdentityVerifier for DisabledVerifier {
    async fn verify(&self, _assertion: &str) -> Result<VerifiedIdentity, ApiError> {
        warn!("oauth login attempted but no client id is configured");
        Err(ApiError::ThirdPartyVerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_verifier_rejects_everything() {
        let err = DisabledVerifier.verify("any-token").await.unwrap_err();
        assert!(matches!(err, ApiError::ThirdPartyVerificationFailed));
    }

    #[test]
    fn tokeninfo_parses_google_shape() {
        let raw = r#"{
            "aud": "client-123",
            "sub": "10769150350006150715113082367",
            "email": "jane@example.com",
            "email_verified": "true",
            "name": "Jane Doe",
            "picture": "https://lh3.example.com/photo.jpg",
            "iss": "https://accounts.google.com",
            "exp": "1353604926"
        }"#;
        let info: TokenInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.aud, "client-123");
        assert_eq!(info.email_verified.as_deref(), Some("true"));
        assert_eq!(info.picture.as_deref(), Some("https://lh3.example.com/photo.jpg"));
    }
}
