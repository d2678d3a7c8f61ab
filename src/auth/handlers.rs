use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::{delete, get, post},
    Json, Router,
};
use rand::RngCore;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, DeleteAccountRequest, ForgotPasswordRequest,
            LoginRequest, MessageResponse, MeResponse, OAuthLoginRequest, PublicUser,
            RegisterRequest, RegisterResponse, ResetPasswordRequest,
        },
        extractors::{AdminUser, CurrentUser, SUPERUSER_ID},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{Identity, LoginRow, NewIdentity, NewProfile},
        roles::Role,
        scoring::profile_completion,
        validate::{is_valid_email, validate_password_strength, validate_phone},
    },
    error::ApiError,
    notify::send_detached,
    oauth::VerifiedIdentity,
    state::AppState,
};
use sqlx::PgPool;

/// Returned for every forgot-password request, found or not, so the endpoint
/// cannot be used to probe which emails have accounts.
const GENERIC_RESET_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/oauth", post(oauth_login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/account/password", post(change_password))
        .route("/account", delete(delete_account))
        .route("/admin/users", get(admin_users))
}

// --- registration ---

#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<RegisterResponse>, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    // Multipart carries the optional resume file; everything else is JSON.
    let (mut payload, resume_ref) = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|_| ApiError::InvalidInput("Malformed multipart body".into()))?;
        read_register_multipart(multipart).await?
    } else {
        let Json(payload) = Json::<RegisterRequest>::from_request(request, &state)
            .await
            .map_err(|_| ApiError::InvalidInput("Malformed registration body".into()))?;
        (payload, None)
    };

    payload.email = payload.email.trim().to_lowercase();

    // Fail fast: nothing is written until every check passes.
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::InvalidInput("Invalid email address".into()));
    }
    validate_password_strength(&payload.password)?;
    validate_phone(&payload.phone)?;
    let role = Role::from_registration_input(&payload.role)?;

    if Identity::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::AccountExists);
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost)?;

    let profile = match role {
        Role::Candidate => NewProfile::Candidate {
            qualification: payload.qualification.unwrap_or_default(),
            resume_url: resume_ref,
        },
        Role::Hr => NewProfile::Employer {
            organization_name: payload.organization_name.unwrap_or_default(),
            organization_category: payload.organization_category.unwrap_or_default(),
        },
        Role::Administrator => {
            // Unreachable via the mapping table; keep the guard anyway.
            return Err(ApiError::InvalidInput("Unknown role: administrator".into()));
        }
    };

    let identity = Identity::create_with_profile(
        &state.db,
        &NewIdentity {
            email: payload.email,
            password_hash,
            role,
            full_name: payload.full_name,
            title: payload.title,
            phone: payload.phone,
            location: payload.location,
            profile,
        },
    )
    .await?;

    // Post-commit side effect: the welcome email never changes the outcome.
    send_detached(
        state.notifier.clone(),
        Duration::from_secs(state.config.notify_timeout_secs),
        identity.email.clone(),
        "Welcome to MedJobs".into(),
        format!(
            "Hello {},\n\nYour {} account has been created. You can now log in.",
            identity.full_name, identity.role
        ),
    );

    info!(user_id = identity.id, role = %identity.role, "user registered");
    Ok(Json(RegisterResponse {
        success: true,
        id: identity.id,
        role: identity.role,
        message: "Registration successful, please log in".into(),
    }))
}

async fn read_register_multipart(
    mut multipart: Multipart,
) -> Result<(RegisterRequest, Option<String>), ApiError> {
    let mut payload = RegisterRequest::default();
    let mut resume_ref = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::InvalidInput("Malformed multipart body".into()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "resume" {
            // File storage is handled elsewhere; only the reference is kept.
            resume_ref = field.file_name().map(String::from);
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|_| ApiError::InvalidInput("Malformed multipart body".into()))?;
        match name.as_str() {
            "title" => payload.title = value,
            "full_name" => payload.full_name = value,
            "email" => payload.email = value,
            "password" => payload.password = value,
            "phone" => payload.phone = value,
            "location" => payload.location = value,
            "role" => payload.role = value,
            "qualification" => payload.qualification = Some(value),
            "organization_name" => payload.organization_name = Some(value),
            "organization_category" => payload.organization_category = Some(value),
            _ => {}
        }
    }

    Ok((payload, resume_ref))
}

// --- login ---

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    let keys = JwtKeys::from_ref(&state);

    // Strategy 1: break-glass bypass. Exact sentinel match, no store access.
    if let Some(superuser) = &state.config.superuser {
        if payload.email == superuser.email && payload.password == superuser.password {
            warn!("superuser bypass login");
            let token = keys.sign(SUPERUSER_ID, Role::Administrator)?;
            return Ok(Json(AuthResponse {
                success: true,
                token,
                user: PublicUser {
                    id: SUPERUSER_ID,
                    email: superuser.email.clone(),
                    full_name: "Superuser".into(),
                    role: Role::Administrator,
                    photo_url: None,
                },
                profile_completion: 100,
            }));
        }
    }

    // Strategy 2: credential login. Unknown email and wrong password fail
    // identically.
    let row = Identity::find_login_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::InvalidCredentials
        })?;

    let hash = row.password_hash.as_deref().ok_or_else(|| {
        // OAuth-only account without a password set.
        warn!(user_id = row.id, "login against passwordless account");
        ApiError::InvalidCredentials
    })?;

    if !verify_password(&payload.password, hash)? {
        warn!(user_id = row.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = keys.sign(row.id, row.role)?;
    info!(user_id = row.id, role = %row.role, "user logged in");
    Ok(Json(auth_response(token, &row)))
}

fn auth_response(token: String, row: &LoginRow) -> AuthResponse {
    let profile_completion = match row.role {
        Role::Candidate => profile_completion(
            row.resume_url.as_deref(),
            row.summary.as_deref(),
            row.experience.as_deref(),
            row.education.as_deref(),
        ),
        _ => 100,
    };
    AuthResponse {
        success: true,
        token,
        user: PublicUser {
            id: row.id,
            email: row.email.clone(),
            full_name: row.full_name.clone(),
            role: row.role,
            photo_url: row.photo_url.clone(),
        },
        profile_completion,
    }
}

/// Strategy 3: third-party login with find-or-create and idempotent
/// backfill. Never creates a duplicate account for an existing email and
/// never changes a stored role.
#[instrument(skip(state, payload))]
pub async fn oauth_login(
    State(state): State<AppState>,
    Json(payload): Json<OAuthLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let verified = state.verifier.verify(&payload.id_token).await?;
    let email = verified.email.trim().to_lowercase();

    let identity = match Identity::find_by_email(&state.db, &email).await? {
        Some(existing) => merge_oauth(&state.db, existing, &verified).await?,
        None => {
            match Identity::create_from_oauth(
                &state.db,
                &email,
                &verified.name,
                &verified.subject,
                verified.picture.as_deref(),
            )
            .await
            {
                Ok(identity) => {
                    info!(user_id = identity.id, "oauth account created");
                    identity
                }
                // Lost a concurrent first-login race on the email index; the
                // row exists now, so merge into it instead of erroring.
                Err(ApiError::AccountExists) => {
                    let existing = Identity::find_by_email(&state.db, &email)
                        .await?
                        .ok_or(ApiError::AccountNotFound)?;
                    merge_oauth(&state.db, existing, &verified).await?
                }
                Err(e) => return Err(e),
            }
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(identity.id, identity.role)?;

    // Re-read through the login join so candidates get a real score.
    let row = Identity::find_login_by_email(&state.db, &identity.email)
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    info!(user_id = identity.id, "oauth login");
    Ok(Json(auth_response(token, &row)))
}

/// The backfill only fires when it would change a stored column; repeat
/// logins after the first merge are pure reads.
fn needs_oauth_backfill(existing: &Identity, verified: &VerifiedIdentity) -> bool {
    existing.oauth_subject.is_none()
        || !existing.email_verified
        || (existing.photo_url.is_none() && verified.picture.is_some())
}

async fn merge_oauth(
    db: &PgPool,
    existing: Identity,
    verified: &VerifiedIdentity,
) -> Result<Identity, ApiError> {
    if needs_oauth_backfill(&existing, verified) {
        Ok(Identity::backfill_oauth(
            db,
            existing.id,
            &verified.subject,
            verified.picture.as_deref(),
        )
        .await?)
    } else {
        Ok(existing)
    }
}

// --- recovery ---

fn generate_recovery_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Unlike the welcome email, this dispatch is load-bearing: a lost reset
/// email means a locked-out user, so failures propagate.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let Some(identity) = Identity::find_by_email(&state.db, &email).await? else {
        info!("password reset requested for unknown email");
        return Ok(Json(MessageResponse::ok(GENERIC_RESET_MESSAGE)));
    };

    let token = generate_recovery_token();
    let ttl_minutes = state.config.recovery_token_ttl_minutes;
    let expires_at = OffsetDateTime::now_utc() + TimeDuration::minutes(ttl_minutes);
    Identity::set_recovery_token(&state.db, identity.id, &token, expires_at).await?;

    let link = format!("{}?token={}", state.config.mail.reset_base_url, token);
    let body = format!(
        "Hello {},\n\nUse the link below to reset your password. \
         It expires in {} minutes and can be used once.\n\n{}",
        identity.full_name, ttl_minutes, link
    );
    let send = state
        .notifier
        .send(&identity.email, "Reset your password", &body);
    match tokio::time::timeout(Duration::from_secs(state.config.notify_timeout_secs), send).await {
        Ok(Ok(())) => {
            info!(user_id = identity.id, "password reset email sent");
            Ok(Json(MessageResponse::ok(GENERIC_RESET_MESSAGE)))
        }
        Ok(Err(e)) => {
            error!(error = %e, user_id = identity.id, "reset email failed");
            Err(ApiError::NotificationFailed)
        }
        Err(_) => {
            error!(user_id = identity.id, "reset email timed out");
            Err(ApiError::NotificationFailed)
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password_strength(&payload.new_password)?;
    let password_hash = hash_password(&payload.new_password, state.config.bcrypt_cost)?;

    // One conditional update: match, expiry check, new hash and token
    // clearing all happen in the same statement.
    let user_id = Identity::consume_recovery_token(&state.db, &payload.token, &password_hash)
        .await?
        .ok_or(ApiError::InvalidOrExpiredToken)?;

    info!(user_id, "password reset completed");
    Ok(Json(MessageResponse::ok("Your password has been reset")))
}

#[instrument(skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let identity = Identity::find_by_id(&state.db, user.id)
        .await?
        .ok_or(ApiError::AccountNotFound)?;
    let current_hash = identity
        .password_hash
        .as_deref()
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.current_password, current_hash)? {
        warn!(user_id = user.id, "change-password with wrong current password");
        return Err(ApiError::InvalidCredentials);
    }

    validate_password_strength(&payload.new_password)?;
    if verify_password(&payload.new_password, current_hash)? {
        return Err(ApiError::InvalidInput(
            "New password must differ from the current password".into(),
        ));
    }

    let new_hash = hash_password(&payload.new_password, state.config.bcrypt_cost)?;
    Identity::update_password(&state.db, user.id, &new_hash).await?;

    info!(user_id = user.id, "password changed");
    Ok(Json(MessageResponse::ok("Your password has been changed")))
}

/// Hard, irreversible boundary: unlike token recovery there is no way back
/// after this succeeds. Profiles go with the identity via cascade.
#[instrument(skip(state, user, payload))]
pub async fn delete_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let identity = Identity::find_by_id(&state.db, user.id)
        .await?
        .ok_or(ApiError::AccountNotFound)?;
    let current_hash = identity
        .password_hash
        .as_deref()
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, current_hash)? {
        warn!(user_id = user.id, "account deletion with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    if !Identity::delete(&state.db, user.id).await? {
        return Err(ApiError::AccountNotFound);
    }

    info!(user_id = user.id, "account deleted");
    Ok(Json(MessageResponse::ok("Your account has been deleted")))
}

// --- protected reads ---

#[instrument(skip(user))]
pub async fn me(user: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        role: user.role,
    })
}

#[instrument(skip(state, admin))]
pub async fn admin_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = Identity::list_all(&state.db).await?;
    info!(admin_id = admin.id, count = users.len(), "admin user listing");
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_tokens_are_long_hex_and_unique() {
        let a = generate_recovery_token();
        let b = generate_recovery_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn reset_link_embeds_the_token() {
        let link = format!("{}?token={}", "https://app.example/reset", "abc123");
        assert_eq!(link, "https://app.example/reset?token=abc123");
    }

    fn merged_identity(photo_url: Option<&str>) -> Identity {
        Identity {
            id: 1,
            email: "oauth@example.com".into(),
            password_hash: None,
            role: Role::Candidate,
            full_name: "OAuth User".into(),
            title: String::new(),
            phone: String::new(),
            location: String::new(),
            oauth_subject: Some("oauth-sub-1".into()),
            photo_url: photo_url.map(String::from),
            email_verified: true,
            recovery_token: None,
            recovery_token_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn verified_fixture(picture: Option<&str>) -> VerifiedIdentity {
        VerifiedIdentity {
            subject: "oauth-sub-1".into(),
            email: "oauth@example.com".into(),
            name: "OAuth User".into(),
            picture: picture.map(String::from),
        }
    }

    #[test]
    fn backfill_skipped_when_nothing_would_change() {
        // Fully merged account, assertion carries no picture: the missing
        // photo cannot be filled, so no write should happen.
        let existing = merged_identity(None);
        assert!(!needs_oauth_backfill(&existing, &verified_fixture(None)));

        let complete = merged_identity(Some("https://pics.example/1.jpg"));
        assert!(!needs_oauth_backfill(
            &complete,
            &verified_fixture(Some("https://pics.example/1.jpg"))
        ));
    }

    #[test]
    fn backfill_runs_when_a_column_would_change() {
        let mut missing_subject = merged_identity(None);
        missing_subject.oauth_subject = None;
        assert!(needs_oauth_backfill(
            &missing_subject,
            &verified_fixture(None)
        ));

        let mut unverified = merged_identity(None);
        unverified.email_verified = false;
        assert!(needs_oauth_backfill(&unverified, &verified_fixture(None)));

        let no_photo = merged_identity(None);
        assert!(needs_oauth_backfill(
            &no_photo,
            &verified_fixture(Some("https://pics.example/new.jpg"))
        ));
    }

    // Store-backed flows; skipped when DATABASE_URL is unset.
    mod store {
        use super::*;
        use crate::auth::dto::OAuthLoginRequest;
        use crate::testutil::{candidate_fixture, test_pool};
        use axum::extract::State;

        // Both tests below work on the fake verifier's fixed email, so they
        // must not interleave.
        static OAUTH_EMAIL_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

        async fn oauth_state() -> Option<AppState> {
            let db = test_pool().await?;
            let mut state = AppState::fake();
            state.db = db;
            // The fake verifier always yields oauth@example.com; clear any
            // leftover row so runs are independent.
            if let Some(existing) =
                Identity::find_by_email(&state.db, "oauth@example.com").await.ok()?
            {
                Identity::delete(&state.db, existing.id).await.ok()?;
            }
            Some(state)
        }

        #[tokio::test]
        async fn oauth_login_is_idempotent() {
            let _guard = OAUTH_EMAIL_LOCK.lock().await;
            let Some(state) = oauth_state().await else { return };

            let request = || {
                Json(OAuthLoginRequest {
                    id_token: "good-assertion".into(),
                })
            };
            let first = oauth_login(State(state.clone()), request()).await.unwrap();
            let second = oauth_login(State(state.clone()), request()).await.unwrap();

            // Same account, same role, no duplicate row.
            assert_eq!(first.0.user.id, second.0.user.id);
            assert_eq!(second.0.user.role, Role::Candidate);
            let stored = Identity::find_by_email(&state.db, "oauth@example.com")
                .await
                .unwrap()
                .expect("single oauth account");
            assert_eq!(stored.id, first.0.user.id);
            assert_eq!(stored.role, Role::Candidate);

            Identity::delete(&state.db, stored.id).await.unwrap();
        }

        #[tokio::test]
        async fn oauth_merge_backfills_an_existing_account_once() {
            let _guard = OAUTH_EMAIL_LOCK.lock().await;
            let Some(state) = oauth_state().await else { return };

            // Password account registered first with the same email.
            let local = Identity::create_with_profile(
                &state.db,
                &candidate_fixture("oauth@example.com"),
            )
            .await
            .unwrap();

            let request = || {
                Json(OAuthLoginRequest {
                    id_token: "good-assertion".into(),
                })
            };
            let merged = oauth_login(State(state.clone()), request()).await.unwrap();
            assert_eq!(merged.0.user.id, local.id);

            let after_first = Identity::find_by_id(&state.db, local.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(after_first.oauth_subject.as_deref(), Some("oauth-sub-1"));
            assert!(after_first.email_verified);
            assert_eq!(after_first.role, Role::Candidate);

            // Second login converges without another write.
            oauth_login(State(state.clone()), request()).await.unwrap();
            let after_second = Identity::find_by_id(&state.db, local.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(after_second.updated_at, after_first.updated_at);

            Identity::delete(&state.db, local.id).await.unwrap();
        }
    }
}
