use sqlx::PgPool;
use time::OffsetDateTime;

use crate::auth::repo_types::{Identity, LoginRow, NewIdentity, NewProfile};
use crate::auth::roles::Role;
use crate::error::ApiError;

const IDENTITY_COLUMNS: &str = "id, email, password_hash, role, full_name, title, phone, \
     location, oauth_subject, photo_url, email_verified, recovery_token, \
     recovery_token_expires_at, created_at, updated_at";

impl Identity {
    /// Case-insensitive email lookup.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<Identity>> {
        sqlx::query_as::<_, Identity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Identity>> {
        sqlx::query_as::<_, Identity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Lookup for credential login, joined with the candidate profile fields
    /// the completion scorer reads.
    pub async fn find_login_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<LoginRow>> {
        sqlx::query_as::<_, LoginRow>(
            r#"
            SELECT u.id, u.email, u.password_hash, u.role, u.full_name, u.photo_url,
                   p.resume_url, p.summary, p.experience, p.education
            FROM users u
            LEFT JOIN candidate_profiles p ON p.user_id = u.id
            WHERE LOWER(u.email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Insert the identity and its role-specific profile in one transaction.
    /// Either both rows become visible or neither does; a concurrent
    /// duplicate email loses on the unique index and maps to AccountExists.
    pub async fn create_with_profile(db: &PgPool, new: &NewIdentity) -> Result<Identity, ApiError> {
        let mut tx = db.begin().await?;

        let identity = sqlx::query_as::<_, Identity>(&format!(
            r#"
            INSERT INTO users (email, password_hash, role, full_name, title, phone, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {IDENTITY_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role)
        .bind(&new.full_name)
        .bind(&new.title)
        .bind(&new.phone)
        .bind(&new.location)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => ApiError::AccountExists,
            _ => ApiError::from(e),
        })?;

        match &new.profile {
            NewProfile::Candidate {
                qualification,
                resume_url,
            } => {
                sqlx::query(
                    "INSERT INTO candidate_profiles (user_id, qualification, resume_url)
                     VALUES ($1, $2, $3)",
                )
                .bind(identity.id)
                .bind(qualification)
                .bind(resume_url)
                .execute(&mut *tx)
                .await?;
            }
            NewProfile::Employer {
                organization_name,
                organization_category,
            } => {
                sqlx::query(
                    "INSERT INTO employer_profiles (user_id, organization_name, organization_category)
                     VALUES ($1, $2, $3)",
                )
                .bind(identity.id)
                .bind(organization_name)
                .bind(organization_category)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(identity)
    }

    /// Find-or-create half of the OAuth merge: a brand-new third-party login
    /// becomes a verified candidate with an empty profile.
    pub async fn create_from_oauth(
        db: &PgPool,
        email: &str,
        full_name: &str,
        subject: &str,
        picture: Option<&str>,
    ) -> Result<Identity, ApiError> {
        let mut tx = db.begin().await?;

        let identity = sqlx::query_as::<_, Identity>(&format!(
            r#"
            INSERT INTO users (email, role, full_name, oauth_subject, photo_url, email_verified)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {IDENTITY_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(Role::Candidate)
        .bind(full_name)
        .bind(subject)
        .bind(picture)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => ApiError::AccountExists,
            _ => ApiError::from(e),
        })?;

        sqlx::query("INSERT INTO candidate_profiles (user_id) VALUES ($1)")
            .bind(identity.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(identity)
    }

    /// Backfill half of the OAuth merge. Only fills columns that are still
    /// null and marks the email verified; role is never touched. Idempotent:
    /// repeat logins after the first backfill change nothing.
    pub async fn backfill_oauth(
        db: &PgPool,
        id: i64,
        subject: &str,
        picture: Option<&str>,
    ) -> sqlx::Result<Identity> {
        sqlx::query_as::<_, Identity>(&format!(
            r#"
            UPDATE users
            SET oauth_subject = COALESCE(oauth_subject, $2),
                photo_url = COALESCE(photo_url, $3),
                email_verified = TRUE,
                updated_at = now()
            WHERE id = $1
            RETURNING {IDENTITY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(subject)
        .bind(picture)
        .fetch_one(db)
        .await
    }

    /// Both recovery fields are written together; a later request overwrites
    /// any outstanding token.
    pub async fn set_recovery_token(
        db: &PgPool,
        id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users
             SET recovery_token = $2, recovery_token_expires_at = $3, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Single-use redemption as one conditional update: the token must match
    /// and be unexpired, and the same statement that installs the new hash
    /// clears both recovery fields. Returns the affected user id, or None
    /// for a wrong or expired token.
    pub async fn consume_recovery_token(
        db: &PgPool,
        token: &str,
        new_password_hash: &str,
    ) -> sqlx::Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE users
             SET password_hash = $2, recovery_token = NULL,
                 recovery_token_expires_at = NULL, updated_at = now()
             WHERE recovery_token = $1 AND recovery_token_expires_at > now()
             RETURNING id",
        )
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    pub async fn update_password(db: &PgPool, id: i64, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Hard delete; profile rows go with it via ON DELETE CASCADE.
    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<Identity>> {
        sqlx::query_as::<_, Identity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await
    }
}
