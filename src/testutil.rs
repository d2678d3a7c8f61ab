//! Helpers for store-backed tests. These tests run against the database in
//! DATABASE_URL and return early when it is unset, so the pure unit suite
//! stays runnable anywhere.

use rand::RngCore;
use sqlx::PgPool;

use crate::auth::repo_types::{NewIdentity, NewProfile};
use crate::auth::roles::Role;

pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .ok()?;
    // Idempotent; the migrator takes an advisory lock, so parallel test
    // binaries do not race each other.
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(pool)
}

/// Random address so concurrent and repeated runs never collide on the
/// case-insensitive unique index.
pub fn unique_email(prefix: &str) -> String {
    let mut bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{prefix}-{suffix}@test.example")
}

pub fn candidate_fixture(email: &str) -> NewIdentity {
    NewIdentity {
        email: email.into(),
        password_hash: "$2b$04$fixturefixturefixturefixture".into(),
        role: Role::Candidate,
        full_name: "Test Candidate".into(),
        title: "Ms".into(),
        phone: "5551234567".into(),
        location: "Testville".into(),
        profile: NewProfile::Candidate {
            qualification: "RN".into(),
            resume_url: None,
        },
    }
}
