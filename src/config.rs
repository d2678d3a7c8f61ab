use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

/// Out-of-band break-glass credentials. When either env var is missing the
/// bypass login strategy is disabled entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct SuperuserConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// HTTP mail API endpoint; unset means notifications are no-ops.
    pub endpoint: Option<String>,
    pub api_key: String,
    pub sender: String,
    /// Base URL the password-reset link is built from.
    pub reset_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub superuser: Option<SuperuserConfig>,
    /// Expected audience (client id) of third-party identity assertions.
    pub oauth_client_id: Option<String>,
    pub mail: MailConfig,
    pub bcrypt_cost: u32,
    pub recovery_token_ttl_minutes: i64,
    pub notify_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "medjobs".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "medjobs-users".into()),
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let superuser = match (
            std::env::var("SUPERUSER_EMAIL"),
            std::env::var("SUPERUSER_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(SuperuserConfig { email, password }),
            _ => None,
        };
        let mail = MailConfig {
            endpoint: std::env::var("MAIL_ENDPOINT").ok(),
            api_key: std::env::var("MAIL_API_KEY").unwrap_or_default(),
            sender: std::env::var("MAIL_SENDER")
                .unwrap_or_else(|_| "no-reply@medjobs.example".into()),
            reset_base_url: std::env::var("RESET_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/reset-password".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            superuser,
            oauth_client_id: std::env::var("OAUTH_CLIENT_ID").ok(),
            mail,
            bcrypt_cost: std::env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(12),
            recovery_token_ttl_minutes: std::env::var("RECOVERY_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            notify_timeout_secs: std::env::var("NOTIFY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        })
    }
}
