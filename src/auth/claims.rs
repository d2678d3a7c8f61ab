use serde::{Deserialize, Serialize};

use crate::auth::roles::Role;

/// JWT payload used for authentication. The role claim is informational;
/// the guard re-reads the account row and treats the stored role as
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,    // user ID (0 = synthetic break-glass administrator)
    pub role: Role,  // role at issuance time
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}
