use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role labels held by a principal or required by an endpoint.
///
/// Ordered so that token claims serialize the same way every time.
pub type RoleSet = BTreeSet<String>;

/// Builds a [`RoleSet`] from string-like labels.
pub fn role_set<I, S>(labels: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels.into_iter().map(Into::into).collect()
}

// --- Core Identity Types ---

/// Principal
///
/// An authenticated identity and its roles. Produced by the credential validator at login and
/// embedded into a token by the token service. Fields are private so a principal cannot be
/// altered once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: String,
    username: String,
    roles: RoleSet,
}

impl Principal {
    pub fn new(id: impl Into<String>, username: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }
}

/// UserRecord
///
/// The credential record returned by the external user store. `password_hash` is opaque to
/// this crate and only ever handed to a `PasswordVerifier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: RoleSet,
}

impl UserRecord {
    /// Consumes the record, dropping the hash, and yields the principal it describes.
    pub fn into_principal(self) -> Principal {
        Principal::new(self.id.to_string(), self.username, self.roles)
    }
}

// --- Request Payloads ---

/// LoginRequest
///
/// Input payload for the token endpoint (POST /auth/token). The password is compared against
/// the stored hash and never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// --- Responses ---

/// LoginResponse
///
/// Output of a successful login. `expires_in` is the token lifetime in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// ProfileResponse
///
/// Output of GET /me: who the presented token says the caller is.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileResponse {
    pub subject: String,
    pub roles: Vec<String>,
}

/// ErrorBody
///
/// JSON body of every rejection. Messages are deliberately generic.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}
