//! Session data and identity-token decoding

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, TokenExchangeError};

/// Group membership that grants the admin role.
pub const ADMIN_GROUP: &str = "admin";

/// Brand assigned when the identity token carries none.
pub const UNKNOWN_BRAND: &str = "Unknown";

/// Authorization role of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Platform administrator, sees every brand.
    Admin,
    /// Brand owner, sees only their own brand.
    Brand,
}

/// The decoded identity and authorization context of the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub brand: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Brand filter for this session's own feeds: `None` (all brands) for admins.
    pub fn brand_scope(&self) -> Option<&str> {
        match self.role {
            Role::Admin => None,
            Role::Brand => Some(&self.brand),
        }
    }
}

/// Credentials obtained from the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub id_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime in seconds as reported by the token endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    pub obtained_at: DateTime<Utc>,
}

impl TokenBundle {
    pub fn new(id_token: impl Into<String>, obtained_at: DateTime<Utc>) -> Self {
        Self {
            id_token: id_token.into(),
            access_token: None,
            refresh_token: None,
            token_type: None,
            expires_in: None,
            obtained_at,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| self.obtained_at + Duration::seconds(secs))
    }

    /// A bundle without a reported lifetime never expires locally.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// Token sent as the bearer credential on telemetry reads.
    pub fn bearer(&self) -> &str {
        &self.id_token
    }
}

/// Raw body of a successful token-endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn into_bundle(self, obtained_at: DateTime<Utc>) -> Result<TokenBundle, TokenExchangeError> {
        let id_token = self
            .id_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TokenExchangeError::MalformedResponse("missing id_token".into()))?;

        Ok(TokenBundle {
            id_token,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            obtained_at,
        })
    }
}

/// The claim set PackSight reads from an identity token.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdTokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "custom:brand", default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(rename = "cognito:groups", default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl IdTokenClaims {
    /// Claims that decode back into `session`.
    pub fn from_session(session: &Session) -> Self {
        let groups = match session.role {
            Role::Admin => vec![ADMIN_GROUP.to_string()],
            Role::Brand => Vec::new(),
        };
        Self {
            sub: Some(session.id.clone()),
            email: Some(session.email.clone()),
            brand: Some(session.brand.clone()),
            groups,
            exp: None,
        }
    }

    pub fn into_session(self) -> Result<Session, AuthError> {
        let id = required_claim(self.sub, "sub")?;
        let email = required_claim(self.email, "email")?;
        let role = if self.groups.iter().any(|g| g == ADMIN_GROUP) {
            Role::Admin
        } else {
            Role::Brand
        };

        Ok(Session {
            id,
            email,
            brand: self.brand.unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
            role,
        })
    }
}

fn required_claim(value: Option<String>, name: &str) -> Result<String, AuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AuthError::DecodeFailure(format!("missing claim: {}", name))),
    }
}

/// Decode an identity token's claims without verifying its signature.
pub fn decode_claims(id_token: &str) -> Result<IdTokenClaims, AuthError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<IdTokenClaims>(id_token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::DecodeFailure(e.to_string()))
}

/// Decode the identity token of `bundle` into a [`Session`].
pub fn decode_session(bundle: &TokenBundle) -> Result<Session, AuthError> {
    decode_claims(&bundle.id_token)?.into_session()
}
