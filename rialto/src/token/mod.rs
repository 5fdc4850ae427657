//! Signed bearer credentials. A token is a base64 claims payload and a hex
//! HMAC-SHA256 signature joined by a dot. There is no revocation list, the fixed
//! validity window is the only invalidation mechanism.
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

type HmacSha256 = Hmac<Sha256>;

/// Tokens are valid for twelve hours from issue.
pub const TOKEN_TTL: Duration = Duration::hours(12);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    BadSignature,
    Expired,
}

impl std::error::Error for TokenError {}

impl core::fmt::Display for TokenError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Malformed"),
            TokenError::BadSignature => write!(f, "BadSignature"),
            TokenError::Expired => write!(f, "Expired"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TokenSigner {
    secret: String,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Secret comes from `RIALTO_TOKEN_SECRET`, with a development fallback.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("RIALTO_TOKEN_SECRET").unwrap_or_else(|_| "super-secret".to_string());
        Self::new(secret)
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac
    }

    pub fn issue(&self, sub: &str, username: &str, is_admin: bool) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.sign(&Claims {
            sub: sub.to_string(),
            username: username.to_string(),
            is_admin,
            iat: now,
            exp: now + TOKEN_TTL.whole_seconds(),
        })
    }

    pub fn sign(&self, claims: &Claims) -> String {
        // Claims serialization cannot fail, every field is a plain scalar
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("claims are serializable"));
        let signature = hex::encode(self.mac(&payload).finalize().into_bytes());
        format!("{payload}.{signature}")
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature_bytes = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        self.mac(payload)
            .verify_slice(&signature_bytes)
            .map_err(|_| TokenError::BadSignature)?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
