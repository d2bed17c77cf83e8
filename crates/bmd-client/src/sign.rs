//! Request signing for authenticated endpoints.
//!
//! Bitget signs each request with
//! `base64(HMAC-SHA256(secret, timestamp + METHOD + path?sorted-query + body))`
//! and sends the signature alongside the API key and passphrase headers.
//! Market-data endpoints also work unsigned, so credentials are optional.

use crate::error::{ClientError, ClientResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "BG_API_KEY";
/// Environment variable holding the API secret.
pub const ENV_SECRET_KEY: &str = "BG_SECRET_KEY";
/// Environment variable holding the API passphrase.
pub const ENV_PASSPHRASE: &str = "BG_PASSPHRASE";

/// API credentials.
///
/// The secret is kept in `Zeroizing` storage; never log it.
pub struct Credentials {
    pub api_key: String,
    pub passphrase: String,
    secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            passphrase: passphrase.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Load credentials from the environment.
    ///
    /// Returns `None` unless all three variables are set; partial
    /// credentials cannot produce a valid signature.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(ENV_API_KEY).ok()?;
        let secret = std::env::var(ENV_SECRET_KEY).ok()?;
        let passphrase = std::env::var(ENV_PASSPHRASE).ok()?;
        Some(Self::new(api_key, secret, passphrase))
    }

    /// Compute the request signature over
    /// `timestamp + METHOD + request_path + body`.
    ///
    /// `request_path` must already include the sorted query string.
    pub fn sign(
        &self,
        timestamp: &str,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> ClientResult<String> {
        let message = format!("{timestamp}{}{request_path}{body}", method.to_uppercase());
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ClientError::Signing(e.to_string()))?;
        mac.update(message.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("passphrase", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}
