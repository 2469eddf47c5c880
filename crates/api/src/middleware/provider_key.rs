//! Per-request provider credential override.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying a caller-supplied provider API key.
pub const PROVIDER_KEY_HEADER: &str = "x-provider-key";

/// The caller's provider key, if the `x-provider-key` header was sent with
/// a non-blank value. When absent the server's default credential is used.
#[derive(Debug, Clone, Default)]
pub struct ProviderKey(pub Option<String>);

impl ProviderKey {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ProviderKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(PROVIDER_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        Ok(ProviderKey(key))
    }
}
