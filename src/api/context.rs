//! Per-call request context.
//!
//! Every backend call receives an [`ApiContext`] explicitly instead of reading
//! the credential or base URL from process-wide state.

use std::fmt;

use crate::core::constants::{DEFAULT_API_BASE, DEFAULT_API_KEY};

/// Opaque API token sent as the `X-API-Key` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0 == DEFAULT_API_KEY
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiContext {
    pub base_url: String,
    pub credential: Credential,
}

impl ApiContext {
    pub fn new(base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            base_url: base_url.into(),
            credential,
        }
    }

    /// Returns a copy of this context carrying a different credential.
    pub fn with_credential(&self, credential: Credential) -> Self {
        Self {
            base_url: self.base_url.clone(),
            credential,
        }
    }
}

impl Default for ApiContext {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, Credential::default())
    }
}
