use crate::common::{MissingCredentialSnafu, Result};

/// Bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return MissingCredentialSnafu.fail();
        }
        Ok(Self(token))
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Endpoint and credential for one CLI invocation. Read-only once built.
#[derive(Debug, Clone)]
pub struct Session {
    base_url: url::Url,
    credential: Credential,
}

impl Session {
    pub fn new(base_url: url::Url, credential: Credential) -> Self {
        Self {
            base_url,
            credential,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Plain concatenation, so a base path like `/v1` is kept.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}
