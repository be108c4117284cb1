//! Authentication and request session
//!
//! Requests are built from an explicit `Session` holding the tenant id and a
//! token provider. Nothing reads credentials from global state.
//!
//! Token sources:
//! 1. `StaticToken` - a token handed over by the caller (tests, CLI flag)
//! 2. `EnvToken` - read from an environment variable on every request
//! 3. `NoToken` - always unauthenticated

use reqwest::RequestBuilder;
use std::env;
use std::fmt;
use std::sync::Arc;

/// Source of the bearer token attached to requests
pub trait TokenProvider: Send + Sync + fmt::Debug {
    /// Current token, or `None` to send the request unauthenticated
    fn token(&self) -> Option<String>;
}

/// Fixed token
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone()).filter(|t| !t.is_empty())
    }
}

/// Token read from an environment variable at request time
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn token(&self) -> Option<String> {
        env::var(&self.var).ok().filter(|t| !t.trim().is_empty())
    }
}

/// No credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Per-tenant request context
#[derive(Debug, Clone)]
pub struct Session {
    tenant_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl Session {
    pub fn new(tenant_id: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tokens,
        }
    }

    /// Session without credentials
    pub fn anonymous(tenant_id: impl Into<String>) -> Self {
        Self::new(tenant_id, Arc::new(NoToken))
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Attach tenant and (when available) bearer headers
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("X-Tenant-ID", &self.tenant_id);
        match self.tokens.token() {
            Some(token) => builder.bearer_auth(token),
            None => {
                tracing::debug!("No auth token available, sending request unauthenticated");
                builder
            }
        }
    }
}
