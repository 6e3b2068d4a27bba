//! Client-side session storage
//!
//! The dashboard keeps exactly two values in persistent key-value storage: the
//! access token and the refresh token. Nothing else about the session is tracked
//! locally; expiry is only ever discovered through a 401 from the API.
//!
//! [`SessionStore`] is the capability the HTTP client and the router are given.
//! Implementations only need `get`/`set`/`clear`; the token helpers are derived.

mod file;
mod memory;

pub use file::{FileSessionStore, SESSION_FILE_NAME};
pub use memory::MemorySessionStore;

use crate::CoreResult;
use crate::guard::SessionPresence;
use std::fmt;

/// Fixed storage keys for the session tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    /// Key under which the token is persisted
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access_token",
            Self::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability for reading and writing the persisted session tokens
pub trait SessionStore: Send + Sync {
    /// Read a raw value
    fn get(&self, key: TokenKey) -> CoreResult<Option<String>>;

    /// Write a raw value
    fn set(&self, key: TokenKey, value: &str) -> CoreResult<()>;

    /// Remove both tokens as a unit
    fn clear(&self) -> CoreResult<()>;

    /// Current access token, if a non-empty one is stored
    fn access_token(&self) -> CoreResult<Option<String>> {
        Ok(self.get(TokenKey::Access)?.filter(|t| !t.is_empty()))
    }

    /// Current refresh token, if a non-empty one is stored
    fn refresh_token(&self) -> CoreResult<Option<String>> {
        Ok(self.get(TokenKey::Refresh)?.filter(|t| !t.is_empty()))
    }

    /// Persist a freshly issued access token and, when the server rotated it,
    /// the new refresh token. A missing refresh token leaves the stored one alone.
    fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> CoreResult<()> {
        self.set(TokenKey::Access, access_token)?;
        if let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) {
            self.set(TokenKey::Refresh, refresh_token)?;
        }
        Ok(())
    }

    /// Which tokens are present; the navigation guard only looks at this
    fn presence(&self) -> CoreResult<SessionPresence> {
        Ok(SessionPresence {
            has_access: self.access_token()?.is_some(),
            has_refresh: self.refresh_token()?.is_some(),
        })
    }
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn get(&self, key: TokenKey) -> CoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: TokenKey, value: &str) -> CoreResult<()> {
        (**self).set(key, value)
    }

    fn clear(&self) -> CoreResult<()> {
        (**self).clear()
    }
}
