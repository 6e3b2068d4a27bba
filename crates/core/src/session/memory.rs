//! In-process session store

use super::{SessionStore, TokenKey};
use crate::{CoreError, CoreResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// Session store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<TokenKey, String>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding both tokens
    pub fn with_tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        let mut values = HashMap::new();
        values.insert(TokenKey::Access, access_token.into());
        values.insert(TokenKey::Refresh, refresh_token.into());
        Self {
            values: RwLock::new(values),
        }
    }
}

fn poisoned() -> CoreError {
    CoreError::storage("session lock poisoned")
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: TokenKey) -> CoreResult<Option<String>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> CoreResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key, value.to_string());
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        self.values.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}
