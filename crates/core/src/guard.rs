//! Navigation guard
//!
//! A pure decision over which tokens are stored and what the target page
//! declares. Token validity is never checked here; an expired access token is
//! only noticed when the next API call comes back 401.

use crate::routes::{AuthRequirement, HOME_PATH, LOGIN_PATH, normalize_path};
use serde::Serialize;

/// Which session tokens are present in storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionPresence {
    pub has_access: bool,
    pub has_refresh: bool,
}

impl SessionPresence {
    /// Both tokens stored
    pub const fn is_complete(self) -> bool {
        self.has_access && self.has_refresh
    }
}

/// Outcome of the guard for one transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

/// Decide whether a transition from `from` to `to` may proceed
pub fn check(
    from: Option<&str>,
    to: &str,
    requirement: AuthRequirement,
    presence: SessionPresence,
) -> GuardDecision {
    let to = normalize_path(to);
    if from.is_some_and(|from| normalize_path(from) == to) {
        return GuardDecision::Allow;
    }

    match requirement {
        AuthRequirement::RequiresAuth if !presence.is_complete() => {
            GuardDecision::Redirect(LOGIN_PATH)
        }
        AuthRequirement::Guest if presence.is_complete() => GuardDecision::Redirect(HOME_PATH),
        _ => GuardDecision::Allow,
    }
}
