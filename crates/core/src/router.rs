//! Router that runs the navigation guard on every transition

use crate::guard::{self, GuardDecision};
use crate::routes::{Page, Resolution, RouteTable};
use crate::session::SessionStore;
use crate::{CoreError, CoreResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Upper bound on chained redirects for a single push
const MAX_REDIRECTS: usize = 8;

/// Capability to move the application to another route
pub trait Navigator: Send + Sync {
    /// Navigate to `path`, subject to the guard
    fn navigate(&self, path: &str) -> CoreResult<()>;
}

/// Where a navigation ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    /// Path that was asked for
    pub requested: String,
    /// Path that was committed
    pub location: String,
    pub page: Page,
    pub params: BTreeMap<String, String>,
    /// Whether a catch-all or guard redirect changed the destination
    pub redirected: bool,
}

/// Route table plus the current location
pub struct Router {
    table: RouteTable,
    store: Arc<dyn SessionStore>,
    // None until the first navigation commits
    current: Mutex<Option<String>>,
}

impl Router {
    /// Create a router over the admin route table
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_table(RouteTable::admin(), store)
    }

    /// Create a router over a custom table
    pub fn with_table(table: RouteTable, store: Arc<dyn SessionStore>) -> Self {
        Self {
            table,
            store,
            current: Mutex::new(None),
        }
    }

    /// Start from a known location, as when restoring history. The location
    /// is taken as-is without running the guard.
    pub fn start_at(self, path: &str) -> Self {
        Self {
            current: Mutex::new(Some(crate::routes::normalize_path(path))),
            ..self
        }
    }

    /// Route table in use
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Current location, if anything has been navigated to yet
    pub fn current(&self) -> CoreResult<Option<String>> {
        Ok(self.lock_current()?.clone())
    }

    /// Navigate to `target`, following catch-all and guard redirects
    pub fn push(&self, target: &str) -> CoreResult<Navigation> {
        let mut current = self.lock_current()?;
        let from = current.clone();

        let mut path = target.to_string();
        let mut redirected = false;

        for _ in 0..MAX_REDIRECTS {
            let route = match self.table.resolve(&path) {
                Resolution::Matched(route) => route,
                Resolution::Redirect(fallback) => {
                    debug!(from = %path, to = %fallback, "No route matched, redirecting");
                    path = fallback;
                    redirected = true;
                    continue;
                }
            };

            let presence = self.store.presence()?;
            match guard::check(from.as_deref(), &route.path, route.page.requirement(), presence) {
                GuardDecision::Allow => {
                    debug!(location = %route.path, page = %route.page, "Navigation committed");
                    *current = Some(route.path.clone());
                    return Ok(Navigation {
                        requested: target.to_string(),
                        location: route.path,
                        page: route.page,
                        params: route.params,
                        redirected,
                    });
                }
                GuardDecision::Redirect(to) => {
                    info!(from = %route.path, to, "Navigation guard redirected");
                    path = to.to_string();
                    redirected = true;
                }
            }
        }

        Err(CoreError::navigation(target, "too many redirects"))
    }

    fn lock_current(&self) -> CoreResult<std::sync::MutexGuard<'_, Option<String>>> {
        self.current
            .lock()
            .map_err(|_| CoreError::navigation("", "router lock poisoned"))
    }
}

impl Navigator for Router {
    fn navigate(&self, path: &str) -> CoreResult<()> {
        self.push(path).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RouteDef;
    use crate::session::{MemorySessionStore, TokenKey};
    use mockall::mock;

    mock! {
        pub Store {}

        impl SessionStore for Store {
            fn get(&self, key: TokenKey) -> CoreResult<Option<String>>;
            fn set(&self, key: TokenKey, value: &str) -> CoreResult<()>;
            fn clear(&self) -> CoreResult<()>;
        }
    }

    fn signed_out() -> Router {
        Router::new(Arc::new(MemorySessionStore::new()))
    }

    fn signed_in() -> Router {
        Router::new(Arc::new(MemorySessionStore::with_tokens("a", "r")))
    }

    #[test]
    fn articles_without_tokens_lands_on_login() {
        let router = signed_out();
        let nav = router.push("/articles").unwrap();

        assert_eq!(nav.location, "/login");
        assert_eq!(nav.page, Page::Login);
        assert!(nav.redirected);
        assert_eq!(router.current().unwrap().as_deref(), Some("/login"));
    }

    #[test]
    fn login_with_tokens_lands_home() {
        let router = signed_in();
        router.push("/articles").unwrap();

        let nav = router.push("/login").unwrap();
        assert_eq!(nav.location, "/");
        assert_eq!(nav.page, Page::Dashboard);
    }

    #[test]
    fn same_path_never_redirects() {
        let store = Arc::new(MemorySessionStore::with_tokens("a", "r"));
        let router = Router::new(store.clone());
        router.push("/users").unwrap();

        store.clear().unwrap();
        let nav = router.push("/users").unwrap();
        assert_eq!(nav.location, "/users");
        assert!(!nav.redirected);
    }

    #[test]
    fn restored_location_enables_loop_guard() {
        let router = signed_out().start_at("/profile/");
        assert_eq!(router.current().unwrap().as_deref(), Some("/profile"));

        let nav = router.push("/profile").unwrap();
        assert_eq!(nav.location, "/profile");
        assert!(!nav.redirected);
    }

    #[test]
    fn first_navigation_is_always_guarded() {
        let nav = signed_out().push("/").unwrap();
        assert_eq!(nav.location, "/login");
    }

    #[test]
    fn unknown_path_falls_back_home_then_guard_applies() {
        let nav = signed_in().push("/does/not/exist").unwrap();
        assert_eq!(nav.location, "/");
        assert!(nav.redirected);

        let nav = signed_out().push("/does/not/exist").unwrap();
        assert_eq!(nav.location, "/login");
    }

    #[test]
    fn edit_page_keeps_params() {
        let nav = signed_in().push("/users/9/edit").unwrap();
        assert_eq!(nav.page, Page::UserEdit);
        assert_eq!(nav.params.get("id").map(String::as_str), Some("9"));
        assert!(!nav.redirected);
    }

    #[test]
    fn redirect_loops_are_reported() {
        // The only route requires auth and sits at the login path itself
        let table = RouteTable::new(
            vec![RouteDef {
                pattern: "/login",
                page: Page::Profile,
            }],
            "/login",
        );
        let router = Router::with_table(table, Arc::new(MemorySessionStore::new()));
        let err = router.push("/anything").unwrap_err();
        assert!(matches!(err, CoreError::Navigation { .. }));
        assert_eq!(router.current().unwrap(), None);
    }

    #[test]
    fn guard_reads_storage_on_each_navigation() {
        let mut store = MockStore::new();
        store
            .expect_get()
            .times(4)
            .returning(|_| Ok(Some("token".to_string())));

        let router = Router::new(Arc::new(store));
        router.push("/articles").unwrap();
        let nav = router.push("/profile").unwrap();
        assert_eq!(nav.location, "/profile");
    }

    #[test]
    fn storage_failures_abort_navigation() {
        let mut store = MockStore::new();
        store
            .expect_get()
            .returning(|_| Err(CoreError::storage("disk gone")));

        let router = Router::new(Arc::new(store));
        assert!(matches!(
            router.push("/articles"),
            Err(CoreError::Storage { .. })
        ));
    }
}
