//! Dashboard route table

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Path of the login page
pub const LOGIN_PATH: &str = "/login";

/// Path of the dashboard home page
pub const HOME_PATH: &str = "/";

/// What a page declares about authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequirement {
    /// Only reachable with both tokens stored
    RequiresAuth,
    /// Only meant for visitors without a session (the login page)
    Guest,
    /// No declared requirement
    Public,
}

/// Pages of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Page {
    Login,
    Dashboard,
    Articles,
    ArticleNew,
    ArticleEdit,
    Users,
    UserNew,
    UserEdit,
    Profile,
}

impl Page {
    /// Route name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Dashboard => "Dashboard",
            Self::Articles => "Articles",
            Self::ArticleNew => "ArticleNew",
            Self::ArticleEdit => "ArticleEdit",
            Self::Users => "Users",
            Self::UserNew => "UserNew",
            Self::UserEdit => "UserEdit",
            Self::Profile => "Profile",
        }
    }

    /// Authentication requirement declared by the page
    pub const fn requirement(self) -> AuthRequirement {
        match self {
            Self::Login => AuthRequirement::Guest,
            _ => AuthRequirement::RequiresAuth,
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A path pattern bound to a page. Segments starting with `:` capture a value.
#[derive(Debug, Clone)]
pub struct RouteDef {
    pub pattern: &'static str,
    pub page: Page,
}

/// A path resolved against the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Normalized path
    pub path: String,
    pub page: Page,
    pub params: BTreeMap<String, String>,
}

/// Result of resolving a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched(RouteMatch),
    /// No route matched; navigation continues at the fallback path
    Redirect(String),
}

/// Ordered set of routes plus the catch-all redirect target
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDef>,
    fallback: String,
}

impl RouteTable {
    /// Create a table from route definitions
    pub fn new(routes: Vec<RouteDef>, fallback: impl Into<String>) -> Self {
        Self {
            routes,
            fallback: normalize_path(&fallback.into()),
        }
    }

    /// The admin dashboard routes; unknown paths redirect home
    pub fn admin() -> Self {
        let route = |pattern, page| RouteDef { pattern, page };
        Self::new(
            vec![
                route(LOGIN_PATH, Page::Login),
                route(HOME_PATH, Page::Dashboard),
                route("/articles", Page::Articles),
                route("/articles/new", Page::ArticleNew),
                route("/articles/:id/edit", Page::ArticleEdit),
                route("/users", Page::Users),
                route("/users/new", Page::UserNew),
                route("/users/:id/edit", Page::UserEdit),
                route("/profile", Page::Profile),
            ],
            HOME_PATH,
        )
    }

    /// Registered routes in declaration order
    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }

    /// Resolve a path. When several patterns match, the one with the most
    /// literal segments wins, so `/articles/new` never reads as an `:id`.
    pub fn resolve(&self, path: &str) -> Resolution {
        let path = normalize_path(path);
        let segments = split_segments(&path);

        let best = self
            .routes
            .iter()
            .filter_map(|def| match_pattern(def.pattern, &segments).map(|m| (def, m)))
            .max_by_key(|(_, (literals, _))| *literals);

        match best {
            Some((def, (_, params))) => Resolution::Matched(RouteMatch {
                path,
                page: def.page,
                params,
            }),
            None => Resolution::Redirect(self.fallback.clone()),
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::admin()
    }
}

/// Strip query string and fragment, force a leading slash and drop a trailing one
pub fn normalize_path(path: &str) -> String {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        HOME_PATH.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

// Returns the number of literal segments matched and the captured params
fn match_pattern(pattern: &str, segments: &[&str]) -> Option<(usize, BTreeMap<String, String>)> {
    let parts = split_segments(pattern);
    if parts.len() != segments.len() {
        return None;
    }

    let mut literals = 0;
    let mut params = BTreeMap::new();
    for (part, segment) in parts.iter().zip(segments) {
        if let Some(name) = part.strip_prefix(':') {
            params.insert(name.to_string(), (*segment).to_string());
        } else if part == segment {
            literals += 1;
        } else {
            return None;
        }
    }
    Some((literals, params))
}
