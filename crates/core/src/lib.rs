//! Dashboard core: session storage, route table and navigation guard

pub mod error;
pub mod guard;
pub mod paths;
pub mod router;
pub mod routes;
pub mod session;

pub use error::{CoreError, CoreResult};
pub use guard::{GuardDecision, SessionPresence};
pub use router::{Navigation, Navigator, Router};
pub use routes::{AuthRequirement, HOME_PATH, LOGIN_PATH, Page, RouteTable};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, TokenKey};
