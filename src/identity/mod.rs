//! Central session, authentication and authorization for the thingamabob API.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorizer;
mod backend;
mod principal;
mod provider;
mod session;

pub use authorizer::authorize;
pub use backend::{MemoryBackend, RedisBackend, SessionBackend};
pub use principal::{Principal, SessionRecord};
pub use provider::{AuthService, AuthStatus, LoginRequest};
pub use session::{random_token, Session, SessionManager};
