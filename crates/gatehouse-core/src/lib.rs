//! gatehouse core - client-side authentication session management.
//!
//! The session manager holds the signed-in user and access credential,
//! restores them from origin-scoped storage at startup and keeps that
//! storage in step with every login, logout and credential update. Screens
//! reach the session only through the `SessionContext` capability handed
//! out by a `SessionProvider`.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod store;

pub use auth::{
    use_session, AuthView, RestoreOutcome, Session, SessionContext, SessionError,
    SessionManager, SessionProvider, SessionSnapshot, SessionState,
};
pub use config::Config;
pub use models::{Credential, UserIdentity};
pub use store::{SessionStore, StorageError, StoreKey};
