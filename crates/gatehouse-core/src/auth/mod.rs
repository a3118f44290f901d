//! Authentication session management.
//!
//! This module provides:
//! - `SessionManager`: owns the session state machine and keeps it in sync
//!   with a `SessionStore`
//! - `SessionProvider` / `SessionContext`: the explicit capability screens
//!   receive to read the session and invoke its mutators
//! - `SessionSnapshot`: the read-only view handed to consumers
//!
//! The session is restored from storage once at startup and is then the
//! single source of truth for the running process.

pub mod context;
pub mod error;
pub mod manager;
pub mod state;

pub use context::{use_session, Session, SessionContext, SessionProvider};
pub use error::SessionError;
pub use manager::{RestoreOutcome, SessionManager};
pub use state::{AuthView, SessionSnapshot, SessionState};
