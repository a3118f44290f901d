//! Data models shared by the session manager and the identity service client.

pub mod user;

pub use user::{Credential, UserIdentity};
