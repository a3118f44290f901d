//! Client for the remote identity service.
//!
//! The service handles sign-up, login and profile updates. Every response
//! is wrapped in an envelope `{ success, data, message }`; a successful
//! login carries `data: { user, token }` which is handed to the session
//! manager unchanged.

pub mod client;
pub mod error;
pub mod forms;

pub use client::{ApiEnvelope, AuthPayload, IdentityClient};
pub use error::ApiError;
pub use forms::{FormErrors, ProfileForm, ProfileUpdate, SignupForm, SignupRequest};
