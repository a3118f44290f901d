use thiserror::Error;

use crate::store::StorageError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("Stored user record is corrupt: {0}")]
    CorruptRecord(String),

    #[error("Session accessed outside of a SessionProvider scope")]
    ContractMisuse,

    #[error("Cannot update the credential without an authenticated session")]
    InvalidCredentialUpdate,

    #[error("Credential must not be empty")]
    EmptyCredential,
}
