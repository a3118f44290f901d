use serde::Serialize;

use crate::models::{Credential, UserIdentity};

/// The session state machine.
///
/// `Restoring` is only ever the initial state. User and credential live in
/// the same variant, so one can never be held without the other.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Restoring,
    Unauthenticated,
    Authenticated {
        user: UserIdentity,
        credential: Credential,
    },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn is_restoring(&self) -> bool {
        matches!(self, SessionState::Restoring)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Restoring => "restoring",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticated { .. } => "authenticated",
        }
    }
}

/// Read-only view of the session handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionSnapshot {
    #[cfg_attr(feature = "ts", ts(type = "Record<string, unknown> | null"))]
    user: Option<UserIdentity>,
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    credential: Option<Credential>,
    is_loading: bool,
    is_authenticated: bool,
}

impl SessionSnapshot {
    pub fn from_state(state: &SessionState) -> Self {
        match state {
            SessionState::Restoring => Self {
                user: None,
                credential: None,
                is_loading: true,
                is_authenticated: false,
            },
            SessionState::Unauthenticated => Self {
                user: None,
                credential: None,
                is_loading: false,
                is_authenticated: false,
            },
            SessionState::Authenticated { user, credential } => Self {
                user: Some(user.clone()),
                credential: Some(credential.clone()),
                is_loading: false,
                is_authenticated: true,
            },
        }
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Display name of the signed-in user, when the record has one
    pub fn display_name(&self) -> Option<&str> {
        self.user.as_ref().and_then(UserIdentity::name)
    }

    /// What a screen may render for this snapshot.
    pub fn view(&self) -> AuthView {
        if self.is_loading {
            return AuthView::Pending;
        }
        match &self.user {
            Some(user) => AuthView::SignedIn {
                name: user.name().map(str::to_string),
            },
            None => AuthView::Anonymous,
        }
    }
}

/// Rendering decision derived from a snapshot.
///
/// `Pending` means neither signed-in nor signed-out UI may be shown yet;
/// the snapshot is still being restored and would gate navigation wrongly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AuthView {
    Pending,
    Anonymous,
    SignedIn { name: Option<String> },
}
