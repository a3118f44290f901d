use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tokio::sync::watch;

use crate::models::{Credential, UserIdentity};
use crate::store::SessionStore;

use super::{RestoreOutcome, SessionError, SessionManager, SessionSnapshot};

/// Owns the session for one application scope.
///
/// Constructed once by the top-level application. Screens never see the
/// provider itself, only the `SessionContext` it hands out. Dropping the
/// provider ends the scope: contexts handed out earlier become inert and
/// fail loudly when used.
pub struct SessionProvider {
    manager: Rc<RefCell<SessionManager>>,
}

impl SessionProvider {
    /// Provider whose session is still `Restoring`. Call `restore` before
    /// rendering anything that depends on authentication.
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            manager: Rc::new(RefCell::new(SessionManager::new(store))),
        }
    }

    /// Provider with the session already restored from `store`.
    pub fn mount(store: impl SessionStore + 'static) -> Self {
        let provider = Self::new(store);
        provider.restore();
        provider
    }

    pub fn restore(&self) -> RestoreOutcome {
        self.manager.borrow_mut().restore()
    }

    /// The capability to thread through the screens of this scope.
    pub fn context(&self) -> SessionContext {
        SessionContext {
            scope: Rc::downgrade(&self.manager),
        }
    }

    pub fn is_memory_only(&self) -> bool {
        self.manager.borrow().is_memory_only()
    }
}

/// Capability granting access to the session of a `SessionProvider`.
///
/// A detached context (the `Default`) stands for a screen wired up outside
/// any provider. Using it is a programming error and panics at the call
/// site instead of reporting a signed-out session.
#[derive(Clone, Default)]
pub struct SessionContext {
    scope: Weak<RefCell<SessionManager>>,
}

impl SessionContext {
    pub fn detached() -> Self {
        Self::default()
    }

    /// True while the owning provider is alive.
    pub fn is_active(&self) -> bool {
        self.scope.strong_count() > 0
    }

    pub fn try_session(&self) -> Result<Session, SessionError> {
        self.scope
            .upgrade()
            .map(|manager| Session { manager })
            .ok_or(SessionError::ContractMisuse)
    }

    /// # Panics
    ///
    /// Panics if the context is detached or its provider has been dropped.
    #[track_caller]
    pub fn session(&self) -> Session {
        match self.try_session() {
            Ok(session) => session,
            Err(e) => panic!("{}", e),
        }
    }
}

/// Access the session from a screen.
///
/// # Panics
///
/// Panics if `ctx` does not belong to a live `SessionProvider`.
#[track_caller]
pub fn use_session(ctx: &SessionContext) -> Session {
    ctx.session()
}

/// Consumer handle: the snapshot accessors and the three mutators.
///
/// Meant to be obtained per use through `use_session` rather than stored.
pub struct Session {
    manager: Rc<RefCell<SessionManager>>,
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.manager.borrow().snapshot()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.snapshot().user().cloned()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.snapshot().credential().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.manager.borrow().state().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.manager.borrow().state().is_restoring()
    }

    pub fn login(&self, user: UserIdentity, credential: Credential) {
        self.manager.borrow_mut().login(user, credential);
    }

    pub fn logout(&self) {
        self.manager.borrow_mut().logout();
    }

    pub fn update_credential(&self, credential: Credential) -> Result<(), SessionError> {
        self.manager.borrow_mut().update_credential(credential)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.manager.borrow().subscribe()
    }
}
