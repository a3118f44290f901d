use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::{Credential, UserIdentity};
use crate::store::{SessionStore, StorageError, StoreKey};

use super::{SessionError, SessionSnapshot, SessionState};

/// How startup restore resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Both records were present and valid
    Restored,
    /// Nothing was stored
    Empty,
    /// Only one of the two records was stored; both were cleared
    DiscardedUnpaired,
    /// The user record did not parse; both records were cleared
    DiscardedCorrupt,
    /// The store could not be read; running memory-only
    StorageUnavailable,
    /// Restore had already run (or a mutator settled the state first)
    AlreadySettled,
}

/// Owns the session state and keeps the session store in sync with it.
///
/// The in-memory state is authoritative. Every transition is mirrored to the
/// store, and a failed store operation never reverts the transition; the
/// manager stops using the store for the rest of the process instead.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    state: SessionState,
    memory_only: bool,
    updates: watch::Sender<SessionSnapshot>,
}

impl SessionManager {
    pub fn new(store: impl SessionStore + 'static) -> Self {
        let state = SessionState::Restoring;
        let (updates, _) = watch::channel(SessionSnapshot::from_state(&state));
        Self {
            store: Box::new(store),
            state,
            memory_only: false,
            updates,
        }
    }

    /// Resolve the `Restoring` state from the stored records.
    pub fn restore(&mut self) -> RestoreOutcome {
        if !self.state.is_restoring() {
            debug!(state = self.state.name(), "Restore skipped, session already settled");
            return RestoreOutcome::AlreadySettled;
        }

        let stored_user = self.read_record(StoreKey::User);
        let stored_token = self
            .read_record(StoreKey::AccessToken)
            .and_then(|token| Credential::new(token).ok());

        let outcome = match (stored_user, stored_token) {
            _ if self.memory_only => {
                self.state = SessionState::Unauthenticated;
                RestoreOutcome::StorageUnavailable
            }
            (Some(raw_user), Some(credential)) => {
                match serde_json::from_str::<UserIdentity>(&raw_user) {
                    Ok(user) => {
                        debug!(user = ?user.name(), "Session restored from storage");
                        self.state = SessionState::Authenticated { user, credential };
                        RestoreOutcome::Restored
                    }
                    Err(e) => {
                        let err = SessionError::CorruptRecord(e.to_string());
                        warn!(error = %err, "Discarding stored session");
                        self.clear_records();
                        self.state = SessionState::Unauthenticated;
                        RestoreOutcome::DiscardedCorrupt
                    }
                }
            }
            (None, None) => {
                debug!("No stored session");
                self.state = SessionState::Unauthenticated;
                RestoreOutcome::Empty
            }
            (user, _) => {
                warn!(
                    has_user = user.is_some(),
                    "Discarding unpaired session record"
                );
                self.clear_records();
                self.state = SessionState::Unauthenticated;
                RestoreOutcome::DiscardedUnpaired
            }
        };

        self.publish();
        outcome
    }

    /// Record a successful authentication.
    ///
    /// The user and credential come from the identity service; nothing about
    /// them is verified here.
    pub fn login(&mut self, user: UserIdentity, credential: Credential) {
        info!(user = ?user.name(), "Logged in");

        // The previous token goes first: a failure part way leaves at most an
        // unpaired user record, which restore discards
        match serde_json::to_string(&user) {
            Ok(serialized) => {
                self.clear_record(StoreKey::AccessToken);
                self.write_record(StoreKey::User, &serialized);
                self.write_record(StoreKey::AccessToken, credential.as_str());
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize user, session not persisted");
                self.clear_records();
            }
        }

        self.state = SessionState::Authenticated { user, credential };
        self.publish();
    }

    /// End the session. Calling this while signed out does nothing.
    pub fn logout(&mut self) {
        if matches!(self.state, SessionState::Unauthenticated) {
            debug!("Logout while unauthenticated ignored");
            return;
        }

        self.state = SessionState::Unauthenticated;
        self.clear_records();
        info!("Logged out");
        self.publish();
    }

    /// Replace the credential of the current session, keeping the user.
    ///
    /// Fails with `InvalidCredentialUpdate`, changing nothing, when there is
    /// no authenticated session.
    pub fn update_credential(&mut self, credential: Credential) -> Result<(), SessionError> {
        if !self.state.is_authenticated() {
            warn!(state = self.state.name(), "Credential update rejected");
            return Err(SessionError::InvalidCredentialUpdate);
        }

        self.write_record(StoreKey::AccessToken, credential.as_str());
        if let SessionState::Authenticated {
            credential: current,
            ..
        } = &mut self.state
        {
            *current = credential;
        }
        debug!("Credential updated");
        self.publish();
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from_state(&self.state)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Receive a fresh snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// True once a storage failure has switched the manager to memory-only.
    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }

    fn read_record(&mut self, key: StoreKey) -> Option<String> {
        if self.memory_only {
            return None;
        }
        match self.store.read(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                self.degrade(e, false);
                None
            }
        }
    }

    fn write_record(&mut self, key: StoreKey, value: &str) {
        if self.memory_only {
            return;
        }
        if let Err(e) = self.store.write(key, value) {
            self.degrade(e, true);
        }
    }

    fn clear_record(&mut self, key: StoreKey) {
        if self.memory_only {
            return;
        }
        if let Err(e) = self.store.clear(key) {
            self.degrade(e, true);
        }
    }

    fn clear_records(&mut self) {
        for key in StoreKey::ALL {
            self.clear_record(key);
        }
    }

    /// Stop using the store. When a mutator failed part way, whatever it
    /// left behind no longer matches memory, so both records are dropped on
    /// a best-effort basis.
    fn degrade(&mut self, err: StorageError, discard_records: bool) {
        let err = SessionError::from(err);
        warn!(error = %err, "Continuing with memory-only session");
        self.memory_only = true;

        if discard_records {
            for key in StoreKey::ALL {
                if let Err(e) = self.store.clear(key) {
                    debug!(%key, error = %e, "Could not discard session record");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthView;
    use crate::store::MemoryStore;

    fn ana() -> UserIdentity {
        UserIdentity::new(1, "Ana").with_email("a@b.com").with_role("user")
    }

    fn token(value: &str) -> Credential {
        Credential::new(value).unwrap()
    }

    fn seeded(user: Option<&str>, access_token: Option<&str>) -> MemoryStore {
        let mut store = MemoryStore::new();
        if let Some(user) = user {
            store.write(StoreKey::User, user).unwrap();
        }
        if let Some(access_token) = access_token {
            store.write(StoreKey::AccessToken, access_token).unwrap();
        }
        store
    }

    fn restored(store: &MemoryStore) -> (SessionManager, RestoreOutcome) {
        let mut manager = SessionManager::new(store.clone());
        let outcome = manager.restore();
        (manager, outcome)
    }

    #[test]
    fn test_new_manager_is_loading() {
        let manager = SessionManager::new(MemoryStore::new());
        assert!(manager.state().is_restoring());
        assert!(manager.snapshot().is_loading());
        assert_eq!(manager.snapshot().view(), AuthView::Pending);
    }

    #[test]
    fn test_restore_empty_store() {
        let (manager, outcome) = restored(&MemoryStore::new());
        assert_eq!(outcome, RestoreOutcome::Empty);
        let snapshot = manager.snapshot();
        assert!(!snapshot.is_loading());
        assert!(!snapshot.is_authenticated());
    }

    #[test]
    fn test_restore_is_idempotent_across_starts() {
        let store = seeded(Some(r#"{"id":1,"email":"a@b.com","name":"Ana","role":"user"}"#), Some("tok-123"));

        let (first, first_outcome) = restored(&store);
        let (second, second_outcome) = restored(&store);

        assert_eq!(first_outcome, RestoreOutcome::Restored);
        assert_eq!(second_outcome, RestoreOutcome::Restored);
        assert_eq!(first.snapshot(), second.snapshot());
        assert_eq!(first.snapshot().user(), Some(&ana()));
        assert_eq!(first.snapshot().credential(), Some(&token("tok-123")));
    }

    #[test]
    fn test_restore_runs_once() {
        let store = seeded(Some(r#"{"id":1,"name":"Ana"}"#), Some("tok-123"));
        let mut manager = SessionManager::new(store.clone());
        manager.restore();
        manager.logout();

        // Records reappearing later must not resurrect the session
        let mut writer = store.clone();
        writer.write(StoreKey::User, r#"{"id":1,"name":"Ana"}"#).unwrap();
        writer.write(StoreKey::AccessToken, "tok-123").unwrap();

        assert_eq!(manager.restore(), RestoreOutcome::AlreadySettled);
        assert!(!manager.snapshot().is_authenticated());
    }

    #[test]
    fn test_user_without_token_is_discarded() {
        let store = seeded(Some(r#"{"id":1,"name":"Ana"}"#), None);
        let (manager, outcome) = restored(&store);

        assert_eq!(outcome, RestoreOutcome::DiscardedUnpaired);
        assert!(!manager.snapshot().is_authenticated());
        assert_eq!(store.read(StoreKey::User).unwrap(), None);
        assert_eq!(store.read(StoreKey::AccessToken).unwrap(), None);
    }

    #[test]
    fn test_token_without_user_is_discarded() {
        let store = seeded(None, Some("tok-123"));
        let (manager, outcome) = restored(&store);

        assert_eq!(outcome, RestoreOutcome::DiscardedUnpaired);
        assert!(manager.snapshot().credential().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let store = seeded(Some(r#"{"id":1,"name":"Ana"}"#), Some(""));
        let (manager, outcome) = restored(&store);

        assert_eq!(outcome, RestoreOutcome::DiscardedUnpaired);
        assert!(!manager.snapshot().is_authenticated());
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_user_record_is_cleared() {
        let store = seeded(Some("{not json"), Some("tok-123"));
        let (manager, outcome) = restored(&store);

        assert_eq!(outcome, RestoreOutcome::DiscardedCorrupt);
        assert!(!manager.snapshot().is_authenticated());
        assert!(!manager.snapshot().is_loading());
        assert_eq!(store.read(StoreKey::User).unwrap(), None);
        assert_eq!(store.read(StoreKey::AccessToken).unwrap(), None);
    }

    #[test]
    fn test_restore_keeps_user_record_verbatim() {
        let records = [
            r#"{"id":1,"email":"a@b.com","role":"user"}"#,
            r#"{"id":1,"name":"Ana","email":null,"role":7}"#,
            r#"{"id":1,"name":"Ana","email":null}"#,
        ];

        for raw in records {
            let store = seeded(Some(raw), Some("tok-123"));
            let (manager, outcome) = restored(&store);
            assert_eq!(outcome, RestoreOutcome::Restored, "record {}", raw);
            assert!(manager.snapshot().is_authenticated());

            let user = manager.snapshot().user().cloned().unwrap();
            let expected: serde_json::Value = serde_json::from_str(raw).unwrap();
            assert_eq!(serde_json::to_value(&user).unwrap(), expected);
            assert_eq!(store.read(StoreKey::AccessToken).unwrap().as_deref(), Some("tok-123"));
        }
    }

    #[test]
    fn test_login_stores_user_verbatim() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);
        let user: UserIdentity =
            serde_json::from_str(r#"{"id":1,"name":"Ana","email":null,"role":7}"#).unwrap();
        manager.login(user, token("tok-123"));

        let raw = store.read(StoreKey::User).unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, serde_json::json!({"id": 1, "name": "Ana", "email": null, "role": 7}));
    }

    #[test]
    fn test_null_user_record_is_corrupt() {
        let store = seeded(Some("null"), Some("tok-123"));
        let (_, outcome) = restored(&store);
        assert_eq!(outcome, RestoreOutcome::DiscardedCorrupt);
        assert!(store.is_empty());
    }

    #[test]
    fn test_login_round_trip_and_restart() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);

        manager.login(ana(), token("tok-123"));
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.user(), Some(&ana()));
        assert_eq!(snapshot.credential(), Some(&token("tok-123")));
        assert!(snapshot.is_authenticated());

        let (restarted, outcome) = restored(&store);
        assert_eq!(outcome, RestoreOutcome::Restored);
        assert_eq!(restarted.snapshot(), snapshot);
    }

    #[test]
    fn test_login_persists_records() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);
        manager.login(ana(), token("tok-123"));

        let raw_user = store.read(StoreKey::User).unwrap().unwrap();
        let stored: UserIdentity = serde_json::from_str(&raw_user).unwrap();
        assert_eq!(stored, ana());
        assert_eq!(store.read(StoreKey::AccessToken).unwrap().as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_logout_clears_everything() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);
        manager.login(ana(), token("tok-123"));
        manager.logout();

        let snapshot = manager.snapshot();
        assert!(snapshot.user().is_none());
        assert!(snapshot.credential().is_none());
        assert!(!snapshot.is_authenticated());
        assert!(store.is_empty());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);
        let updates = manager.subscribe();

        manager.logout();
        manager.logout();

        assert!(!manager.snapshot().is_authenticated());
        assert!(!updates.has_changed().unwrap());
    }

    #[test]
    fn test_update_credential_preserves_user() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);
        manager.login(ana(), token("tok-1"));

        manager.update_credential(token("tok-2")).unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.user(), Some(&ana()));
        assert_eq!(snapshot.credential(), Some(&token("tok-2")));
        assert_eq!(store.read(StoreKey::AccessToken).unwrap().as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_update_credential_rejected_when_signed_out() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);

        let err = manager.update_credential(token("tok-2")).unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentialUpdate));
        assert_eq!(manager.state(), &SessionState::Unauthenticated);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_credential_rejected_while_restoring() {
        let mut manager = SessionManager::new(MemoryStore::new());
        assert!(matches!(
            manager.update_credential(token("tok-2")),
            Err(SessionError::InvalidCredentialUpdate)
        ));
        assert!(manager.state().is_restoring());
    }

    #[test]
    fn test_storage_failure_keeps_memory_state() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);
        store.set_disabled(true);

        manager.login(ana(), token("tok-123"));
        assert!(manager.snapshot().is_authenticated());
        assert!(manager.is_memory_only());

        // Storage recovering later is not picked up again
        store.set_disabled(false);
        manager.update_credential(token("tok-456")).unwrap();
        assert!(store.is_empty());
        assert_eq!(manager.snapshot().credential(), Some(&token("tok-456")));
    }

    #[test]
    fn test_quota_exceeded_does_not_roll_back_login() {
        let store = MemoryStore::new().with_quota(16);
        let (mut manager, _) = restored(&store);

        manager.login(ana(), token("tok-123"));
        assert!(manager.snapshot().is_authenticated());
        assert!(manager.is_memory_only());
    }

    #[test]
    fn test_failed_relogin_never_pairs_new_user_with_old_token() {
        let store = MemoryStore::new().with_quota(30);
        let (mut manager, _) = restored(&store);
        manager.login(UserIdentity::new(1, "Ana"), token("t1"));
        assert!(!manager.is_memory_only());

        // The new user fits the quota, the long token does not
        manager.login(UserIdentity::new(2, "Bo"), token("tok-much-longer-token"));
        assert!(manager.is_memory_only());
        assert_eq!(manager.snapshot().display_name(), Some("Bo"));

        let (restarted, outcome) = restored(&store);
        assert_ne!(outcome, RestoreOutcome::Restored);
        assert!(!restarted.snapshot().is_authenticated());
        assert!(store.is_empty());
    }

    #[test]
    fn test_login_clears_previous_token_first() {
        let store = seeded(None, Some("old-token"));
        let mut manager = SessionManager::new(store.clone());
        manager.login(UserIdentity::new(1, "Ana"), token("tok-123"));

        assert_eq!(store.read(StoreKey::AccessToken).unwrap().as_deref(), Some("tok-123"));
        assert!(!manager.is_memory_only());
    }

    #[test]
    fn test_unreadable_store_restores_unauthenticated() {
        let store = seeded(Some(r#"{"id":1,"name":"Ana"}"#), Some("tok-123"));
        store.set_disabled(true);

        let (manager, outcome) = restored(&store);
        assert_eq!(outcome, RestoreOutcome::StorageUnavailable);
        assert!(!manager.snapshot().is_loading());
        assert!(!manager.snapshot().is_authenticated());
        assert!(manager.is_memory_only());
    }

    #[test]
    fn test_subscribers_see_each_transition() {
        let store = MemoryStore::new();
        let mut manager = SessionManager::new(store);
        let mut updates = manager.subscribe();
        assert!(updates.borrow_and_update().is_loading());

        manager.restore();
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().view(), AuthView::Anonymous);

        manager.login(ana(), token("tok-123"));
        assert_eq!(
            updates.borrow_and_update().view(),
            AuthView::SignedIn { name: Some("Ana".to_string()) }
        );

        manager.logout();
        assert_eq!(updates.borrow_and_update().view(), AuthView::Anonymous);
    }

    #[test]
    fn test_scenario_login_then_logout() {
        let store = MemoryStore::new();
        let (mut manager, _) = restored(&store);
        let empty = manager.snapshot();
        assert!(!empty.is_loading());
        assert!(!empty.is_authenticated());

        let user: UserIdentity = serde_json::from_value(serde_json::json!({
            "id": 1, "email": "a@b.com", "name": "Ana", "role": "user"
        }))
        .unwrap();
        manager.login(user.clone(), token("tok-123"));

        let snapshot = manager.snapshot();
        assert!(snapshot.is_authenticated());
        assert_eq!(snapshot.display_name(), Some("Ana"));
        assert_eq!(snapshot.credential().map(Credential::as_str), Some("tok-123"));

        let raw_user = store.read(StoreKey::User).unwrap().unwrap();
        assert_eq!(serde_json::from_str::<UserIdentity>(&raw_user).unwrap(), user);
        assert_eq!(store.read(StoreKey::AccessToken).unwrap().as_deref(), Some("tok-123"));

        manager.logout();
        assert_eq!(manager.snapshot(), empty);
        assert_eq!(store.read(StoreKey::User).unwrap(), None);
        assert_eq!(store.read(StoreKey::AccessToken).unwrap(), None);
    }
}
