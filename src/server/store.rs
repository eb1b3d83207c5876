use std::collections::HashMap;

use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use super::traits::{SessionStore, StoreError};
use super::types::{Session, SessionField};
use crate::types::SessionId;

pub const DEFAULT_SESSION_TTL: Duration = Duration::days(7);

/// In-process session table.
///
/// Sessions live until deleted or until they are older than the TTL. Nothing
/// survives a restart.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_live(&self, session: &Session, now: OffsetDateTime) -> bool {
        now - session.created_at < self.ttl
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| self.is_live(s, now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for MemorySessionStore {
    async fn create(&self, session: Session) -> Result<SessionId, StoreError> {
        let id = SessionId::generate();
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| self.is_live(s, now));
        sessions.insert(id.clone(), session);
        Ok(id)
    }

    async fn find(&self, session_id: &SessionId) -> Result<Option<Session>, StoreError> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .filter(|s| self.is_live(s, now))
            .cloned())
    }

    async fn set_field(&self, session_id: &SessionId, field: SessionField) -> Result<bool, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id).map(|s| self.is_live(s, now)) {
            Some(true) => {
                if let Some(session) = sessions.get_mut(session_id) {
                    session.apply(field);
                }
                Ok(true)
            }
            Some(false) => {
                sessions.remove(session_id);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessToken, RepoRef, UserProfile};

    #[tokio::test]
    async fn create_find_delete() {
        let store = MemorySessionStore::new();
        let id = store
            .create(Session::new().with_access_token(AccessToken::new("gho_1")))
            .await
            .unwrap();

        let found = store.find(&id).await.unwrap().expect("session");
        assert!(found.is_authenticated());
        assert_eq!(store.len().await, 1);

        store.delete(&id).await.unwrap();
        assert!(store.find(&id).await.unwrap().is_none());
        // idempotent
        store.delete(&id).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn set_field_is_last_write_wins() {
        let store = MemorySessionStore::new();
        let id = store.create(Session::new()).await.unwrap();

        for name in ["first", "second"] {
            let updated = store
                .set_field(&id, SessionField::SelectedRepo(Some(RepoRef::new("o", name))))
                .await
                .unwrap();
            assert!(updated);
        }
        store
            .set_field(&id, SessionField::UserProfile(Some(UserProfile::new("octocat", 1))))
            .await
            .unwrap();

        let session = store.find(&id).await.unwrap().unwrap();
        assert_eq!(session.selected_repo, Some(RepoRef::new("o", "second")));
        assert_eq!(session.user_profile.map(|p| p.login).as_deref(), Some("octocat"));
        assert!(session.access_token.is_none());
    }

    #[tokio::test]
    async fn set_field_on_unknown_session_reports_false() {
        let store = MemorySessionStore::new();
        let updated = store
            .set_field(&SessionId::generate(), SessionField::SelectedRepo(None))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn expired_sessions_are_absent() {
        let store = MemorySessionStore::with_ttl(Duration::ZERO);
        let id = store.create(Session::new()).await.unwrap();

        assert!(store.find(&id).await.unwrap().is_none());
        assert!(!store.set_field(&id, SessionField::SelectedRepo(None)).await.unwrap());
        assert!(store.is_empty().await);
    }
}
