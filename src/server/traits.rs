use std::future::Future;
use std::sync::Arc;

use super::types::{Session, SessionField};
use crate::types::SessionId;

/// Error type returned by [`SessionStore`] implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Session persistence.
///
/// Sessions are identified by opaque [`SessionId`]s generated by the store.
/// The bundled [`MemorySessionStore`](super::MemorySessionStore) keeps them in
/// process memory; a deployment with several instances would plug in a shared
/// table here.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for RedisSessions {
///     async fn create(&self, session: Session) -> Result<SessionId, StoreError> {
///         let id = SessionId::generate();
///         self.put(&id, &session).await?;
///         Ok(id)
///     }
///     // ...
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Store a new session and return its ID.
    fn create(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<SessionId, StoreError>> + Send;

    /// Look up a live session. Expired or unknown IDs yield `None`.
    fn find(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, StoreError>> + Send;

    /// Overwrite one field. Returns `false` if the session no longer exists.
    fn set_field(
        &self,
        session_id: &SessionId,
        field: SessionField,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Delete a session. Deleting an unknown ID is not an error.
    fn delete(&self, session_id: &SessionId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A shared store, so the caller can keep a handle next to the router.
impl<T: SessionStore> SessionStore for Arc<T> {
    fn create(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<SessionId, StoreError>> + Send {
        (**self).create(session)
    }

    fn find(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, StoreError>> + Send {
        (**self).find(session_id)
    }

    fn set_field(
        &self,
        session_id: &SessionId,
        field: SessionField,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).set_field(session_id, field)
    }

    fn delete(&self, session_id: &SessionId) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).delete(session_id)
    }
}
