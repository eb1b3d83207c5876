use time::OffsetDateTime;

use crate::types::{AccessToken, RepoRef, UserProfile};

/// Per-browser session state.
///
/// Each field is independently optional. A session with no usable
/// `access_token` is unauthenticated.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: Option<AccessToken>,
    /// GitHub profile snapshot taken at login, for display.
    pub user_profile: Option<UserProfile>,
    pub selected_repo: Option<RepoRef>,
    pub(crate) created_at: OffsetDateTime,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            access_token: None,
            user_profile: None,
            selected_repo: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    #[must_use]
    pub fn with_user_profile(mut self, profile: UserProfile) -> Self {
        self.user_profile = Some(profile);
        self
    }

    #[must_use]
    pub fn with_selected_repo(mut self, repo: RepoRef) -> Self {
        self.selected_repo = Some(repo);
        self
    }

    /// Usable bearer credential, if any.
    #[must_use]
    pub fn credential(&self) -> Option<&AccessToken> {
        self.access_token.as_ref().filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }

    #[must_use]
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Overwrite one field (last write wins).
    pub fn apply(&mut self, field: SessionField) {
        match field {
            SessionField::AccessToken(token) => self.access_token = token,
            SessionField::UserProfile(profile) => self.user_profile = profile,
            SessionField::SelectedRepo(repo) => self.selected_repo = repo,
        }
    }
}

/// A single session field write for [`SessionStore::set_field`](super::SessionStore::set_field).
#[derive(Debug, Clone)]
pub enum SessionField {
    AccessToken(Option<AccessToken>),
    UserProfile(Option<UserProfile>),
    SelectedRepo(Option<RepoRef>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_unauthenticated() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(session.user_profile.is_none());
        assert!(session.selected_repo.is_none());
    }

    #[test]
    fn empty_token_is_not_a_credential() {
        let session = Session::new().with_access_token(AccessToken::new(""));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn apply_overwrites_single_field() {
        let mut session = Session::new()
            .with_access_token(AccessToken::new("gho_1"))
            .with_selected_repo(RepoRef::new("a", "b"));

        session.apply(SessionField::SelectedRepo(Some(RepoRef::new("c", "d"))));
        assert_eq!(session.selected_repo, Some(RepoRef::new("c", "d")));
        assert!(session.is_authenticated());

        session.apply(SessionField::AccessToken(None));
        assert!(!session.is_authenticated());
        assert_eq!(session.selected_repo, Some(RepoRef::new("c", "d")));
    }
}
