//! Auth service - signup, login, logout and session restore

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::result::{Error, Result};
use crate::domain::{LoginForm, Session, SessionCheck, SignupForm, User, UserProfile};
use crate::ports::{read_json, write_json, Clock, KeyValueStore, StorageKey};

/// Holds the authenticated identity and persists it under `session`
pub struct AuthService {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    session_timeout: Duration,
    current: Mutex<Option<Session>>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            session_timeout,
            current: Mutex::new(None),
        }
    }

    fn current(&self) -> Result<MutexGuard<'_, Option<Session>>> {
        self.current.lock().map_err(|_| Error::poisoned("session"))
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Registered users; an unreadable list counts as empty
    pub fn users(&self) -> Result<Vec<User>> {
        Ok(read_json(self.store.as_ref(), StorageKey::Users)?.unwrap_or_default())
    }

    /// Check a signup form without registering anything
    pub fn validate_signup(&self, form: &SignupForm) -> Result<User> {
        form.validate(&self.users()?)
    }

    /// Register a new user. Does not log them in.
    pub fn signup(&self, form: &SignupForm) -> Result<UserProfile> {
        let mut users = self.users()?;
        let user = form.validate(&users)?;
        let profile = user.profile();
        users.push(user);
        write_json(self.store.as_ref(), StorageKey::Users, &users)?;
        Ok(profile)
    }

    /// Check credentials without starting a session
    pub fn authenticate(&self, form: &LoginForm) -> Result<UserProfile> {
        let users = self.users()?;
        form.authenticate(&users).map(User::profile)
    }

    /// Start a session for valid credentials
    pub fn login(&self, form: &LoginForm) -> Result<Session> {
        let profile = self.authenticate(form)?;
        let session = Session::new(profile, self.clock.now_ms());
        write_json(self.store.as_ref(), StorageKey::Session, &session)?;
        *self.current()? = Some(session.clone());
        Ok(session)
    }

    pub fn logout(&self) -> Result<()> {
        *self.current()? = None;
        self.store.remove_item(&StorageKey::Session.key())
    }

    /// Restore the persisted session, dropping it if it has expired.
    ///
    /// An unreadable session entry is treated as logged out.
    pub fn check_session(&self) -> Result<SessionCheck> {
        let stored: Option<Session> = read_json(self.store.as_ref(), StorageKey::Session)?;
        let mut current = self.current()?;

        let Some(session) = stored else {
            *current = None;
            return Ok(SessionCheck::Missing);
        };

        if session.is_expired(self.clock.now_ms(), self.session_timeout) {
            *current = None;
            self.store.remove_item(&StorageKey::Session.key())?;
            return Ok(SessionCheck::Expired);
        }

        *current = Some(session.clone());
        Ok(SessionCheck::Active(session))
    }

    /// The active session or the reason there is none
    pub fn require_session(&self) -> Result<Session> {
        match self.check_session()? {
            SessionCheck::Active(session) => Ok(session),
            SessionCheck::Expired => Err(Error::SessionExpired),
            SessionCheck::Missing => Err(Error::Unauthenticated),
        }
    }

    /// In-memory session, without consulting storage
    pub fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.current()?.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.current_session(), Ok(Some(_)))
    }

    /// Time left on the in-memory session
    pub fn remaining(&self) -> Result<Option<Duration>> {
        let now = self.clock.now_ms();
        Ok(self
            .current_session()?
            .map(|s| s.remaining(now, self.session_timeout)))
    }
}
