// Authentication state shared by the API client and the dashboard.
//
// There is no global: whoever needs the session gets an `AuthState` handle passed in, and
// whoever must react to a forced logout holds a `LogoutSubscription`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::{error, info};

use crate::TridashError;
use crate::config::app_config_dir;
use crate::model::{Account, Session};

const SESSION_FILE_NAME: &str = "session.json";

/// Persistence for the access token and the account it belongs to.
pub trait TokenStore: Send {
    fn load(&self) -> Result<Option<Session>, TridashError>;

    fn save(&mut self, session: &Session) -> Result<(), TridashError>;

    fn clear(&mut self) -> Result<(), TridashError>;
}

/// Keeps the session in a JSON file under the application config directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> Result<Self, TridashError> {
        Ok(Self::new(app_config_dir()?.join(SESSION_FILE_NAME)))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Session>, TridashError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| TridashError::ConfigIOError { source: e })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| TridashError::ConfigSerializeError { source: e })
    }

    fn save(&mut self, session: &Session) -> Result<(), TridashError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TridashError::ConfigIOError { source: e })?;
        }
        let content = serde_json::to_string(session)
            .map_err(|e| TridashError::ConfigSerializeError { source: e })?;
        fs::write(&self.path, content).map_err(|e| TridashError::ConfigIOError { source: e })
    }

    fn clear(&mut self) -> Result<(), TridashError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| TridashError::ConfigIOError { source: e })?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    session: Option<Session>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Session>, TridashError> {
        Ok(self.session.clone())
    }

    fn save(&mut self, session: &Session) -> Result<(), TridashError> {
        self.session = Some(session.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), TridashError> {
        self.session = None;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    /// The API answered 401
    Unauthorized,
}

struct AuthInner {
    store: Box<dyn TokenStore>,
    session: Option<Session>,
    next_subscriber_id: u64,
    subscribers: HashMap<u64, Sender<LogoutReason>>,
}

#[derive(Clone)]
pub struct AuthState {
    inner: Arc<Mutex<AuthInner>>,
}

impl AuthState {
    /// Creates the state, restoring any session the store already holds.
    pub fn new(store: impl TokenStore + 'static) -> Self {
        let session = store.load().unwrap_or_else(|e| {
            error!("Could not restore saved session: {}", e);
            None
        });
        Self {
            inner: Arc::new(Mutex::new(AuthInner {
                store: Box::new(store),
                session,
                next_subscriber_id: 0,
                subscribers: HashMap::new(),
            })),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::default())
    }

    fn lock(&self) -> MutexGuard<'_, AuthInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.access_token.clone())
    }

    pub fn account(&self) -> Option<Account> {
        self.lock().session.as_ref().map(|s| s.account.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().session.is_some()
    }

    pub fn login(&self, session: Session) -> Result<(), TridashError> {
        let mut inner = self.lock();
        inner.store.save(&session)?;
        info!("Logged in as {}", session.account.username());
        inner.session = Some(session);
        Ok(())
    }

    /// Clears the stored credentials and tells every live subscriber why.
    pub fn logout(&self, reason: LogoutReason) {
        let mut inner = self.lock();
        if let Err(e) = inner.store.clear() {
            error!("Could not clear saved session: {}", e);
        }
        let was_authenticated = inner.session.take().is_some();
        if was_authenticated {
            info!("Logged out ({:?})", reason);
        }
        inner
            .subscribers
            .retain(|_, subscriber| subscriber.send(reason).is_ok());
    }

    pub fn subscribe_logout(&self) -> LogoutSubscription {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.lock();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner.subscribers.insert(id, tx);
        LogoutSubscription {
            id,
            receiver: rx,
            auth: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Receives logout notifications until cancelled or dropped.
pub struct LogoutSubscription {
    id: u64,
    receiver: Receiver<LogoutReason>,
    auth: Weak<Mutex<AuthInner>>,
}

impl LogoutSubscription {
    /// Non-blocking, meant to be polled once per frame.
    pub fn try_next(&self) -> Option<LogoutReason> {
        self.receiver.try_recv().ok()
    }

    pub fn cancel(self) {}
}

impl Drop for LogoutSubscription {
    fn drop(&mut self) {
        if let Some(auth) = self.auth.upgrade() {
            let mut inner = auth.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.subscribers.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserInfo;
    use tempfile::tempdir;

    fn session() -> Session {
        Session {
            access_token: "token-123".to_string(),
            account: Account::User(UserInfo {
                user_id: "U1".to_string(),
                username: "athlete".to_string(),
                full_name: None,
                email: None,
            }),
        }
    }

    #[test]
    fn test_login_and_logout() {
        let auth = AuthState::in_memory();
        assert!(!auth.is_authenticated());
        auth.login(session()).unwrap();
        assert_eq!(auth.token().as_deref(), Some("token-123"));
        auth.logout(LogoutReason::UserRequested);
        assert!(auth.token().is_none());
    }

    #[test]
    fn test_subscribers_are_notified_until_cancelled() {
        let auth = AuthState::in_memory();
        let first = auth.subscribe_logout();
        let second = auth.subscribe_logout();
        assert_eq!(auth.subscriber_count(), 2);

        auth.logout(LogoutReason::Unauthorized);
        assert_eq!(first.try_next(), Some(LogoutReason::Unauthorized));
        assert_eq!(second.try_next(), Some(LogoutReason::Unauthorized));
        assert_eq!(first.try_next(), None);

        second.cancel();
        assert_eq!(auth.subscriber_count(), 1);
        drop(first);
        assert_eq!(auth.subscriber_count(), 0);
    }

    #[test]
    fn test_file_store_survives_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let auth = AuthState::new(FileTokenStore::new(path.clone()));
        auth.login(session()).unwrap();
        assert!(path.exists());

        let restored = AuthState::new(FileTokenStore::new(path.clone()));
        assert_eq!(restored.session(), Some(session()));

        restored.logout(LogoutReason::Unauthorized);
        assert!(!path.exists());
        assert!(AuthState::new(FileTokenStore::new(path)).session().is_none());
    }
}
