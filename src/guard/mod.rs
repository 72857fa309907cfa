use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::session::{SessionStore, UserSession};
use crate::storage::{self, error::StorageResult, KvStorage};

pub const TOKEN_KEY: &str = "token";
pub const TOKEN_EXPIRE_KEY: &str = "token_expire";

pub const DEFAULT_LOGIN_ROUTE: &str = "/pages/login";
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);

/// The UI side of a redirect.
pub trait Navigator: Send + Sync {
    /// Route of the screen on top, `None` before the first screen is shown.
    fn current_route(&self) -> Option<String>;

    fn redirect_to(&self, route: &str);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum GuardState {
    #[default]
    Idle,
    /// `release_at` stays `None` while the check itself is running.
    Checking { release_at: Option<Instant> },
}

impl GuardState {
    fn is_busy(&self, now: Instant) -> bool {
        match self {
            GuardState::Idle => false,
            GuardState::Checking { release_at: None } => true,
            GuardState::Checking {
                release_at: Some(at),
            } => now < *at,
        }
    }
}

/// Re-entrancy flag shared by every guard of one app run. Clones share the
/// same state.
#[derive(Debug, Clone, Default)]
pub struct CheckLatch {
    state: Arc<Mutex<GuardState>>,
}

impl CheckLatch {
    /// `None` while a check runs or is cooling down.
    pub fn try_enter(&self, cooldown: Duration) -> Option<CheckPermit> {
        let mut state = self.state.lock();
        if state.is_busy(Instant::now()) {
            return None;
        }
        *state = GuardState::Checking { release_at: None };

        Some(CheckPermit {
            latch: self.clone(),
            cooldown,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().is_busy(Instant::now())
    }
}

/// Held for the duration of one check. Dropping it starts the cool-down,
/// whether the check finished or was cancelled.
#[derive(Debug)]
pub struct CheckPermit {
    latch: CheckLatch,
    cooldown: Duration,
}

impl Drop for CheckPermit {
    fn drop(&mut self) {
        *self.latch.state.lock() = GuardState::Checking {
            release_at: Some(Instant::now() + self.cooldown),
        };
    }
}

/// Checks the locally stored token before a protected screen is shown.
///
/// A call that arrives while another check runs, or within `cooldown` after
/// one finished, reports `true` without looking at storage.
pub struct LoginGuard<N> {
    latch: CheckLatch,
    storage: KvStorage,
    session: SessionStore,
    navigator: N,
    login_route: String,
    cooldown: Duration,
}

impl<N: Navigator> LoginGuard<N> {
    pub fn new(storage: KvStorage, session: SessionStore, navigator: N) -> Self {
        Self {
            latch: CheckLatch::default(),
            storage,
            session,
            navigator,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_latch(mut self, latch: CheckLatch) -> Self {
        self.latch = latch;
        self
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// `Ok(false)` means the session was cleared and the user sent to the
    /// login route.
    pub async fn check_login(&self) -> StorageResult<bool> {
        let Some(_permit) = self.latch.try_enter(self.cooldown) else {
            debug!("login check skipped, another check is running or cooling down");
            return Ok(true);
        };

        self.verify(storage::now_ms()).await
    }

    async fn verify(&self, now_ms: i64) -> StorageResult<bool> {
        let token = self.storage.get_item::<Value>(TOKEN_KEY).await?;
        let expire = self.storage.get_item::<Value>(TOKEN_EXPIRE_KEY).await?;

        if token_is_fresh(token.as_ref(), expire.as_ref(), now_ms) {
            return Ok(true);
        }

        info!("login required: token missing or expired");
        forget_token(&self.storage).await?;
        self.session.update(UserSession::clear_login_info).await?;

        if let Some(route) = self.navigator.current_route() {
            if !route.contains(&self.login_route) {
                self.navigator.redirect_to(&self.login_route);
            }
        }

        Ok(false)
    }
}

/// Stores what the guard reads. Called by the login screen after a
/// successful login.
pub async fn remember_token(storage: &KvStorage, token: &str, expire_ms: i64) -> StorageResult<()> {
    storage.set_item(TOKEN_KEY, token).await?;
    storage.set_item(TOKEN_EXPIRE_KEY, &expire_ms).await
}

pub async fn forget_token(storage: &KvStorage) -> StorageResult<()> {
    storage.remove_item(TOKEN_KEY).await?;
    storage.remove_item(TOKEN_EXPIRE_KEY).await
}

/// A token is fresh when it is a non-empty string and its expiry is a
/// non-zero epoch-millis value not earlier than `now_ms`. Expiry may be
/// stored as a number or a numeric string.
pub fn token_is_fresh(token: Option<&Value>, expire: Option<&Value>, now_ms: i64) -> bool {
    let has_token = matches!(token, Some(Value::String(t)) if !t.is_empty());

    let expire_ms = match expire {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match expire_ms {
        Some(at) if has_token && at != 0 => now_ms <= at,
        _ => false,
    }
}
