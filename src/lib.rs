pub mod api;
pub mod config;
pub mod guard;
pub mod session;
pub mod storage;
pub mod tasks;

use thiserror::Error;
use tracing::info;

use api::ApiClient;
use config::Config;
use guard::{CheckLatch, LoginGuard, Navigator};
use session::SessionStore;
use storage::{error::StorageError, KvStorage};
use tasks::TaskStore;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Everything the screens need for one run of the app. Cheap to clone; all
/// clones share the same stores.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub storage: KvStorage,
    pub session: SessionStore,
    pub tasks: TaskStore,
    pub api: ApiClient,
    /// One re-entrancy flag for every guard handed out by this context.
    pub login_latch: CheckLatch,
}

impl AppContext {
    pub async fn open(config: Config) -> Result<Self, AppError> {
        let storage = KvStorage::open(&config.db_path).await?;
        let ctx = Self::with_storage(config, storage).await?;
        info!(base_url = %ctx.config.base_url, "app context ready");
        Ok(ctx)
    }

    pub async fn with_storage(config: Config, storage: KvStorage) -> Result<Self, AppError> {
        let session = SessionStore::open(storage.clone()).await?;
        let tasks = TaskStore::open(storage.clone()).await?;
        let api = ApiClient::new(&config.base_url, session.clone());

        Ok(Self {
            config,
            storage,
            session,
            tasks,
            api,
            login_latch: CheckLatch::default(),
        })
    }

    pub fn login_guard<N: Navigator>(&self, navigator: N) -> LoginGuard<N> {
        LoginGuard::new(self.storage.clone(), self.session.clone(), navigator)
            .with_latch(self.login_latch.clone())
            .with_login_route(self.config.login_route.clone())
            .with_cooldown(self.config.login_check_cooldown())
    }
}

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`). Safe to
/// call more than once.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
