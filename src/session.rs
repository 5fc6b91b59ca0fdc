//! Session management.
//!
//! The session identifier is the only value the client persists. It lives
//! under the single canonical key [`SESSION_KEY`]; no other key is read.
//!
//! [`SessionManager`] owns the identifier for the whole process: login,
//! account creation and logout are its only writers, and every gated view
//! reads it through [`SessionManager::gate`]. Components never reach for an
//! ambient session; they receive the [`SessionId`] the gate hands out.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::model::{Credentials, NewAccount, SessionId};
use crate::remote::RemoteService;

/// Storage key of the session identifier.
pub const SESSION_KEY: &str = "user_id";

/// Entry view for unauthenticated callers.
pub const LOGIN_VIEW: &str = "/login";

/// Key/value persistence for client state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()>;

    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Volatile store; the session dies with the process.
#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

/// SQLite-backed store, so a session survives restarts of the gateway.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open the store and create its table.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:footprint-session.db?mode=rwc" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // One connection: a single value, and `sqlite::memory:` is per-connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS client_state (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT value FROM client_state WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO client_state (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM client_state WHERE key = ?
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Outcome of gating a protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted(SessionId),
    /// No session; send the caller to this view instead.
    Redirect(&'static str),
}

/// Owner of the current session identifier.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<SessionId>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// Pick up a session persisted by an earlier run.
    pub async fn restore(&self) -> anyhow::Result<Option<SessionId>> {
        let restored = self.store.load(SESSION_KEY).await?.and_then(SessionId::new);
        if restored.is_some() {
            info!("Restored persisted session");
        }
        *self.current.write().await = restored.clone();
        Ok(restored)
    }

    pub async fn current_session(&self) -> Option<SessionId> {
        self.current.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Decide whether a protected view may be entered.
    pub async fn gate(&self) -> Access {
        match self.current_session().await {
            Some(session) => Access::Granted(session),
            None => Access::Redirect(LOGIN_VIEW),
        }
    }

    /// Record a session issued by the remote service.
    ///
    /// The in-memory session is set even when persisting it fails; the
    /// failure is logged and the session then lasts only for this process.
    pub async fn establish(&self, session: SessionId) {
        if let Err(e) = self.store.save(SESSION_KEY, session.as_str()).await {
            warn!(error = %e, "Failed to persist session");
        }
        debug!(session = %session, "Session established");
        *self.current.write().await = Some(session);
    }

    /// Forget the current session (logout).
    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY).await {
            warn!(error = %e, "Failed to remove persisted session");
        }
        *self.current.write().await = None;
        info!("Session cleared");
    }

    /// Log in and establish the issued session.
    pub async fn login(
        &self,
        remote: &dyn RemoteService,
        credentials: &Credentials,
    ) -> Result<SessionId, ClientError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(ClientError::validation("Please enter your email and password."));
        }

        let grant = remote.login(credentials).await?;
        self.establish(grant.user_id.clone()).await;
        info!("Login successful");
        Ok(grant.user_id)
    }

    /// Create an account and establish the issued session.
    pub async fn create_account(
        &self,
        remote: &dyn RemoteService,
        account: &NewAccount,
    ) -> Result<SessionId, ClientError> {
        if account.username.trim().is_empty()
            || account.email.trim().is_empty()
            || account.password.is_empty()
        {
            return Err(ClientError::validation(
                "Please enter a name, email and password.",
            ));
        }

        let grant = remote.create_account(account).await?;
        self.establish(grant.user_id.clone()).await;
        info!("Account created");
        Ok(grant.user_id)
    }
}
