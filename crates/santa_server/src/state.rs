use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use santa_core::{ParticipantService, SqliteParticipantRepository};

use crate::config::Settings;
use crate::error::ApiError;

/// Shared handle to the single SQLite connection.
///
/// Each operation holds the lock for its whole duration on a blocking
/// thread, so generate and reset never interleave.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `op` with exclusive access to the connection.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, ApiError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| ApiError::Internal("store connection lock poisoned".to_owned()))?;
            op(&mut *guard)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("store task failed: {err}")))?
    }
}

/// Runs CPU-bound work such as bcrypt on the blocking pool without
/// touching the store lock.
pub async fn run_blocking<T, F>(op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
}

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(conn: Connection, settings: Settings) -> Self {
        Self {
            store: Store::new(conn),
            settings: Arc::new(settings),
        }
    }

    /// Creates or refreshes the configured admin account.
    pub async fn bootstrap_admin(&self, name: &str, password_hash: &str) -> Result<(), ApiError> {
        let name = name.to_owned();
        let password_hash = password_hash.to_owned();
        self.store
            .run(move |conn| {
                let repo = SqliteParticipantRepository::try_new(conn)?;
                ParticipantService::new(repo).ensure_admin(&name, &password_hash)?;
                Ok(())
            })
            .await
    }
}
