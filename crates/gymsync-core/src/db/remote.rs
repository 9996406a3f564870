//! Client for the hosted libSQL store, cached per credential pair

use std::future::Future;
use std::sync::Arc;

use libsql::{Builder, Connection, Database as LibSqlDatabase};
use tokio::sync::Mutex;

use super::store::{run_statement, QueryResult, SqlStore};
use crate::error::Result;
use crate::models::{Credentials, SqlValue};

/// A connection to the hosted store.
///
/// Every statement is one network round trip; there is no retry at this
/// layer, transport errors surface to the caller as-is.
pub struct RemoteStore {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl RemoteStore {
    pub async fn connect(credentials: &Credentials) -> Result<Self> {
        let db = Builder::new_remote(credentials.url.clone(), credentials.token.clone())
            .build()
            .await?;
        let conn = db.connect()?;
        tracing::debug!("Connected remote store client for {}", credentials.url);
        Ok(Self {
            _db: db,
            conn,
        })
    }

    pub async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<QueryResult> {
        run_statement(&self.conn, sql, args).await
    }
}

impl SqlStore for RemoteStore {
    async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<QueryResult> {
        Self::execute(self, sql, args).await
    }

    fn label(&self) -> &str {
        "remote"
    }
}

/// Produces a remote store for a credential pair.
pub trait RemoteConnector: Send + Sync {
    type Store: SqlStore + 'static;

    fn connect(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Arc<Self::Store>>> + Send;
}

/// Holds at most one live client, keyed by the credentials it was built with.
///
/// A request with different credentials discards the cached client and builds
/// a new one, so credentials can rotate at runtime.
pub struct ClientCache<T> {
    slot: Mutex<Option<(Credentials, Arc<T>)>>,
}

impl<T> ClientCache<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub async fn get_or_connect<F, Fut>(&self, credentials: &Credentials, connect: F) -> Result<Arc<T>>
    where
        F: FnOnce(Credentials) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some((cached, client)) = slot.as_ref() {
            if cached == credentials {
                return Ok(Arc::clone(client));
            }
            tracing::info!("Remote credentials changed; discarding cached client");
        }

        *slot = None;
        let client = Arc::new(connect(credentials.clone()).await?);
        *slot = Some((credentials.clone(), Arc::clone(&client)));
        Ok(client)
    }

    /// Drop the cached client, if any.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    pub async fn is_cached(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl<T> Default for ClientCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Remote connector backed by real libSQL clients.
#[derive(Default)]
pub struct RemoteClientCache {
    cache: ClientCache<RemoteStore>,
}

impl RemoteClientCache {
    pub fn new() -> Self {
        Self {
            cache: ClientCache::new(),
        }
    }

    /// Client for explicit values, falling back to `TURSO_DATABASE_URL` /
    /// `TURSO_AUTH_TOKEN` for whatever is not supplied.
    pub async fn client(
        &self,
        url: Option<String>,
        token: Option<String>,
    ) -> Result<Arc<RemoteStore>> {
        let credentials = Credentials::resolve_from_env(url, token)?;
        self.connect(&credentials).await
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }
}

impl RemoteConnector for RemoteClientCache {
    type Store = RemoteStore;

    async fn connect(&self, credentials: &Credentials) -> Result<Arc<RemoteStore>> {
        self.cache
            .get_or_connect(credentials, |credentials| async move {
                RemoteStore::connect(&credentials).await
            })
            .await
    }
}
