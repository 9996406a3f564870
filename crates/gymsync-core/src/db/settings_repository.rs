//! Settings repository implementation

use super::connection::LocalStore;
use crate::error::Result;
use crate::models::{Credentials, SqlValue};

const REMOTE_URL_KEY: &str = "sync.remote_url";
const REMOTE_TOKEN_KEY: &str = "sync.remote_token";

/// Trait for the persisted key-value configuration store (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Load the remote credentials, if both halves are stored
    async fn load_credentials(&self) -> Result<Option<Credentials>>;

    /// Persist the remote credentials
    async fn save_credentials(&self, credentials: &Credentials) -> Result<()>;

    /// Remove any persisted credentials
    async fn clear_credentials(&self) -> Result<()>;
}

/// Settings repository backed by the local store's `settings` table
pub struct LocalSettingsRepository<'a> {
    store: &'a LocalStore,
}

impl<'a> LocalSettingsRepository<'a> {
    /// Create a new repository over the given store
    pub const fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .store
            .execute(
                "SELECT value FROM settings WHERE key = ?",
                vec![key.into()],
            )
            .await?;

        Ok(result
            .rows
            .first()
            .and_then(|row| row.get("value"))
            .and_then(SqlValue::as_text)
            .map(str::to_string))
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.store
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                vec![key.into(), value.into()],
            )
            .await?;
        Ok(())
    }

    pub async fn remove_setting(&self, key: &str) -> Result<()> {
        self.store
            .execute("DELETE FROM settings WHERE key = ?", vec![key.into()])
            .await?;
        Ok(())
    }
}

impl SettingsRepository for LocalSettingsRepository<'_> {
    async fn load_credentials(&self) -> Result<Option<Credentials>> {
        let url = self.get_setting(REMOTE_URL_KEY).await?;
        let token = self.get_setting(REMOTE_TOKEN_KEY).await?;

        Ok(match (url, token) {
            (Some(url), Some(token)) => Credentials::new(url, token).ok(),
            _ => None,
        })
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.set_setting(REMOTE_URL_KEY, &credentials.url).await?;
        self.set_setting(REMOTE_TOKEN_KEY, &credentials.token)
            .await?;
        Ok(())
    }

    async fn clear_credentials(&self) -> Result<()> {
        self.remove_setting(REMOTE_URL_KEY).await?;
        self.remove_setting(REMOTE_TOKEN_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DEFAULT_BOOTSTRAP_SCRIPT;

    async fn setup() -> LocalStore {
        LocalStore::open_in_memory(DEFAULT_BOOTSTRAP_SCRIPT)
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_no_credentials_by_default() {
        let store = setup().await;
        let repo = LocalSettingsRepository::new(&store);
        assert!(repo.load_credentials().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_load_and_clear_credentials() {
        let store = setup().await;
        let repo = LocalSettingsRepository::new(&store);
        let credentials = Credentials::new("libsql://gym.turso.io", "token-1").unwrap();

        repo.save_credentials(&credentials).await.unwrap();
        assert_eq!(repo.load_credentials().await.unwrap(), Some(credentials));

        repo.clear_credentials().await.unwrap();
        assert!(repo.load_credentials().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_half_configured_credentials_are_absent() {
        let store = setup().await;
        let repo = LocalSettingsRepository::new(&store);
        repo.set_setting(REMOTE_URL_KEY, "libsql://gym.turso.io")
            .await
            .unwrap();
        assert!(repo.load_credentials().await.unwrap().is_none());
    }
}
