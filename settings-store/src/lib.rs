use reeltube_core::{CoreError, ErrorReporter, Settings, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, warn};


/// Slot holding the serialized settings record.
pub const SETTINGS_KEY: &str = "reel-to-tube-settings";

pub struct SettingsStore {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl SettingsStore {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| StoreError::ConnectionFailed {
                reason: e.to_string(),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to settings store at {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(self.pool()?)
            .await
            .map_err(StoreError::from)?;
        debug!("Settings store migrations applied");
        Ok(())
    }

    pub async fn save_setting(&self, key: &str, value: &str) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool()?)
        .await
        .map_err(map_sql_error)?;
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, CoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(self.pool()?)
            .await
            .map_err(map_sql_error)?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn remove_setting(&self, key: &str) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(self.pool()?)
            .await
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Reads the settings record.
    ///
    /// Unreadable or incomplete records are removed and reported as absent,
    /// which sends the user back through setup.
    pub async fn load(&self) -> Result<Option<Settings>, CoreError> {
        let Some(raw) = self.get_setting(SETTINGS_KEY).await? else {
            debug!("No saved settings");
            return Ok(None);
        };

        match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) if settings.is_complete() => Ok(Some(settings)),
            Ok(_) => {
                warn!("Saved settings have no monitored account, discarding");
                self.clear().await?;
                Ok(None)
            }
            Err(e) => {
                warn!("Error parsing saved settings: {}", e);
                ErrorReporter::new().report_warning(&CoreError::Store(
                    StoreError::MalformedRecord {
                        key: SETTINGS_KEY.to_string(),
                    },
                ));
                self.clear().await?;
                Ok(None)
            }
        }
    }

    pub async fn save(&self, settings: &Settings) -> Result<(), CoreError> {
        let raw = serde_json::to_string(settings)?;
        self.save_setting(SETTINGS_KEY, &raw).await?;
        debug!("Saved settings for @{}", settings.monitored_account);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), CoreError> {
        self.remove_setting(SETTINGS_KEY).await?;
        info!("Cleared saved settings");
        Ok(())
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool
            .as_ref()
            .ok_or_else(|| CoreError::Store(StoreError::NotConnected))
    }
}

fn map_sql_error(error: sqlx::Error) -> CoreError {
    let locked = matches!(
        &error,
        sqlx::Error::Database(db) if db.message().contains("database is locked")
    );
    if locked {
        CoreError::Store(StoreError::DatabaseLocked)
    } else {
        CoreError::Store(StoreError::Sql(error))
    }
}
