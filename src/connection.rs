use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::backend::{BackendClient, Database, Instance};
use crate::config::SpannerOptions;
use crate::cursor::Cursor;
use crate::ddl;
use crate::error::SpannerDbError;

/// Connection to one backend database.
///
/// Instance and database handles are resolved on first use and reused afterwards; every
/// cursor created from the connection shares the same database handle.
pub struct SpannerConnection {
    client: Arc<dyn BackendClient>,
    options: SpannerOptions,
    instance: OnceCell<Arc<dyn Instance>>,
    database: OnceCell<Arc<dyn Database>>,
}

impl std::fmt::Debug for SpannerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannerConnection")
            .field("options", &self.options)
            .field("instance_resolved", &self.instance.initialized())
            .field("database_resolved", &self.database.initialized())
            .finish_non_exhaustive()
    }
}

impl SpannerConnection {
    /// # Errors
    /// Returns `SpannerDbError::ConfigError` if `options` are invalid.
    pub fn new(
        client: Arc<dyn BackendClient>,
        options: SpannerOptions,
    ) -> Result<Self, SpannerDbError> {
        options.validate()?;
        Ok(Self {
            client,
            options,
            instance: OnceCell::new(),
            database: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn options(&self) -> &SpannerOptions {
        &self.options
    }

    #[must_use]
    pub fn project(&self) -> &str {
        self.client.project()
    }

    /// Instance handle, resolved once.
    ///
    /// # Errors
    /// Propagates the backend's lookup failure; a failed lookup is retried on the next call.
    pub async fn instance(&self) -> Result<&Arc<dyn Instance>, SpannerDbError> {
        self.instance
            .get_or_try_init(|| async {
                debug!(instance = %self.options.instance, "resolving instance");
                self.client.instance(&self.options.instance).await
            })
            .await
    }

    /// Database handle, resolved once.
    ///
    /// # Errors
    /// Propagates the backend's lookup failure; a failed lookup is retried on the next call.
    pub async fn database(&self) -> Result<&Arc<dyn Database>, SpannerDbError> {
        self.database
            .get_or_try_init(|| async {
                let instance = self.instance().await?;
                debug!(database = %self.options.database, "resolving database");
                instance.database(&self.options.database).await
            })
            .await
    }

    /// A new cursor over this connection's database.
    ///
    /// # Errors
    /// See [`SpannerConnection::database`].
    pub async fn cursor(&self) -> Result<Cursor, SpannerDbError> {
        let database = Arc::clone(self.database().await?);
        Ok(Cursor::new(database).with_arraysize(self.options.arraysize))
    }

    /// Create this connection's database with the full registry DDL.
    ///
    /// # Errors
    /// Returns whatever the backend reports, e.g. when the database already exists.
    pub async fn create_database(&self) -> Result<(), SpannerDbError> {
        let instance = self.instance().await?;
        ddl::create_database(instance.as_ref(), &self.options.database).await
    }
}
