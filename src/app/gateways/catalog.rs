use crate::app::gateways::log_failure;
use crate::domain::model::{CrawlerDefinition, CrawlerRecord, DatabaseRecord, TableRecord};
use crate::domain::ports::CatalogApi;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Data Catalog introspection and crawler lifecycle.
///
/// Crawler runs are owned by the managed service: `start_crawler` returns
/// as soon as the run is accepted and nothing here waits for it.
#[derive(Clone)]
pub struct CatalogGateway {
    api: Arc<dyn CatalogApi>,
}

impl CatalogGateway {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self { api }
    }

    pub async fn create_crawler(&self, definition: &CrawlerDefinition) -> Result<()> {
        self.api
            .create_crawler(definition)
            .await
            .inspect_err(log_failure)?;
        info!(
            crawler = %definition.name,
            database = %definition.database_name,
            target = %definition.s3_target_path,
            "✅ Crawler created"
        );
        Ok(())
    }

    /// Returns `None` when the crawler does not exist.
    pub async fn get_crawler(&self, name: &str) -> Result<Option<CrawlerRecord>> {
        match self.api.get_crawler(name).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => {
                debug!("Crawler {} does not exist", name);
                Ok(None)
            }
            Err(e) => {
                log_failure(&e);
                Err(e)
            }
        }
    }

    pub async fn start_crawler(&self, name: &str) -> Result<()> {
        self.api.start_crawler(name).await.inspect_err(log_failure)?;
        info!(crawler = %name, "🕷️ Crawler started");
        Ok(())
    }

    pub async fn delete_crawler(&self, name: &str) -> Result<()> {
        self.api.delete_crawler(name).await.inspect_err(log_failure)?;
        info!(crawler = %name, "Crawler deleted");
        Ok(())
    }

    pub async fn get_database(&self, name: &str) -> Result<DatabaseRecord> {
        self.api.get_database(name).await.inspect_err(log_failure)
    }

    pub async fn list_tables(&self, database_name: &str) -> Result<Vec<TableRecord>> {
        self.api
            .list_tables(database_name)
            .await
            .inspect_err(log_failure)
    }
}
