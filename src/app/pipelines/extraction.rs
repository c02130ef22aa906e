use crate::adapters::sqlite::SqliteSource;
use crate::app::gateways::ObjectStoreGateway;
use crate::config::LakeConfig;
use crate::domain::model::{TabularFrame, Tier};
use crate::domain::ports::{Pipeline, TableSource};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Reads configured tables from a local source and writes each one to
/// `source/<table>.csv` in the project bucket.
pub struct ExtractionPipeline<S: TableSource> {
    source: Arc<S>,
    store: ObjectStoreGateway,
    bucket: String,
    tables: Vec<String>,
    tier: Tier,
}

impl<S: TableSource> ExtractionPipeline<S> {
    pub fn new(source: S, store: ObjectStoreGateway, bucket: &str, tables: Vec<String>) -> Self {
        Self {
            source: Arc::new(source),
            store,
            bucket: bucket.to_string(),
            tables,
            tier: Tier::Source,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

impl ExtractionPipeline<SqliteSource> {
    /// SQLite file, bucket and table list from `[database]` / `[aws]`.
    pub fn from_config(config: &LakeConfig, store: ObjectStoreGateway) -> Self {
        Self::new(
            SqliteSource::new(&config.database.path),
            store,
            &config.aws.project_bucket,
            config.database.tables.clone(),
        )
    }
}

#[async_trait]
impl<S: TableSource + 'static> Pipeline for ExtractionPipeline<S> {
    fn tables(&self) -> &[String] {
        &self.tables
    }

    async fn extract(&self, table: &str) -> Result<TabularFrame> {
        // rusqlite 是同步 API，放到 blocking 執行緒上讀取
        let source = Arc::clone(&self.source);
        let name = table.to_string();
        let frame = tokio::task::spawn_blocking(move || source.read_table(&name))
            .await
            .map_err(|e| EtlError::processing(format!("Reading table {} was interrupted: {}", table, e)))??;
        debug!(table = %table, rows = frame.row_count(), "Extracted table");
        Ok(frame)
    }

    async fn load(&self, table: &str, frame: TabularFrame) -> Result<String> {
        let key = self.tier.object_key(table);
        self.store
            .upload_tabular_as_csv(&frame, &self.bucket, &key)
            .await?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryObjectStore;
    use crate::domain::model::CellValue;

    struct FixedSource;

    impl TableSource for FixedSource {
        fn read_table(&self, table: &str) -> Result<TabularFrame> {
            let mut frame = TabularFrame::new(vec!["id".into(), "name".into()]);
            frame.push_row(vec![CellValue::Integer(1), CellValue::Text(table.to_string())]);
            Ok(frame)
        }
    }

    #[tokio::test]
    async fn test_load_writes_source_tier_key() {
        let store = InMemoryObjectStore::with_buckets(["tickit-project-bucket"]);
        let gateway = ObjectStoreGateway::new(Arc::new(store.clone()), None);
        let pipeline = ExtractionPipeline::new(
            FixedSource,
            gateway,
            "tickit-project-bucket",
            vec!["users".into()],
        );

        let frame = pipeline.extract("users").await.unwrap();
        let key = pipeline.load("users", frame).await.unwrap();

        assert_eq!(key, "source/users.csv");
        assert_eq!(pipeline.tier(), Tier::Source);
        let body = store.object("tickit-project-bucket", &key).await.unwrap();
        assert_eq!(String::from_utf8(body).unwrap(), "id,name\n1,users\n");
    }

    struct BrokenSource;

    impl TableSource for BrokenSource {
        fn read_table(&self, table: &str) -> Result<TabularFrame> {
            Err(EtlError::processing(format!("no such table: {}", table)))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_extract_surfaces_source_error_from_blocking_read() {
        let store = InMemoryObjectStore::with_buckets(["tickit-project-bucket"]);
        let pipeline = ExtractionPipeline::new(
            BrokenSource,
            ObjectStoreGateway::new(Arc::new(store.clone()), None),
            "tickit-project-bucket",
            vec!["sales".into()],
        );

        let err = pipeline.extract("sales").await.unwrap_err();

        assert!(matches!(err, EtlError::ProcessingError { .. }));
        assert!(err.to_string().contains("no such table: sales"));
        assert!(store.uploads().await.is_empty());
    }
}
