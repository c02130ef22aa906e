use crate::domain::model::{
    ClusterDefinition, ClusterRecord, CrawlerDefinition, CrawlerRecord, DatabaseRecord,
    JobArguments, JobDefinition, JobRunId, TableRecord, TabularFrame,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Access key, secret key and region resolved once for a client.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key", &self.access_key.as_ref().map(|_| "***"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("region", &self.region)
            .finish()
    }
}

pub trait CredentialProvider: Send + Sync {
    fn resolve(&self) -> Result<AwsCredentials>;
}

/// Local relational source that can materialize a whole table.
pub trait TableSource: Send + Sync {
    fn read_table(&self, table: &str) -> Result<TabularFrame>;
}

impl<T: TableSource + ?Sized> TableSource for std::sync::Arc<T> {
    fn read_table(&self, table: &str) -> Result<TabularFrame> {
        (**self).read_table(table)
    }
}

#[async_trait]
pub trait ObjectStoreApi: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>>;
    async fn create_bucket(&self, bucket: &str, region: Option<&str>) -> Result<()>;
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()>;
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn create_crawler(&self, definition: &CrawlerDefinition) -> Result<()>;
    async fn get_crawler(&self, name: &str) -> Result<CrawlerRecord>;
    async fn start_crawler(&self, name: &str) -> Result<()>;
    async fn delete_crawler(&self, name: &str) -> Result<()>;
    async fn get_database(&self, name: &str) -> Result<DatabaseRecord>;
    async fn list_tables(&self, database_name: &str) -> Result<Vec<TableRecord>>;
}

#[async_trait]
pub trait JobApi: Send + Sync {
    async fn list_jobs(&self, limit: i32) -> Result<Vec<String>>;
    async fn create_job(&self, definition: &JobDefinition) -> Result<()>;
    async fn start_job_run(&self, name: &str, arguments: &JobArguments) -> Result<JobRunId>;
    async fn delete_job(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait WarehouseApi: Send + Sync {
    async fn create_cluster(&self, definition: &ClusterDefinition) -> Result<ClusterRecord>;
    async fn describe_cluster(&self, identifier: &str) -> Result<ClusterRecord>;
    async fn delete_cluster(&self, identifier: &str, final_snapshot: Option<&str>) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn tables(&self) -> &[String];
    async fn extract(&self, table: &str) -> Result<TabularFrame>;
    /// Returns the object key the frame was written to.
    async fn load(&self, table: &str, frame: TabularFrame) -> Result<String>;
}
