//! In-process provider backends.
//!
//! They keep just enough state to behave like S3, Glue and Redshift for dry
//! runs and tests, and can be told to fail a named operation with a provider
//! error code.

use crate::domain::model::{
    ClusterDefinition, ClusterRecord, CrawlerDefinition, CrawlerRecord, CrawlerState,
    DatabaseRecord, JobArguments, JobDefinition, JobRunId, TableRecord,
};
use crate::domain::ports::{CatalogApi, JobApi, ObjectStoreApi, WarehouseApi};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

fn injected(
    failures: &HashMap<String, String>,
    service: &str,
    operation: &str,
) -> Result<()> {
    match failures.get(operation) {
        Some(code) => Err(EtlError::provider(
            service,
            operation,
            Some(code.as_str()),
            "injected failure",
        )),
        None => Ok(()),
    }
}

#[derive(Default)]
struct ObjectStoreState {
    buckets: Vec<String>,
    objects: BTreeMap<(String, String), Vec<u8>>,
    uploads: Vec<(String, String)>,
    calls: HashMap<String, usize>,
    failures: HashMap<String, String>,
}

impl ObjectStoreState {
    fn record(&mut self, operation: &str) -> Result<()> {
        *self.calls.entry(operation.to_string()).or_insert(0) += 1;
        injected(&self.failures, "s3", operation)
    }

    fn require_bucket(&self, operation: &str, bucket: &str) -> Result<()> {
        if self.buckets.iter().any(|b| b == bucket) {
            Ok(())
        } else {
            Err(EtlError::provider(
                "s3",
                operation,
                Some("NoSuchBucket"),
                format!("The specified bucket does not exist: {}", bucket),
            ))
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    state: Arc<Mutex<ObjectStoreState>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(Mutex::new(ObjectStoreState {
                buckets: buckets.into_iter().map(Into::into).collect(),
                ..Default::default()
            })),
        }
    }

    /// Every later call to `operation` (e.g. `"PutObject"`) fails with `code`.
    pub async fn fail_operation(&self, operation: &str, code: &str) {
        let mut state = self.state.lock().await;
        state.failures.insert(operation.to_string(), code.to_string());
    }

    pub async fn buckets(&self) -> Vec<String> {
        self.state.lock().await.buckets.clone()
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// (bucket, key) pairs in the order they were written.
    pub async fn uploads(&self) -> Vec<(String, String)> {
        self.state.lock().await.uploads.clone()
    }

    pub async fn call_count(&self, operation: &str) -> usize {
        let state = self.state.lock().await;
        state.calls.get(operation).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStoreApi for InMemoryObjectStore {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        state.record("ListBuckets")?;
        Ok(state.buckets.clone())
    }

    async fn create_bucket(&self, bucket: &str, _region: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("CreateBucket")?;
        if state.buckets.iter().any(|b| b == bucket) {
            return Err(EtlError::provider(
                "s3",
                "CreateBucket",
                Some("BucketAlreadyOwnedByYou"),
                format!("Bucket {} already exists", bucket),
            ));
        }
        state.buckets.push(bucket.to_string());
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("PutObject")?;
        state.require_bucket("PutObject", bucket)?;
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        state.uploads.push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let mut state = self.state.lock().await;
        state.record("GetObject")?;
        state.require_bucket("GetObject", bucket)?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| {
                EtlError::provider(
                    "s3",
                    "GetObject",
                    Some("NoSuchKey"),
                    format!("The specified key does not exist: {}", key),
                )
            })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record("DeleteObject")?;
        state.require_bucket("DeleteObject", bucket)?;
        // S3 刪除不存在的 key 也回傳成功
        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

/// One recorded `StartJobRun` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedJobRun {
    pub run_id: JobRunId,
    pub job_name: String,
    pub arguments: JobArguments,
    pub started_at: DateTime<Utc>,
}

#[derive(Default)]
struct GlueState {
    crawlers: BTreeMap<String, (CrawlerDefinition, CrawlerState, DateTime<Utc>)>,
    databases: BTreeMap<String, Vec<TableRecord>>,
    jobs: BTreeMap<String, JobDefinition>,
    runs: Vec<RecordedJobRun>,
    next_run: u64,
    failures: HashMap<String, String>,
}

fn entity_not_found(operation: &str, what: &str, name: &str) -> EtlError {
    EtlError::provider(
        "glue",
        operation,
        Some("EntityNotFoundException"),
        format!("{} {} not found", what, name),
    )
}

#[derive(Clone, Default)]
pub struct InMemoryGlue {
    state: Arc<Mutex<GlueState>>,
}

impl InMemoryGlue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_operation(&self, operation: &str, code: &str) {
        let mut state = self.state.lock().await;
        state.failures.insert(operation.to_string(), code.to_string());
    }

    /// Registers a catalog database, as a finished crawler would.
    pub async fn add_database(&self, name: &str, tables: Vec<TableRecord>) {
        let mut state = self.state.lock().await;
        state.databases.insert(name.to_string(), tables);
    }

    pub async fn crawler_state(&self, name: &str) -> Option<CrawlerState> {
        let state = self.state.lock().await;
        state.crawlers.get(name).map(|(_, s, _)| s.clone())
    }

    pub async fn job_names(&self) -> Vec<String> {
        self.state.lock().await.jobs.keys().cloned().collect()
    }

    pub async fn runs(&self) -> Vec<RecordedJobRun> {
        self.state.lock().await.runs.clone()
    }
}

#[async_trait]
impl CatalogApi for InMemoryGlue {
    async fn create_crawler(&self, definition: &CrawlerDefinition) -> Result<()> {
        let mut state = self.state.lock().await;
        injected(&state.failures, "glue", "CreateCrawler")?;
        if state.crawlers.contains_key(&definition.name) {
            return Err(EtlError::provider(
                "glue",
                "CreateCrawler",
                Some("AlreadyExistsException"),
                format!("Crawler {} already exists", definition.name),
            ));
        }
        state.crawlers.insert(
            definition.name.clone(),
            (definition.clone(), CrawlerState::Ready, Utc::now()),
        );
        Ok(())
    }

    async fn get_crawler(&self, name: &str) -> Result<CrawlerRecord> {
        let state = self.state.lock().await;
        injected(&state.failures, "glue", "GetCrawler")?;
        let (definition, crawler_state, created_at) = state
            .crawlers
            .get(name)
            .ok_or_else(|| entity_not_found("GetCrawler", "Crawler", name))?;

        Ok(CrawlerRecord {
            name: definition.name.clone(),
            role: Some(definition.role_arn.clone()),
            database_name: Some(definition.database_name.clone()),
            table_prefix: Some(definition.table_prefix.clone()),
            s3_targets: vec![definition.s3_target_path.clone()],
            state: Some(crawler_state.clone()),
            created_at: Some(*created_at),
        })
    }

    async fn start_crawler(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        injected(&state.failures, "glue", "StartCrawler")?;
        let database_name = {
            let (definition, crawler_state, _) = state
                .crawlers
                .get_mut(name)
                .ok_or_else(|| entity_not_found("StartCrawler", "Crawler", name))?;
            if *crawler_state == CrawlerState::Running {
                return Err(EtlError::provider(
                    "glue",
                    "StartCrawler",
                    Some("CrawlerRunningException"),
                    format!("Crawler {} is already running", name),
                ));
            }
            *crawler_state = CrawlerState::Running;
            definition.database_name.clone()
        };
        state.databases.entry(database_name).or_default();
        Ok(())
    }

    async fn delete_crawler(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        injected(&state.failures, "glue", "DeleteCrawler")?;
        state
            .crawlers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| entity_not_found("DeleteCrawler", "Crawler", name))
    }

    async fn get_database(&self, name: &str) -> Result<DatabaseRecord> {
        let state = self.state.lock().await;
        injected(&state.failures, "glue", "GetDatabase")?;
        if !state.databases.contains_key(name) {
            return Err(entity_not_found("GetDatabase", "Database", name));
        }
        Ok(DatabaseRecord {
            name: name.to_string(),
            description: None,
            location_uri: None,
            created_at: None,
        })
    }

    async fn list_tables(&self, database_name: &str) -> Result<Vec<TableRecord>> {
        let state = self.state.lock().await;
        injected(&state.failures, "glue", "GetTables")?;
        state
            .databases
            .get(database_name)
            .cloned()
            .ok_or_else(|| entity_not_found("GetTables", "Database", database_name))
    }
}

#[async_trait]
impl JobApi for InMemoryGlue {
    async fn list_jobs(&self, limit: i32) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        injected(&state.failures, "glue", "GetJobs")?;
        Ok(state
            .jobs
            .keys()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn create_job(&self, definition: &JobDefinition) -> Result<()> {
        let mut state = self.state.lock().await;
        injected(&state.failures, "glue", "CreateJob")?;
        if state.jobs.contains_key(&definition.name) {
            return Err(EtlError::provider(
                "glue",
                "CreateJob",
                Some("AlreadyExistsException"),
                format!("Job {} already exists", definition.name),
            ));
        }
        state
            .jobs
            .insert(definition.name.clone(), definition.clone());
        Ok(())
    }

    async fn start_job_run(&self, name: &str, arguments: &JobArguments) -> Result<JobRunId> {
        let mut state = self.state.lock().await;
        injected(&state.failures, "glue", "StartJobRun")?;
        if !state.jobs.contains_key(name) {
            return Err(entity_not_found("StartJobRun", "Job", name));
        }
        state.next_run += 1;
        let run_id = JobRunId::new(format!("jr_{:064x}", state.next_run));
        state.runs.push(RecordedJobRun {
            run_id: run_id.clone(),
            job_name: name.to_string(),
            arguments: arguments.clone(),
            started_at: Utc::now(),
        });
        Ok(run_id)
    }

    async fn delete_job(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        injected(&state.failures, "glue", "DeleteJob")?;
        // Glue 刪除不存在的 job 也成功，執行紀錄一併刪除
        state.jobs.remove(name);
        state.runs.retain(|run| run.job_name != name);
        Ok(())
    }
}

#[derive(Default)]
struct WarehouseState {
    clusters: BTreeMap<String, ClusterRecord>,
    failures: HashMap<String, String>,
}

fn cluster_not_found(operation: &str, identifier: &str) -> EtlError {
    EtlError::provider(
        "redshift",
        operation,
        Some("ClusterNotFound"),
        format!("Cluster {} not found", identifier),
    )
}

#[derive(Clone, Default)]
pub struct InMemoryWarehouse {
    state: Arc<Mutex<WarehouseState>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_operation(&self, operation: &str, code: &str) {
        let mut state = self.state.lock().await;
        state.failures.insert(operation.to_string(), code.to_string());
    }

    pub async fn cluster_count(&self) -> usize {
        self.state.lock().await.clusters.len()
    }
}

#[async_trait]
impl WarehouseApi for InMemoryWarehouse {
    async fn create_cluster(&self, definition: &ClusterDefinition) -> Result<ClusterRecord> {
        let mut state = self.state.lock().await;
        injected(&state.failures, "redshift", "CreateCluster")?;
        if state.clusters.contains_key(&definition.identifier) {
            return Err(EtlError::provider(
                "redshift",
                "CreateCluster",
                Some("ClusterAlreadyExists"),
                format!("Cluster {} already exists", definition.identifier),
            ));
        }
        let record = ClusterRecord {
            identifier: definition.identifier.clone(),
            status: Some("available".to_string()),
            node_type: Some(definition.node_type.clone()),
            number_of_nodes: Some(definition.number_of_nodes),
            endpoint: Some(format!("{}.redshift.local", definition.identifier)),
            port: Some(5439),
        };
        state
            .clusters
            .insert(definition.identifier.clone(), record.clone());
        Ok(record)
    }

    async fn describe_cluster(&self, identifier: &str) -> Result<ClusterRecord> {
        let state = self.state.lock().await;
        injected(&state.failures, "redshift", "DescribeClusters")?;
        state
            .clusters
            .get(identifier)
            .cloned()
            .ok_or_else(|| cluster_not_found("DescribeClusters", identifier))
    }

    async fn delete_cluster(&self, identifier: &str, _final_snapshot: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        injected(&state.failures, "redshift", "DeleteCluster")?;
        state
            .clusters
            .remove(identifier)
            .map(|_| ())
            .ok_or_else(|| cluster_not_found("DeleteCluster", identifier))
    }
}
