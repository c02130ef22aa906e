//! AWS Glue adapter.
//!
//! Covers both the Data Catalog/crawler calls and the job calls, since they
//! share one Glue client.

use crate::adapters::{sdk_error, to_utc};
use crate::domain::model::{
    ColumnRecord, CrawlerDefinition, CrawlerRecord, CrawlerState, DatabaseRecord, JobArguments,
    JobDefinition, JobRunId, TableRecord,
};
use crate::domain::ports::{CatalogApi, JobApi};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_glue::types::{CrawlerTargets, JobCommand, S3Target};
use aws_sdk_glue::Client as GlueClient;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GlueApi {
    client: GlueClient,
}

impl GlueApi {
    pub fn new(client: GlueClient) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::new(GlueClient::new(config))
    }
}

/// GetJobs 單頁上限
const MAX_JOBS_PAGE_SIZE: i32 = 1000;

fn jobs_page_size(limit: i32) -> i32 {
    limit.clamp(1, MAX_JOBS_PAGE_SIZE)
}

fn convert_table(table: &aws_sdk_glue::types::Table, database_name: &str) -> TableRecord {
    let storage = table.storage_descriptor();
    TableRecord {
        name: table.name().to_string(),
        database_name: table.database_name().unwrap_or(database_name).to_string(),
        location: storage.and_then(|sd| sd.location()).map(str::to_string),
        columns: storage
            .map(|sd| {
                sd.columns()
                    .iter()
                    .map(|column| ColumnRecord {
                        name: column.name().to_string(),
                        data_type: column.r#type().map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[async_trait]
impl CatalogApi for GlueApi {
    async fn create_crawler(&self, definition: &CrawlerDefinition) -> Result<()> {
        let targets = CrawlerTargets::builder()
            .s3_targets(S3Target::builder().path(&definition.s3_target_path).build())
            .build();

        self.client
            .create_crawler()
            .name(&definition.name)
            .role(&definition.role_arn)
            .database_name(&definition.database_name)
            .table_prefix(&definition.table_prefix)
            .targets(targets)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "CreateCrawler", e))?;
        Ok(())
    }

    async fn get_crawler(&self, name: &str) -> Result<CrawlerRecord> {
        let output = self
            .client
            .get_crawler()
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "GetCrawler", e))?;

        let crawler = output.crawler().ok_or_else(|| {
            EtlError::provider(
                "glue",
                "GetCrawler",
                Some("EntityNotFoundException"),
                format!("Crawler {} was not returned", name),
            )
        })?;

        Ok(CrawlerRecord {
            name: crawler.name().unwrap_or(name).to_string(),
            role: crawler.role().map(str::to_string),
            database_name: crawler.database_name().map(str::to_string),
            table_prefix: crawler.table_prefix().map(str::to_string),
            s3_targets: crawler
                .targets()
                .map(|targets| {
                    targets
                        .s3_targets()
                        .iter()
                        .filter_map(|target| target.path().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            state: crawler.state().map(|state| CrawlerState::parse(state.as_str())),
            created_at: crawler
                .creation_time()
                .and_then(|t| to_utc(t.secs(), t.subsec_nanos())),
        })
    }

    async fn start_crawler(&self, name: &str) -> Result<()> {
        self.client
            .start_crawler()
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "StartCrawler", e))?;
        Ok(())
    }

    async fn delete_crawler(&self, name: &str) -> Result<()> {
        self.client
            .delete_crawler()
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "DeleteCrawler", e))?;
        Ok(())
    }

    async fn get_database(&self, name: &str) -> Result<DatabaseRecord> {
        let output = self
            .client
            .get_database()
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "GetDatabase", e))?;

        let database = output.database().ok_or_else(|| {
            EtlError::provider(
                "glue",
                "GetDatabase",
                Some("EntityNotFoundException"),
                format!("Database {} was not returned", name),
            )
        })?;

        Ok(DatabaseRecord {
            name: database.name().to_string(),
            description: database.description().map(str::to_string),
            location_uri: database.location_uri().map(str::to_string),
            created_at: database
                .create_time()
                .and_then(|t| to_utc(t.secs(), t.subsec_nanos())),
        })
    }

    async fn list_tables(&self, database_name: &str) -> Result<Vec<TableRecord>> {
        let mut tables = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .get_tables()
                .database_name(database_name)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("glue", "GetTables", e))?;

            tables.extend(
                output
                    .table_list()
                    .iter()
                    .map(|table| convert_table(table, database_name)),
            );

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(database = %database_name, count = tables.len(), "Listed Glue tables");
        Ok(tables)
    }
}

#[async_trait]
impl JobApi for GlueApi {
    async fn list_jobs(&self, limit: i32) -> Result<Vec<String>> {
        let limit = limit.max(1);
        let page_size = jobs_page_size(limit);
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .get_jobs()
                .max_results(page_size)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("glue", "GetJobs", e))?;

            names.extend(
                output
                    .jobs()
                    .iter()
                    .filter_map(|job| job.name().map(str::to_string)),
            );

            if names.len() >= limit as usize {
                names.truncate(limit as usize);
                break;
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn create_job(&self, definition: &JobDefinition) -> Result<()> {
        let command = JobCommand::builder()
            .name(&definition.command)
            .script_location(&definition.script_location)
            .python_version(&definition.python_version)
            .build();

        self.client
            .create_job()
            .name(&definition.name)
            .description(&definition.description)
            .role(&definition.role_arn)
            .command(command)
            .glue_version(&definition.glue_version)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "CreateJob", e))?;
        Ok(())
    }

    async fn start_job_run(&self, name: &str, arguments: &JobArguments) -> Result<JobRunId> {
        let arguments: HashMap<String, String> = arguments.clone().into_iter().collect();

        let output = self
            .client
            .start_job_run()
            .job_name(name)
            .set_arguments(Some(arguments))
            .send()
            .await
            .map_err(|e| sdk_error("glue", "StartJobRun", e))?;

        match output.job_run_id() {
            Some(id) if !id.is_empty() => Ok(JobRunId::new(id)),
            _ => Err(EtlError::processing(format!(
                "Glue did not return a run id for job {}",
                name
            ))),
        }
    }

    async fn delete_job(&self, name: &str) -> Result<()> {
        self.client
            .delete_job()
            .job_name(name)
            .send()
            .await
            .map_err(|e| sdk_error("glue", "DeleteJob", e))?;
        Ok(())
    }
}
