use crate::app::gateways::log_failure;
use crate::domain::model::{
    JobArguments, JobDefinition, JobRunId, ARG_INPUT_DATABASE, ARG_INPUT_TABLE,
    ARG_OUTPUT_BUCKET_URL,
};
use crate::domain::ports::JobApi;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_JOB_LIST_LIMIT: i32 = 10;

/// `s3://<bucket>/`; values that are already S3 URIs only get the trailing slash.
pub fn output_bucket_url(output_bucket: &str) -> String {
    if output_bucket.starts_with("s3://") {
        if output_bucket.ends_with('/') {
            output_bucket.to_string()
        } else {
            format!("{}/", output_bucket)
        }
    } else {
        format!("s3://{}/", output_bucket.trim_end_matches('/'))
    }
}

/// The argument map the transform scripts read with `getResolvedOptions`.
pub fn job_arguments(input_database: &str, input_table: &str, output_bucket: &str) -> JobArguments {
    let mut arguments = JobArguments::new();
    arguments.insert(ARG_INPUT_DATABASE.to_string(), input_database.to_string());
    arguments.insert(ARG_INPUT_TABLE.to_string(), input_table.to_string());
    arguments.insert(
        ARG_OUTPUT_BUCKET_URL.to_string(),
        output_bucket_url(output_bucket),
    );
    arguments
}

#[derive(Clone)]
pub struct JobGateway {
    api: Arc<dyn JobApi>,
}

impl JobGateway {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }

    pub async fn list_jobs(&self, limit: i32) -> Result<Vec<String>> {
        self.api.list_jobs(limit).await.inspect_err(log_failure)
    }

    pub async fn create_job_definition(&self, definition: &JobDefinition) -> Result<()> {
        self.api.create_job(definition).await.inspect_err(log_failure)?;
        info!(
            job = %definition.name,
            script = %definition.script_location,
            glue_version = %definition.glue_version,
            "✅ Job definition created"
        );
        Ok(())
    }

    /// Starts one run and returns its id without waiting for completion.
    pub async fn start_job_run(
        &self,
        name: &str,
        input_database: &str,
        input_table: &str,
        output_bucket: &str,
    ) -> Result<JobRunId> {
        let arguments = job_arguments(input_database, input_table, output_bucket);
        let run_id = self
            .api
            .start_job_run(name, &arguments)
            .await
            .inspect_err(log_failure)?;
        info!(job = %name, run_id = %run_id, "🚀 Job run started");
        Ok(run_id)
    }

    /// Run history goes with the definition on the provider side.
    pub async fn delete_job_definition(&self, name: &str) -> Result<()> {
        self.api.delete_job(name).await.inspect_err(log_failure)?;
        info!(job = %name, "Job definition deleted");
        Ok(())
    }
}
