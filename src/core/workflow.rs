use crate::app::context::Gateways;
use crate::app::pipelines::ExtractionPipeline;
use crate::app::scripts::ScriptDeployer;
use crate::config::LakeConfig;
use crate::core::etl::EtlEngine;
use crate::domain::model::{CrawlerDefinition, JobDefinition};
use crate::domain::ports::TableSource;
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One entry of `[workflow] steps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowStep {
    ExtractTables,
    DeployScripts {
        #[serde(default)]
        folder: Option<String>,
    },
    RemoveScripts {
        #[serde(default)]
        folder: Option<String>,
    },
    CreateCrawler {
        crawler: String,
    },
    StartCrawler {
        crawler: String,
    },
    DeleteCrawler {
        crawler: String,
    },
    CreateJob {
        job: String,
    },
    StartJobRun {
        job: String,
        input_database: String,
        input_table: String,
        #[serde(default)]
        output_bucket: Option<String>,
    },
    DeleteJob {
        job: String,
    },
}

impl WorkflowStep {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::ExtractTables => "extract_tables",
            WorkflowStep::DeployScripts { .. } => "deploy_scripts",
            WorkflowStep::RemoveScripts { .. } => "remove_scripts",
            WorkflowStep::CreateCrawler { .. } => "create_crawler",
            WorkflowStep::StartCrawler { .. } => "start_crawler",
            WorkflowStep::DeleteCrawler { .. } => "delete_crawler",
            WorkflowStep::CreateJob { .. } => "create_job",
            WorkflowStep::StartJobRun { .. } => "start_job_run",
            WorkflowStep::DeleteJob { .. } => "delete_job",
        }
    }

    /// Step name plus the crawler/job it acts on, e.g. `start_crawler tickit-source`.
    pub fn label(&self) -> String {
        match self.crawler_ref().or(self.job_ref()) {
            Some(target) => format!("{} {}", self.name(), target),
            None => self.name().to_string(),
        }
    }

    pub fn crawler_ref(&self) -> Option<&str> {
        match self {
            WorkflowStep::CreateCrawler { crawler }
            | WorkflowStep::StartCrawler { crawler }
            | WorkflowStep::DeleteCrawler { crawler } => Some(crawler.as_str()),
            _ => None,
        }
    }

    pub fn job_ref(&self) -> Option<&str> {
        match self {
            WorkflowStep::CreateJob { job }
            | WorkflowStep::StartJobRun { job, .. }
            | WorkflowStep::DeleteJob { job } => Some(job.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub detail: String,
    pub run_id: Option<String>,
    pub skipped: bool,
    pub duration: Duration,
}

/// Runs configured steps one after another, stopping at the first failure.
/// Completed steps are not rolled back.
pub struct Workflow<'a, S: TableSource + Clone + 'static> {
    config: &'a LakeConfig,
    gateways: Gateways,
    source: S,
}

impl<'a, S: TableSource + Clone + 'static> Workflow<'a, S> {
    pub fn new(config: &'a LakeConfig, gateways: Gateways, source: S) -> Self {
        Self {
            config,
            gateways,
            source,
        }
    }

    /// Runs `[workflow] steps`.
    pub async fn execute_all(&self) -> Result<Vec<StepOutcome>> {
        self.execute(&self.config.workflow.steps).await
    }

    pub async fn execute(&self, steps: &[WorkflowStep]) -> Result<Vec<StepOutcome>> {
        // 先檢查所有名稱，避免跑到一半才發現設定錯誤
        self.config.check_step_references(steps)?;

        info!("🚀 Starting workflow with {} steps", steps.len());
        let mut outcomes = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let label = step.label();
            info!("📋 Step {}/{}: {}", index + 1, steps.len(), label);

            let started = Instant::now();
            let mut outcome = self.execute_step(step).await.map_err(|e| EtlError::StepError {
                step: label.clone(),
                source: Box::new(e),
            })?;
            outcome.duration = started.elapsed();

            info!("✅ {} finished in {:?}: {}", label, outcome.duration, outcome.detail);
            outcomes.push(outcome);
        }

        info!("🎉 Workflow completed: {} steps", outcomes.len());
        Ok(outcomes)
    }

    async fn execute_step(&self, step: &WorkflowStep) -> Result<StepOutcome> {
        let bucket = self.config.aws.project_bucket.as_str();
        let mut outcome = StepOutcome {
            step: step.label(),
            detail: String::new(),
            run_id: None,
            skipped: false,
            duration: Duration::ZERO,
        };

        match step {
            WorkflowStep::ExtractTables => {
                let pipeline = ExtractionPipeline::new(
                    self.source.clone(),
                    self.gateways.store.clone(),
                    bucket,
                    self.config.database.tables.clone(),
                );
                let report = EtlEngine::new(pipeline)
                    .with_failure_policy(self.config.pipeline.on_upload_failure)
                    .run()
                    .await?;
                outcome.detail = format!(
                    "uploaded {} tables ({} rows), {} failed",
                    report.uploaded.len(),
                    report.total_rows(),
                    report.failed.len()
                );
            }
            WorkflowStep::DeployScripts { folder } => {
                let folder = folder.as_deref().unwrap_or(&self.config.pipeline.scripts_folder);
                let keys = ScriptDeployer::new(self.gateways.store.clone())
                    .deploy(folder, bucket)
                    .await?;
                outcome.detail = format!("uploaded {} scripts from {}", keys.len(), folder);
            }
            WorkflowStep::RemoveScripts { folder } => {
                let folder = folder.as_deref().unwrap_or(&self.config.pipeline.scripts_folder);
                let keys = ScriptDeployer::new(self.gateways.store.clone())
                    .remove(folder, bucket)
                    .await?;
                outcome.detail = format!("removed {} scripts of {}", keys.len(), folder);
            }
            WorkflowStep::CreateCrawler { crawler } => {
                let definition = self.crawler(crawler)?;
                if self.gateways.catalog.get_crawler(crawler).await?.is_some() {
                    warn!("Crawler {} already exists, skipping creation", crawler);
                    outcome.skipped = true;
                    outcome.detail = format!("crawler {} already exists", crawler);
                } else {
                    self.gateways.catalog.create_crawler(definition).await?;
                    outcome.detail = format!(
                        "crawler {} targets {}",
                        crawler, definition.s3_target_path
                    );
                }
            }
            WorkflowStep::StartCrawler { crawler } => {
                self.gateways.catalog.start_crawler(crawler).await?;
                outcome.detail = format!("crawler {} started", crawler);
            }
            WorkflowStep::DeleteCrawler { crawler } => {
                self.gateways.catalog.delete_crawler(crawler).await?;
                outcome.detail = format!("crawler {} deleted", crawler);
            }
            WorkflowStep::CreateJob { job } => {
                let definition = self.job(job)?;
                self.gateways.jobs.create_job_definition(definition).await?;
                outcome.detail = format!("job {} runs {}", job, definition.script_location);
            }
            WorkflowStep::StartJobRun {
                job,
                input_database,
                input_table,
                output_bucket,
            } => {
                let output_bucket = output_bucket.as_deref().unwrap_or(bucket);
                let run_id = self
                    .gateways
                    .jobs
                    .start_job_run(job, input_database, input_table, output_bucket)
                    .await?;
                outcome.detail = format!("job {} run {}", job, run_id);
                outcome.run_id = Some(run_id.to_string());
            }
            WorkflowStep::DeleteJob { job } => {
                self.gateways.jobs.delete_job_definition(job).await?;
                outcome.detail = format!("job {} deleted", job);
            }
        }

        Ok(outcome)
    }

    fn crawler(&self, name: &str) -> Result<&'a CrawlerDefinition> {
        self.config
            .crawler(name)
            .ok_or_else(|| EtlError::config(format!("Unknown crawler '{}'", name)))
    }

    fn job(&self, name: &str) -> Result<&'a JobDefinition> {
        self.config
            .job(name)
            .ok_or_else(|| EtlError::config(format!("Unknown job '{}'", name)))
    }
}

/// 取得執行摘要
pub fn execution_summary(outcomes: &[StepOutcome]) -> serde_json::Value {
    let total_duration: Duration = outcomes.iter().map(|o| o.duration).sum();
    serde_json::json!({
        "total_steps": outcomes.len(),
        "skipped_steps": outcomes.iter().filter(|o| o.skipped).count(),
        "total_duration_ms": total_duration.as_millis() as u64,
        "executed_steps": outcomes.iter().map(|o| o.step.clone()).collect::<Vec<_>>(),
        "job_run_ids": outcomes.iter().filter_map(|o| o.run_id.clone()).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_deserialization() {
        #[derive(Deserialize)]
        struct Steps {
            steps: Vec<WorkflowStep>,
        }

        let parsed: Steps = toml::from_str(
            r#"
steps = [
  { type = "extract_tables" },
  { type = "deploy_scripts" },
  { type = "start_job_run", job = "b2s", input_database = "db1", input_table = "cat" },
]
"#,
        )
        .unwrap();

        assert_eq!(parsed.steps[0], WorkflowStep::ExtractTables);
        assert_eq!(parsed.steps[1], WorkflowStep::DeployScripts { folder: None });
        assert_eq!(parsed.steps[2].job_ref(), Some("b2s"));
        assert_eq!(parsed.steps[2].label(), "start_job_run b2s");
        assert_eq!(parsed.steps[0].label(), "extract_tables");
    }

    #[test]
    fn test_execution_summary() {
        let outcomes = vec![
            StepOutcome {
                step: "extract_tables".into(),
                detail: "uploaded 2 tables".into(),
                run_id: None,
                skipped: false,
                duration: Duration::from_millis(100),
            },
            StepOutcome {
                step: "start_job_run b2s".into(),
                detail: "job b2s run jr_1".into(),
                run_id: Some("jr_1".into()),
                skipped: false,
                duration: Duration::from_millis(200),
            },
        ];

        let summary = execution_summary(&outcomes);

        assert_eq!(summary["total_steps"], 2);
        assert_eq!(summary["skipped_steps"], 0);
        assert_eq!(summary["total_duration_ms"], 300);
        assert_eq!(summary["executed_steps"][1], "start_job_run b2s");
        assert_eq!(summary["job_run_ids"][0], "jr_1");
    }
}
