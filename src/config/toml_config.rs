use crate::adapters::credentials::EnvCredentialProvider;
use crate::core::workflow::WorkflowStep;
use crate::domain::model::{
    ClusterDefinition, CrawlerDefinition, JobDefinition, UploadFailurePolicy,
};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_aws_region, validate_identifier, validate_non_empty_string, validate_path,
    validate_range, validate_role_arn, validate_s3_bucket_name, validate_s3_uri, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SCRIPTS_FOLDER: &str = "glue_scripts";

/// Whole-project configuration, loaded once and passed to constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LakeConfig {
    pub project: ProjectConfig,
    pub aws: AwsConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub crawlers: Vec<CrawlerDefinition>,
    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
    #[serde(default)]
    pub clusters: Vec<ClusterDefinition>,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub project_bucket: String,
    /// 本地模擬端點，例如 LocalStack
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
    pub access_key_var: Option<String>,
    pub secret_key_var: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

fn default_scripts_folder() -> String {
    DEFAULT_SCRIPTS_FOLDER.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub on_upload_failure: UploadFailurePolicy,
    #[serde(default = "default_scripts_folder")]
    pub scripts_folder: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_upload_failure: UploadFailurePolicy::default(),
            scripts_folder: default_scripts_folder(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl LakeConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PROJECT_BUCKET})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| EtlError::config(format!("Invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("project.name", &self.project.name)?;

        validate_s3_bucket_name("aws.project_bucket", &self.aws.project_bucket)?;
        if let Some(region) = &self.aws.region {
            validate_aws_region("aws.region", region)?;
        }
        if let Some(endpoint) = &self.aws.endpoint_url {
            validate_url("aws.endpoint_url", endpoint)?;
        }

        validate_path("database.path", &self.database.path)?;
        let mut seen = HashSet::new();
        for table in &self.database.tables {
            validate_identifier("database.tables", table)?;
            if !seen.insert(table.as_str()) {
                return Err(duplicate("database.tables", table));
            }
        }

        validate_path("pipeline.scripts_folder", &self.pipeline.scripts_folder)?;

        let mut seen = HashSet::new();
        for crawler in &self.crawlers {
            validate_non_empty_string("crawlers.name", &crawler.name)?;
            validate_role_arn("crawlers.role_arn", &crawler.role_arn)?;
            validate_non_empty_string("crawlers.database_name", &crawler.database_name)?;
            validate_s3_uri("crawlers.s3_target_path", &crawler.s3_target_path)?;
            if !seen.insert(crawler.name.as_str()) {
                return Err(duplicate("crawlers.name", &crawler.name));
            }
        }

        let mut seen = HashSet::new();
        for job in &self.jobs {
            validate_non_empty_string("jobs.name", &job.name)?;
            validate_role_arn("jobs.role_arn", &job.role_arn)?;
            validate_s3_uri("jobs.script_location", &job.script_location)?;
            validate_non_empty_string("jobs.command", &job.command)?;
            if !seen.insert(job.name.as_str()) {
                return Err(duplicate("jobs.name", &job.name));
            }
        }

        let mut seen = HashSet::new();
        for cluster in &self.clusters {
            validate_non_empty_string("clusters.identifier", &cluster.identifier)?;
            validate_non_empty_string("clusters.node_type", &cluster.node_type)?;
            validate_range("clusters.number_of_nodes", cluster.number_of_nodes, 1, 128)?;
            validate_non_empty_string("clusters.master_username", &cluster.master_username)?;
            validate_non_empty_string("clusters.database_name", &cluster.database_name)?;
            for role in &cluster.iam_roles {
                validate_role_arn("clusters.iam_roles", role)?;
            }
            if !seen.insert(cluster.identifier.as_str()) {
                return Err(duplicate("clusters.identifier", &cluster.identifier));
            }
        }

        self.check_step_references(&self.workflow.steps)
    }

    /// Every crawler/job a step names must be defined in this file.
    pub fn check_step_references(&self, steps: &[WorkflowStep]) -> Result<()> {
        for step in steps {
            if let Some(name) = step.crawler_ref() {
                if self.crawler(name).is_none() {
                    return Err(EtlError::config(format!(
                        "Workflow step '{}' refers to unknown crawler '{}'",
                        step.name(),
                        name
                    )));
                }
            }
            if let Some(name) = step.job_ref() {
                if self.job(name).is_none() {
                    return Err(EtlError::config(format!(
                        "Workflow step '{}' refers to unknown job '{}'",
                        step.name(),
                        name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn crawler(&self, name: &str) -> Option<&CrawlerDefinition> {
        self.crawlers.iter().find(|c| c.name == name)
    }

    pub fn job(&self, name: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn cluster(&self, identifier: &str) -> Option<&ClusterDefinition> {
        self.clusters.iter().find(|c| c.identifier == identifier)
    }

    /// 依 `[aws]` 設定建立環境變數憑證來源
    pub fn credential_provider(&self) -> EnvCredentialProvider {
        let provider = EnvCredentialProvider::new(self.aws.region.clone());
        match (&self.aws.access_key_var, &self.aws.secret_key_var) {
            (None, None) => provider,
            (access, secret) => provider.with_variables(
                access
                    .as_deref()
                    .unwrap_or(crate::adapters::credentials::DEFAULT_ACCESS_KEY_VAR),
                secret
                    .as_deref()
                    .unwrap_or(crate::adapters::credentials::DEFAULT_SECRET_KEY_VAR),
            ),
        }
    }
}

/// 載入環境變數檔，需在 `LakeConfig::from_file` 之前呼叫，`${VAR}` 才能取到檔內的值。
/// 指定的檔案必須存在；未指定時從工作目錄往上找 `.env`，找不到就略過。
/// 已存在的環境變數不會被覆寫。
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|_| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(loaded) => {
            debug!("Loaded environment file {}", loaded.display());
            Ok(Some(loaded))
        }
        Err(e) if e.not_found() && path.is_none() => Ok(None),
        Err(e) => Err(EtlError::config(format!("Failed to read environment file: {}", e))),
    }
}

fn duplicate(field: &str, value: &str) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: "Duplicate entry".to_string(),
    }
}

impl Validate for LakeConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[project]
name = "tickit"

[aws]
region = "us-east-2"
project_bucket = "tickit-project-bucket"

[database]
path = "tickit.db"
tables = ["category", "venue"]

[[crawlers]]
name = "tickit-source"
role_arn = "arn:aws:iam::123456789012:role/glue-role"
database_name = "tickit_bronze"
table_prefix = "src_"
s3_target_path = "s3://tickit-project-bucket/source/"

[[jobs]]
name = "bronze_to_silver"
role_arn = "arn:aws:iam::123456789012:role/glue-role"
script_location = "s3://tickit-project-bucket/glue_scripts/bronze_to_silver.py"

[workflow]
steps = [
  { type = "extract_tables" },
  { type = "create_crawler", crawler = "tickit-source" },
  { type = "start_job_run", job = "bronze_to_silver", input_database = "tickit_bronze", input_table = "src_category" },
]
"#;

    #[test]
    fn test_parse_basic_config() {
        let config = LakeConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.project.name, "tickit");
        assert_eq!(config.aws.region.as_deref(), Some("us-east-2"));
        assert_eq!(config.database.tables, vec!["category", "venue"]);
        assert_eq!(config.pipeline.on_upload_failure, UploadFailurePolicy::Fail);
        assert_eq!(config.pipeline.scripts_folder, DEFAULT_SCRIPTS_FOLDER);
        assert_eq!(config.workflow.steps.len(), 3);

        let job = config.job("bronze_to_silver").unwrap();
        assert_eq!(job.command, "glueetl");
        assert_eq!(job.glue_version, "4.0");
        assert!(config.crawler("tickit-source").is_some());
        assert!(config.cluster("missing").is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TICKIT_TEST_BUCKET", "substituted-bucket");

        let content = r#"
[project]
name = "tickit"

[aws]
project_bucket = "${TICKIT_TEST_BUCKET}"

[database]
path = "${TICKIT_TEST_UNSET_PATH}"
"#;
        let config = LakeConfig::from_toml_str(content).unwrap();
        assert_eq!(config.aws.project_bucket, "substituted-bucket");
        assert_eq!(config.database.path, "${TICKIT_TEST_UNSET_PATH}");

        std::env::remove_var("TICKIT_TEST_BUCKET");
    }

    #[test]
    fn test_upload_failure_policy_parsing() {
        let content = BASIC.replace(
            "[[crawlers]]",
            "[pipeline]\non_upload_failure = \"continue\"\n\n[[crawlers]]",
        );
        let config = LakeConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.pipeline.on_upload_failure, UploadFailurePolicy::Continue);

        let content = BASIC.replace(
            "[[crawlers]]",
            "[pipeline]\non_upload_failure = \"retry\"\n\n[[crawlers]]",
        );
        assert!(LakeConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_bucket = BASIC.replace("tickit-project-bucket\"\n", "Tickit_Bucket\"\n");
        let config = LakeConfig::from_toml_str(&bad_bucket).unwrap();
        assert!(config.validate().is_err());

        let bad_table = BASIC.replace("\"venue\"", "\"venue; DROP TABLE venue\"");
        let config = LakeConfig::from_toml_str(&bad_table).unwrap();
        assert!(config.validate().is_err());

        let duplicate_table = BASIC.replace("\"venue\"", "\"category\"");
        let config = LakeConfig::from_toml_str(&duplicate_table).unwrap();
        assert!(config.validate().is_err());

        let bad_role = BASIC.replacen("arn:aws:iam::123456789012:role/glue-role", "glue-role", 1);
        let config = LakeConfig::from_toml_str(&bad_role).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_workflow_reference() {
        let content = BASIC.replace(
            "crawler = \"tickit-source\"",
            "crawler = \"not-defined\"",
        );
        let config = LakeConfig::from_toml_str(&content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not-defined"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = LakeConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.project.name, "tickit");
    }

    #[test]
    fn test_placeholder_resolved_from_env_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let env_path = dir.path().join(".env");
        std::fs::write(&env_path, "TICKIT_ENV_FILE_BUCKET=bucket-from-env-file\n").unwrap();

        let loaded = load_env_file(Some(&env_path)).unwrap();
        assert_eq!(loaded.as_deref(), Some(env_path.as_path()));

        let content = BASIC.replace(
            "project_bucket = \"tickit-project-bucket\"",
            "project_bucket = \"${TICKIT_ENV_FILE_BUCKET}\"",
        );
        let config = LakeConfig::from_toml_str(&content).unwrap();

        assert_eq!(config.aws.project_bucket, "bucket-from-env-file");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_env_file_must_exist() {
        let err = load_env_file(Some(Path::new("/nonexistent/tickit.env"))).unwrap_err();
        assert!(matches!(err, EtlError::ConfigError { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LakeConfig::from_file("/nonexistent/tickit-lake.toml").unwrap_err();
        assert!(matches!(err, EtlError::IoError(_)));
    }
}
