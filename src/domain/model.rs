use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// SQLite 儲存格的值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(v) => write!(f, "{}", v),
            // Debug 格式保留小數點，例如 1.0
            CellValue::Real(v) => write!(f, "{:?}", v),
            CellValue::Text(v) => f.write_str(v),
            CellValue::Blob(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}

/// In-memory rows and columns materialized from one query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl TabularFrame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Renders every cell the way it is written to CSV.
    pub fn string_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    /// Serializes the whole frame as CSV with a header row.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in self.string_rows() {
            writer.write_record(&row)?;
        }
        writer
            .into_inner()
            .map_err(|e| crate::utils::error::EtlError::IoError(e.into_error()))
    }

    /// Parses CSV with a header row. Every cell comes back as text.
    pub fn from_csv_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(data);
        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let mut frame = TabularFrame::new(columns);
        for record in reader.records() {
            let record = record?;
            frame.push_row(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            CellValue::Null
                        } else {
                            CellValue::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }
        Ok(frame)
    }
}

/// Pipeline stage, encoded only as an object key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Source,
    Bronze,
    Silver,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Source => "source",
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
        }
    }

    /// `<tier>/<name>.csv`
    pub fn object_key(&self, name: &str) -> String {
        format!("{}/{}.csv", self.as_str(), name)
    }

    /// `s3://<bucket>/<tier>/`
    pub fn uri(&self, bucket: &str) -> String {
        format!("s3://{}/{}/", bucket, self.as_str())
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the extraction run does when one table fails to upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadFailurePolicy {
    #[default]
    Fail,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Created,
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerDefinition {
    pub name: String,
    pub role_arn: String,
    pub database_name: String,
    #[serde(default)]
    pub table_prefix: String,
    pub s3_target_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlerState {
    Ready,
    Running,
    Stopping,
    Other(String),
}

impl CrawlerState {
    pub fn parse(value: &str) -> Self {
        match value {
            "READY" => CrawlerState::Ready,
            "RUNNING" => CrawlerState::Running,
            "STOPPING" => CrawlerState::Stopping,
            other => CrawlerState::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlerRecord {
    pub name: String,
    pub role: Option<String>,
    pub database_name: Option<String>,
    pub table_prefix: Option<String>,
    pub s3_targets: Vec<String>,
    pub state: Option<CrawlerState>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseRecord {
    pub name: String,
    pub description: Option<String>,
    pub location_uri: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRecord {
    pub name: String,
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRecord {
    pub name: String,
    pub database_name: String,
    pub location: Option<String>,
    pub columns: Vec<ColumnRecord>,
}

pub const DEFAULT_JOB_COMMAND: &str = "glueetl";
pub const DEFAULT_PYTHON_VERSION: &str = "3";
pub const DEFAULT_GLUE_VERSION: &str = "4.0";

fn default_job_command() -> String {
    DEFAULT_JOB_COMMAND.to_string()
}

fn default_python_version() -> String {
    DEFAULT_PYTHON_VERSION.to_string()
}

fn default_glue_version() -> String {
    DEFAULT_GLUE_VERSION.to_string()
}

/// A named, reusable reference to a transform script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub role_arn: String,
    pub script_location: String,
    #[serde(default = "default_job_command")]
    pub command: String,
    #[serde(default = "default_python_version")]
    pub python_version: String,
    #[serde(default = "default_glue_version")]
    pub glue_version: String,
}

impl JobDefinition {
    pub fn new(name: &str, description: &str, role_arn: &str, script_location: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            role_arn: role_arn.to_string(),
            script_location: script_location.to_string(),
            command: default_job_command(),
            python_version: default_python_version(),
            glue_version: default_glue_version(),
        }
    }
}

pub const ARG_INPUT_DATABASE: &str = "--input_database";
pub const ARG_INPUT_TABLE: &str = "--input_table";
pub const ARG_OUTPUT_BUCKET_URL: &str = "--output_bucket_url";

/// Arguments handed verbatim to the managed transform job.
pub type JobArguments = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobRunId(String);

impl JobRunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_node_count() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDefinition {
    pub identifier: String,
    pub node_type: String,
    #[serde(default = "default_node_count")]
    pub number_of_nodes: i32,
    pub master_username: String,
    pub master_password: String,
    pub database_name: String,
    #[serde(default)]
    pub iam_roles: Vec<String>,
}

impl ClusterDefinition {
    pub fn cluster_type(&self) -> &'static str {
        if self.number_of_nodes > 1 {
            "multi-node"
        } else {
            "single-node"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub identifier: String,
    pub status: Option<String>,
    pub node_type: Option<String>,
    pub number_of_nodes: Option<i32>,
    pub endpoint: Option<String>,
    pub port: Option<i32>,
}
