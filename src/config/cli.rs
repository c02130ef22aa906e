use crate::app::gateways::jobs::DEFAULT_JOB_LIST_LIMIT;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tickit-lake")]
#[command(about = "Move the TICKIT SQLite tables into S3 and drive Glue/Redshift around them")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "tickit-lake.toml")]
    pub config: String,

    /// Environment file loaded before the configuration (defaults to a `.env` found from the working directory)
    #[arg(long, global = true)]
    pub env_file: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON log lines instead of the compact format
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Use in-memory providers instead of AWS
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload every configured table to source/<table>.csv
    Extract,
    /// Run the configured workflow steps in order
    Run,
    /// List buckets visible to the credentials
    ListBuckets,
    /// Create a bucket (defaults to aws.project_bucket)
    CreateBucket { name: Option<String> },
    /// Upload *.py job scripts to <folder>/<file>
    DeployScripts {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Delete the job scripts uploaded by deploy-scripts
    RemoveScripts {
        #[arg(long)]
        folder: Option<String>,
    },
    #[command(subcommand)]
    Crawler(CrawlerCommand),
    /// List catalog tables of a database
    Tables { database: String },
    #[command(subcommand)]
    Job(JobCommand),
    #[command(subcommand)]
    Cluster(ClusterCommand),
}

/// Crawler lifecycle, by name from `[[crawlers]]`
#[derive(Debug, Subcommand)]
pub enum CrawlerCommand {
    Create { name: String },
    Start { name: String },
    Get { name: String },
    Delete { name: String },
}

#[derive(Debug, Subcommand)]
pub enum JobCommand {
    List {
        #[arg(long, default_value_t = DEFAULT_JOB_LIST_LIMIT)]
        limit: i32,
    },
    /// Register a job from `[[jobs]]`
    Create { name: String },
    Start {
        name: String,
        #[arg(long)]
        input_database: String,
        #[arg(long)]
        input_table: String,
        /// Defaults to aws.project_bucket
        #[arg(long)]
        output_bucket: Option<String>,
    },
    Delete { name: String },
}

/// Redshift cluster lifecycle, by identifier from `[[clusters]]`
#[derive(Debug, Subcommand)]
pub enum ClusterCommand {
    Create { identifier: String },
    Describe { identifier: String },
    Delete {
        identifier: String,
        #[arg(long)]
        final_snapshot: Option<String>,
    },
}
