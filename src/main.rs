use clap::Parser;
use std::path::Path;
use tickit_lake::adapters::sqlite::SqliteSource;
use tickit_lake::config::cli::{CliArgs, ClusterCommand, Command, CrawlerCommand, JobCommand};
use tickit_lake::config::load_env_file;
use tickit_lake::core::execution_summary;
use tickit_lake::utils::error::{ErrorSeverity, EtlError};
use tickit_lake::utils::{logger, validation::Validate};
use tickit_lake::{EtlEngine, ExtractionPipeline, Gateways, LakeConfig, Workflow};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    // `${VAR}` 替換前先載入 .env
    if let Err(e) = load_env_file(args.env_file.as_deref().map(Path::new)) {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match LakeConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration for {} loaded and validated", config.project.name);

    let gateways = if args.dry_run {
        Gateways::in_memory(&config)
    } else {
        match Gateways::connect(&config).await {
            Ok(gateways) => gateways,
            Err(e) => exit_with(e),
        }
    };

    if let Err(e) = dispatch(args.command, &config, gateways).await {
        exit_with(e);
    }

    Ok(())
}

async fn dispatch(
    command: Command,
    config: &LakeConfig,
    gateways: Gateways,
) -> tickit_lake::Result<()> {
    let bucket = config.aws.project_bucket.as_str();

    match command {
        Command::Extract => {
            let pipeline = ExtractionPipeline::from_config(config, gateways.store.clone());
            let report = EtlEngine::new(pipeline)
                .with_failure_policy(config.pipeline.on_upload_failure)
                .run()
                .await?;
            for table in &report.uploaded {
                println!("✅ {} ({} rows) -> s3://{}/{}", table.table, table.rows, bucket, table.key);
            }
            for table in &report.failed {
                println!("❌ {}: {}", table.table, table.error);
            }
        }
        Command::Run => {
            let source = SqliteSource::new(&config.database.path);
            let outcomes = Workflow::new(config, gateways, source).execute_all().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&execution_summary(&outcomes))?
            );
        }
        Command::ListBuckets => {
            for name in gateways.store.list_buckets().await? {
                println!("{}", name);
            }
        }
        Command::CreateBucket { name } => {
            let name = name.as_deref().unwrap_or(bucket);
            let status = gateways.store.create_bucket(name).await?;
            println!("{}: {:?}", name, status);
        }
        Command::DeployScripts { folder } => {
            let folder = folder.as_deref().unwrap_or(&config.pipeline.scripts_folder);
            let keys = tickit_lake::app::ScriptDeployer::new(gateways.store.clone())
                .deploy(folder, bucket)
                .await?;
            for key in keys {
                println!("⬆️  s3://{}/{}", bucket, key);
            }
        }
        Command::RemoveScripts { folder } => {
            let folder = folder.as_deref().unwrap_or(&config.pipeline.scripts_folder);
            let keys = tickit_lake::app::ScriptDeployer::new(gateways.store.clone())
                .remove(folder, bucket)
                .await?;
            for key in keys {
                println!("🗑️  s3://{}/{}", bucket, key);
            }
        }
        Command::Crawler(command) => crawler_command(command, config, &gateways).await?,
        Command::Tables { database } => {
            let record = gateways.catalog.get_database(&database).await?;
            println!("Database {} ({})", record.name, record.location_uri.unwrap_or_default());
            for table in gateways.catalog.list_tables(&database).await? {
                let columns: Vec<String> = table
                    .columns
                    .iter()
                    .map(|c| format!("{}:{}", c.name, c.data_type.as_deref().unwrap_or("?")))
                    .collect();
                println!("  {} [{}]", table.name, columns.join(", "));
            }
        }
        Command::Job(command) => job_command(command, config, &gateways).await?,
        Command::Cluster(command) => cluster_command(command, config, &gateways).await?,
    }

    Ok(())
}

async fn crawler_command(
    command: CrawlerCommand,
    config: &LakeConfig,
    gateways: &Gateways,
) -> tickit_lake::Result<()> {
    match command {
        CrawlerCommand::Create { name } => {
            let definition = config
                .crawler(&name)
                .ok_or_else(|| EtlError::config(format!("Unknown crawler '{}'", name)))?;
            gateways.catalog.create_crawler(definition).await?;
        }
        CrawlerCommand::Start { name } => gateways.catalog.start_crawler(&name).await?,
        CrawlerCommand::Get { name } => match gateways.catalog.get_crawler(&name).await? {
            Some(record) => println!("{:#?}", record),
            None => println!("Crawler {} does not exist", name),
        },
        CrawlerCommand::Delete { name } => gateways.catalog.delete_crawler(&name).await?,
    }
    Ok(())
}

async fn job_command(
    command: JobCommand,
    config: &LakeConfig,
    gateways: &Gateways,
) -> tickit_lake::Result<()> {
    match command {
        JobCommand::List { limit } => {
            for name in gateways.jobs.list_jobs(limit).await? {
                println!("{}", name);
            }
        }
        JobCommand::Create { name } => {
            let definition = config
                .job(&name)
                .ok_or_else(|| EtlError::config(format!("Unknown job '{}'", name)))?;
            gateways.jobs.create_job_definition(definition).await?;
        }
        JobCommand::Start {
            name,
            input_database,
            input_table,
            output_bucket,
        } => {
            let output_bucket = output_bucket.as_deref().unwrap_or(&config.aws.project_bucket);
            let run_id = gateways
                .jobs
                .start_job_run(&name, &input_database, &input_table, output_bucket)
                .await?;
            println!("{}", run_id);
        }
        JobCommand::Delete { name } => gateways.jobs.delete_job_definition(&name).await?,
    }
    Ok(())
}

async fn cluster_command(
    command: ClusterCommand,
    config: &LakeConfig,
    gateways: &Gateways,
) -> tickit_lake::Result<()> {
    match command {
        ClusterCommand::Create { identifier } => {
            let definition = config
                .cluster(&identifier)
                .ok_or_else(|| EtlError::config(format!("Unknown cluster '{}'", identifier)))?;
            let record = gateways.warehouse.create_cluster(definition).await?;
            println!("{:#?}", record);
        }
        ClusterCommand::Describe { identifier } => {
            match gateways.warehouse.describe_cluster(&identifier).await? {
                Some(record) => println!("{:#?}", record),
                None => println!("Cluster {} does not exist", identifier),
            }
        }
        ClusterCommand::Delete {
            identifier,
            final_snapshot,
        } => {
            gateways
                .warehouse
                .delete_cluster(&identifier, final_snapshot.as_deref())
                .await?
        }
    }
    Ok(())
}

fn exit_with(e: EtlError) -> ! {
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
