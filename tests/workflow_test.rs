use rusqlite::Connection;
use std::sync::Arc;
use tempfile::TempDir;
use tickit_lake::adapters::memory::{InMemoryGlue, InMemoryObjectStore, InMemoryWarehouse};
use tickit_lake::adapters::sqlite::SqliteSource;
use tickit_lake::app::gateways::{CatalogGateway, JobGateway, ObjectStoreGateway, WarehouseGateway};
use tickit_lake::core::execution_summary;
use tickit_lake::domain::model::CrawlerState;
use tickit_lake::{EtlError, Gateways, LakeConfig, Workflow, WorkflowStep};

const BUCKET: &str = "tickit-project-bucket";

struct Fixture {
    _dir: TempDir,
    config: LakeConfig,
    store: InMemoryObjectStore,
    glue: InMemoryGlue,
}

impl Fixture {
    fn new(steps: &str) -> Self {
        let dir = TempDir::new().unwrap();

        let db = dir.path().join("tickit.db");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE category (catid INTEGER, catname TEXT);
             INSERT INTO category VALUES (1, 'MLB');
             INSERT INTO category VALUES (2, 'NHL');",
        )
        .unwrap();

        let scripts = dir.path().join("glue_job_scripts");
        std::fs::create_dir(&scripts).unwrap();
        std::fs::write(scripts.join("bronze_to_silver.py"), "print('b2s')").unwrap();
        std::fs::write(scripts.join("__init__.py"), "").unwrap();

        let content = format!(
            r#"
[project]
name = "tickit"

[aws]
region = "us-east-2"
project_bucket = "{bucket}"

[database]
path = "{db}"
tables = ["category"]

[pipeline]
scripts_folder = "{scripts}"

[[crawlers]]
name = "tickit-source-crawler"
role_arn = "arn:aws:iam::123456789012:role/glue-role"
database_name = "tickit_bronze"
table_prefix = "bronze_"
s3_target_path = "s3://{bucket}/source/"

[[jobs]]
name = "bronze_to_silver"
role_arn = "arn:aws:iam::123456789012:role/glue-role"
script_location = "s3://{bucket}/glue_job_scripts/bronze_to_silver.py"

[workflow]
steps = [
{steps}
]
"#,
            bucket = BUCKET,
            db = db.display(),
            scripts = scripts.display(),
            steps = steps,
        );
        let config = LakeConfig::from_toml_str(&content).unwrap();

        Self {
            _dir: dir,
            config,
            store: InMemoryObjectStore::with_buckets([BUCKET]),
            glue: InMemoryGlue::new(),
        }
    }

    fn gateways(&self) -> Gateways {
        Gateways {
            store: ObjectStoreGateway::new(Arc::new(self.store.clone()), self.config.aws.region.clone()),
            catalog: CatalogGateway::new(Arc::new(self.glue.clone())),
            jobs: JobGateway::new(Arc::new(self.glue.clone())),
            warehouse: WarehouseGateway::new(Arc::new(InMemoryWarehouse::new())),
        }
    }

    fn workflow(&self) -> Workflow<'_, SqliteSource> {
        Workflow::new(
            &self.config,
            self.gateways(),
            SqliteSource::new(&self.config.database.path),
        )
    }
}

const FULL: &str = r#"
  { type = "extract_tables" },
  { type = "deploy_scripts" },
  { type = "create_crawler", crawler = "tickit-source-crawler" },
  { type = "start_crawler", crawler = "tickit-source-crawler" },
  { type = "create_job", job = "bronze_to_silver" },
  { type = "start_job_run", job = "bronze_to_silver", input_database = "tickit_bronze", input_table = "bronze_category" },
"#;

#[tokio::test]
async fn test_full_workflow_runs_steps_in_order() {
    let fixture = Fixture::new(FULL);

    let outcomes = fixture.workflow().execute_all().await.unwrap();

    let steps: Vec<&str> = outcomes.iter().map(|o| o.step.as_str()).collect();
    assert_eq!(
        steps,
        vec![
            "extract_tables",
            "deploy_scripts",
            "create_crawler tickit-source-crawler",
            "start_crawler tickit-source-crawler",
            "create_job bronze_to_silver",
            "start_job_run bronze_to_silver",
        ]
    );

    let uploads: Vec<String> = fixture.store.uploads().await.into_iter().map(|(_, k)| k).collect();
    assert_eq!(uploads[0], "source/category.csv");
    assert_eq!(uploads.len(), 2);
    // 上傳的 key 必須與 jobs.script_location 指向的物件一致
    assert_eq!(uploads[1], "glue_job_scripts/bronze_to_silver.py");
    let job = fixture.config.job("bronze_to_silver").unwrap();
    assert_eq!(
        job.script_location,
        format!("s3://{}/{}", fixture.config.aws.project_bucket, uploads[1])
    );

    assert_eq!(
        fixture.glue.crawler_state("tickit-source-crawler").await,
        Some(CrawlerState::Running)
    );

    let runs = fixture.glue.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].arguments["--output_bucket_url"], "s3://tickit-project-bucket/");
    assert_eq!(outcomes[5].run_id.as_deref(), Some(runs[0].run_id.as_str()));

    let summary = execution_summary(&outcomes);
    assert_eq!(summary["total_steps"], 6);
    assert_eq!(summary["job_run_ids"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_existing_crawler_is_not_recreated() {
    let fixture = Fixture::new(r#"{ type = "create_crawler", crawler = "tickit-source-crawler" },"#);
    let definition = fixture.config.crawler("tickit-source-crawler").unwrap().clone();
    fixture.gateways().catalog.create_crawler(&definition).await.unwrap();

    let outcomes = fixture.workflow().execute_all().await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].skipped);
}

#[tokio::test]
async fn test_unknown_reference_fails_before_any_step() {
    let fixture = Fixture::new(r#"{ type = "extract_tables" },"#);
    let steps = vec![
        WorkflowStep::ExtractTables,
        WorkflowStep::StartCrawler {
            crawler: "not-configured".to_string(),
        },
    ];

    let err = fixture.workflow().execute(&steps).await.unwrap_err();

    assert!(matches!(err, EtlError::ConfigError { .. }));
    assert!(fixture.store.uploads().await.is_empty());
}

#[tokio::test]
async fn test_failing_step_stops_the_workflow() {
    let fixture = Fixture::new(FULL);
    fixture.glue.fail_operation("CreateJob", "AccessDeniedException").await;

    let err = fixture.workflow().execute_all().await.unwrap_err();

    match &err {
        EtlError::StepError { step, source } => {
            assert_eq!(step, "create_job bronze_to_silver");
            assert!(matches!(**source, EtlError::ProviderError { .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(fixture.glue.runs().await.is_empty());
    assert_eq!(
        fixture.glue.crawler_state("tickit-source-crawler").await,
        Some(CrawlerState::Running)
    );
}
