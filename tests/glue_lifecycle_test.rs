use std::collections::BTreeMap;
use std::sync::Arc;
use tickit_lake::adapters::memory::InMemoryGlue;
use tickit_lake::app::gateways::{CatalogGateway, JobGateway};
use tickit_lake::domain::model::{
    ColumnRecord, CrawlerDefinition, CrawlerState, JobDefinition, TableRecord,
};

const ROLE: &str = "arn:aws:iam::123456789012:role/glue-role";

fn crawler() -> CrawlerDefinition {
    CrawlerDefinition {
        name: "tickit-source-crawler".to_string(),
        role_arn: ROLE.to_string(),
        database_name: "tickit_bronze".to_string(),
        table_prefix: "bronze_".to_string(),
        s3_target_path: "s3://tickit-project-bucket/source/".to_string(),
    }
}

#[tokio::test]
async fn test_crawler_lifecycle() {
    let glue = InMemoryGlue::new();
    let catalog = CatalogGateway::new(Arc::new(glue.clone()));

    assert!(catalog.get_crawler("tickit-source-crawler").await.unwrap().is_none());

    catalog.create_crawler(&crawler()).await.unwrap();
    let record = catalog.get_crawler("tickit-source-crawler").await.unwrap().unwrap();
    assert_eq!(record.database_name.as_deref(), Some("tickit_bronze"));
    assert_eq!(record.table_prefix.as_deref(), Some("bronze_"));
    assert_eq!(record.s3_targets, vec!["s3://tickit-project-bucket/source/"]);
    assert_eq!(record.state, Some(CrawlerState::Ready));

    catalog.start_crawler("tickit-source-crawler").await.unwrap();
    assert_eq!(
        glue.crawler_state("tickit-source-crawler").await,
        Some(CrawlerState::Running)
    );

    catalog.delete_crawler("tickit-source-crawler").await.unwrap();
    assert!(catalog.get_crawler("tickit-source-crawler").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_crawler_is_rejected() {
    let catalog = CatalogGateway::new(Arc::new(InMemoryGlue::new()));
    catalog.create_crawler(&crawler()).await.unwrap();

    let err = catalog.create_crawler(&crawler()).await.unwrap_err();
    assert!(err.to_string().contains("AlreadyExistsException"));
}

#[tokio::test]
async fn test_catalog_lookups_fail_closed() {
    let glue = InMemoryGlue::new();
    let catalog = CatalogGateway::new(Arc::new(glue.clone()));

    assert!(catalog.get_database("tickit_bronze").await.unwrap_err().is_not_found());
    assert!(catalog.list_tables("tickit_bronze").await.is_err());

    glue.add_database(
        "tickit_bronze",
        vec![TableRecord {
            name: "bronze_category".to_string(),
            database_name: "tickit_bronze".to_string(),
            location: Some("s3://tickit-project-bucket/source/category.csv".to_string()),
            columns: vec![ColumnRecord {
                name: "catid".to_string(),
                data_type: Some("bigint".to_string()),
            }],
        }],
    )
    .await;

    assert_eq!(catalog.get_database("tickit_bronze").await.unwrap().name, "tickit_bronze");
    let tables = catalog.list_tables("tickit_bronze").await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].columns[0].name, "catid");
}

#[tokio::test]
async fn test_job_run_receives_exact_arguments() {
    let glue = InMemoryGlue::new();
    let jobs = JobGateway::new(Arc::new(glue.clone()));
    jobs.create_job_definition(&JobDefinition::new(
        "etl1",
        "bronze to silver",
        ROLE,
        "s3://tickit-project-bucket/glue_job_scripts/bronze_to_silver.py",
    ))
    .await
    .unwrap();

    let run_id = jobs.start_job_run("etl1", "db1", "cat", "out-bucket").await.unwrap();

    let runs = glue.runs().await;
    assert_eq!(runs.len(), 1);
    assert!(!run_id.as_str().is_empty());
    assert_eq!(runs[0].run_id, run_id);
    assert_eq!(runs[0].job_name, "etl1");

    let expected: BTreeMap<String, String> = [
        ("--input_database", "db1"),
        ("--input_table", "cat"),
        ("--output_bucket_url", "s3://out-bucket/"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(runs[0].arguments, expected);
}

#[tokio::test]
async fn test_job_listing_and_deletion() {
    let glue = InMemoryGlue::new();
    let jobs = JobGateway::new(Arc::new(glue.clone()));
    for name in ["a_job", "b_job", "c_job"] {
        jobs.create_job_definition(&JobDefinition::new(
            name,
            "",
            ROLE,
            "s3://tickit-project-bucket/glue_job_scripts/job.py",
        ))
        .await
        .unwrap();
    }

    assert_eq!(jobs.list_jobs(2).await.unwrap(), vec!["a_job", "b_job"]);

    jobs.start_job_run("b_job", "db1", "cat", "out-bucket").await.unwrap();
    jobs.delete_job_definition("b_job").await.unwrap();

    assert_eq!(glue.job_names().await, vec!["a_job", "c_job"]);
    assert!(glue.runs().await.is_empty());
    assert!(jobs.start_job_run("b_job", "db1", "cat", "out-bucket").await.is_err());
}
