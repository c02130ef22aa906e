use crate::domain::model::UploadFailurePolicy;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedTable {
    pub table: String,
    pub key: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTable {
    pub table: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub uploaded: Vec<UploadedTable>,
    pub failed: Vec<FailedTable>,
    pub elapsed: Duration,
}

impl ExtractionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.uploaded.iter().map(|t| t.rows).sum()
    }
}

/// Runs a pipeline table by table, one at a time.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    on_upload_failure: UploadFailurePolicy,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            on_upload_failure: UploadFailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: UploadFailurePolicy) -> Self {
        self.on_upload_failure = policy;
        self
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Extract errors always abort. Load errors abort or are recorded
    /// depending on the upload failure policy.
    pub async fn run(&self) -> Result<ExtractionReport> {
        let started = Instant::now();
        let tables = self.pipeline.tables();
        info!("🚀 Starting extraction of {} tables", tables.len());

        let mut report = ExtractionReport::default();
        for table in tables {
            let frame = self.pipeline.extract(table).await?;
            let rows = frame.row_count();

            match self.pipeline.load(table, frame).await {
                Ok(key) => {
                    info!(table = %table, rows, "✅ Uploaded {}", key);
                    report.uploaded.push(UploadedTable {
                        table: table.clone(),
                        key,
                        rows,
                    });
                }
                Err(e) => match self.on_upload_failure {
                    UploadFailurePolicy::Fail => return Err(e),
                    UploadFailurePolicy::Continue => {
                        warn!(table = %table, "⚠️ Upload failed, continuing: {}", e);
                        report.failed.push(FailedTable {
                            table: table.clone(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        report.elapsed = started.elapsed();
        if report.is_complete() {
            info!(
                "Data extraction and upload completed: {} tables, {} rows in {:.2?}",
                report.uploaded.len(),
                report.total_rows(),
                report.elapsed
            );
        } else {
            warn!(
                "Data extraction finished with {} failed uploads out of {} tables",
                report.failed.len(),
                tables.len()
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CellValue, TabularFrame};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    struct MockPipeline {
        tables: Vec<String>,
        failing_loads: HashSet<String>,
        failing_extracts: HashSet<String>,
        loaded: Mutex<Vec<String>>,
    }

    impl MockPipeline {
        fn new(tables: &[&str]) -> Self {
            Self {
                tables: tables.iter().map(|t| t.to_string()).collect(),
                failing_loads: HashSet::new(),
                failing_extracts: HashSet::new(),
                loaded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Pipeline for MockPipeline {
        fn tables(&self) -> &[String] {
            &self.tables
        }

        async fn extract(&self, table: &str) -> Result<TabularFrame> {
            if self.failing_extracts.contains(table) {
                return Err(EtlError::processing(format!("cannot read {}", table)));
            }
            let mut frame = TabularFrame::new(vec!["id".into()]);
            for i in 0..table.len() {
                frame.push_row(vec![CellValue::Integer(i as i64)]);
            }
            Ok(frame)
        }

        async fn load(&self, table: &str, _frame: TabularFrame) -> Result<String> {
            if self.failing_loads.contains(table) {
                return Err(EtlError::provider("s3", "PutObject", Some("AccessDenied"), "denied"));
            }
            self.loaded.lock().await.push(table.to_string());
            Ok(format!("source/{}.csv", table))
        }
    }

    #[tokio::test]
    async fn test_run_uploads_tables_in_order() {
        let engine = EtlEngine::new(MockPipeline::new(&["category", "venue"]));

        let report = engine.run().await.unwrap();

        assert!(report.is_complete());
        assert_eq!(
            report.uploaded,
            vec![
                UploadedTable { table: "category".into(), key: "source/category.csv".into(), rows: 8 },
                UploadedTable { table: "venue".into(), key: "source/venue.csv".into(), rows: 5 },
            ]
        );
        assert_eq!(report.total_rows(), 13);
        assert_eq!(*engine.pipeline().loaded.lock().await, vec!["category", "venue"]);
    }

    #[tokio::test]
    async fn test_fail_policy_aborts_on_upload_error() {
        let mut pipeline = MockPipeline::new(&["category", "venue", "users"]);
        pipeline.failing_loads.insert("venue".into());
        let engine = EtlEngine::new(pipeline);

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, EtlError::ProviderError { .. }));
        assert_eq!(*engine.pipeline().loaded.lock().await, vec!["category"]);
    }

    #[tokio::test]
    async fn test_continue_policy_reports_failures() {
        let mut pipeline = MockPipeline::new(&["category", "venue", "users"]);
        pipeline.failing_loads.insert("venue".into());
        let engine = EtlEngine::new(pipeline).with_failure_policy(UploadFailurePolicy::Continue);

        let report = engine.run().await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].table, "venue");
        assert!(report.failed[0].error.contains("AccessDenied"));
        assert_eq!(*engine.pipeline().loaded.lock().await, vec!["category", "users"]);
    }

    #[tokio::test]
    async fn test_extract_error_aborts_even_with_continue() {
        let mut pipeline = MockPipeline::new(&["category", "venue"]);
        pipeline.failing_extracts.insert("category".into());
        let engine = EtlEngine::new(pipeline).with_failure_policy(UploadFailurePolicy::Continue);

        assert!(engine.run().await.is_err());
        assert!(engine.pipeline().loaded.lock().await.is_empty());
    }
}
