use crate::app::gateways::log_failure;
use crate::domain::model::{BucketStatus, TabularFrame};
use crate::domain::ports::ObjectStoreApi;
use crate::utils::error::{EtlError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const CSV_CONTENT_TYPE: &str = "text/csv";

/// Bucket and object operations over one object store client.
#[derive(Clone)]
pub struct ObjectStoreGateway {
    api: Arc<dyn ObjectStoreApi>,
    region: Option<String>,
}

impl ObjectStoreGateway {
    pub fn new(api: Arc<dyn ObjectStoreApi>, region: Option<String>) -> Self {
        Self { api, region }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        self.api.list_buckets().await.inspect_err(log_failure)
    }

    /// Creates the bucket unless a bucket with that name is already listed.
    ///
    /// The pre-check is a separate list call, so two concurrent callers can
    /// both see the name as free; the loser gets the provider's conflict error.
    pub async fn create_bucket(&self, name: &str) -> Result<BucketStatus> {
        if self.list_buckets().await?.iter().any(|b| b == name) {
            info!("The bucket {} already exists", name);
            return Ok(BucketStatus::AlreadyPresent);
        }

        info!("Creating bucket {} in {}", name, self.region().unwrap_or("the default region"));
        self.api
            .create_bucket(name, self.region())
            .await
            .inspect_err(log_failure)?;
        info!("✅ The bucket {} has been created", name);
        Ok(BucketStatus::Created)
    }

    /// Uploads a local file and returns the key it was stored under.
    /// The key defaults to the file's base name.
    pub async fn try_upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: Option<&str>,
    ) -> Result<String> {
        let key = match key {
            Some(key) => key.to_string(),
            None => local_path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    EtlError::processing(format!(
                        "Cannot derive an object key from {}",
                        local_path.display()
                    ))
                })?,
        };

        let body = tokio::fs::read(local_path).await?;
        debug!("Uploading {} bytes to s3://{}/{}", body.len(), bucket, key);

        self.api
            .put_object(bucket, &key, body, None)
            .await
            .inspect_err(log_failure)?;
        Ok(key)
    }

    /// Boolean form of [`try_upload_file`](Self::try_upload_file): failures are
    /// logged and reported as `false`.
    pub async fn upload_file(&self, local_path: &Path, bucket: &str, key: Option<&str>) -> bool {
        match self.try_upload_file(local_path, bucket, key).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("❌ Upload of {} failed: {}", local_path.display(), e);
                false
            }
        }
    }

    pub async fn download_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let data = self
            .api
            .get_object(bucket, key)
            .await
            .inspect_err(log_failure)?;

        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(local_path, data).await?;
        debug!("Downloaded s3://{}/{} to {}", bucket, key, local_path.display());
        Ok(())
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.api
            .delete_object(bucket, key)
            .await
            .inspect_err(log_failure)?;
        info!("The file {} has been deleted from the bucket {}", key, bucket);
        Ok(())
    }

    /// Reads an object and decodes it as UTF-8 text.
    pub async fn read_object(&self, bucket: &str, key: &str) -> Result<String> {
        let data = self
            .api
            .get_object(bucket, key)
            .await
            .inspect_err(log_failure)?;

        String::from_utf8(data).map_err(|e| {
            EtlError::processing(format!("s3://{}/{} is not valid UTF-8: {}", bucket, key, e))
        })
    }

    /// Serializes the whole frame to CSV (with header) and stores it as one object.
    pub async fn upload_tabular_as_csv(
        &self,
        frame: &TabularFrame,
        bucket: &str,
        key: &str,
    ) -> Result<()> {
        let body = frame.to_csv_bytes()?;
        debug!(
            rows = frame.row_count(),
            bytes = body.len(),
            "Uploading CSV to s3://{}/{}",
            bucket,
            key
        );

        self.api
            .put_object(bucket, key, body, Some(CSV_CONTENT_TYPE))
            .await
            .inspect_err(log_failure)?;
        info!("Dataframe is saved as CSV in s3://{}/{}", bucket, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryObjectStore;
    use crate::domain::model::CellValue;
    use crate::utils::error::ProviderErrorKind;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn gateway(store: &InMemoryObjectStore) -> ObjectStoreGateway {
        ObjectStoreGateway::new(Arc::new(store.clone()), Some("us-east-2".to_string()))
    }

    #[tokio::test]
    async fn test_create_bucket_is_idempotent() {
        let store = InMemoryObjectStore::new();
        let gateway = gateway(&store);

        assert_eq!(gateway.create_bucket("tickit-project-bucket").await.unwrap(), BucketStatus::Created);
        assert_eq!(
            gateway.create_bucket("tickit-project-bucket").await.unwrap(),
            BucketStatus::AlreadyPresent
        );

        assert_eq!(store.buckets().await, vec!["tickit-project-bucket"]);
        assert_eq!(store.call_count("CreateBucket").await, 1);
    }

    #[tokio::test]
    async fn test_create_bucket_propagates_provider_errors() {
        let store = InMemoryObjectStore::new();
        store.fail_operation("CreateBucket", "AccessDenied").await;

        let err = gateway(&store).create_bucket("tickit-project-bucket").await.unwrap_err();
        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::AccessDenied));
    }

    #[tokio::test]
    async fn test_upload_file_defaults_key_to_basename() {
        let store = InMemoryObjectStore::with_buckets(["tickit"]);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"print('hello')").unwrap();

        let key = gateway(&store)
            .try_upload_file(file.path(), "tickit", None)
            .await
            .unwrap();

        let expected = file.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(key, expected);
        assert_eq!(store.object("tickit", expected).await.unwrap(), b"print('hello')");
    }

    #[tokio::test]
    async fn test_upload_file_returns_false_on_provider_rejection() {
        let store = InMemoryObjectStore::with_buckets(["tickit"]);
        store.fail_operation("PutObject", "AccessDenied").await;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"data").unwrap();

        let uploaded = gateway(&store)
            .upload_file(file.path(), "tickit", Some("scripts/job.py"))
            .await;

        assert!(!uploaded);
        assert!(store.uploads().await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_file_returns_false_when_local_file_missing() {
        let store = InMemoryObjectStore::with_buckets(["tickit"]);
        let dir = TempDir::new().unwrap();

        let uploaded = gateway(&store)
            .upload_file(&dir.path().join("missing.py"), "tickit", None)
            .await;

        assert!(!uploaded);
    }

    #[tokio::test]
    async fn test_read_download_and_delete_object() {
        let store = InMemoryObjectStore::with_buckets(["tickit"]);
        let gateway = gateway(&store);
        store
            .put_object("tickit", "silver/venue.csv", b"venueid\n1\n".to_vec(), None)
            .await
            .unwrap();

        let text = gateway.read_object("tickit", "silver/venue.csv").await.unwrap();
        assert_eq!(text, "venueid\n1\n");

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("venue.csv");
        gateway
            .download_file("tickit", "silver/venue.csv", &target)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "venueid\n1\n");

        gateway.delete_object("tickit", "silver/venue.csv").await.unwrap();
        let err = gateway.read_object("tickit", "silver/venue.csv").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_object_rejects_invalid_utf8() {
        let store = InMemoryObjectStore::with_buckets(["tickit"]);
        store
            .put_object("tickit", "bad.bin", vec![0xff, 0xfe], None)
            .await
            .unwrap();

        let err = gateway(&store).read_object("tickit", "bad.bin").await.unwrap_err();
        assert!(matches!(err, EtlError::ProcessingError { .. }));
    }

    #[tokio::test]
    async fn test_upload_tabular_as_csv_writes_header_and_rows() {
        let store = InMemoryObjectStore::with_buckets(["tickit"]);
        let mut frame = TabularFrame::new(vec!["catid".into(), "catname".into()]);
        frame.push_row(vec![CellValue::Integer(1), CellValue::Text("MLB".into())]);

        gateway(&store)
            .upload_tabular_as_csv(&frame, "tickit", "source/category.csv")
            .await
            .unwrap();

        let body = store.object("tickit", "source/category.csv").await.unwrap();
        assert_eq!(String::from_utf8(body).unwrap(), "catid,catname\n1,MLB\n");
    }
}
