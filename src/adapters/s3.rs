use crate::adapters::sdk_error;
use crate::domain::ports::ObjectStoreApi;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, Clone)]
pub struct S3Api {
    client: S3Client,
}

impl S3Api {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &SdkConfig, force_path_style: bool) -> Self {
        let config = aws_sdk_s3::config::Builder::from(config)
            .force_path_style(force_path_style)
            .build();
        Self::new(S3Client::from_conf(config))
    }
}

#[async_trait]
impl ObjectStoreApi for S3Api {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| sdk_error("s3", "ListBuckets", e))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }

    async fn create_bucket(&self, bucket: &str, region: Option<&str>) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 不接受 LocationConstraint
        if let Some(region) = region.filter(|r| *r != "us-east-1") {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| sdk_error("s3", "CreateBucket", e))?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_error("s3", "PutObject", e))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("s3", "GetObject", e))?;

        let data = output.body.collect().await.map_err(|e| {
            EtlError::provider(
                "s3",
                "GetObject",
                Some("StreamError"),
                format!("Failed to collect S3 data: {}", e),
            )
        })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("s3", "DeleteObject", e))?;
        Ok(())
    }
}
