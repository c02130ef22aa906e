use crate::adapters::credentials::load_sdk_config;
use crate::adapters::glue::GlueApi;
use crate::adapters::memory::{InMemoryGlue, InMemoryObjectStore, InMemoryWarehouse};
use crate::adapters::redshift::RedshiftApi;
use crate::adapters::s3::S3Api;
use crate::app::gateways::{CatalogGateway, JobGateway, ObjectStoreGateway, WarehouseGateway};
use crate::config::LakeConfig;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::info;

/// One gateway per provider capability, all built from the same credentials.
#[derive(Clone)]
pub struct Gateways {
    pub store: ObjectStoreGateway,
    pub catalog: CatalogGateway,
    pub jobs: JobGateway,
    pub warehouse: WarehouseGateway,
}

impl Gateways {
    /// AWS clients configured from `[aws]` and the credential variables.
    pub async fn connect(config: &LakeConfig) -> Result<Self> {
        let provider = config.credential_provider();
        let sdk_config = load_sdk_config(&provider, config.aws.endpoint_url.as_deref()).await?;

        // 區域以 SDK 解析結果為準 (設定檔、AWS_REGION 或 profile)，CreateBucket 依此決定 LocationConstraint
        let region = sdk_config.region().map(|r| r.to_string());

        let glue = Arc::new(GlueApi::from_sdk_config(&sdk_config));
        Ok(Self {
            store: ObjectStoreGateway::new(
                Arc::new(S3Api::from_sdk_config(&sdk_config, config.aws.force_path_style)),
                region,
            ),
            catalog: CatalogGateway::new(glue.clone()),
            jobs: JobGateway::new(glue),
            warehouse: WarehouseGateway::new(Arc::new(RedshiftApi::from_sdk_config(&sdk_config))),
        })
    }

    /// In-process providers with the project bucket already present.
    pub fn in_memory(config: &LakeConfig) -> Self {
        info!("🔍 DRY RUN MODE - using in-memory providers");
        let glue = Arc::new(InMemoryGlue::new());
        Self {
            store: ObjectStoreGateway::new(
                Arc::new(InMemoryObjectStore::with_buckets([config.aws.project_bucket.clone()])),
                config.aws.region.clone(),
            ),
            catalog: CatalogGateway::new(glue.clone()),
            jobs: JobGateway::new(glue),
            warehouse: WarehouseGateway::new(Arc::new(InMemoryWarehouse::new())),
        }
    }
}
