use crate::app::gateways::log_failure;
use crate::domain::model::{ClusterDefinition, ClusterRecord};
use crate::domain::ports::WarehouseApi;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Redshift cluster lifecycle.
#[derive(Clone)]
pub struct WarehouseGateway {
    api: Arc<dyn WarehouseApi>,
}

impl WarehouseGateway {
    pub fn new(api: Arc<dyn WarehouseApi>) -> Self {
        Self { api }
    }

    pub async fn create_cluster(&self, definition: &ClusterDefinition) -> Result<ClusterRecord> {
        let record = self
            .api
            .create_cluster(definition)
            .await
            .inspect_err(log_failure)?;
        info!(
            cluster = %record.identifier,
            node_type = %definition.node_type,
            nodes = definition.number_of_nodes,
            "✅ Cluster creation requested"
        );
        Ok(record)
    }

    /// Returns `None` when no cluster has that identifier.
    pub async fn describe_cluster(&self, identifier: &str) -> Result<Option<ClusterRecord>> {
        match self.api.describe_cluster(identifier).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => {
                debug!("Cluster {} does not exist", identifier);
                Ok(None)
            }
            Err(e) => {
                log_failure(&e);
                Err(e)
            }
        }
    }

    /// Skips the final snapshot unless one is named.
    pub async fn delete_cluster(&self, identifier: &str, final_snapshot: Option<&str>) -> Result<()> {
        self.api
            .delete_cluster(identifier, final_snapshot)
            .await
            .inspect_err(log_failure)?;
        info!(cluster = %identifier, "Cluster deletion requested");
        Ok(())
    }
}
