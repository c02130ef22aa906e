use crate::adapters::sdk_error;
use crate::domain::model::{ClusterDefinition, ClusterRecord};
use crate::domain::ports::WarehouseApi;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_redshift::types::Cluster;
use aws_sdk_redshift::Client as RedshiftClient;

#[derive(Debug, Clone)]
pub struct RedshiftApi {
    client: RedshiftClient,
}

impl RedshiftApi {
    pub fn new(client: RedshiftClient) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self::new(RedshiftClient::new(config))
    }
}

fn convert_cluster(cluster: &Cluster, fallback_identifier: &str) -> ClusterRecord {
    ClusterRecord {
        identifier: cluster
            .cluster_identifier()
            .unwrap_or(fallback_identifier)
            .to_string(),
        status: cluster.cluster_status().map(str::to_string),
        node_type: cluster.node_type().map(str::to_string),
        number_of_nodes: cluster.number_of_nodes(),
        endpoint: cluster
            .endpoint()
            .and_then(|endpoint| endpoint.address())
            .map(str::to_string),
        port: cluster.endpoint().and_then(|endpoint| endpoint.port()),
    }
}

#[async_trait]
impl WarehouseApi for RedshiftApi {
    async fn create_cluster(&self, definition: &ClusterDefinition) -> Result<ClusterRecord> {
        let mut request = self
            .client
            .create_cluster()
            .cluster_identifier(&definition.identifier)
            .node_type(&definition.node_type)
            .cluster_type(definition.cluster_type())
            .master_username(&definition.master_username)
            .master_user_password(&definition.master_password)
            .db_name(&definition.database_name)
            .set_iam_roles(Some(definition.iam_roles.clone()));

        // single-node 叢集不可指定節點數
        if definition.number_of_nodes > 1 {
            request = request.number_of_nodes(definition.number_of_nodes);
        }

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error("redshift", "CreateCluster", e))?;

        Ok(output
            .cluster()
            .map(|cluster| convert_cluster(cluster, &definition.identifier))
            .unwrap_or_else(|| ClusterRecord {
                identifier: definition.identifier.clone(),
                status: None,
                node_type: Some(definition.node_type.clone()),
                number_of_nodes: Some(definition.number_of_nodes),
                endpoint: None,
                port: None,
            }))
    }

    async fn describe_cluster(&self, identifier: &str) -> Result<ClusterRecord> {
        let output = self
            .client
            .describe_clusters()
            .cluster_identifier(identifier)
            .send()
            .await
            .map_err(|e| sdk_error("redshift", "DescribeClusters", e))?;

        output
            .clusters()
            .first()
            .map(|cluster| convert_cluster(cluster, identifier))
            .ok_or_else(|| {
                EtlError::provider(
                    "redshift",
                    "DescribeClusters",
                    Some("ClusterNotFound"),
                    format!("Cluster {} not found", identifier),
                )
            })
    }

    async fn delete_cluster(&self, identifier: &str, final_snapshot: Option<&str>) -> Result<()> {
        let request = self
            .client
            .delete_cluster()
            .cluster_identifier(identifier);

        let request = match final_snapshot {
            Some(snapshot) => request
                .skip_final_cluster_snapshot(false)
                .final_cluster_snapshot_identifier(snapshot),
            None => request.skip_final_cluster_snapshot(true),
        };

        request
            .send()
            .await
            .map_err(|e| sdk_error("redshift", "DeleteCluster", e))?;
        Ok(())
    }
}
