/// Cluster and node pool lifecycle on Container Engine
use std::path::Path;
use tracing::info;

use super::client::ContainerEngine;
use super::models::{
    AddOnOptions, ClusterCreateOptions, CreateClusterRequest, CreateKubeconfigRequest,
    CreateNodePoolRequest, NodePool, WorkRequest,
};
use super::node_pool::{wait_for_nodes, WaitMode};
use super::work_request::{created_resource, wait_for_work_request, ENTITY_CLUSTER, ENTITY_NODE_POOL};
use crate::config::NodePoolStore;
use crate::error::{OkeError, OkeResult};
use crate::utils::PollingConfig;

/// Kubeconfig token expiration requested from the service
const KUBECONFIG_EXPIRATION: u32 = 360;

/// Placeholder some callers pass to mean "no SSH key"
const NO_SSH_KEY: &str = "Null";

/// Parameters for a new cluster and its node pool
#[derive(Debug, Clone)]
pub struct ClusterSpec {
    pub cluster_name: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub kube_version: String,
    /// Control plane load balancer subnets
    pub lb_subnet_ids: [String; 2],
    /// Worker subnets in priority order; the first is required
    pub worker_subnet_ids: Vec<Option<String>>,
    pub node_image_name: String,
    pub node_shape: String,
    pub node_ssh_key: Option<String>,
    pub quantity_wkr_subnets: usize,
    pub quantity_per_subnet: u32,
}

impl ClusterSpec {
    pub fn cluster_request(&self) -> CreateClusterRequest {
        CreateClusterRequest {
            name: self.cluster_name.clone(),
            compartment_id: self.compartment_id.clone(),
            vcn_id: self.vcn_id.clone(),
            kubernetes_version: self.kube_version.clone(),
            options: ClusterCreateOptions {
                service_lb_subnet_ids: self.lb_subnet_ids.to_vec(),
                add_ons: AddOnOptions {
                    is_kubernetes_dashboard_enabled: true,
                    is_tiller_enabled: true,
                },
            },
        }
    }

    /// The first `quantity_wkr_subnets` worker subnets, all of which must be set
    pub fn worker_subnets(&self) -> OkeResult<Vec<String>> {
        (0..self.quantity_wkr_subnets)
            .map(|i| {
                self.worker_subnet_ids
                    .get(i)
                    .cloned()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        OkeError::MissingInput(format!(
                            "--subnet{}-id is required when --quantity-wkr-subnets is {}",
                            i + 3,
                            self.quantity_wkr_subnets
                        ))
                    })
            })
            .collect()
    }

    pub fn node_pool_request(&self, cluster_id: &str) -> OkeResult<CreateNodePoolRequest> {
        Ok(CreateNodePoolRequest {
            compartment_id: self.compartment_id.clone(),
            cluster_id: cluster_id.to_string(),
            name: self.cluster_name.clone(),
            kubernetes_version: self.kube_version.clone(),
            node_image_name: self.node_image_name.clone(),
            node_shape: self.node_shape.clone(),
            subnet_ids: self.worker_subnets()?,
            quantity_per_subnet: self.quantity_per_subnet,
            ssh_public_key: self
                .node_ssh_key
                .clone()
                .filter(|k| !k.is_empty() && k != NO_SSH_KEY),
        })
    }
}

/// Polling settings for the two kinds of waits
#[derive(Debug, Clone)]
pub struct WaitSettings {
    pub work_request: PollingConfig,
    pub nodes: PollingConfig,
}

/// Cluster manager for handling OKE clusters and node pools
pub struct ClusterManager<'a, E: ContainerEngine + ?Sized> {
    engine: &'a E,
    waits: WaitSettings,
}

impl<'a, E: ContainerEngine + ?Sized> ClusterManager<'a, E> {
    /// Create a new cluster manager
    pub fn new(engine: &'a E, waits: WaitSettings) -> Self {
        Self { engine, waits }
    }

    async fn wait(&self, work_request_id: &str, what: &str) -> OkeResult<WorkRequest> {
        let polling = self
            .waits
            .work_request
            .describe(format!("Waiting for {} (work request {})", what, work_request_id));
        wait_for_work_request(self.engine, work_request_id, &polling).await
    }

    /// Create the cluster and return its id once the work request completes
    pub async fn create_cluster(&self, params: &ClusterSpec) -> OkeResult<String> {
        info!("Create Cluster :: Submitted ...");
        let work_request_id = self.engine.create_cluster(&params.cluster_request()).await?;

        let work_request = self.wait(&work_request_id, "cluster creation").await?;
        info!("Create Cluster :: Complete ...");

        let cluster_id = created_resource(&work_request, ENTITY_CLUSTER)?;
        info!("Cluster created (ID: {})", cluster_id);
        Ok(cluster_id)
    }

    /// Create the node pool for `cluster_id` and return its id
    pub async fn create_node_pool(&self, params: &ClusterSpec, cluster_id: &str) -> OkeResult<String> {
        let request = params.node_pool_request(cluster_id)?;

        info!("Create NodePool :: Submitted ...");
        let work_request_id = self.engine.create_node_pool(&request).await?;

        let work_request = self.wait(&work_request_id, "node pool creation").await?;
        info!("Create NodePool :: Complete ...");

        let node_pool_id = created_resource(&work_request, ENTITY_NODE_POOL)?;
        info!("Node pool created (ID: {})", node_pool_id);
        Ok(node_pool_id)
    }

    /// Delete the cluster and wait for the work request
    pub async fn delete_cluster(&self, cluster_id: &str) -> OkeResult<WorkRequest> {
        info!("Delete Cluster :: Submitted ...");
        let work_request_id = self.engine.delete_cluster(cluster_id).await?;
        self.wait(&work_request_id, "cluster deletion").await
    }

    /// Delete the node pool and wait for the work request
    pub async fn delete_node_pool(&self, node_pool_id: &str) -> OkeResult<WorkRequest> {
        info!("Delete NodePool :: Submitted ...");
        let work_request_id = self.engine.delete_node_pool(node_pool_id).await?;
        self.wait(&work_request_id, "node pool deletion").await
    }

    /// Wait for worker nodes according to `mode`
    pub async fn wait_for_nodes(&self, node_pool_id: &str, mode: WaitMode) -> OkeResult<()> {
        let polling = self.waits.nodes.describe(format!(
            "Waiting for nodes in pool {} (wait mode: {})",
            node_pool_id, mode
        ));
        wait_for_nodes(self.engine, node_pool_id, mode, &polling).await?;
        Ok(())
    }

    /// Fetch the node pool and persist it as the descriptor
    pub async fn save_node_pool(&self, node_pool_id: &str, store: &NodePoolStore) -> OkeResult<NodePool> {
        info!("Getting NodePool Data ...");
        let node_pool = self.engine.get_node_pool(node_pool_id).await?;
        store.write(&node_pool)?;
        info!("Node pool descriptor written to {}", store.path().display());
        Ok(node_pool)
    }

    /// Issue a kubeconfig for the cluster and write it to `path` verbatim
    pub async fn save_kubeconfig(&self, cluster_id: &str, path: &Path) -> OkeResult<u64> {
        info!("Getting kubeconfig Data ...");
        let request = CreateKubeconfigRequest {
            expiration: KUBECONFIG_EXPIRATION,
        };
        // Buffer the whole response so a failed download leaves any existing file intact
        let mut content = Vec::new();
        let written = self
            .engine
            .create_kubeconfig(cluster_id, &request, &mut content)
            .await?;
        tokio::fs::write(path, &content).await?;
        info!("Kubeconfig ({} bytes) written to {}", written, path.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oke::testing::FakeEngine;
    use std::time::Duration;
    use tempfile::TempDir;

    fn params() -> ClusterSpec {
        ClusterSpec {
            cluster_name: "dev-oke-001".to_string(),
            compartment_id: "ocid1.compartment.oc1..comp".to_string(),
            vcn_id: "ocid1.vcn.oc1..vcn".to_string(),
            kube_version: "v1.10.3".to_string(),
            lb_subnet_ids: ["subnet-1".to_string(), "subnet-2".to_string()],
            worker_subnet_ids: vec![
                Some("subnet-3".to_string()),
                Some("subnet-4".to_string()),
                None,
            ],
            node_image_name: "Oracle-Linux-7.4".to_string(),
            node_shape: "VM.Standard1.1".to_string(),
            node_ssh_key: None,
            quantity_wkr_subnets: 1,
            quantity_per_subnet: 1,
        }
    }

    fn waits() -> WaitSettings {
        let polling = PollingConfig::new(Duration::from_secs(5), Duration::from_millis(2), "test");
        WaitSettings {
            work_request: polling.clone(),
            nodes: polling,
        }
    }

    #[test]
    fn test_cluster_request() {
        let request = params().cluster_request();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["options"]["serviceLbSubnetIds"][1], "subnet-2");
        assert_eq!(json["options"]["addOns"]["isTillerEnabled"], true);
        assert_eq!(json["vcnId"], "ocid1.vcn.oc1..vcn");
    }

    #[test]
    fn test_worker_subnets_by_quantity() {
        let mut params = params();
        assert_eq!(params.worker_subnets().unwrap(), vec!["subnet-3"]);

        params.quantity_wkr_subnets = 2;
        assert_eq!(params.worker_subnets().unwrap(), vec!["subnet-3", "subnet-4"]);

        params.quantity_wkr_subnets = 3;
        assert!(matches!(
            params.worker_subnets(),
            Err(OkeError::MissingInput(_))
        ));
    }

    #[test]
    fn test_ssh_key_placeholder_is_dropped() {
        let mut params = params();
        params.node_ssh_key = Some("Null".to_string());
        assert!(params.node_pool_request("c1").unwrap().ssh_public_key.is_none());

        params.node_ssh_key = Some("ssh-rsa AAAA".to_string());
        assert_eq!(
            params.node_pool_request("c1").unwrap().ssh_public_key.as_deref(),
            Some("ssh-rsa AAAA")
        );
    }

    #[tokio::test]
    async fn test_create_cluster_locates_id() {
        let engine = FakeEngine::default();
        engine.push_work_request(FakeEngine::pending_work_request("wr-cluster-create"));
        engine.push_work_request(FakeEngine::finished_work_request(
            "wr-cluster-create",
            vec![FakeEngine::created("cluster", "ocid1.cluster.oc1..new")],
        ));

        let manager = ClusterManager::new(&engine, waits());
        let cluster_id = manager.create_cluster(&params()).await.unwrap();

        assert_eq!(cluster_id, "ocid1.cluster.oc1..new");
        assert_eq!(engine.work_request_polls(), 2);
    }

    #[tokio::test]
    async fn test_create_cluster_without_created_record() {
        let engine = FakeEngine::default();
        engine.push_work_request(FakeEngine::finished_work_request("wr-cluster-create", vec![]));

        let manager = ClusterManager::new(&engine, waits());
        let result = manager.create_cluster(&params()).await;

        assert!(matches!(result, Err(OkeError::ResourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_save_kubeconfig_writes_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kubeconfig");
        let engine = FakeEngine::default();
        let content = b"apiVersion: v1\nkind: Config\n";
        engine.set_kubeconfig(content);

        let manager = ClusterManager::new(&engine, waits());
        let written = manager.save_kubeconfig("c1", &path).await.unwrap();

        assert_eq!(written, content.len() as u64);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "apiVersion: v1\nkind: Config\n"
        );
        assert_eq!(engine.calls(), vec!["create_kubeconfig c1 expiration=360"]);
    }

    #[tokio::test]
    async fn test_failed_kubeconfig_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kubeconfig");
        std::fs::write(&path, "apiVersion: v1 # previous\n").unwrap();

        let engine = FakeEngine::default();
        engine.set_kubeconfig(b"apiVersion: v1\nkind: Config\n");
        engine.fail_kubeconfig(OkeError::Api {
            status: 500,
            code: "InternalServerError".to_string(),
            message: "stream reset".to_string(),
        });

        let manager = ClusterManager::new(&engine, waits());
        let result = manager.save_kubeconfig("c1", &path).await;

        assert!(matches!(result, Err(OkeError::Api { status: 500, .. })));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "apiVersion: v1 # previous\n"
        );
    }
}
