/// Command pipelines: submit, wait, persist, report
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::store::{worker_node_ip, DescriptorField};
use crate::config::ConfigDir;
use crate::oke::cluster::{ClusterSpec, WaitSettings};
use crate::oke::{ClusterManager, ContainerEngine, WaitMode};

/// Settings shared by every pipeline
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub waits: WaitSettings,
    /// Delay between echoing request parameters and the first remote call
    pub pause: Duration,
}

async fn pause(settings: &RunSettings) {
    if !settings.pause.is_zero() {
        tokio::time::sleep(settings.pause).await;
    }
}

fn banner(title: &str) {
    info!("OKECTL :: {} ...", title);
    info!("-------------------------------------------------------");
}

/// Create a cluster, its node pool, and the local descriptor and kubeconfig
///
/// Returns the descriptor text as written.
pub async fn create_cluster<E: ContainerEngine + ?Sized>(
    engine: &E,
    config_dir: &Path,
    params: &ClusterSpec,
    wait_mode: WaitMode,
    settings: &RunSettings,
) -> Result<String> {
    banner("Create Cluster :: Request Parameters");
    info!("configDir: {}", config_dir.display());
    info!("clusterName: {}", params.cluster_name);
    info!("kubeVersion: {}", params.kube_version);
    info!("vcnId: {}", params.vcn_id);
    info!("compartmentId: {}", params.compartment_id);
    info!("lbSubnetIds: {}", params.lb_subnet_ids.join(", "));
    for (i, subnet) in params.worker_subnet_ids.iter().enumerate() {
        info!("subnet{}Id: {}", i + 3, subnet.as_deref().unwrap_or(""));
    }
    info!("nodeImageName: {}", params.node_image_name);
    info!("nodeShape: {}", params.node_shape);
    info!("nodeSshKey: {}", params.node_ssh_key.as_deref().unwrap_or(""));
    info!("quantityWkrSubnets: {}", params.quantity_wkr_subnets);
    info!("quantityPerSubnet: {}", params.quantity_per_subnet);
    info!("waitNodesActive: {}", wait_mode);

    // Reject a short worker subnet list before anything is created remotely
    params.worker_subnets()?;

    pause(settings).await;

    let dir = ConfigDir::prepare(config_dir, true).context("Failed to prepare config directory")?;
    info!("Using config directory {}", dir.path().display());
    let store = dir.node_pool_store();
    let manager = ClusterManager::new(engine, settings.waits.clone());

    let cluster_id = manager
        .create_cluster(params)
        .await
        .context("Failed to create cluster")?;

    let node_pool_id = manager
        .create_node_pool(params, &cluster_id)
        .await
        .context("Failed to create node pool")?;

    manager
        .wait_for_nodes(&node_pool_id, wait_mode)
        .await
        .context("Failed waiting for worker nodes")?;
    info!("OKECTL :: Create Node(s) :: Complete ...");

    manager
        .save_node_pool(&node_pool_id, &store)
        .await
        .context("Failed to save node pool descriptor")?;

    manager
        .save_kubeconfig(&cluster_id, &dir.kubeconfig_path())
        .await
        .context("Failed to create kubeconfig")?;

    banner("Create Cluster :: Complete");
    info!("Cluster ID: {}", cluster_id);
    info!("Node pool ID: {}", node_pool_id);
    info!("Kubeconfig: {}", dir.kubeconfig_path().display());
    info!("To access your cluster:");
    info!("  export KUBECONFIG={}", dir.kubeconfig_path().display());
    info!("  kubectl get nodes");

    Ok(store.read_raw()?)
}

/// Delete a cluster by flag or by the clusterId stored in the descriptor
pub async fn delete_cluster<E: ContainerEngine + ?Sized>(
    engine: &E,
    config_dir: &Path,
    cluster_id: Option<&str>,
    settings: &RunSettings,
) -> Result<()> {
    let cluster_id = resolve_identifier(config_dir, cluster_id, DescriptorField::ClusterId)?;

    banner("Delete Cluster :: Request Parameters");
    info!("clusterId: {}", cluster_id);

    pause(settings).await;

    let manager = ClusterManager::new(engine, settings.waits.clone());
    manager
        .delete_cluster(&cluster_id)
        .await
        .context("Failed to delete cluster")?;

    banner("Delete Cluster :: Complete");
    Ok(())
}

/// Delete a node pool by flag or by the id stored in the descriptor
pub async fn delete_node_pool<E: ContainerEngine + ?Sized>(
    engine: &E,
    config_dir: &Path,
    node_pool_id: Option<&str>,
    settings: &RunSettings,
) -> Result<()> {
    let node_pool_id = resolve_identifier(config_dir, node_pool_id, DescriptorField::NodePoolId)?;

    banner("Delete NodePool :: Request Parameters");
    info!("nodePoolId: {}", node_pool_id);

    pause(settings).await;

    let manager = ClusterManager::new(engine, settings.waits.clone());
    manager
        .delete_node_pool(&node_pool_id)
        .await
        .context("Failed to delete node pool")?;

    banner("Delete NodePool :: Complete");
    Ok(())
}

/// Issue a fresh kubeconfig for the cluster into the config directory
pub async fn create_kubeconfig<E: ContainerEngine + ?Sized>(
    engine: &E,
    config_dir: &Path,
    cluster_id: Option<&str>,
    settings: &RunSettings,
) -> Result<()> {
    let cluster_id = resolve_identifier(config_dir, cluster_id, DescriptorField::ClusterId)?;

    banner("Create kubeconfig :: Request Parameters");
    info!("configDir: {}", config_dir.display());
    info!("clusterId: {}", cluster_id);

    pause(settings).await;

    let dir = ConfigDir::prepare(config_dir, false).context("Failed to prepare config directory")?;
    let manager = ClusterManager::new(engine, settings.waits.clone());
    manager
        .save_kubeconfig(&cluster_id, &dir.kubeconfig_path())
        .await
        .context("Failed to create kubeconfig")?;

    banner("Create kubeconfig :: Complete");
    Ok(())
}

/// Refresh the descriptor and report it
///
/// In Terraform external data source mode only `{"workerNodeIp": ...}` is returned.
pub async fn get_node_pool<E: ContainerEngine + ?Sized>(
    engine: &E,
    config_dir: &Path,
    node_pool_id: Option<&str>,
    wait_mode: WaitMode,
    tf_external_ds: bool,
    settings: &RunSettings,
) -> Result<String> {
    let dir = ConfigDir::prepare(config_dir, false).context("Failed to prepare config directory")?;
    let store = dir.node_pool_store();
    let node_pool_id = store.resolve(node_pool_id, DescriptorField::NodePoolId)?;

    banner("Get NodePool :: Request Parameters");
    info!("nodePoolId: {}", node_pool_id);
    info!("waitNodesActive: {}", wait_mode);
    info!("tfExternalDs: {}", tf_external_ds);

    pause(settings).await;

    let manager = ClusterManager::new(engine, settings.waits.clone());
    manager
        .wait_for_nodes(&node_pool_id, wait_mode)
        .await
        .context("Failed waiting for worker nodes")?;

    let node_pool = manager
        .save_node_pool(&node_pool_id, &store)
        .await
        .context("Failed to save node pool descriptor")?;

    if tf_external_ds {
        let ip = worker_node_ip(&node_pool);
        if ip.is_empty() {
            warn!("No worker node public IP found in node pool {}", node_pool_id);
        }
        return Ok(serde_json::json!({ "workerNodeIp": ip }).to_string());
    }

    banner("Get NodePool :: Complete");
    Ok(store.read_raw()?)
}

/// Flag value if given, otherwise the field from the stored descriptor
///
/// Only the descriptor is read; a missing custom directory or file is a
/// missing-input error and no remote call is made.
fn resolve_identifier(
    config_dir: &Path,
    flag: Option<&str>,
    field: DescriptorField,
) -> Result<String> {
    if let Some(value) = flag.filter(|v| !v.is_empty()) {
        return Ok(value.to_string());
    }

    let dir = ConfigDir::prepare(config_dir, false)?;
    Ok(dir.node_pool_store().resolve(None, field)?)
}
