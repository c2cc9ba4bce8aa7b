/// okectl - Oracle Container Engine for Kubernetes
///
/// A command-line tool for creating and tearing down OKE clusters and node
/// pools, and for producing the nodepool.json and kubeconfig artefacts.
mod commands;
mod config;
mod error;
mod oke;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::RunSettings;
use crate::config::store::DEFAULT_CONFIG_DIR;
use crate::config::ApiConfig;
use crate::error::{exit_code_for, OkeError};
use crate::oke::cluster::{ClusterSpec, WaitSettings};
use crate::oke::{ContainerEngineClient, WaitMode};
use crate::utils::PollingConfig;

#[derive(Parser)]
#[command(name = "okectl", version)]
#[command(
    about = "A command-line application for configuring Oracle OKE (Container Engine for Kubernetes)",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path where output files are created or referenced, e.g. the kubeconfig file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// OCI region used to derive the API endpoint
    #[arg(long, global = true, env = "OCI_REGION")]
    region: Option<String>,

    /// Container Engine API endpoint (overrides --region)
    #[arg(long, global = true, env = "OKE_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token for the API
    #[arg(long, global = true, env = "OCI_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// YAML profile with region, endpoint, auth_token and request_timeout_secs
    #[arg(long, global = true, env = "OKECTL_API_CONFIG")]
    api_config: Option<PathBuf>,

    /// Seconds to wait for a work request to finish
    #[arg(long, global = true, default_value_t = 3600)]
    work_request_timeout: u64,

    /// Seconds to wait for worker nodes to become active
    #[arg(long, global = true, default_value_t = 3600)]
    nodes_timeout: u64,

    /// Seconds between status polls
    #[arg(long, global = true, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Seconds to pause after echoing request parameters
    #[arg(long, global = true, default_value_t = 5)]
    pause: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create new OKE Kubernetes cluster
    CreateCluster(CreateClusterArgs),

    /// Delete OKE Kubernetes cluster
    DeleteCluster {
        /// OKE Kubernetes cluster Id. If not specified, clusterId contained in nodepool.json will be used
        #[arg(long)]
        cluster_id: Option<String>,
    },

    /// Create kubeconfig authentication artefact for kubectl
    CreateKubeconfig {
        /// OKE Kubernetes cluster Id. If not specified, clusterId contained in nodepool.json will be used
        #[arg(long)]
        cluster_id: Option<String>,
    },

    /// Get cluster, node pool, and node details for a specified node pool
    GetNodePool {
        /// OKE Node Pool Id. If not specified, Id contained in nodepool.json will be used
        #[arg(long)]
        node_pool_id: Option<String>,

        /// Wait for worker nodes before returning
        #[arg(long, value_enum, default_value_t = WaitMode::None)]
        wait_nodes_active: WaitMode,

        /// Run as a Terraform external data source and print only JSON for Terraform
        #[arg(long)]
        tf_external_ds: bool,
    },

    /// Delete OKE node pool
    DeleteNodePool {
        /// OKE Node Pool Id. If not specified, Id contained in nodepool.json will be used
        #[arg(long)]
        node_pool_id: Option<String>,
    },
}

#[derive(clap::Args)]
struct CreateClusterArgs {
    /// OCI VCN Id where cluster will be created
    #[arg(long)]
    vcn_id: String,

    /// OCI Compartment Id where cluster will be created
    #[arg(long)]
    compartment_id: String,

    /// Cluster control plane LB subnet 1
    #[arg(long)]
    subnet1_id: String,

    /// Cluster control plane LB subnet 2
    #[arg(long)]
    subnet2_id: String,

    /// Worker node subnet 1
    #[arg(long)]
    subnet3_id: String,

    /// Worker node subnet 2
    #[arg(long)]
    subnet4_id: Option<String>,

    /// Worker node subnet 3
    #[arg(long)]
    subnet5_id: Option<String>,

    /// Kubernetes cluster name
    #[arg(long, default_value = "dev-oke-001")]
    cluster_name: String,

    /// Kubernetes cluster version
    #[arg(long, default_value = "v1.10.3")]
    kube_version: String,

    /// OS image used for worker nodes
    #[arg(long, default_value = "Oracle-Linux-7.4")]
    node_image_name: String,

    /// CPU/RAM allocated to worker nodes
    #[arg(long, default_value = "VM.Standard1.1")]
    node_shape: String,

    /// SSH key to provision to worker nodes for remote access
    #[arg(long)]
    node_ssh_key: Option<String>,

    /// Number of subnets used to host worker nodes
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    quantity_wkr_subnets: u8,

    /// Number of worker nodes per subnet
    #[arg(long, default_value_t = 1)]
    quantity_per_subnet: u32,

    /// all: wait until every node is active; any: until one node is active; false: no wait
    #[arg(long, value_enum, default_value_t = WaitMode::None)]
    wait_nodes_active: WaitMode,
}

impl CreateClusterArgs {
    fn to_params(&self) -> ClusterSpec {
        ClusterSpec {
            cluster_name: self.cluster_name.clone(),
            compartment_id: self.compartment_id.clone(),
            vcn_id: self.vcn_id.clone(),
            kube_version: self.kube_version.clone(),
            lb_subnet_ids: [self.subnet1_id.clone(), self.subnet2_id.clone()],
            worker_subnet_ids: vec![
                Some(self.subnet3_id.clone()),
                self.subnet4_id.clone(),
                self.subnet5_id.clone(),
            ],
            node_image_name: self.node_image_name.clone(),
            node_shape: self.node_shape.clone(),
            node_ssh_key: self.node_ssh_key.clone(),
            quantity_wkr_subnets: usize::from(self.quantity_wkr_subnets),
            quantity_per_subnet: self.quantity_per_subnet,
        }
    }
}

impl Cli {
    fn api_config(&self) -> Result<ApiConfig> {
        let base = match &self.api_config {
            Some(path) => ApiConfig::from_file(path)
                .with_context(|| format!("Failed to load API config {}", path.display()))?,
            None => ApiConfig::default(),
        };
        Ok(base.merge(ApiConfig {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            auth_token: self.auth_token.clone(),
            request_timeout_secs: None,
        }))
    }

    fn run_settings(&self) -> RunSettings {
        let interval = Duration::from_secs(self.poll_interval);
        RunSettings {
            waits: WaitSettings {
                work_request: PollingConfig::new(
                    Duration::from_secs(self.work_request_timeout),
                    interval,
                    "Waiting for work request",
                ),
                nodes: PollingConfig::new(
                    Duration::from_secs(self.nodes_timeout),
                    interval,
                    "Waiting for worker nodes",
                ),
            },
            pause: Duration::from_secs(self.pause),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("okectl={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Execute command; an interrupt abandons whatever wait is in progress
    let result = tokio::select! {
        result = run(&cli) => result,
        _ = interrupted(tokio::signal::ctrl_c()) => Err(OkeError::Cancelled.into()),
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        let transient = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<OkeError>())
            .any(OkeError::is_retryable);
        if transient {
            info!("The failure looks transient; re-running the command may succeed");
        }
        std::process::exit(exit_code_for(&e));
    }
}

/// Resolves once the operator interrupts; never resolves if the listener can't be installed
async fn interrupted<F: std::future::Future<Output = std::io::Result<()>>>(signal: F) {
    if let Err(e) = signal.await {
        warn!("Unable to listen for Ctrl-C, interrupts will not cancel cleanly: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let api_config = cli.api_config()?;
    let engine = ContainerEngineClient::new(&api_config).context("Failed to create API client")?;
    let settings = cli.run_settings();

    match &cli.command {
        Commands::CreateCluster(args) => {
            let descriptor = commands::create_cluster(
                &engine,
                &cli.config_dir,
                &args.to_params(),
                args.wait_nodes_active,
                &settings,
            )
            .await?;
            println!("{}", descriptor);
        }
        Commands::DeleteCluster { cluster_id } => {
            commands::delete_cluster(&engine, &cli.config_dir, cluster_id.as_deref(), &settings)
                .await?;
        }
        Commands::CreateKubeconfig { cluster_id } => {
            commands::create_kubeconfig(&engine, &cli.config_dir, cluster_id.as_deref(), &settings)
                .await?;
        }
        Commands::GetNodePool {
            node_pool_id,
            wait_nodes_active,
            tf_external_ds,
        } => {
            let output = commands::get_node_pool(
                &engine,
                &cli.config_dir,
                node_pool_id.as_deref(),
                *wait_nodes_active,
                *tf_external_ds,
                &settings,
            )
            .await?;
            println!("{}", output);
        }
        Commands::DeleteNodePool { node_pool_id } => {
            commands::delete_node_pool(&engine, &cli.config_dir, node_pool_id.as_deref(), &settings)
                .await?;
        }
    }

    info!("Done");
    Ok(())
}
