/// Oracle Container Engine for Kubernetes (OKE) API client implementation
pub mod client;
pub mod cluster;
pub mod models;
pub mod node_pool;
pub mod work_request;

#[cfg(test)]
pub mod testing;

pub use client::{ContainerEngine, ContainerEngineClient};
pub use cluster::ClusterManager;
pub use node_pool::WaitMode;
