/// Scripted in-memory ContainerEngine for tests
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::client::ContainerEngine;
use super::models::*;
use crate::error::{OkeError, OkeResult};

/// Replays queued responses in order; once a queue drains, the default (if any) repeats
#[derive(Default)]
pub struct FakeEngine {
    work_requests: Mutex<VecDeque<OkeResult<WorkRequest>>>,
    default_work_request: Mutex<Option<WorkRequest>>,
    node_pools: Mutex<VecDeque<OkeResult<NodePool>>>,
    default_node_pool: Mutex<Option<NodePool>>,
    kubeconfig: Mutex<Vec<u8>>,
    kubeconfig_error: Mutex<Option<OkeError>>,
    calls: Mutex<Vec<String>>,
    node_pool_requests: Mutex<Vec<serde_json::Value>>,
    cluster_requests: Mutex<Vec<serde_json::Value>>,
}

impl FakeEngine {
    pub fn pending_work_request(id: &str) -> WorkRequest {
        WorkRequest {
            id: id.to_string(),
            operation_type: None,
            status: Some(WorkRequestStatus::InProgress),
            compartment_id: None,
            resources: vec![],
            time_accepted: Some(Utc::now()),
            time_started: None,
            time_finished: None,
        }
    }

    pub fn finished_work_request(id: &str, resources: Vec<WorkRequestResource>) -> WorkRequest {
        WorkRequest {
            status: Some(WorkRequestStatus::Succeeded),
            resources,
            time_finished: Some(Utc::now()),
            ..Self::pending_work_request(id)
        }
    }

    pub fn created(entity: &str, id: &str) -> WorkRequestResource {
        WorkRequestResource {
            action_type: ActionType::Created,
            entity_type: entity.to_string(),
            identifier: id.to_string(),
            entity_uri: None,
        }
    }

    pub fn node_pool(id: &str, cluster_id: &str, states: &[&str]) -> NodePool {
        let nodes = states
            .iter()
            .enumerate()
            .map(|(i, state)| Node {
                name: Some(format!("oke-node-{}", i)),
                public_ip: Some(format!("129.146.0.{}", i + 10)),
                lifecycle_state: NodeState::from(*state),
                ..Default::default()
            })
            .collect();

        NodePool {
            id: id.to_string(),
            cluster_id: cluster_id.to_string(),
            nodes,
            ..Default::default()
        }
    }

    pub fn push_work_request(&self, wr: WorkRequest) {
        self.work_requests.lock().unwrap().push_back(Ok(wr));
    }

    pub fn push_work_request_error(&self, err: OkeError) {
        self.work_requests.lock().unwrap().push_back(Err(err));
    }

    pub fn set_default_work_request(&self, wr: WorkRequest) {
        *self.default_work_request.lock().unwrap() = Some(wr);
    }

    pub fn push_node_pool(&self, pool: NodePool) {
        self.node_pools.lock().unwrap().push_back(Ok(pool));
    }

    pub fn set_default_node_pool(&self, pool: NodePool) {
        *self.default_node_pool.lock().unwrap() = Some(pool);
    }

    pub fn set_kubeconfig(&self, content: &[u8]) {
        *self.kubeconfig.lock().unwrap() = content.to_vec();
    }

    /// Fail the next kubeconfig call after half of the content has been written
    pub fn fail_kubeconfig(&self, err: OkeError) {
        *self.kubeconfig_error.lock().unwrap() = Some(err);
    }

    /// Every call made, in order, as "<operation> <argument>"
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cluster_requests(&self) -> Vec<serde_json::Value> {
        self.cluster_requests.lock().unwrap().clone()
    }

    pub fn node_pool_requests(&self) -> Vec<serde_json::Value> {
        self.node_pool_requests.lock().unwrap().clone()
    }

    pub fn work_request_polls(&self) -> usize {
        self.count("get_work_request")
    }

    pub fn node_pool_polls(&self) -> usize {
        self.count("get_node_pool")
    }

    fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    fn record(&self, operation: &str, arg: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", operation, arg));
    }

    fn unscripted(what: &str) -> OkeError {
        OkeError::Api {
            status: 500,
            code: "Unscripted".to_string(),
            message: format!("no scripted {}", what),
        }
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn create_cluster(&self, request: &CreateClusterRequest) -> OkeResult<String> {
        self.record("create_cluster", &request.name);
        self.cluster_requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(request)?);
        Ok("wr-cluster-create".to_string())
    }

    async fn delete_cluster(&self, cluster_id: &str) -> OkeResult<String> {
        self.record("delete_cluster", cluster_id);
        Ok("wr-cluster-delete".to_string())
    }

    async fn create_node_pool(&self, request: &CreateNodePoolRequest) -> OkeResult<String> {
        self.record("create_node_pool", &request.cluster_id);
        self.node_pool_requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(request)?);
        Ok("wr-node-pool-create".to_string())
    }

    async fn delete_node_pool(&self, node_pool_id: &str) -> OkeResult<String> {
        self.record("delete_node_pool", node_pool_id);
        Ok("wr-node-pool-delete".to_string())
    }

    async fn get_node_pool(&self, node_pool_id: &str) -> OkeResult<NodePool> {
        self.record("get_node_pool", node_pool_id);
        let next = self.node_pools.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => self
                .default_node_pool
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Self::unscripted("node pool")),
        }
    }

    async fn get_work_request(&self, work_request_id: &str) -> OkeResult<WorkRequest> {
        self.record("get_work_request", work_request_id);
        let next = self.work_requests.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => self
                .default_work_request
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Self::unscripted("work request")),
        }
    }

    async fn create_kubeconfig(
        &self,
        cluster_id: &str,
        request: &CreateKubeconfigRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> OkeResult<u64> {
        self.record(
            "create_kubeconfig",
            &format!("{} expiration={}", cluster_id, request.expiration),
        );
        let content = self.kubeconfig.lock().unwrap().clone();
        let failure = self.kubeconfig_error.lock().unwrap().take();
        if let Some(err) = failure {
            sink.write_all(&content[..content.len() / 2]).await?;
            return Err(err);
        }
        sink.write_all(&content).await?;
        sink.flush().await?;
        Ok(content.len() as u64)
    }
}
