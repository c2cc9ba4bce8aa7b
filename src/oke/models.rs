/// Container Engine API data models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Work request tracking an asynchronous operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    pub id: String,
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub status: Option<WorkRequestStatus>,
    #[serde(default)]
    pub compartment_id: Option<String>,
    #[serde(default)]
    pub resources: Vec<WorkRequestResource>,
    #[serde(default)]
    pub time_accepted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_finished: Option<DateTime<Utc>>,
}

impl WorkRequest {
    /// A work request is complete once the service stamps its finish time
    pub fn is_finished(&self) -> bool {
        self.time_finished.is_some()
    }
}

/// Work request status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkRequestStatus {
    Accepted,
    InProgress,
    Failed,
    Succeeded,
    Canceling,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// Resource touched by a work request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequestResource {
    pub action_type: ActionType,
    pub entity_type: String,
    pub identifier: String,
    #[serde(default)]
    pub entity_uri: Option<String>,
}

/// What a work request did to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Created,
    Updated,
    Deleted,
    Related,
    InProgress,
    Failed,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionType::Created => "CREATED",
            ActionType::Updated => "UPDATED",
            ActionType::Deleted => "DELETED",
            ActionType::Related => "RELATED",
            ActionType::InProgress => "IN_PROGRESS",
            ActionType::Failed => "FAILED",
            ActionType::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// Node pool as returned by the API and persisted as nodepool.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compartment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_shape: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnet_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_per_subnet: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Fields this tool does not interpret, kept so the descriptor stays verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodePool {
    /// Lifecycle state of every node, in API order
    pub fn node_states(&self) -> Vec<NodeState> {
        self.nodes.iter().map(|n| n.lifecycle_state.clone()).collect()
    }
}

/// Worker node within a node pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub lifecycle_state: NodeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_details: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Node lifecycle state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeState {
    Creating,
    Active,
    Updating,
    Deleting,
    Deleted,
    Failing,
    Inactive,
    #[default]
    Unknown,
    Other(String),
}

impl NodeState {
    pub fn as_str(&self) -> &str {
        match self {
            NodeState::Creating => "CREATING",
            NodeState::Active => "ACTIVE",
            NodeState::Updating => "UPDATING",
            NodeState::Deleting => "DELETING",
            NodeState::Deleted => "DELETED",
            NodeState::Failing => "FAILING",
            NodeState::Inactive => "INACTIVE",
            NodeState::Unknown => "UNKNOWN",
            NodeState::Other(s) => s,
        }
    }

    /// Node is still moving between stable states
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            NodeState::Creating | NodeState::Updating | NodeState::Deleting | NodeState::Failing
        )
    }
}

impl From<&str> for NodeState {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "CREATING" => NodeState::Creating,
            "ACTIVE" => NodeState::Active,
            "UPDATING" => NodeState::Updating,
            "DELETING" => NodeState::Deleting,
            "DELETED" => NodeState::Deleted,
            "FAILING" => NodeState::Failing,
            "INACTIVE" => NodeState::Inactive,
            "UNKNOWN" | "" => NodeState::Unknown,
            _ => NodeState::Other(s.to_string()),
        }
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for NodeState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.as_deref().map(NodeState::from).unwrap_or_default())
    }
}

/// Request body for creating a cluster
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub name: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub kubernetes_version: String,
    pub options: ClusterCreateOptions,
}

/// Optional cluster settings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreateOptions {
    pub service_lb_subnet_ids: Vec<String>,
    pub add_ons: AddOnOptions,
}

/// Cluster add-ons
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOnOptions {
    pub is_kubernetes_dashboard_enabled: bool,
    pub is_tiller_enabled: bool,
}

/// Request body for creating a node pool
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodePoolRequest {
    pub compartment_id: String,
    pub cluster_id: String,
    pub name: String,
    pub kubernetes_version: String,
    pub node_image_name: String,
    pub node_shape: String,
    pub subnet_ids: Vec<String>,
    pub quantity_per_subnet: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
}

/// Request body for issuing a kubeconfig
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKubeconfigRequest {
    pub expiration: u32,
}

/// Error response from API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
