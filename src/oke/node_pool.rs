/// Worker node readiness tracking
use clap::ValueEnum;
use tracing::info;

use super::client::ContainerEngine;
use super::models::{NodePool, NodeState};
use crate::error::{OkeError, OkeResult};
use crate::utils::PollingConfig;

/// How long to wait for worker nodes after the node pool exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum WaitMode {
    /// Return as soon as the node pool is active
    #[default]
    #[value(name = "false")]
    None,
    /// Return once any node in the pool is active
    Any,
    /// Return once every node in the pool has settled
    All,
}

impl std::fmt::Display for WaitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitMode::None => write!(f, "false"),
            WaitMode::Any => write!(f, "any"),
            WaitMode::All => write!(f, "all"),
        }
    }
}

/// Whether the observed node states satisfy `mode`
///
/// An empty pool never satisfies a waiting mode.
pub fn nodes_ready(mode: WaitMode, states: &[NodeState]) -> bool {
    if states.is_empty() {
        return mode == WaitMode::None;
    }

    match mode {
        WaitMode::None => true,
        WaitMode::Any => states.iter().any(|s| *s == NodeState::Active),
        WaitMode::All => !states.iter().any(NodeState::is_transitional),
    }
}

fn summarize(states: &[NodeState]) -> String {
    if states.is_empty() {
        return "no nodes".to_string();
    }
    states
        .iter()
        .map(NodeState::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Poll the node pool until its nodes satisfy `mode`
///
/// Returns the node pool from the final poll, or `None` when `mode` is
/// [`WaitMode::None`] and nothing was fetched.
pub async fn wait_for_nodes<E: ContainerEngine + ?Sized>(
    engine: &E,
    node_pool_id: &str,
    mode: WaitMode,
    polling: &PollingConfig,
) -> OkeResult<Option<NodePool>> {
    if mode == WaitMode::None {
        return Ok(None);
    }

    let node_pool = polling
        .poll(|| async move {
            let node_pool = engine.get_node_pool(node_pool_id).await?;
            let states = node_pool.node_states();
            info!("Node pool {} lifecycle states: {}", node_pool_id, summarize(&states));
            Ok::<_, OkeError>(nodes_ready(mode, &states).then_some(node_pool))
        })
        .await?;

    Ok(Some(node_pool))
}
