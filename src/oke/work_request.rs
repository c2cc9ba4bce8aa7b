/// Work request completion and created-resource lookup
use tracing::{info, warn};

use super::client::ContainerEngine;
use super::models::{ActionType, WorkRequest, WorkRequestResource, WorkRequestStatus};
use crate::error::{OkeError, OkeResult};
use crate::utils::PollingConfig;

/// Entity type of a cluster in work request resources
pub const ENTITY_CLUSTER: &str = "CLUSTER";
/// Entity type of a node pool in work request resources
pub const ENTITY_NODE_POOL: &str = "NODEPOOL";

/// Poll a work request until the service reports it finished
///
/// Errors from the status call end the wait immediately.
pub async fn wait_for_work_request<E: ContainerEngine + ?Sized>(
    engine: &E,
    work_request_id: &str,
    polling: &PollingConfig,
) -> OkeResult<WorkRequest> {
    let work_request = polling
        .poll(|| async move {
            let wr = engine.get_work_request(work_request_id).await?;
            Ok::<_, OkeError>(wr.is_finished().then_some(wr))
        })
        .await?;

    match &work_request.status {
        Some(WorkRequestStatus::Failed) | Some(WorkRequestStatus::Canceled) => warn!(
            "Work request {} finished with status {:?}",
            work_request.id, work_request.status
        ),
        _ => info!(
            "Work request {} finished ({} resources)",
            work_request.id,
            work_request.resources.len()
        ),
    }

    Ok(work_request)
}

/// Identifier of the first resource matching the action and entity type
///
/// `entity_type` is expected upper case; stored entity types are compared
/// after upper-casing.
pub fn locate<'a>(
    resources: &'a [WorkRequestResource],
    action_type: ActionType,
    entity_type: &str,
) -> Option<&'a str> {
    let found = resources
        .iter()
        .find(|r| r.action_type == action_type && r.entity_type.to_uppercase() == entity_type)
        .map(|r| r.identifier.as_str());

    if found.is_none() {
        warn!("Unable to obtain resource ID for {} {}", action_type, entity_type);
    }
    found
}

/// Locate the resource a finished work request created, failing if it is absent
pub fn created_resource(work_request: &WorkRequest, entity_type: &str) -> OkeResult<String> {
    locate(&work_request.resources, ActionType::Created, entity_type)
        .map(str::to_string)
        .ok_or_else(|| OkeError::ResourceNotFound {
            work_request_id: work_request.id.clone(),
            action: ActionType::Created.to_string(),
            entity: entity_type.to_string(),
        })
}
