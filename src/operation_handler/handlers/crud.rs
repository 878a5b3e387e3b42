//! Single-resource handlers.

use crate::operation_handler::ScimResponse;
use crate::error::{ScimError, ScimResult};
use crate::pagination::PaginationController;
use crate::resource::{ListResponse, Record};
use crate::storage::ResourceStore;
use log::info;

fn parse_body<R: Record>(body: &[u8]) -> ScimResult<R> {
    serde_json::from_slice(body).map_err(ScimError::InvalidBody)
}

/// Lookup by id, answered as a list of zero or one resources.
pub async fn handle_get<S: ResourceStore>(
    controller: &PaginationController<S>,
    id: &str,
) -> ScimResult<ScimResponse> {
    let record = controller.store().get(id).await.map_err(Into::<ScimError>::into)?;
    Ok(ScimResponse::ok(serde_json::to_value(ListResponse::single(record))?))
}

pub async fn handle_create<S: ResourceStore>(
    controller: &PaginationController<S>,
    body: &[u8],
) -> ScimResult<ScimResponse> {
    let record: S::Record = parse_body(body)?;
    let created = controller.store().create(record).await.map_err(Into::<ScimError>::into)?;
    info!(
        "Created {} {}",
        S::Record::RESOURCE_TYPE,
        created.id().unwrap_or_default()
    );
    Ok(ScimResponse::created(serde_json::to_value(&created)?))
}

pub async fn handle_update<S: ResourceStore>(
    controller: &PaginationController<S>,
    id: &str,
    body: &[u8],
) -> ScimResult<ScimResponse> {
    let record: S::Record = parse_body(body)?;
    let updated = controller
        .store()
        .update(id, record)
        .await
        .map_err(Into::<ScimError>::into)?
        .ok_or_else(|| ScimError::resource_not_found(S::Record::RESOURCE_TYPE, id))?;
    Ok(ScimResponse::ok(serde_json::to_value(&updated)?))
}

pub async fn handle_delete<S: ResourceStore>(
    controller: &PaginationController<S>,
    id: &str,
) -> ScimResult<ScimResponse> {
    if controller.store().delete(id).await.map_err(Into::<ScimError>::into)? {
        info!("Deleted {} {}", S::Record::RESOURCE_TYPE, id);
        Ok(ScimResponse::no_content())
    } else {
        Err(ScimError::resource_not_found(S::Record::RESOURCE_TYPE, id))
    }
}
