//! Endpoint dispatch.

use crate::cache::CacheError;
use crate::config::{ConnectorConfig, ProvisioningFeature};
use crate::error::ScimResult;
use crate::pagination::PaginationController;
use crate::resource::{ScimGroup, ScimUser};
use crate::storage::ResourceStore;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::errors::error_response;
use super::handlers::query::ListQuery;
use super::handlers::{crud, general, query};

use ProvisioningFeature::*;

/// Every operation the connector serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScimOperation {
    ListUsers,
    CreateUser,
    GetUser,
    UpdateUser,
    ListGroups,
    CreateGroup,
    GetGroup,
    UpdateGroup,
    DeleteGroup,
    ServiceProviderConfig,
    ClearCache,
    HealthCheck,
}

impl ScimOperation {
    /// Features of which at least one must be enabled; empty means always served.
    pub fn required_features(&self) -> &'static [ProvisioningFeature] {
        match self {
            Self::ListUsers => &[
                PushNewUsers,
                PushPendingUsers,
                ImportNewUsers,
                OppScimIncrementalImports,
            ],
            Self::CreateUser => &[PushNewUsers, PushPendingUsers],
            Self::GetUser => &[
                ImportProfileUpdates,
                PushPasswordUpdates,
                PushPendingUsers,
                PushProfileUpdates,
                PushUserDeactivation,
                ReactivateUsers,
            ],
            Self::UpdateUser => &[
                PushPasswordUpdates,
                PushPendingUsers,
                PushProfileUpdates,
                PushUserDeactivation,
                ReactivateUsers,
            ],
            Self::ListGroups | Self::CreateGroup => &[GroupPush, ImportGroupsWithUsers],
            Self::GetGroup | Self::UpdateGroup | Self::DeleteGroup => &[GroupPush],
            Self::ServiceProviderConfig | Self::ClearCache | Self::HealthCheck => &[],
        }
    }
}

impl fmt::Display for ScimOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Status and optional JSON body of an endpoint call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ScimResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    pub fn created(body: Value) -> Self {
        Self {
            status: 201,
            body: Some(body),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn no_content() -> Self {
        Self::empty(204)
    }

    pub fn not_implemented() -> Self {
        Self::empty(501)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// All endpoints of the connector, over one user store and one group store.
pub struct ScimEndpoints<U, G>
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    config: Arc<ConnectorConfig>,
    users: PaginationController<U>,
    groups: PaginationController<G>,
}

impl<U, G> ScimEndpoints<U, G>
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    /// Open the import caches for both resource types.
    pub async fn open(
        config: Arc<ConnectorConfig>,
        users: Arc<U>,
        groups: Arc<G>,
    ) -> Result<Self, CacheError> {
        let users = PaginationController::open(users, &config).await?;
        let groups = PaginationController::open(groups, &config).await?;
        Ok(Self {
            config,
            users,
            groups,
        })
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn users(&self) -> &PaginationController<U> {
        &self.users
    }

    pub fn groups(&self) -> &PaginationController<G> {
        &self.groups
    }

    pub async fn list_users(&self, params: &ListQuery) -> ScimResponse {
        self.dispatch(ScimOperation::ListUsers, query::handle_list(&self.users, params))
            .await
    }

    pub async fn create_user(&self, body: &[u8]) -> ScimResponse {
        self.dispatch(ScimOperation::CreateUser, crud::handle_create(&self.users, body))
            .await
    }

    pub async fn get_user(&self, id: &str) -> ScimResponse {
        self.dispatch(ScimOperation::GetUser, crud::handle_get(&self.users, id))
            .await
    }

    pub async fn update_user(&self, id: &str, body: &[u8]) -> ScimResponse {
        self.dispatch(
            ScimOperation::UpdateUser,
            crud::handle_update(&self.users, id, body),
        )
        .await
    }

    pub async fn list_groups(&self, params: &ListQuery) -> ScimResponse {
        self.dispatch(ScimOperation::ListGroups, query::handle_list(&self.groups, params))
            .await
    }

    pub async fn create_group(&self, body: &[u8]) -> ScimResponse {
        self.dispatch(ScimOperation::CreateGroup, crud::handle_create(&self.groups, body))
            .await
    }

    pub async fn get_group(&self, id: &str) -> ScimResponse {
        self.dispatch(ScimOperation::GetGroup, crud::handle_get(&self.groups, id))
            .await
    }

    pub async fn update_group(&self, id: &str, body: &[u8]) -> ScimResponse {
        self.dispatch(
            ScimOperation::UpdateGroup,
            crud::handle_update(&self.groups, id, body),
        )
        .await
    }

    pub async fn delete_group(&self, id: &str) -> ScimResponse {
        self.dispatch(ScimOperation::DeleteGroup, crud::handle_delete(&self.groups, id))
            .await
    }

    pub async fn service_provider_config(&self) -> ScimResponse {
        self.dispatch(
            ScimOperation::ServiceProviderConfig,
            general::handle_service_provider_config(&self.config),
        )
        .await
    }

    /// Force-clear every import cache and lock marker.
    pub async fn clear_cache(&self) -> ScimResponse {
        self.dispatch(ScimOperation::ClearCache, async {
            self.users.clear_caches().await?;
            self.groups.clear_caches().await?;
            Ok(ScimResponse::no_content())
        })
        .await
    }

    pub async fn health(&self) -> ScimResponse {
        ScimResponse::empty(200)
    }

    async fn dispatch<F>(&self, operation: ScimOperation, work: F) -> ScimResponse
    where
        F: Future<Output = ScimResult<ScimResponse>>,
    {
        let required = operation.required_features();
        if !required.is_empty() && !self.config.supports_any(required) {
            debug!("{} rejected: no supporting provisioning feature enabled", operation);
            return ScimResponse::not_implemented();
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        info!(
            "SCIM connector processing {} (request: '{}')",
            operation, request_id
        );

        match work.await {
            Ok(response) => {
                debug!(
                    "{} completed with status {} (request: '{}')",
                    operation, response.status, request_id
                );
                response
            }
            Err(e) if e.is_client_error() => {
                warn!("{} rejected: {} (request: '{}')", operation, e, request_id);
                error_response(&e, self.config.production)
            }
            Err(e) => {
                error!("{} failed: {} (request: '{}')", operation, e, request_id);
                error_response(&e, self.config.production)
            }
        }
    }
}
