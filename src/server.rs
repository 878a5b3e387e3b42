//! Axum HTTP surface for the connector.
//!
//! Route handlers only extract ids, query parameters and raw bodies and hand them
//! to [`ScimEndpoints`]; every status and body decision is made there.

use crate::auth;
use crate::config::ConnectorConfig;
use crate::operation_handler::{ListQuery, ScimEndpoints, ScimResponse, error_response};
use crate::resource::{ScimGroup, ScimUser};
use crate::storage::ResourceStore;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;

pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

impl IntoResponse for ScimResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self.body {
            Some(body) => (
                status,
                [(header::CONTENT_TYPE, HeaderValue::from_static(SCIM_CONTENT_TYPE))],
                body.to_string(),
            )
                .into_response(),
            None => (status, Body::empty()).into_response(),
        }
    }
}

type Shared<U, G> = Arc<ScimEndpoints<U, G>>;

// ─── Route builder ───────────────────────────────────────────────

pub fn build_router<U, G>(endpoints: Shared<U, G>) -> Router
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    let config = Arc::new(endpoints.config().clone());

    let mut scim = Router::new()
        .route("/Users", get(list_users::<U, G>).post(create_user::<U, G>))
        .route("/Users/:id", get(get_user::<U, G>).put(update_user::<U, G>))
        .route("/Groups", get(list_groups::<U, G>).post(create_group::<U, G>))
        .route(
            "/Groups/:id",
            get(get_group::<U, G>)
                .put(update_group::<U, G>)
                .delete(delete_group::<U, G>),
        )
        .route("/ServiceProviderConfig", get(service_provider_config::<U, G>))
        .route("/ServiceProviderConfigs", get(service_provider_config::<U, G>))
        .route("/ClearCache", get(clear_cache::<U, G>));

    if config.auth.is_some() {
        scim = scim.route_layer(middleware::from_fn_with_state(config, require_credentials));
    }

    scim.route("/", get(health::<U, G>)).with_state(endpoints)
}

/// Bind and serve until Ctrl+C.
pub async fn serve<U, G>(endpoints: Shared<U, G>, addr: SocketAddr) -> std::io::Result<()>
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    let router = build_router(endpoints);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("SCIM connector listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SCIM connector shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down gracefully...");
}

async fn require_credentials(
    State(config): State<Arc<ConnectorConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(settings) = &config.auth {
        if let Err(e) = auth::authenticate(settings, request.headers()) {
            log::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            return error_response(&e, config.production).into_response();
        }
    }
    next.run(request).await
}

// ─── Handlers ────────────────────────────────────────────────────

async fn list_users<U, G>(
    State(endpoints): State<Shared<U, G>>,
    Query(params): Query<ListQuery>,
) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.list_users(&params).await
}

async fn create_user<U, G>(State(endpoints): State<Shared<U, G>>, body: Bytes) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.create_user(&body).await
}

async fn get_user<U, G>(
    State(endpoints): State<Shared<U, G>>,
    Path(id): Path<String>,
) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.get_user(&id).await
}

async fn update_user<U, G>(
    State(endpoints): State<Shared<U, G>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.update_user(&id, &body).await
}

async fn list_groups<U, G>(
    State(endpoints): State<Shared<U, G>>,
    Query(params): Query<ListQuery>,
) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.list_groups(&params).await
}

async fn create_group<U, G>(State(endpoints): State<Shared<U, G>>, body: Bytes) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.create_group(&body).await
}

async fn get_group<U, G>(
    State(endpoints): State<Shared<U, G>>,
    Path(id): Path<String>,
) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.get_group(&id).await
}

async fn update_group<U, G>(
    State(endpoints): State<Shared<U, G>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.update_group(&id, &body).await
}

async fn delete_group<U, G>(
    State(endpoints): State<Shared<U, G>>,
    Path(id): Path<String>,
) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.delete_group(&id).await
}

async fn service_provider_config<U, G>(State(endpoints): State<Shared<U, G>>) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.service_provider_config().await
}

async fn clear_cache<U, G>(State(endpoints): State<Shared<U, G>>) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.clear_cache().await
}

async fn health<U, G>(State(endpoints): State<Shared<U, G>>) -> ScimResponse
where
    U: ResourceStore<Record = ScimUser>,
    G: ResourceStore<Record = ScimGroup>,
{
    endpoints.health().await
}
