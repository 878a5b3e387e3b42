//! HTTP-level tests of the connector routes.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::Router;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use common::{TestConnector, USER_COUNT};
use scim_connector::server::{SCIM_CONTENT_TYPE, build_router};
use scim_connector::{AuthSettings, ConnectorConfig, ProvisioningFeature};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<Value>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_body(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_users_over_http() {
    let connector = TestConnector::new().await;
    let app = build_router(connector.endpoints.clone());

    let response = app
        .clone()
        .oneshot(get("/Users?startIndex=1&count=5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        SCIM_CONTENT_TYPE
    );

    let (status, body) = send(&app, get("/Users?startIndex=6&count=5&totalResults=22")).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["schemas"][0], "urn:ietf:params:scim:api:messages:2.0:ListResponse");
    assert_eq!(body["totalResults"], USER_COUNT);
    assert_eq!(body["itemsPerPage"], 5);
    assert_eq!(body["Resources"][0]["id"], "user-06");
}

#[tokio::test]
async fn test_filter_query_parameter() {
    let connector = TestConnector::new().await;
    let app = build_router(connector.endpoints.clone());

    let (status, body) = send(&app, get("/Users?filter=number%20lt%204")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["totalResults"], 3);

    let (status, body) = send(&app, get("/Users?filter=number%20~%204")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = body.unwrap();
    assert_eq!(body["schemas"][0], "urn:ietf:params:scim:api:messages:2.0:Error");
    assert_eq!(body["status"], "400");

    let (status, _) = send(&app, get("/Users?startIndex=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_crud_over_http() {
    let connector = TestConnector::new().await;
    let app = build_router(connector.endpoints.clone());

    let (status, body) = send(
        &app,
        with_body(
            "POST",
            "/Users",
            json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                "userName": "new.hire@example.com",
                "name": { "givenName": "New", "familyName": "Hire" },
                "password": "correct horse"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = body.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["meta"]["location"], format!("/Users/{id}"));

    let (status, body) = send(&app, get(&format!("/Users/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["Resources"][0]["userName"], "new.hire@example.com");

    let (status, body) = send(
        &app,
        with_body(
            "PUT",
            &format!("/Users/{id}"),
            json!({ "userName": "new.hire@example.com", "active": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["active"], false);

    let (status, body) = send(&app, get("/Users/missing")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["totalResults"], 0);

    let (status, _) = send(
        &app,
        with_body("PUT", "/Users/missing", json!({ "userName": "x@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_group_delete_over_http() {
    let connector = TestConnector::new().await;
    let app = build_router(connector.endpoints.clone());

    let delete = Request::builder()
        .method("DELETE")
        .uri("/Groups/group-03")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, None);
    assert_eq!(connector.groups.stats().await.records, 2);
}

#[tokio::test]
async fn test_service_provider_config_routes() {
    let connector = TestConnector::with_config(ConnectorConfig::default().with_max_page_size(100)).await;
    let app = build_router(connector.endpoints.clone());

    for uri in ["/ServiceProviderConfig", "/ServiceProviderConfigs"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert_eq!(body["filter"]["maxResults"], 100);
        assert_eq!(body["bulk"]["supported"], false);
    }
}

#[tokio::test]
async fn test_disabled_feature_is_not_implemented() {
    let config = ConnectorConfig::default().with_features([ProvisioningFeature::ImportNewUsers]);
    let connector = TestConnector::with_config(config).await;
    let app = build_router(connector.endpoints.clone());

    let (status, body) = send(&app, with_body("POST", "/Users", json!({ "userName": "a@b.c" }))).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body, None);

    let (status, _) = send(&app, get("/Groups")).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    let (status, _) = send(&app, get("/Users")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_clear_cache_and_health() {
    let connector = TestConnector::new().await;
    let app = build_router(connector.endpoints.clone());

    send(&app, get("/Users?startIndex=1&count=1")).await;
    assert!(!connector.cache_files().is_empty());

    let (status, body) = send(&app, get("/ClearCache")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, None);
    assert!(connector.cache_files().is_empty());

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, None);
}

#[tokio::test]
async fn test_header_authentication() {
    let config = ConnectorConfig::default().with_auth(AuthSettings::header("X-Api-Key", "s3cret"));
    let connector = TestConnector::with_config(config).await;
    let app = build_router(connector.endpoints.clone());

    let (status, body) = send(&app, get("/Users")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["status"], "401");

    let request = Request::builder()
        .uri("/Users")
        .header("X-Api-Key", "s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    // Health checks are never authenticated
    let (status, _) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_basic_authentication() {
    let config = ConnectorConfig::default().with_auth(AuthSettings::basic("okta", "secret"));
    let connector = TestConnector::with_config(config).await;
    let app = build_router(connector.endpoints.clone());

    let credentials = |user_pass: &str| {
        Request::builder()
            .uri("/Groups")
            .header(header::AUTHORIZATION, format!("Basic {}", BASE64.encode(user_pass)))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, credentials("okta:secret")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, credentials("okta:wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
