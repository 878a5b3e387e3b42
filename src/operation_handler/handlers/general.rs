//! Service provider discovery.

use crate::operation_handler::ScimResponse;
use crate::auth::AuthScheme;
use crate::config::{ConnectorConfig, ProvisioningFeature};
use crate::error::ScimResult;
use serde_json::{Value, json};

pub const CORE_SCHEMA: &str = "urn:scim:schemas:core:1.0";
pub const PROVIDER_CONFIG_SCHEMA: &str = "urn:okta:schemas:scim:providerconfig:1.0";

/// Describe what this connector supports, including its enabled provisioning features.
pub fn service_provider_config(config: &ConnectorConfig) -> Value {
    let capabilities: Vec<&str> = ProvisioningFeature::ALL
        .iter()
        .filter(|feature| config.supports(**feature))
        .map(ProvisioningFeature::as_str)
        .collect();

    let authentication_schemes = match config.auth.as_ref().map(|auth| auth.scheme) {
        Some(AuthScheme::Basic) => vec![json!({
            "type": "httpbasic",
            "name": "HTTP Basic",
            "description": "Authentication scheme using the HTTP Basic standard",
        })],
        Some(AuthScheme::Header) => vec![json!({
            "type": "header",
            "name": "Shared secret header",
            "description": "Authentication with a preconfigured header value",
        })],
        None => Vec::new(),
    };

    json!({
        "schemas": [CORE_SCHEMA, PROVIDER_CONFIG_SCHEMA],
        "patch": { "supported": false },
        "bulk": { "supported": false },
        "sort": { "supported": false },
        "etag": { "supported": false },
        "filter": { "supported": true, "maxResults": config.max_page_size },
        "changePassword": {
            "supported": config.supports(ProvisioningFeature::PushPasswordUpdates),
        },
        "authenticationSchemes": authentication_schemes,
        PROVIDER_CONFIG_SCHEMA: { "userManagementCapabilities": capabilities },
    })
}

pub async fn handle_service_provider_config(config: &ConnectorConfig) -> ScimResult<ScimResponse> {
    Ok(ScimResponse::ok(service_provider_config(config)))
}
