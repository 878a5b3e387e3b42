//! SCIM error bodies.

use super::ScimResponse;
use crate::error::ScimError;
use serde_json::{Value, json};
use std::backtrace::Backtrace;

pub const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Convert an error into a SCIM error response.
///
/// Outside production the body carries a `stack_trace` captured at the point
/// the response is built.
pub fn error_response(error: &ScimError, production: bool) -> ScimResponse {
    let status = error.status_code();
    let mut body = json!({
        "schemas": [ERROR_SCHEMA],
        "detail": error.to_string(),
        "status": status.to_string(),
    });

    if !production {
        body["stack_trace"] = Value::String(Backtrace::force_capture().to_string());
    }

    ScimResponse {
        status,
        body: Some(body),
    }
}
