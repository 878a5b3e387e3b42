//! Credential-header authentication.
//!
//! Two schemes are supported. With `header` the configured header must carry the
//! configured value verbatim. With `basic` the `Authorization` header must hold
//! HTTP Basic credentials, with the configured header name as the user name and
//! the configured header value as the password.

use crate::config::ConfigError;
use crate::error::{ScimError, ScimResult};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Header,
    Basic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSettings {
    pub scheme: AuthScheme,
    #[serde(default = "default_header_name")]
    pub header_name: String,
    pub header_value: String,
}

fn default_header_name() -> String {
    "Authorization".to_string()
}

impl AuthSettings {
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: AuthScheme::Header,
            header_name: name.into(),
            header_value: value.into(),
        }
    }

    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            scheme: AuthScheme::Basic,
            header_name: user.into(),
            header_value: password.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.header_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "auth.header_name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.header_value.is_empty() {
            return Err(ConfigError::Invalid {
                field: "auth.header_value".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.scheme == AuthScheme::Basic && self.header_name.contains(':') {
            return Err(ConfigError::Invalid {
                field: "auth.header_name".to_string(),
                message: "basic user name must not contain ':'".to_string(),
            });
        }
        Ok(())
    }
}

/// Check request headers against the configured credentials.
pub fn authenticate(settings: &AuthSettings, headers: &HeaderMap) -> ScimResult<()> {
    let header_name = match settings.scheme {
        AuthScheme::Header => settings.header_name.as_str(),
        AuthScheme::Basic => AUTHORIZATION.as_str(),
    };

    let provided = headers
        .get(header_name)
        .ok_or_else(|| ScimError::unauthorized(format!("missing '{}' header", header_name)))?
        .to_str()
        .map_err(|_| ScimError::unauthorized("credential header is not valid text"))?;

    let accepted = match settings.scheme {
        AuthScheme::Header => provided == settings.header_value,
        AuthScheme::Basic => decode_basic(provided).is_some_and(|(user, password)| {
            user == settings.header_name && password == settings.header_value
        }),
    };

    if accepted {
        Ok(())
    } else {
        Err(ScimError::unauthorized("invalid credentials"))
    }
}

fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(BASE64.decode(encoded.trim()).ok()?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_header_scheme() {
        let settings = AuthSettings::header("X-Api-Key", "s3cret");

        assert!(authenticate(&settings, &headers("x-api-key", "s3cret")).is_ok());
        let error = authenticate(&settings, &headers("x-api-key", "wrong")).unwrap_err();
        assert_eq!(error.status_code(), 401);
        assert!(authenticate(&settings, &HeaderMap::new()).is_err());
    }

    #[test]
    fn test_basic_scheme() {
        let settings = AuthSettings::basic("okta", "secret");
        let encoded = BASE64.encode("okta:secret");

        assert!(authenticate(&settings, &headers("authorization", &format!("Basic {encoded}"))).is_ok());
        assert!(authenticate(&settings, &headers("authorization", "Basic !!!")).is_err());
        let wrong = BASE64.encode("okta:guess");
        assert!(authenticate(&settings, &headers("authorization", &format!("Basic {wrong}"))).is_err());
        assert!(authenticate(&settings, &headers("authorization", &format!("Bearer {encoded}"))).is_err());
    }

    #[test]
    fn test_validate_basic_credentials() {
        assert!(AuthSettings::basic("ok:ta", "secret").validate().is_err());
        assert!(AuthSettings::basic("okta", "secret").validate().is_ok());
        assert!(AuthSettings::header("", "x").validate().is_err());
        assert!(AuthSettings::header("X-Api-Key", "x").validate().is_ok());
    }
}
