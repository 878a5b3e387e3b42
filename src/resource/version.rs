//! Content-based resource versions.
//!
//! Versions are derived from the serialized resource itself, so any store can
//! produce them without keeping counters: SHA-256 over the JSON form, the first
//! eight bytes base64-encoded, presented as a weak ETag (`W/"..."`).

use super::Record;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque version identifier of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceVersion {
    opaque: String,
}

impl ResourceVersion {
    /// Hash resource content into a version.
    pub fn from_content(content: &[u8]) -> Self {
        let hash = Sha256::digest(content);
        Self {
            opaque: BASE64.encode(&hash[..8]),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.opaque
    }

    /// HTTP weak ETag form.
    pub fn to_etag(&self) -> String {
        format!("W/\"{}\"", self.opaque)
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.opaque)
    }
}

/// Fill in server-managed metadata after a write.
///
/// Sets the resource type and location, keeps an existing creation time,
/// moves `lastModified` to `now`, and recomputes `version` from the resulting
/// content. The version field itself is excluded from the hash.
pub fn stamp<R: Record>(record: &mut R, now: DateTime<Utc>) -> Result<ResourceVersion, serde_json::Error> {
    let location = record.id().map(|id| format!("{}/{}", R::ENDPOINT, id));

    let meta = record.meta_mut();
    meta.resource_type = Some(R::RESOURCE_TYPE.to_string());
    meta.created.get_or_insert(now);
    meta.last_modified = Some(now);
    meta.location = location;
    meta.version = None;

    let version = ResourceVersion::from_content(&serde_json::to_vec(record)?);
    record.meta_mut().version = Some(version.to_etag());
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ScimUser;
    use chrono::TimeZone;

    #[test]
    fn test_version_is_deterministic() {
        let a = ResourceVersion::from_content(br#"{"id":"123","userName":"john.doe"}"#);
        let b = ResourceVersion::from_content(br#"{"id":"123","userName":"john.doe"}"#);
        let c = ResourceVersion::from_content(br#"{"id":"123","userName":"jane.doe"}"#);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.to_etag().starts_with("W/\""));
        assert!(a.to_etag().ends_with('"'));
    }

    #[test]
    fn test_stamp_sets_server_metadata() {
        let created = Utc.with_ymd_and_hms(2021, 5, 1, 8, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2021, 6, 1, 8, 0, 0).unwrap();

        let mut user = ScimUser::new("ada@example.com").with_id("u-1");
        stamp(&mut user, created).unwrap();
        let first_version = user.meta.version.clone();

        assert_eq!(user.meta.resource_type.as_deref(), Some("User"));
        assert_eq!(user.meta.location.as_deref(), Some("/Users/u-1"));
        assert_eq!(user.meta.created, Some(created));

        user.display_name = Some("Ada Lovelace".to_string());
        stamp(&mut user, updated).unwrap();

        assert_eq!(user.meta.created, Some(created));
        assert_eq!(user.meta.last_modified, Some(updated));
        assert_ne!(user.meta.version, first_version);
    }
}
