use super::StoreError;
use crate::resource::{ScimGroup, ScimUser};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initial contents for the in-memory stores.
///
/// ```json
/// {"users": [{"userName": "ada@example.com", ...}], "groups": []}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<ScimUser>,
    #[serde(default)]
    pub groups: Vec<ScimGroup>,
}

impl SeedData {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::unavailable(format!("cannot read seed file {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
