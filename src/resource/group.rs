//! The SCIM Group resource.

use super::{Meta, Record};
use crate::filter::{FilterValue, Filterable, extension_values};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Core schema URN for groups.
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// Reference from a group to a member, or from a user to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRef {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl MemberRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display: None,
            reference: None,
        }
    }
}

fn default_group_schemas() -> Vec<String> {
    vec![GROUP_SCHEMA.to_string()]
}

/// A SCIM group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    #[serde(default = "default_group_schemas")]
    pub schemas: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    pub display_name: String,

    #[serde(default)]
    pub members: Vec<MemberRef>,

    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,

    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ScimGroup {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            schemas: default_group_schemas(),
            id: None,
            external_id: None,
            display_name: display_name.into(),
            members: Vec::new(),
            meta: Meta::default(),
            extensions: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_member(mut self, user_id: impl Into<String>) -> Self {
        self.members.push(MemberRef::new(user_id));
        self
    }
}

impl Filterable for ScimGroup {
    fn attribute_values(&self, attribute: &str) -> Vec<FilterValue> {
        let text = |s: &str| FilterValue::String(s.to_string());
        match attribute.to_ascii_lowercase().as_str() {
            "id" => self.id.as_deref().map(text).into_iter().collect(),
            "externalid" => self.external_id.as_deref().map(text).into_iter().collect(),
            "displayname" => vec![text(&self.display_name)],
            "members" | "members.value" => self.members.iter().map(|m| text(&m.value)).collect(),
            "meta.lastmodified" => self
                .meta
                .last_modified
                .map(FilterValue::DateTime)
                .into_iter()
                .collect(),
            "meta.created" => self
                .meta
                .created
                .map(FilterValue::DateTime)
                .into_iter()
                .collect(),
            _ => extension_values(&self.extensions, attribute),
        }
    }
}

impl Record for ScimGroup {
    const RESOURCE_TYPE: &'static str = "Group";
    const ENDPOINT: &'static str = "/Groups";
    const FULL_IMPORT_CACHE: &'static str = "full_import_groups_cache.json";
    const INCREMENTAL_IMPORT_CACHE: &'static str = "incremental_import_groups_cache.json";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }
}
