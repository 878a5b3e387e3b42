//! The SCIM User resource.

use super::{MemberRef, Meta, Record};
use crate::filter::{FilterValue, Filterable, extension_values};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Core schema URN for users.
pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// Extension that carries connector-specific custom attributes.
pub const CUSTOM_USER_SCHEMA: &str = "urn:okta:scim_connector:1.0:user:custom";

/// Name components of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honorific_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honorific_suffix: Option<String>,
}

/// One entry of a multi-valued attribute such as `emails` or `phoneNumbers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiValuedAttribute {
    pub value: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl MultiValuedAttribute {
    pub fn new(value: impl Into<String>, kind: impl Into<String>, primary: bool) -> Self {
        Self {
            value: value.into(),
            kind: Some(kind.into()),
            primary: Some(primary),
            display: None,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.primary.unwrap_or(false)
    }
}

fn default_user_schemas() -> Vec<String> {
    vec![USER_SCHEMA.to_string()]
}

fn default_active() -> bool {
    true
}

/// A SCIM user.
///
/// `password` is accepted on input and never serialized, so it does not reach
/// responses or the import cache. Unrecognised top-level attributes, including
/// schema extensions, are preserved in `extensions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    #[serde(default = "default_user_schemas")]
    pub schemas: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    pub user_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<MultiValuedAttribute>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phone_numbers: Vec<MultiValuedAttribute>,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<MemberRef>,

    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,

    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ScimUser {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            schemas: default_user_schemas(),
            id: None,
            external_id: None,
            user_name: user_name.into(),
            name: None,
            display_name: None,
            emails: Vec::new(),
            phone_numbers: Vec::new(),
            active: true,
            password: None,
            groups: Vec::new(),
            meta: Meta::default(),
            extensions: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        let given_name = given_name.into();
        let family_name = family_name.into();
        self.display_name = Some(format!("{given_name} {family_name}"));
        self.name = Some(Name {
            given_name: Some(given_name),
            family_name: Some(family_name),
            ..Name::default()
        });
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let primary = self.emails.is_empty();
        let kind = if primary { "work" } else { "other" };
        self.emails.push(MultiValuedAttribute::new(email, kind, primary));
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.meta.created.get_or_insert(last_modified);
        self.meta.last_modified = Some(last_modified);
        self
    }

    /// Set an attribute in the connector's custom extension.
    pub fn with_custom_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        if !self.schemas.iter().any(|s| s == CUSTOM_USER_SCHEMA) {
            self.schemas.push(CUSTOM_USER_SCHEMA.to_string());
        }
        let extension = self
            .extensions
            .entry(CUSTOM_USER_SCHEMA)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(attributes) = extension {
            attributes.insert(key.into(), value);
        }
        self
    }

    /// Read an attribute from the connector's custom extension.
    pub fn custom_attribute(&self, key: &str) -> Option<&Value> {
        self.extensions.get(CUSTOM_USER_SCHEMA)?.get(key)
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|email| email.is_primary())
            .or_else(|| self.emails.first())
            .map(|email| email.value.as_str())
    }
}

fn strings<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<FilterValue> {
    values
        .into_iter()
        .map(|v| FilterValue::String(v.to_string()))
        .collect()
}

impl Filterable for ScimUser {
    fn attribute_values(&self, attribute: &str) -> Vec<FilterValue> {
        let name = self.name.as_ref();
        match attribute.to_ascii_lowercase().as_str() {
            "id" => strings(self.id.as_deref()),
            "username" => strings([self.user_name.as_str()]),
            "externalid" => strings(self.external_id.as_deref()),
            "displayname" => strings(self.display_name.as_deref()),
            "active" => vec![FilterValue::Boolean(self.active)],
            "name.givenname" => strings(name.and_then(|n| n.given_name.as_deref())),
            "name.familyname" => strings(name.and_then(|n| n.family_name.as_deref())),
            "name.middlename" => strings(name.and_then(|n| n.middle_name.as_deref())),
            "name.formatted" => strings(name.and_then(|n| n.formatted.as_deref())),
            "emails" | "emails.value" => strings(self.emails.iter().map(|e| e.value.as_str())),
            "phonenumbers" | "phonenumbers.value" => {
                strings(self.phone_numbers.iter().map(|p| p.value.as_str()))
            }
            "groups" | "groups.value" => strings(self.groups.iter().map(|g| g.value.as_str())),
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

impl Record for ScimUser {
    const RESOURCE_TYPE: &'static str = "User";
    const ENDPOINT: &'static str = "/Users";
    const FULL_IMPORT_CACHE: &'static str = "full_import_cache.json";
    const INCREMENTAL_IMPORT_CACHE: &'static str = "incremental_import_cache.json";

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
