use crate::pagination::Page;
use serde::{Deserialize, Serialize};

/// Schema URN of the SCIM list envelope.
pub const LIST_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// SCIM `ListResponse` envelope.
///
/// `itemsPerPage` carries the page window's count and is omitted when that
/// count is 0 and on lookups by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<R> {
    pub schemas: Vec<String>,
    pub total_results: usize,
    pub start_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<usize>,
    #[serde(rename = "Resources")]
    pub resources: Vec<R>,
}

impl<R> ListResponse<R> {
    pub fn new(resources: Vec<R>, start_index: usize, total_results: usize) -> Self {
        Self {
            schemas: vec![LIST_RESPONSE_SCHEMA.to_string()],
            total_results,
            start_index,
            items_per_page: None,
            resources,
        }
    }

    pub fn with_items_per_page(mut self, count: usize) -> Self {
        self.items_per_page = (count > 0).then_some(count);
        self
    }

    /// Envelope for a lookup by id, holding zero or one resource.
    pub fn single(resource: Option<R>) -> Self {
        let resources: Vec<R> = resource.into_iter().collect();
        let total = resources.len();
        Self::new(resources, 1, total)
    }
}

impl<R> From<Page<R>> for ListResponse<R> {
    fn from(page: Page<R>) -> Self {
        Self::new(
            page.resources,
            page.window.start_index,
            page.window.total_results,
        )
        .with_items_per_page(page.window.count)
    }
}
