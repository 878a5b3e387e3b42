//! List endpoint parameters and handler.

use crate::operation_handler::ScimResponse;
use crate::error::{ScimError, ScimResult};
use crate::filter::Filter;
use crate::pagination::{PageRequest, PaginationController};
use crate::resource::ListResponse;
use crate::storage::ResourceStore;
use serde::Deserialize;

/// Raw list query parameters as sent by the client.
///
/// Values are kept as text so that malformed numbers are reported as SCIM
/// errors instead of being rejected by the HTTP layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "startIndex")]
    pub start_index: Option<String>,
    pub count: Option<String>,
    #[serde(rename = "totalResults")]
    pub total_results: Option<String>,
    pub filter: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = Some(start_index.to_string());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count.to_string());
        self
    }

    pub fn with_total_results(mut self, total_results: usize) -> Self {
        self.total_results = Some(total_results.to_string());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Validate the parameters.
    ///
    /// A `startIndex` below 1 is read as 1 and a negative `count` as 0. Values
    /// that are not integers, a negative `totalResults`, or an unparseable
    /// filter are rejected.
    pub fn to_page_request(&self) -> ScimResult<PageRequest> {
        let mut request = PageRequest::new();

        if let Some(start_index) = parse_integer("startIndex", self.start_index.as_deref())? {
            request = request.with_start_index(start_index.max(1) as usize);
        }
        if let Some(count) = parse_integer("count", self.count.as_deref())? {
            request = request.with_count(count.max(0) as usize);
        }
        if let Some(total) = parse_integer("totalResults", self.total_results.as_deref())? {
            if total < 0 {
                return Err(ScimError::invalid_parameter("totalResults", total.to_string()));
            }
            request = request.with_total_results(total as usize);
        }
        if let Some(filter) = self.filter.as_deref().filter(|f| !f.trim().is_empty()) {
            request = request.with_filter(Filter::parse(filter)?);
        }

        Ok(request)
    }
}

fn parse_integer(parameter: &str, value: Option<&str>) -> ScimResult<Option<i64>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ScimError::invalid_parameter(parameter, raw)),
    }
}

/// Serve one page of a list import as a SCIM `ListResponse`.
pub async fn handle_list<S: ResourceStore>(
    controller: &PaginationController<S>,
    params: &ListQuery,
) -> ScimResult<ScimResponse> {
    let request = params.to_page_request()?;
    let page = controller.paginate(&request).await?;
    let response = ListResponse::from(page);
    Ok(ScimResponse::ok(serde_json::to_value(&response)?))
}
