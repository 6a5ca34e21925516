//! Request and response bodies of the remote search API
//!
//! ```text
//! GET {endpoint}?query=<text>&page=<n>&order=<criteria>&direction=asc|desc
//!
//! 200 { "data": [Card...], "total_cards": 400, "has_more": true }
//! 4xx { "details": "..." }
//! ```

use cardscroll_core::{Card, RemotePage, Result, SearchQuery};
use serde::{Deserialize, Serialize};

/// Query parameters of one page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiRequest {
    /// Encoded text + filters; never empty
    pub query: String,
    /// 1-based page number
    pub page: u32,
    /// Sort criteria wire name
    pub order: &'static str,
    /// `asc` or `desc`
    pub direction: &'static str,
}

impl ApiRequest {
    /// Build the request for one page of a query
    ///
    /// Fails with `InvalidQuery` when the query has neither text nor filters,
    /// before anything goes on the wire.
    pub fn from_query(query: &SearchQuery, page: u32) -> Result<Self> {
        Ok(ApiRequest {
            query: query.remote_query_text()?,
            page,
            order: query.sort.criteria.as_order(),
            direction: query.sort.direction.as_str(),
        })
    }
}

/// Successful response body
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// Cards on this page
    #[serde(default)]
    pub data: Vec<Card>,
    /// Total matches across all pages
    pub total_cards: usize,
    /// Whether another page exists
    #[serde(default)]
    pub has_more: bool,
}

impl ApiResponse {
    /// Attach the page number the response was requested for
    pub fn into_page(self, page_number: u32) -> RemotePage {
        RemotePage::new(self.data, self.total_cards, self.has_more, page_number)
    }
}

/// Error response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Human readable reason
    #[serde(default)]
    pub details: Option<String>,
}

impl ApiErrorBody {
    /// Extract `details` from a raw body; `None` if the body is not JSON
    pub fn details_from(body: &str) -> Option<String> {
        serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardscroll_core::{Filters, SortCriteria, SortDirection, SortSpec};

    #[test]
    fn test_request_carries_sort_wire_names() {
        let query = SearchQuery::new("goblin", Filters::new())
            .with_sort(SortSpec::new(SortCriteria::ManaValue, SortDirection::Desc));
        let req = ApiRequest::from_query(&query, 2).unwrap();
        assert_eq!(req.query, "goblin");
        assert_eq!(req.page, 2);
        assert_eq!(req.order, "cmc");
        assert_eq!(req.direction, "desc");
    }

    #[test]
    fn test_request_for_empty_query_fails() {
        let query = SearchQuery::new("", Filters::new());
        assert!(ApiRequest::from_query(&query, 1).is_err());
    }

    #[test]
    fn test_response_decodes_into_page() {
        let body = r#"{"data":[{"id":"1","name":"Opt"}],"total_cards":400,"has_more":true}"#;
        let response: ApiResponse = serde_json::from_str(body).unwrap();
        let page = response.into_page(3);
        assert_eq!(page.page_number, 3);
        assert_eq!(page.total_count, 400);
        assert!(page.has_more);
        assert_eq!(page.cards[0].name, "Opt");
    }

    #[test]
    fn test_error_details_extraction() {
        assert_eq!(
            ApiErrorBody::details_from(r#"{"details":"bad syntax"}"#),
            Some("bad syntax".to_string())
        );
        assert_eq!(ApiErrorBody::details_from("<html>"), None);
    }
}
