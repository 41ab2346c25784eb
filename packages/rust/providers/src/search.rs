//! Structured web-research client (Linkup).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use ideascope_shared::{IdeaScopeError, Result};

use crate::{SearchProvider, SearchRequest, build_client, endpoint, error_for_status, network_error};

const PROVIDER: &str = "linkup";

/// Start of the research window, as the service originally pinned it.
const RESEARCH_FROM: &str = "2016-01-01T00:00:00-06:00";
/// End of the research window.
const RESEARCH_TO: &str = "2025-06-21T23:59:59-05:00";

// ---------------------------------------------------------------------------
// DateWindow
// ---------------------------------------------------------------------------

/// Inclusive publication-date filter, sent as UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// Build a window from two RFC 3339 instants, converted to UTC days.
    pub fn from_rfc3339(from: &str, to: &str) -> Result<Self> {
        let window = Self {
            from: utc_day(from)?,
            to: utc_day(to)?,
        };
        if window.from > window.to {
            return Err(IdeaScopeError::validation(format!(
                "date window starts after it ends ({from} > {to})"
            )));
        }
        Ok(window)
    }

    /// The fixed historical window every market-research call uses.
    pub fn research() -> Result<Self> {
        Self::from_rfc3339(RESEARCH_FROM, RESEARCH_TO)
    }
}

fn utc_day(instant: &str) -> Result<NaiveDate> {
    DateTime::parse_from_rfc3339(instant)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|e| IdeaScopeError::config(format!("invalid date '{instant}': {e}")))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for Linkup's `/search` endpoint in structured-output mode.
pub struct LinkupClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl LinkupClient {
    /// Create a client rooted at `base_url` (e.g. `https://api.linkup.so/v1`).
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: endpoint(base_url, "search")?,
            api_key: api_key.into(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    q: &'a str,
    depth: &'static str,
    output_type: &'static str,
    /// Linkup takes the schema as a JSON-encoded string.
    structured_output_schema: String,
    include_images: bool,
    from_date: String,
    to_date: String,
}

#[async_trait]
impl SearchProvider for LinkupClient {
    #[instrument(skip_all, fields(depth = %request.depth))]
    async fn structured_search(&self, request: &SearchRequest<'_>) -> Result<serde_json::Value> {
        let schema = serde_json::to_string(request.schema)
            .map_err(|e| IdeaScopeError::Schema(format!("failed to encode schema: {e}")))?;

        let body = SearchBody {
            q: request.query,
            depth: request.depth.as_str(),
            output_type: "structured",
            structured_output_schema: schema,
            include_images: request.include_images,
            from_date: request.window.from.format("%Y-%m-%d").to_string(),
            to_date: request.window.to.format("%Y-%m-%d").to_string(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let response = error_for_status(PROVIDER, response).await?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IdeaScopeError::parse(format!("{PROVIDER}: invalid search body: {e}")))?;

        if !value.is_object() {
            return Err(IdeaScopeError::parse(format!(
                "{PROVIDER}: structured answer is not a JSON object"
            )));
        }

        debug!(keys = value.as_object().map_or(0, |o| o.len()), "structured search received");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideascope_shared::Mode;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn research_window_in_utc_days() {
        let window = DateWindow::research().unwrap();
        assert_eq!(window.from, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        // 23:59:59 at UTC-5 is already the next day in UTC.
        assert_eq!(window.to, NaiveDate::from_ymd_opt(2025, 6, 22).unwrap());
    }

    #[test]
    fn inverted_window_rejected() {
        let err = DateWindow::from_rfc3339("2025-01-01T00:00:00Z", "2024-01-01T00:00:00Z");
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn sends_structured_request_and_returns_object() {
        let server = MockServer::start().await;
        let schema = serde_json::json!({ "type": "object", "properties": { "title": { "type": "string" } } });
        let window = DateWindow::research().unwrap();

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer lk-key"))
            .and(body_partial_json(serde_json::json!({
                "q": "sneaker resale market",
                "depth": "deep",
                "outputType": "structured",
                "includeImages": false,
                "fromDate": "2016-01-01",
                "toDate": "2025-06-22",
                "structuredOutputSchema": schema.to_string(),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "title": "Sneaker Swap" })))
            .mount(&server)
            .await;

        let client = LinkupClient::new(&server.uri(), "lk-key", 5).unwrap();
        let request = SearchRequest {
            query: "sneaker resale market",
            depth: Mode::Deep,
            schema: &schema,
            include_images: false,
            window: &window,
        };
        let value = client.structured_search(&request).await.unwrap();
        assert_eq!(value["title"], "Sneaker Swap");
    }

    #[tokio::test]
    async fn unauthorized_is_provider_error() {
        let server = MockServer::start().await;
        let schema = serde_json::json!({ "type": "object" });
        let window = DateWindow::research().unwrap();

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "statusCode": 401,
                "error": { "code": "UNAUTHORIZED", "message": "Invalid API key" }
            })))
            .mount(&server)
            .await;

        let client = LinkupClient::new(&server.uri(), "bad", 5).unwrap();
        let request = SearchRequest {
            query: "q",
            depth: Mode::Standard,
            schema: &schema,
            include_images: false,
            window: &window,
        };
        let err = client.structured_search(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "linkup error: HTTP 401: Invalid API key");
    }

    #[tokio::test]
    async fn non_object_answer_is_parse_error() {
        let server = MockServer::start().await;
        let schema = serde_json::json!({ "type": "object" });
        let window = DateWindow::research().unwrap();

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["not", "an", "object"])))
            .mount(&server)
            .await;

        let client = LinkupClient::new(&server.uri(), "lk-key", 5).unwrap();
        let request = SearchRequest {
            query: "q",
            depth: Mode::Standard,
            schema: &schema,
            include_images: false,
            window: &window,
        };
        let err = client.structured_search(&request).await.unwrap_err();
        assert!(matches!(err, IdeaScopeError::Parse { .. }));
    }
}
