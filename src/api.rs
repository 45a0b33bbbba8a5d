//! Remote document-repository adaptor.
//!
//! One [`ApiAdaptor`] per configured target. Every operation is a single
//! blocking round-trip (no retries — failures are the caller's policy) and
//! every response funnels through one normalization step so downstream code
//! only ever sees a [`ResponseBody`]: parsed JSON, reduced plain text, or
//! nothing. Content-type branching lives here and nowhere else.

use std::time::Duration;

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::multipart;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::query::FindListQuery;

/// Request timeout for a single remote call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Already-resolved credentials handed to the adaptor at construction.
/// Acquisition (flags, config default, prompting) is a boundary concern
/// and happens before any adaptor exists.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Errors raised by adaptor construction or a remote operation.
#[derive(Debug)]
pub enum ApiError {
    /// The configured base URL failed validation. Raised before any
    /// network activity.
    InvalidBaseUrl(String),
    /// HTTP 400 — the request was malformed; carries the normalized
    /// response body as server-side detail.
    BadRequest(String),
    /// HTTP 401 — authentication was rejected.
    Unauthorized(String),
    /// Any other non-2xx status.
    Status { code: u16, detail: String },
    /// The request never produced a response (connect, timeout, ...).
    Transport(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidBaseUrl(msg) => write!(f, "invalid base URL: {}", msg),
            ApiError::BadRequest(detail) => {
                write!(f, "bad request: HTTP 400: server error message: {}", detail)
            }
            ApiError::Unauthorized(detail) => {
                write!(f, "invalid auth: HTTP 401: error connecting to server: {}", detail)
            }
            ApiError::Status { code, detail } => {
                write!(f, "response error: status code {}: {}", code, detail)
            }
            ApiError::Transport(msg) => write!(f, "request failed: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

/// A remote response reduced to the only three shapes downstream code
/// handles.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Declared structured content, parsed.
    Json(Value),
    /// Declared text/markup content; HTML is reduced to its visible body
    /// text with one line per text run.
    Text(String),
    /// Empty body (or structured content that failed to parse — logged,
    /// never raised).
    Empty,
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Flat rendering used when a body is carried as error detail.
    fn detail(&self) -> String {
        match self {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
            ResponseBody::Empty => String::new(),
        }
    }
}

/// One part of a multipart file submission: the field name is the remote
/// document identifier; metadata parts (like `client_data`) carry no
/// filename.
#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub body: String,
}

/// Authenticated blocking HTTP adaptor for one remote endpoint.
#[derive(Debug)]
pub struct ApiAdaptor {
    base_url: Url,
    webservice_id: String,
    credentials: Credentials,
    client: reqwest::blocking::Client,
}

impl ApiAdaptor {
    /// Validate the base URL and build the adaptor.
    ///
    /// The URL must use `https`, carry a non-empty host, and its first path
    /// segment must contain `fmax` (the application path marker). The stored
    /// form always ends in `/` so endpoint joins resolve under it.
    pub fn new(
        url: &str,
        webservice_id: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, ApiError> {
        let base_url = validate_base_url(url)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        info!(url, "initialized API adaptor");
        Ok(Self {
            base_url,
            webservice_id: webservice_id.into(),
            credentials,
            client,
        })
    }

    /// Build one adaptor per requested target from the configuration.
    /// Any configuration problem is fatal before network activity starts.
    pub fn connect_all(
        config: &Config,
        credentials: &Credentials,
        targets: &[String],
    ) -> anyhow::Result<Vec<(String, ApiAdaptor)>> {
        targets
            .iter()
            .map(|name| {
                let target = config.target(name)?;
                let api = ApiAdaptor::new(&target.url, &target.webservice_id, credentials.clone())
                    .with_context(|| format!("invalid configuration for target {}", name))?;
                Ok((name.clone(), api))
            })
            .collect()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Post a multipart payload to the fixed action endpoint, with the route
    /// and service identifier as query parameters.
    pub fn submit_files(&self, route: &str, parts: Vec<FormPart>) -> Result<ResponseBody, ApiError> {
        let endpoint = self.endpoint("actioncode")?;
        debug!(%endpoint, route, "submitting files");

        let mut form = multipart::Form::new();
        for part in parts {
            let mut piece = multipart::Part::text(part.body)
                .mime_str(&part.content_type)
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            if let Some(file_name) = part.file_name {
                piece = piece.file_name(file_name);
            }
            form = form.part(part.name, piece);
        }

        let response = self
            .client
            .post(endpoint)
            .query(&[("tranxNum", self.webservice_id.as_str()), ("route", route)])
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .multipart(form)
            .send()?;

        Self::handle(response)
    }

    /// Issue a find-list query against `PUT /crud/dto/list/{entity}`.
    ///
    /// Returns at most one batch of results per call; page manually by
    /// advancing the query's start offset. When present, the result body
    /// carries a `results` sequence.
    pub fn find_list(&self, entity: &str, query: &FindListQuery) -> Result<ResponseBody, ApiError> {
        let endpoint = self.endpoint(&format!("crud/dto/list/{}", entity))?;
        debug!(%endpoint, entity, "find-list query");

        let response = self
            .client
            .put(endpoint)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&query.body())
            .send()?;

        Self::handle(response)
    }

    /// Fetch a record hierarchy via `GET /crud/dto/{entity}` keyed by the
    /// given attributes, optionally cascading into detail records.
    pub fn find_hierarchy(
        &self,
        entity: &str,
        keys: &[(String, String)],
        cascade: bool,
    ) -> Result<ResponseBody, ApiError> {
        let endpoint = self.endpoint(&format!("crud/dto/{}", entity))?;
        debug!(%endpoint, entity, cascade, "hierarchy fetch");

        let mut request = self
            .client
            .get(endpoint)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password));
        if cascade {
            request = request.query(&[("details", "true")]);
        }
        let response = request.query(keys).send()?;

        Self::handle(response)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))
    }

    fn handle(response: reqwest::blocking::Response) -> Result<ResponseBody, ApiError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let text = response.text()?;

        normalize_response(status, &content_type, &text)
    }
}

/// Classify one HTTP exchange into the normalized success/error contract.
///
/// 2xx returns the normalized body; 400 and 401 become their dedicated error
/// classes carrying the normalized body as detail; everything else is a
/// generic remote error.
pub fn normalize_response(
    status: u16,
    content_type: &str,
    text: &str,
) -> Result<ResponseBody, ApiError> {
    let body = parse_contents(content_type, text);

    match status {
        200..=299 => Ok(body),
        400 => Err(ApiError::BadRequest(body.detail())),
        401 => Err(ApiError::Unauthorized(body.detail())),
        code => Err(ApiError::Status {
            code,
            detail: body.detail(),
        }),
    }
}

/// Reduce a raw body to a [`ResponseBody`] based on the declared content
/// type. A JSON body that fails to parse is logged and becomes `Empty`.
fn parse_contents(content_type: &str, text: &str) -> ResponseBody {
    if text.is_empty() {
        return ResponseBody::Empty;
    }

    if content_type.contains("text/html") || content_type.contains("application/xhtml+xml") {
        let reduced = html_body_text(text).unwrap_or_else(|| text.to_string());
        return ResponseBody::Text(reduced);
    }

    if content_type.contains("application/json") {
        return match serde_json::from_str(text) {
            Ok(value) => ResponseBody::Json(value),
            Err(e) => {
                error!(content_type, %e, "failed to parse JSON response body");
                ResponseBody::Empty
            }
        };
    }

    ResponseBody::Text(text.to_string())
}

/// Extract the visible text of an HTML `<body>`, one line per text run.
///
/// Returns `None` when no body element is found (callers fall back to the
/// raw text). Malformed markup past the last readable event ends extraction
/// rather than failing it.
fn html_body_text(html: &str) -> Option<String> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;

    let mut in_body = false;
    let mut seen_body = false;
    let mut lines: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.name().as_ref().eq_ignore_ascii_case(b"body") =>
            {
                in_body = true;
                seen_body = true;
            }
            Ok(Event::End(e)) if e.name().as_ref().eq_ignore_ascii_case(b"body") => {
                in_body = false;
            }
            Ok(Event::Text(t)) if in_body => {
                let text = t
                    .unescape()
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()).into_owned());
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    if seen_body {
        Some(lines.join("\n"))
    } else {
        None
    }
}

/// Parse and validate a base URL, normalizing it to end with `/`.
fn validate_base_url(url: &str) -> Result<Url, ApiError> {
    let parsed = Url::parse(url).map_err(|e| ApiError::InvalidBaseUrl(format!("{}; {}", e, url)))?;

    if parsed.scheme() != "https" {
        return Err(ApiError::InvalidBaseUrl(format!(
            "URL scheme is not `https`; {}",
            url
        )));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => {
            return Err(ApiError::InvalidBaseUrl(format!(
                "URL domain is invalid; {}",
                url
            )))
        }
    }

    let first_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next())
        .unwrap_or("");
    if !first_segment.contains("fmax") {
        return Err(ApiError::InvalidBaseUrl(format!(
            "URL path is empty or does not contain `fmax`: {}; {}",
            parsed.path(),
            url
        )));
    }

    // Re-append the trailing slash so Url::join resolves endpoints under the
    // application path instead of replacing its last segment.
    let normalized = format!("{}/", url.trim_end_matches('/'));
    Url::parse(&normalized).map_err(|e| ApiError::InvalidBaseUrl(format!("{}; {}", e, url)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn creds() -> Credentials {
        Credentials {
            username: "user".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn http_scheme_is_rejected() {
        let err = ApiAdaptor::new("http://example.com/fmax/", "42", creds()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl(_)));
        assert!(err.to_string().contains("https"));
    }

    #[test]
    fn missing_application_path_marker_is_rejected() {
        let err = ApiAdaptor::new("https://example.com/other/", "42", creds()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl(_)));
        assert!(err.to_string().contains("fmax"));
    }

    #[test]
    fn valid_url_is_normalized_with_trailing_slash() {
        let api = ApiAdaptor::new("https://example.com/fmax", "42", creds()).unwrap();
        assert_eq!(api.base_url(), "https://example.com/fmax/");
    }

    #[test]
    fn endpoints_join_under_the_application_path() {
        let api = ApiAdaptor::new("https://example.com/fmax", "42", creds()).unwrap();
        assert_eq!(
            api.endpoint("actioncode").unwrap().as_str(),
            "https://example.com/fmax/actioncode"
        );
        assert_eq!(
            api.endpoint("crud/dto/list/AeDocumentVersion").unwrap().as_str(),
            "https://example.com/fmax/crud/dto/list/AeDocumentVersion"
        );
    }

    #[test]
    fn empty_host_is_rejected() {
        let err = validate_base_url("https:///fmax/").unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl(_)));
    }

    #[test]
    fn html_response_reduces_to_body_text() {
        let body =
            normalize_response(200, "text/html; charset=utf-8", "<html><body>Hello<br/>World</body></html>")
                .unwrap();
        assert_eq!(body, ResponseBody::Text("Hello\nWorld".to_string()));
    }

    #[test]
    fn html_without_body_falls_back_to_raw_text() {
        let body = normalize_response(200, "text/html", "<p>loose markup").unwrap();
        assert_eq!(body, ResponseBody::Text("<p>loose markup".to_string()));
    }

    #[test]
    fn json_response_parses() {
        let body = normalize_response(200, "application/json", r#"{"results": [1, 2]}"#).unwrap();
        assert_eq!(body, ResponseBody::Json(json!({ "results": [1, 2] })));
    }

    #[test]
    fn unparsable_json_becomes_empty_not_an_error() {
        let body = normalize_response(200, "application/json", "{not json").unwrap();
        assert_eq!(body, ResponseBody::Empty);
    }

    #[test]
    fn empty_body_normalizes_to_empty() {
        let body = normalize_response(204, "", "").unwrap();
        assert_eq!(body, ResponseBody::Empty);
    }

    #[test]
    fn status_400_is_a_bad_request_with_detail() {
        let err = normalize_response(400, "text/plain", "missing field").unwrap_err();
        match err {
            ApiError::BadRequest(detail) => assert_eq!(detail, "missing field"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn status_401_is_unauthorized() {
        let err = normalize_response(401, "", "").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn other_statuses_are_generic_remote_errors() {
        let err = normalize_response(503, "text/plain", "down").unwrap_err();
        match err {
            ApiError::Status { code, detail } => {
                assert_eq!(code, 503);
                assert_eq!(detail, "down");
            }
            other => panic!("expected Status, got {:?}", other),
        }
    }

    #[test]
    fn error_detail_carries_normalized_json_body() {
        let err = normalize_response(400, "application/json", r#"{"error": "bad column"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("bad column"));
    }
}
