//! HTTP access to the backend.
//!
//! Every backend call goes through [`ApiClient::request`], which resolves the
//! URL against the configured origin and attaches the session's bearer token.

pub mod endpoints;
pub mod error;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::session::SessionStore;
use error::{ApiError, ApiResult};

/// One call to the backend.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub path: String,
    pub method: Method,
    pub payload: Value,
    pub headers: HeaderMap,
    pub auth: bool,
}

impl RequestOptions {
    /// GET with an empty payload, no extra headers and auth on.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            payload: Value::Object(Default::default()),
            headers: HeaderMap::new(),
            auth: true,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::POST)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> ApiResult<Self> {
        Ok(self.payload(serde_json::to_value(payload)?))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }
}

/// Response as received, whatever the status code.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Body parsed as JSON, or the body text as a JSON string when it is not
    /// valid JSON.
    pub data: Value,
}

impl RawResponse {
    async fn read(response: reqwest::Response) -> ApiResult<Self> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let data = serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

        Ok(Self {
            status,
            headers,
            data,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionStore) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str, session: SessionStore) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues the call. Any HTTP status resolves; only transport failures
    /// are errors. No retry and no timeout beyond the client's own.
    pub async fn request(&self, options: RequestOptions) -> ApiResult<RawResponse> {
        let url = resolve_url(&self.base_url, &options.path)?;

        let token = if options.auth {
            self.session.read(|s| s.token().map(str::to_owned))
        } else {
            None
        };
        let headers = build_headers(&options.headers, options.auth, token.as_deref())?;

        debug!(method = %options.method, %url, auth = options.auth, "sending request");

        let mut builder = self.http.request(options.method.clone(), url).headers(headers);
        builder = if options.method == Method::GET {
            let pairs = query_pairs(&options.payload)?;
            if pairs.is_empty() {
                builder
            } else {
                builder.query(&pairs)
            }
        } else {
            builder.json(&options.payload)
        };

        let response = builder.send().await?;
        let raw = RawResponse::read(response).await?;
        debug!(status = raw.status, path = %options.path, "response received");
        Ok(raw)
    }
}

/// Absolute paths (anything starting with `http`) are used as given; the rest
/// are appended to `base_url`.
pub fn resolve_url(base_url: &str, path: &str) -> ApiResult<Url> {
    let full = if path.starts_with("http") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    };

    Url::parse(&full).map_err(|source| ApiError::InvalidUrl { url: full, source })
}

/// Flattens a GET payload into query pairs. Only an object of scalar values
/// can be encoded; `null` members are left out.
pub fn query_pairs(payload: &Value) -> ApiResult<Vec<(String, String)>> {
    let map = match payload {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(ApiError::InvalidQuery(format!(
                "payload must be an object, got {other}"
            )))
        }
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        let encoded = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(ApiError::InvalidQuery(format!(
                    "`{key}` is not a scalar value"
                )))
            }
        };
        pairs.push((key.clone(), encoded));
    }
    Ok(pairs)
}

/// Caller headers plus `Authorization: Bearer <token>` when `auth` is set and
/// a token is available. The wrapper's bearer value replaces a caller one.
pub fn build_headers(extra: &HeaderMap, auth: bool, token: Option<&str>) -> ApiResult<HeaderMap> {
    let mut headers = extra.clone();

    if let Some(token) = token.filter(|t| auth && !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ApiError::InvalidHeader(format!("authorization: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relative_path_is_joined_to_base() {
        let url = resolve_url("http://localhost:3001", "/tasks").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/tasks");

        let url = resolve_url("http://localhost:3001", "tasks").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/tasks");
    }

    #[test]
    fn absolute_path_is_used_verbatim() {
        let url = resolve_url("http://localhost:3001", "https://files.example.com/a?b=1").unwrap();
        assert_eq!(url.as_str(), "https://files.example.com/a?b=1");
    }

    #[test]
    fn bad_base_is_reported() {
        let err = resolve_url("not a url", "/tasks").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { ref url, .. } if url == "not a url/tasks"));
    }

    #[test]
    fn bearer_added_when_auth_and_token() {
        let headers = build_headers(&HeaderMap::new(), true, Some("abc")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn no_bearer_without_auth() {
        let headers = build_headers(&HeaderMap::new(), false, Some("abc")).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn no_bearer_for_empty_token() {
        let headers = build_headers(&HeaderMap::new(), true, Some("")).unwrap();
        assert!(headers.is_empty());
        let headers = build_headers(&HeaderMap::new(), true, None).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn extra_headers_are_kept() {
        let mut extra = HeaderMap::new();
        extra.insert("x-client", HeaderValue::from_static("app"));
        extra.insert(AUTHORIZATION, HeaderValue::from_static("Basic zzz"));

        let headers = build_headers(&extra, true, Some("abc")).unwrap();
        assert_eq!(headers.get("x-client").unwrap(), "app");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");

        let headers = build_headers(&extra, false, Some("abc")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic zzz");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let err = build_headers(&HeaderMap::new(), true, Some("a\nb")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader(_)));
    }

    #[test]
    fn query_pairs_from_scalars() {
        let mut pairs = query_pairs(&serde_json::json!({
            "userid": "42",
            "page": 2,
            "all": true,
            "tel": null
        }))
        .unwrap();
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("all".to_string(), "true".to_string()),
                ("page".to_string(), "2".to_string()),
                ("userid".to_string(), "42".to_string()),
            ]
        );
        assert!(query_pairs(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn nested_query_payload_is_rejected() {
        let err = query_pairs(&serde_json::json!({ "filter": { "tel": "139" } })).unwrap_err();
        assert!(matches!(err, ApiError::InvalidQuery(ref msg) if msg.contains("filter")));

        let err = query_pairs(&serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidQuery(_)));
    }

    #[test]
    fn options_default_to_authenticated_get() {
        let options = RequestOptions::new("/ping");
        assert_eq!(options.method, Method::GET);
        assert_eq!(options.payload, serde_json::json!({}));
        assert!(options.headers.is_empty());
        assert!(options.auth);
    }
}
