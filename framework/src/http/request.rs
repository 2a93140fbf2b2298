use crate::error::FrameworkError;
use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// HTTP request with a fully buffered body
///
/// The server reads the body before dispatching, so middleware can inspect it
/// without consuming the request.
pub struct Request {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self {
            parts,
            body,
            params: HashMap::new(),
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Get a route parameter by name (e.g., /cache/{key})
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get a header value by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Typed per-request storage shared between middleware and handlers
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parse the body as JSON
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// #[derive(Deserialize)]
    /// struct PutValue { value: String }
    ///
    /// pub async fn store(req: Request) -> Response {
    ///     let input: PutValue = req.json()?;
    ///     // ...
    /// }
    /// ```
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| FrameworkError::internal(format!("Failed to parse JSON body: {}", e)))
    }

    /// Parse the query string; a missing query parses like an empty one
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        serde_urlencoded::from_str(self.uri().query().unwrap_or_default())
            .map_err(|e| FrameworkError::internal(format!("Failed to parse query string: {}", e)))
    }

    /// Parse the body as form-urlencoded
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        serde_urlencoded::from_bytes(&self.body)
            .map_err(|e| FrameworkError::internal(format!("Failed to parse form body: {}", e)))
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }
}
