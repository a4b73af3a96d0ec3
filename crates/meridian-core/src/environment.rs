//! The unit of work carried by the built-in calling conventions.
//!
//! An [`Environment`] holds one request and the response being produced for
//! it. It is passed by value through an [`AppFunc`](crate::AppFunc): each
//! stage receives it, may hand it to the next stage, and returns it once done.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each unit of work, using UUID v7.
///
/// # Example
///
/// ```
/// use meridian_core::RequestId;
///
/// let a = RequestId::new();
/// let b = RequestId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One request and its response under construction.
///
/// The response status starts at `200 OK`; the default terminal app marks
/// unclaimed work as `404 Not Found`.
///
/// # Example
///
/// ```
/// use meridian_core::Environment;
/// use http::StatusCode;
///
/// let mut env = Environment::new();
/// env.set_path("/users/42");
/// env.set_status(StatusCode::CREATED);
///
/// assert_eq!(env.path(), "/users/42");
/// assert_eq!(env.status(), StatusCode::CREATED);
/// ```
pub struct Environment {
    request_id: RequestId,
    method: Method,
    path_base: String,
    path: String,
    query: Option<String>,
    request_headers: HeaderMap,
    request_body: Bytes,
    status: StatusCode,
    response_headers: HeaderMap,
    response_body: Bytes,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Environment {
    /// Creates a blank `GET /` unit of work.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            method: Method::GET,
            path_base: String::new(),
            path: "/".to_string(),
            query: None,
            request_headers: HeaderMap::new(),
            request_body: Bytes::new(),
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: Bytes::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a unit of work from an HTTP request.
    #[must_use]
    pub fn from_request(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let mut env = Self::new();
        env.method = parts.method;
        env.path = parts.uri.path().to_string();
        env.query = parts.uri.query().map(str::to_string);
        env.request_headers = parts.headers;
        env.request_body = body;
        env
    }

    /// Converts the response half into an HTTP response.
    pub fn into_response(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.response_body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Sets the request method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Returns the portion of the path already consumed by branch routing.
    #[must_use]
    pub fn path_base(&self) -> &str {
        &self.path_base
    }

    /// Sets the path base.
    pub fn set_path_base(&mut self, path_base: impl Into<String>) {
        self.path_base = path_base.into();
    }

    /// Returns the request path relative to the path base.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sets the request path.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    /// Returns the request headers for modification.
    pub fn request_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.request_headers
    }

    /// Returns the request body.
    #[must_use]
    pub const fn request_body(&self) -> &Bytes {
        &self.request_body
    }

    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the response headers.
    #[must_use]
    pub const fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Returns the response headers for modification.
    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    /// Returns the response body.
    #[must_use]
    pub const fn response_body(&self) -> &Bytes {
        &self.response_body
    }

    /// Replaces the response body.
    pub fn set_response_body(&mut self, body: impl Into<Bytes>) {
        self.response_body = body.into();
    }

    /// Returns the elapsed time since the unit of work was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous one.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("path_base", &self.path_base)
            .field("path", &self.path)
            .field("status", &self.status)
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http::HeaderValue;

    #[test]
    fn test_new_environment_defaults() {
        let env = Environment::new();
        assert_eq!(env.method(), Method::GET);
        assert_eq!(env.path(), "/");
        assert_eq!(env.path_base(), "");
        assert_eq!(env.status(), StatusCode::OK);
        assert!(env.response_headers().is_empty());
    }

    #[test]
    fn test_from_request() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/orders/7?expand=items")
            .header("x-tenant", "acme")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let env = Environment::from_request(request);
        assert_eq!(env.method(), Method::POST);
        assert_eq!(env.path(), "/orders/7");
        assert_eq!(env.query(), Some("expand=items"));
        assert_eq!(env.request_headers().get("x-tenant").unwrap(), "acme");
        assert_eq!(env.request_body().as_ref(), b"{}");
    }

    #[test]
    fn test_into_response() {
        let mut env = Environment::new();
        env.set_status(StatusCode::ACCEPTED);
        env.response_headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        env.set_response_body("done");

        let response = env.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(response.body().as_ref(), b"done");
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Tenant(&'static str);

        let mut env = Environment::new();
        assert!(env.get_extension::<Tenant>().is_none());

        env.set_extension(Tenant("acme"));
        assert_eq!(env.get_extension::<Tenant>(), Some(&Tenant("acme")));

        assert_eq!(env.remove_extension::<Tenant>(), Some(Tenant("acme")));
        assert!(env.get_extension::<Tenant>().is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(Environment::new().request_id(), Environment::new().request_id());
    }
}
