//! Wire-level request and response types.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data.
//! `ApiClient::build_request` produces an `HttpRequest` and
//! `ApiClient::parse` consumes an `HttpResponse`, so the catalog and decoding
//! logic can be exercised without a network. `ApiClient::execute` is the only
//! place that turns an `HttpRequest` into real I/O.
//!
//! All fields use owned types (`String`, `Vec`) so a built request can be
//! handed to any transport, including a test harness playing the server.

use serde_json::{Map, Value};

/// Body parameters for a request, in insertion order.
pub type Parameters = Map<String, Value>;

/// HTTP method for a request. The backend only uses GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method, path, headers and body parameters for one operation.
///
/// Derived from an `Operation` by the endpoint catalog and never stored;
/// the path is relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub parameters: Option<Parameters>,
    pub headers: Vec<(String, String)>,
}

/// A fully built HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
///
/// Constructed by the executor (or a test harness) after the round-trip,
/// then passed to `ApiClient::parse` for decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
