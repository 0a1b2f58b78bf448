//! Request executor for the vmeste API.
//!
//! # Design
//! `ApiClient` holds the configuration and a `reqwest::Client` supplied by
//! the application, and keeps no other state between calls. Work is split
//! the same way for every operation:
//!
//! - `build_request` turns a `RequestSpec` into an `HttpRequest` (base URL,
//!   headers, encoded body) without I/O.
//! - `parse` decodes an `HttpResponse` into the caller's result type.
//! - `execute` glues the two around exactly one network round-trip.
//!
//! Status codes are not interpreted. The backend answers rejected forms with
//! a well-formed body under a non-2xx status, so the body is decoded
//! regardless and the status is only reported on decode failure.

use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::encoding::encode_body;
use crate::endpoint::{Operation, RegistrationForm};
use crate::error::{ApiError, ResponseEnvelope};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestSpec};
use crate::types::{CurrentUserResponse, District, LoginResponse, RegistrationResult};

#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Arc<ApiConfig>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Client with a default `reqwest::Client`.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Client configured from `VMESTE_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::new(ApiConfig::from_env()?))
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Resolve an operation through the endpoint catalog.
    pub fn request_spec(&self, operation: &Operation) -> RequestSpec {
        operation.request_spec(&self.config)
    }

    /// Build the wire request for `spec` without sending it.
    ///
    /// GET requests never carry a body. POST parameters are encoded with the
    /// configured body encoding; a value that cannot be encoded fails the
    /// whole call.
    pub fn build_request(&self, spec: &RequestSpec) -> Result<HttpRequest, ApiError> {
        let url = self.config.resolve(&spec.path)?;
        let mut headers = spec.headers.clone();

        let body = match (spec.method, &spec.parameters) {
            (HttpMethod::Post, Some(params)) => {
                let encoded = encode_body(params, self.config.body_encoding)?;
                headers.push(("Content-Type".to_string(), encoded.content_type.to_string()));
                Some(encoded.bytes)
            }
            (HttpMethod::Post, None) | (HttpMethod::Get, _) => None,
        };

        for (name, value) in &headers {
            validate_header(name, value)?;
        }

        Ok(HttpRequest {
            method: spec.method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Decode a response body into `T`.
    ///
    /// A decode failure carries the status and `Content-Type` of the
    /// response.
    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse) -> ResponseEnvelope<T> {
        serde_json::from_slice(&response.body).map_err(|source| ApiError::Decode {
            status: response.status,
            content_type: response.header("content-type").map(str::to_string),
            source,
        })
    }

    /// Build, send and decode one request.
    pub async fn execute<T: DeserializeOwned>(&self, spec: &RequestSpec) -> ResponseEnvelope<T> {
        let request = self.build_request(spec)?;
        let response = self.send(request).await?;
        let result = self.parse(response);
        if let Err(err) = &result {
            warn!(path = %spec.path, error = %err, "response did not match expected shape");
        }
        result
    }

    /// Resolve `operation` and execute it.
    pub async fn execute_operation<T: DeserializeOwned>(
        &self,
        operation: &Operation,
    ) -> ResponseEnvelope<T> {
        self.execute(&self.request_spec(operation)).await
    }

    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ResponseEnvelope<LoginResponse> {
        self.execute_operation(&Operation::login(username, password))
            .await
    }

    /// The logged-in user.
    ///
    /// Without a session the backend answers `{"user": null, "error": {...}}`,
    /// usually under 401. `user` is not optional, so that settles as
    /// `ApiError::Decode`; check `ApiError::status()` for 401 to tell "not
    /// logged in" from a malformed body.
    pub async fn current_user(&self) -> ResponseEnvelope<CurrentUserResponse> {
        self.execute_operation(&Operation::CurrentUser).await
    }

    /// Districts in the order the server lists them.
    pub async fn districts(&self) -> ResponseEnvelope<Vec<District>> {
        self.execute_operation(&Operation::Districts).await
    }

    /// Submit a registration. A server-side rejection is `Ok` with
    /// `accepted == false`.
    pub async fn register(&self, form: RegistrationForm) -> ResponseEnvelope<RegistrationResult> {
        self.execute_operation(&Operation::Register(form)).await
    }

    /// Profile lookup; the body shape is chosen by the caller.
    pub async fn profile<T: DeserializeOwned>(&self, id: i64) -> ResponseEnvelope<T> {
        self.execute_operation(&Operation::Profile { id }).await
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.inspect_err(|err| {
            warn!(url = %request.url, error = %err, "transport failure");
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();
        debug!(status, bytes = body.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn validate_header(name: &str, value: &str) -> Result<(), ApiError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ApiError::Construction(format!("invalid header name `{name}`")))?;
    HeaderValue::from_str(value)
        .map_err(|_| ApiError::Construction(format!("invalid value for header `{name}`")))?;
    Ok(())
}

/// Builder for an `ApiClient` that shares an application-wide HTTP client.
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
    config: Option<ApiConfig>,
    http: Option<reqwest::Client>,
}

impl ApiClientBuilder {
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `client` for all requests. Timeouts, TLS and cookie handling are
    /// whatever that client was built with.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self
            .config
            .ok_or_else(|| ApiError::Config("no configuration supplied".to_string()))?;
        Ok(ApiClient {
            config: Arc::new(config),
            http: self.http.unwrap_or_default(),
        })
    }
}
