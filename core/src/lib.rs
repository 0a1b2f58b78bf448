//! Typed client core for the vmeste backend API.
//!
//! # Overview
//! A closed set of `Operation`s (login, current user, district list,
//! registration, profile lookup) is resolved by the endpoint catalog into a
//! `RequestSpec`. `ApiClient` turns that into a wire request, sends it once
//! and decodes the body into the operation's result type. Every call
//! settles exactly once with a `ResponseEnvelope`.
//!
//! # Design
//! - The catalog is pure: no I/O, no failure, same input same output.
//! - Base URL, login wire keys, body encoding and the identification header
//!   come from an explicit `ApiConfig`.
//! - `ApiClient::build_request` / `ApiClient::parse` expose the I/O boundary,
//!   so everything but the round-trip itself is testable without a server.
//! - Cookies, timeouts and TLS belong to the `reqwest::Client` the
//!   application supplies; the core keeps no cross-call state.
//!
//! ```no_run
//! use vmeste_core::{ApiClient, ApiConfig};
//!
//! # async fn example() -> Result<(), vmeste_core::ApiError> {
//! let client = ApiClient::new(ApiConfig::new("http://localhost:3000")?);
//! let login = client.login("ilaytest", "1234567").await?;
//! if login.success {
//!     let districts = client.districts().await?;
//!     println!("{} districts", districts.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod encoding;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder};
pub use config::{ApiConfig, BodyEncoding, LoginKeys};
pub use encoding::{decode_form, encode_body, form_view, EncodedBody};
pub use endpoint::{Operation, PasswordConfirmation, RegistrationForm};
pub use error::{ApiError, ResponseEnvelope};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Parameters, RequestSpec};
pub use types::{
    CurrentUserResponse, District, DistrictRef, FieldErrors, LoginResponse, PasswordErrors,
    RegistrationResult, User,
};
