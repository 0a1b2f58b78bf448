//! Client configuration.
//!
//! # Design
//! Everything that differs between deployments or backend revisions (the
//! origin, the login wire keys, the body encoding, the identification
//! header) lives in one `ApiConfig` value that is handed to the catalog and
//! the executor. Nothing is read from globals, so tests can point a client
//! at any origin.

use url::Url;

use crate::error::ApiError;

/// Value of the `X-Requested-With` header the backend expects.
pub const DEFAULT_REQUESTED_WITH: &str = "XMLHttpRequest";

const ENV_BASE_URL: &str = "VMESTE_BASE_URL";
const ENV_BODY_ENCODING: &str = "VMESTE_BODY_ENCODING";
const ENV_USERNAME_KEY: &str = "VMESTE_LOGIN_USERNAME_KEY";
const ENV_PASSWORD_KEY: &str = "VMESTE_LOGIN_PASSWORD_KEY";

/// Wire keys for the login form. These are not the field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginKeys {
    pub username: String,
    pub password: String,
}

impl LoginKeys {
    /// Keys used by the older backend revision that logged in by email.
    pub fn email() -> Self {
        Self {
            username: "email".to_string(),
            password: "password".to_string(),
        }
    }
}

impl Default for LoginKeys {
    fn default() -> Self {
        Self {
            username: "_username".to_string(),
            password: "_password".to_string(),
        }
    }
}

/// How body parameters are serialized. Applies to every request of a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    /// `application/x-www-form-urlencoded`, nested keys in brackets.
    #[default]
    Form,
    /// `application/json`.
    Json,
}

impl std::str::FromStr for BodyEncoding {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(BodyEncoding::Form),
            "json" => Ok(BodyEncoding::Json),
            other => Err(ApiError::Config(format!("unknown body encoding: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: Url,
    pub login_keys: LoginKeys,
    pub body_encoding: BodyEncoding,
    pub requested_with: String,
}

impl ApiConfig {
    /// Parse `base_url` and apply defaults for everything else.
    ///
    /// A trailing slash is added when missing so that paths are appended to
    /// the origin instead of replacing its last segment.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: normalize_base(base_url)?,
            login_keys: LoginKeys::default(),
            body_encoding: BodyEncoding::default(),
            requested_with: DEFAULT_REQUESTED_WITH.to_string(),
        })
    }

    /// Load from `VMESTE_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup(ENV_BASE_URL)
            .ok_or_else(|| ApiError::Config(format!("{ENV_BASE_URL} is not set")))?;
        let mut config = Self::new(&base_url).map_err(|e| ApiError::Config(e.to_string()))?;

        if let Some(encoding) = lookup(ENV_BODY_ENCODING) {
            config.body_encoding = encoding.parse()?;
        }
        if let Some(key) = lookup(ENV_USERNAME_KEY) {
            config.login_keys.username = key;
        }
        if let Some(key) = lookup(ENV_PASSWORD_KEY) {
            config.login_keys.password = key;
        }
        Ok(config)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn with_login_keys(mut self, keys: LoginKeys) -> Self {
        self.login_keys = keys;
        self
    }

    pub fn with_body_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.body_encoding = encoding;
        self
    }

    pub fn with_requested_with(mut self, value: impl Into<String>) -> Self {
        self.requested_with = value.into();
        self
    }

    /// Resolve a catalog path against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

fn normalize_base(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(ApiError::Construction(format!("{raw} cannot be used as a base url")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_follow_latest_backend() {
        let config = ApiConfig::new("https://api.example.test:9090").unwrap();
        assert_eq!(config.base_url().as_str(), "https://api.example.test:9090/");
        assert_eq!(config.login_keys.username, "_username");
        assert_eq!(config.login_keys.password, "_password");
        assert_eq!(config.body_encoding, BodyEncoding::Form);
        assert_eq!(config.requested_with, "XMLHttpRequest");
    }

    #[test]
    fn paths_append_to_base_with_prefix() {
        let config = ApiConfig::new("http://localhost:8181/app").unwrap();
        assert_eq!(
            config.resolve("api/user").unwrap().as_str(),
            "http://localhost:8181/app/api/user"
        );
        assert_eq!(
            config.resolve("/login_check").unwrap().as_str(),
            "http://localhost:8181/app/login_check"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(ApiConfig::new("not a url").unwrap_err().is_construction());
        assert!(ApiConfig::new("mailto:someone@example.test").is_err());
    }

    #[test]
    fn from_env_requires_base_url() {
        let err = ApiConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn from_env_applies_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://10.0.1.3:8181/"),
            (ENV_BODY_ENCODING, "JSON"),
            (ENV_USERNAME_KEY, "email"),
        ]))
        .unwrap();
        assert_eq!(config.body_encoding, BodyEncoding::Json);
        assert_eq!(config.login_keys.username, "email");
        assert_eq!(config.login_keys.password, "_password");
    }

    #[test]
    fn from_env_rejects_unknown_encoding() {
        let err = ApiConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost"),
            (ENV_BODY_ENCODING, "xml"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn email_preset_keys() {
        let config = ApiConfig::new("http://localhost")
            .unwrap()
            .with_login_keys(LoginKeys::email());
        assert_eq!(config.login_keys.username, "email");
        assert_eq!(config.login_keys.password, "password");
    }
}
