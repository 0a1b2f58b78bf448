//! The endpoint catalog: logical operations and their wire requests.
//!
//! # Design
//! The backend surface is a closed set, so it is a single enum. Each variant
//! carries exactly the data its request needs, and `request_spec` maps it to
//! method, path, fixed headers and body parameters. The mapping never fails
//! and never touches the network.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{ApiConfig, LoginKeys};
use crate::http::{HttpMethod, Parameters, RequestSpec};

/// The two halves of a password confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfirmation {
    pub first: String,
    pub second: String,
}

impl PasswordConfirmation {
    /// Confirmation where both halves are the same password.
    pub fn matching(password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            first: password.clone(),
            second: password,
        }
    }
}

/// Fields submitted when registering a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    pub surname: String,
    pub name: String,
    pub email: String,
    pub password: PasswordConfirmation,
    pub district_id: i64,
}

/// A logical call against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Login { username: String, password: String },
    CurrentUser,
    Districts,
    Register(RegistrationForm),
    /// Public profile lookup by user id.
    Profile { id: i64 },
}

impl Operation {
    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Operation::Login {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Operation::Login { .. } | Operation::Register(_) => HttpMethod::Post,
            Operation::CurrentUser | Operation::Districts | Operation::Profile { .. } => {
                HttpMethod::Get
            }
        }
    }

    /// Path relative to the base URL.
    pub fn path(&self) -> String {
        match self {
            Operation::Login { .. } => "login_check".to_string(),
            Operation::CurrentUser => "api/user".to_string(),
            Operation::Districts => "api/district/list".to_string(),
            Operation::Register(_) => "api/registration".to_string(),
            Operation::Profile { id } => format!("profile/{id}"),
        }
    }

    /// Body parameters keyed by wire key, or `None` for bodiless calls.
    pub fn parameters(&self, keys: &LoginKeys) -> Option<Parameters> {
        match self {
            Operation::Login { username, password } => {
                let mut params = Parameters::new();
                params.insert(keys.username.clone(), Value::String(username.clone()));
                params.insert(keys.password.clone(), Value::String(password.clone()));
                Some(params)
            }
            Operation::Register(form) => {
                let mut params = Parameters::new();
                params.insert("username".to_string(), json!(form.username));
                params.insert("surname".to_string(), json!(form.surname));
                params.insert("name".to_string(), json!(form.name));
                params.insert("email".to_string(), json!(form.email));
                params.insert(
                    "plainPassword".to_string(),
                    json!({ "first": form.password.first, "second": form.password.second }),
                );
                params.insert("districtId".to_string(), json!(form.district_id));
                Some(params)
            }
            Operation::CurrentUser | Operation::Districts | Operation::Profile { .. } => None,
        }
    }

    /// Resolve this operation into its request description.
    pub fn request_spec(&self, config: &ApiConfig) -> RequestSpec {
        RequestSpec {
            method: self.method(),
            path: self.path(),
            parameters: self.parameters(&config.login_keys),
            headers: fixed_headers(config),
        }
    }
}

/// Headers sent with every request.
fn fixed_headers(config: &ApiConfig) -> Vec<(String, String)> {
    vec![
        ("X-Requested-With".to_string(), config.requested_with.clone()),
        ("Accept".to_string(), "application/json".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn config() -> ApiConfig {
        ApiConfig::new("http://localhost:3000").unwrap()
    }

    fn registration() -> RegistrationForm {
        RegistrationForm {
            username: "ilaytest".to_string(),
            surname: "Petrova".to_string(),
            name: "Ilya".to_string(),
            email: "ilay@example.test".to_string(),
            password: PasswordConfirmation::matching("1234567"),
            district_id: 3,
        }
    }

    fn all_operations() -> Vec<Operation> {
        vec![
            Operation::login("ilaytest", "1234567"),
            Operation::CurrentUser,
            Operation::Districts,
            Operation::Register(registration()),
            Operation::Profile { id: 42 },
        ]
    }

    #[test]
    fn catalog_is_deterministic() {
        let config = config();
        for op in all_operations() {
            assert_eq!(op.request_spec(&config), op.clone().request_spec(&config));
        }
    }

    #[test]
    fn methods_and_paths() {
        let expected = [
            (HttpMethod::Post, "login_check"),
            (HttpMethod::Get, "api/user"),
            (HttpMethod::Get, "api/district/list"),
            (HttpMethod::Post, "api/registration"),
            (HttpMethod::Get, "profile/42"),
        ];
        for (op, (method, path)) in all_operations().iter().zip(expected) {
            let spec = op.request_spec(&config());
            assert_eq!(spec.method, method, "{op:?}");
            assert_eq!(spec.path, path, "{op:?}");
        }
    }

    #[test]
    fn login_uses_wire_keys() {
        let spec = Operation::login("ilaytest", "1234567").request_spec(&config());
        let params = spec.parameters.unwrap();
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_username", "_password"]);
        assert_eq!(params["_username"], "ilaytest");
        assert_eq!(params["_password"], "1234567");
    }

    #[test]
    fn login_keeps_empty_and_special_credentials() {
        for (user, pass) in [("", ""), ("a&b=c", "p%20+ ?#"), ("имя", "пароль\n")] {
            let params = Operation::login(user, pass)
                .request_spec(&config())
                .parameters
                .unwrap();
            assert_eq!(params.len(), 2);
            assert_eq!(params["_username"], user);
            assert_eq!(params["_password"], pass);
        }
    }

    #[test]
    fn login_follows_configured_keys() {
        let config = config().with_login_keys(LoginKeys::email());
        let params = Operation::login("a@b.test", "pw")
            .request_spec(&config)
            .parameters
            .unwrap();
        assert_eq!(params["email"], "a@b.test");
        assert_eq!(params["password"], "pw");
        assert!(!params.contains_key("_username"));
    }

    #[test]
    fn bodiless_operations_have_no_parameters() {
        for op in [Operation::CurrentUser, Operation::Districts, Operation::Profile { id: 1 }] {
            assert!(op.request_spec(&config()).parameters.is_none(), "{op:?}");
        }
    }

    #[test]
    fn register_nests_password_confirmation() {
        let mut form = registration();
        form.password = PasswordConfirmation {
            first: "one".to_string(),
            second: "two".to_string(),
        };
        let params = Operation::Register(form)
            .request_spec(&config())
            .parameters
            .unwrap();

        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["username", "surname", "name", "email", "plainPassword", "districtId"]
        );
        assert_eq!(params["plainPassword"], json!({ "first": "one", "second": "two" }));
        assert_eq!(params["districtId"], 3);
    }

    #[test]
    fn every_request_carries_identification_header() {
        let config = config().with_requested_with("Custom");
        for op in all_operations() {
            let spec = op.request_spec(&config);
            assert!(spec
                .headers
                .contains(&("X-Requested-With".to_string(), "Custom".to_string())));
        }
    }
}
