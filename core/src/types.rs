//! Typed response bodies.
//!
//! # Design
//! Decoding is strict: a field is only allowed to be missing or `null` when
//! it is declared as `Option` (or explicitly defaulted for the per-field
//! error lists, which the server omits when a field has no messages).
//! Unknown keys are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST login_check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
}

/// District as embedded in a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub surname: String,
    pub email: String,
    pub subscribe: bool,
    pub roles: Vec<String>,
    pub district: DistrictRef,
}

/// Body of `GET api/user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user: User,
    pub error: Option<Value>,
}

/// One entry of `GET api/district/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub id: i64,
    pub name: String,
    pub center: String,
    #[serde(rename = "svg")]
    pub svg_payload: String,
}

/// Messages for the two password confirmation inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordErrors {
    #[serde(default)]
    pub first: Vec<String>,
    #[serde(default)]
    pub second: Vec<String>,
}

/// Per-field validation messages returned with a rejected registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    #[serde(default)]
    pub username: Vec<String>,
    #[serde(default)]
    pub surname: Vec<String>,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default, rename = "plainPassword")]
    pub plain_password: PasswordErrors,
    #[serde(default, rename = "districtId")]
    pub district_id: Vec<String>,
}

impl FieldErrors {
    /// All messages as `(wire field path, message)` pairs.
    pub fn messages(&self) -> Vec<(&'static str, &str)> {
        let fields: [(&'static str, &Vec<String>); 7] = [
            ("username", &self.username),
            ("surname", &self.surname),
            ("name", &self.name),
            ("email", &self.email),
            ("plainPassword.first", &self.plain_password.first),
            ("plainPassword.second", &self.plain_password.second),
            ("districtId", &self.district_id),
        ];
        fields
            .into_iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| (field, m.as_str())))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages().is_empty()
    }
}

/// Body of `POST api/registration`.
///
/// `accepted == false` is the server rejecting the input, not a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResult {
    #[serde(rename = "result")]
    pub accepted: bool,
    #[serde(rename = "errors")]
    pub field_errors: Option<FieldErrors>,
}
