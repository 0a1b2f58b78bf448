use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const DEMO_USERNAME: &str = "ilaytest";
pub const DEMO_PASSWORD: &str = "1234567";
pub const DEMO_EMAIL: &str = "ilay@example.test";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct District {
    pub id: i64,
    pub name: String,
    pub center: String,
    pub svg: String,
}

#[derive(Clone, Debug)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub surname: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub district_id: i64,
    pub subscribe: bool,
}

#[derive(Debug)]
pub struct Backend {
    pub districts: Vec<District>,
    pub accounts: Vec<Account>,
    pub logged_in: Option<i64>,
}

impl Backend {
    /// Three districts and one demo account.
    pub fn seeded() -> Self {
        let districts = vec![
            district(1, "Central", "55.7558,37.6173"),
            district(2, "Northern", "55.8383,37.5256"),
            district(3, "Southern", "55.6100,37.6800"),
        ];
        let accounts = vec![Account {
            id: 1,
            username: DEMO_USERNAME.to_string(),
            surname: "Petrova".to_string(),
            name: "Ilya".to_string(),
            email: DEMO_EMAIL.to_string(),
            password: DEMO_PASSWORD.to_string(),
            district_id: 1,
            subscribe: false,
        }];
        Self {
            districts,
            accounts,
            logged_in: None,
        }
    }

    fn district_name(&self, id: i64) -> Option<&str> {
        self.districts
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.as_str())
    }
}

fn district(id: i64, name: &str, center: &str) -> District {
    District {
        id,
        name: name.to_string(),
        center: center.to_string(),
        svg: format!("<path id=\"district-{id}\" d=\"M0 0h10v10H0z\"/>"),
    }
}

pub type Db = Arc<RwLock<Backend>>;

pub fn app() -> Router {
    app_with(Backend::seeded())
}

pub fn app_with(backend: Backend) -> Router {
    let db: Db = Arc::new(RwLock::new(backend));
    Router::new()
        .route("/login_check", post(login_check))
        .route("/api/user", get(current_user))
        .route("/api/district/list", get(list_districts))
        .route("/api/registration", post(register))
        .route("/profile/{id}", get(profile))
        .layer(middleware::from_fn(require_xhr))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock backend listening");
    }
    axum::serve(listener, app()).await
}

/// The backend only answers requests marked as XMLHttpRequest.
async fn require_xhr(request: Request, next: Next) -> Response {
    let marked = request
        .headers()
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "XMLHttpRequest");
    if !marked {
        debug!(uri = %request.uri(), "rejecting request without X-Requested-With");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "X-Requested-With header required" })),
        )
            .into_response();
    }
    next.run(request).await
}

/// Flatten a form or JSON body into `key -> value`, with nested keys in
/// bracket notation (`plainPassword[first]`).
fn body_fields(headers: &HeaderMap, body: &[u8]) -> Result<HashMap<String, String>, StatusCode> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if !is_json {
        return Ok(url::form_urlencoded::parse(body).into_owned().collect());
    }

    let value: Value = serde_json::from_slice(body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let mut fields = HashMap::new();
    flatten_json("", &value, &mut fields);
    Ok(fields)
}

fn flatten_json(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}[{key}]")
                };
                flatten_json(&key, nested, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

async fn login_check(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let fields = body_fields(&headers, &body)?;
    let field = |key: &str| fields.get(key).map(String::as_str);

    // `_username`/`_password` is the form login; `email`/`password` logs in
    // by email address.
    let (login, password, by_email) = match field("_username") {
        Some(username) => (username, field("_password"), false),
        None => (field("email").unwrap_or_default(), field("password"), true),
    };
    let password = password.unwrap_or_default();

    let mut backend = db.write().await;
    let account = backend
        .accounts
        .iter()
        .find(|a| {
            let name = if by_email { &a.email } else { &a.username };
            name == login && a.password == password
        })
        .map(|a| a.id);
    backend.logged_in = account;
    debug!(login, by_email, success = account.is_some(), "login attempt");
    Ok(Json(json!({ "success": account.is_some() })))
}

async fn current_user(State(db): State<Db>) -> (StatusCode, Json<Value>) {
    let backend = db.read().await;
    let account = backend
        .logged_in
        .and_then(|id| backend.accounts.iter().find(|a| a.id == id));

    match account {
        Some(a) => (
            StatusCode::OK,
            Json(json!({
                "user": {
                    "id": a.id,
                    "name": a.name,
                    "username": a.username,
                    "surname": a.surname,
                    "email": a.email,
                    "subscribe": a.subscribe,
                    "roles": ["ROLE_USER"],
                    "district": {
                        "id": a.district_id,
                        "name": backend.district_name(a.district_id).unwrap_or_default(),
                    },
                },
                "error": null,
            })),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "user": null, "error": { "code": 401, "message": "not logged in" } })),
        ),
    }
}

async fn list_districts(State(db): State<Db>) -> Json<Vec<District>> {
    Json(db.read().await.districts.clone())
}

async fn register(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let fields = body_fields(&headers, &body)?;
    let field = |key: &str| fields.get(key).cloned().unwrap_or_default();

    let username = field("username");
    let email = field("email");
    let first = field("plainPassword[first]");
    let second = field("plainPassword[second]");
    let district_id = field("districtId").parse::<i64>().ok();

    let mut backend = db.write().await;
    let mut errors: Vec<(&str, Option<&str>, &str)> = Vec::new();

    if username.is_empty() {
        errors.push(("username", None, "This value should not be blank."));
    } else if backend.accounts.iter().any(|a| a.username == username) {
        errors.push(("username", None, "This username is already used."));
    }
    if !email.contains('@') {
        errors.push(("email", None, "This value is not a valid email address."));
    } else if backend.accounts.iter().any(|a| a.email == email) {
        errors.push(("email", None, "This email is already used."));
    }
    if first.is_empty() {
        errors.push(("plainPassword", Some("first"), "This value should not be blank."));
    } else if first != second {
        errors.push(("plainPassword", Some("first"), "passwords do not match"));
    }
    let district_id = match district_id.filter(|id| backend.district_name(*id).is_some()) {
        Some(id) => id,
        None => {
            errors.push(("districtId", None, "Unknown district."));
            0
        }
    };

    if !errors.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "result": false, "errors": error_tree(&errors) })),
        ));
    }

    let id = backend.accounts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
    backend.accounts.push(Account {
        id,
        username,
        surname: field("surname"),
        name: field("name"),
        email,
        password: first,
        district_id,
        subscribe: false,
    });
    info!(id, "account registered");
    Ok((StatusCode::OK, Json(json!({ "result": true, "errors": null }))))
}

/// `[(field, subfield, message)]` into `{field: [msg]}` / `{field: {sub: [msg]}}`.
fn error_tree(errors: &[(&str, Option<&str>, &str)]) -> Value {
    let mut tree = serde_json::Map::new();
    for (field, sub, message) in errors {
        let entry = tree
            .entry(field.to_string())
            .or_insert_with(|| if sub.is_some() { json!({}) } else { json!([]) });
        let list = match sub {
            Some(sub) => match entry {
                Value::Object(nested) => nested.entry(sub.to_string()).or_insert_with(|| json!([])),
                other => other,
            },
            None => entry,
        };
        if let Value::Array(items) = list {
            items.push(json!(message));
        }
    }
    Value::Object(tree)
}

async fn profile(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let backend = db.read().await;
    backend
        .accounts
        .iter()
        .find(|a| a.id == id)
        .map(|a| {
            Json(json!({
                "id": a.id,
                "username": a.username,
                "name": a.name,
                "surname": a.surname,
            }))
        })
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "profile not found" }))))
}
