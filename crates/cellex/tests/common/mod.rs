//! In-process stand-in for the Cellex REST API.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const ADMIN_EMAIL: &str = "admin@cellex.test";
pub const ADMIN_PASSWORD: &str = "AdminPass123";

#[derive(Default)]
pub struct Backend {
    pub users: HashMap<String, String>,
    pub banned: HashSet<String>,
    pub products: Vec<Value>,
    pub requests: Vec<String>,
}

pub type Shared = Arc<Mutex<Backend>>;

type Reply = (StatusCode, Json<Value>);

fn error(status: StatusCode, code: i64, message: &str) -> Reply {
    (status, Json(json!({ "code": code, "message": message })))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn authorized(headers: &HeaderMap) -> bool {
    bearer(headers).is_some_and(|token| token.starts_with("tok-"))
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let mut backend = state.lock().unwrap();
    backend.requests.push(format!("login {email}"));

    if email.len() < 3 {
        return error(StatusCode::BAD_REQUEST, 1003, "Tên đăng nhập phải có ít nhất 3 ký tự");
    }
    if !email.contains('@') {
        return error(StatusCode::BAD_REQUEST, 1003, "Email không hợp lệ");
    }
    if password.len() < 8 {
        return error(StatusCode::BAD_REQUEST, 1004, "Mật khẩu không hợp lệ");
    }
    if email.starts_with("expired") {
        return (StatusCode::OK, Json(json!({ "result": { "token": "expired" } })));
    }
    match backend.users.get(&email) {
        None => error(StatusCode::NOT_FOUND, 1002, "Tài khoản không tồn tại"),
        Some(stored) if *stored != password => {
            error(StatusCode::BAD_REQUEST, 1004, "Mật khẩu không hợp lệ")
        }
        Some(_) => (
            StatusCode::OK,
            Json(json!({ "code": 1000, "result": { "token": format!("tok-{email}") } })),
        ),
    }
}

async fn logout(headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, 1006, "Unauthenticated");
    }
    (StatusCode::OK, Json(json!({ "code": 1000 })))
}

async fn me(headers: HeaderMap) -> Reply {
    match bearer(&headers) {
        Some(token) if token.starts_with("tok-") => (
            StatusCode::OK,
            Json(json!({ "result": { "email": token.trim_start_matches("tok-") } })),
        ),
        _ => error(StatusCode::UNAUTHORIZED, 1006, "Unauthenticated"),
    }
}

async fn create_user(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, 1006, "Unauthenticated");
    }
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut backend = state.lock().unwrap();
    backend.users.insert(email.clone(), "ValidPass123".to_string());
    (StatusCode::CREATED, Json(json!({ "result": { "id": email } })))
}

async fn ban(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, 1006, "Unauthenticated");
    }
    let mut backend = state.lock().unwrap();
    backend.requests.push(format!("ban {id} body={body}"));
    if !backend.users.contains_key(&id) {
        return error(StatusCode::NOT_FOUND, 1002, "Tài khoản không tồn tại");
    }
    if body.get("reason").is_none() {
        return error(StatusCode::BAD_REQUEST, 1001, "Lý do khóa không được để trống");
    }
    backend.banned.insert(id);
    (StatusCode::OK, Json(json!({ "code": 1000 })))
}

async fn unban(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, 1006, "Unauthenticated");
    }
    let mut backend = state.lock().unwrap();
    backend.requests.push(format!("unban {id}"));
    backend.banned.remove(&id);
    (StatusCode::OK, Json(json!({ "code": 1000 })))
}

async fn create_product(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, 1006, "Unauthenticated");
    }
    if body["price"].as_f64().unwrap_or(0.0) <= 0.0 {
        return error(StatusCode::BAD_REQUEST, 1008, "Giá sản phẩm phải lớn hơn 0");
    }
    let mut backend = state.lock().unwrap();
    let id = format!("p-{}", backend.products.len() + 1);
    backend.products.push(json!({ "id": id, "name": body["name"] }));
    (StatusCode::CREATED, Json(json!({ "result": { "id": id } })))
}

async fn list_products(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> Reply {
    let backend = state.lock().unwrap();
    (
        StatusCode::OK,
        Json(json!({ "result": backend.products, "query": query })),
    )
}

async fn delete_product(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, 1006, "Unauthenticated");
    }
    let mut backend = state.lock().unwrap();
    backend.requests.push(format!("delete {id}"));
    backend.products.retain(|p| p["id"] != id.as_str());
    (StatusCode::OK, Json(json!({ "code": 1000 })))
}

/// Start the mock API; returns its base URL (`http://addr/api`) and state.
pub async fn start_backend() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(Backend::default()));
    {
        let mut backend = state.lock().unwrap();
        backend
            .users
            .insert(ADMIN_EMAIL.to_string(), ADMIN_PASSWORD.to_string());
        backend
            .users
            .insert("user@cellex.test".to_string(), "ValidPass123".to_string());
    }

    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/users", post(create_user))
        .route("/api/users/me", get(me))
        .route("/api/users/{id}/ban", post(ban))
        .route("/api/users/{id}/unban", post(unban))
        .route("/api/products", post(create_product).get(list_products))
        .route("/api/products/{id}", axum::routing::delete(delete_product))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{addr}/api"), state)
}
