//! WebDriver client against a stub W3C endpoint

#![allow(clippy::expect_used, clippy::unwrap_used)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use cellex::page::{
    BrowserDriver, DriverError, LoginPage, PageObject, Selector, SessionOptions, WebDriverSession,
    ELEMENT_KEY,
};
use cellex::{DispatchError, PollOptions, Poller};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SESSION: &str = "s-1";

#[derive(Default)]
struct Browser {
    url: String,
    /// locator value -> element id
    locators: HashMap<String, String>,
    /// element id -> (text, displayed)
    elements: HashMap<String, (String, bool)>,
    values: HashMap<String, String>,
    commands: Vec<String>,
    quit: bool,
}

type Shared = Arc<Mutex<Browser>>;
type Reply = (StatusCode, Json<Value>);

fn ok(value: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "value": value })))
}

fn no_such_element() -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "value": { "error": "no such element", "message": "not found" } })),
    )
}

async fn new_session(Json(body): Json<Value>) -> Reply {
    if body["capabilities"]["alwaysMatch"]["browserName"].is_null() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "value": { "error": "invalid argument", "message": "no browserName" } })),
        );
    }
    ok(json!({ "sessionId": SESSION, "capabilities": {} }))
}

async fn delete_session(State(state): State<Shared>) -> Reply {
    state.lock().unwrap().quit = true;
    ok(Value::Null)
}

async fn navigate(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut browser = state.lock().unwrap();
    browser.url = body["url"].as_str().unwrap_or_default().to_string();
    let line = format!("goto {}", browser.url);
    browser.commands.push(line);
    ok(Value::Null)
}

async fn current_url(State(state): State<Shared>) -> Reply {
    ok(json!(state.lock().unwrap().url))
}

async fn find_element(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let browser = state.lock().unwrap();
    let locator = body["value"].as_str().unwrap_or_default();
    match browser.locators.get(locator) {
        Some(id) => ok(json!({ ELEMENT_KEY: id })),
        None => no_such_element(),
    }
}

async fn find_elements(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let browser = state.lock().unwrap();
    let locator = body["value"].as_str().unwrap_or_default();
    let found: Vec<Value> = browser
        .locators
        .get(locator)
        .map(|id| vec![json!({ ELEMENT_KEY: id })])
        .unwrap_or_default();
    ok(json!(found))
}

async fn element_command(
    State(state): State<Shared>,
    Path((_, element, command)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Reply {
    let mut browser = state.lock().unwrap();
    browser.commands.push(format!("{command} {element}"));
    match command.as_str() {
        "clear" => {
            browser.values.remove(&element);
        }
        "value" => {
            let text = body["text"].as_str().unwrap_or_default().to_string();
            browser.values.entry(element).or_default().push_str(&text);
        }
        "click" if element == "submit" => {
            let password = browser.values.get("password").cloned().unwrap_or_default();
            if password.len() < 8 {
                browser
                    .elements
                    .insert("error".into(), ("Mật khẩu không hợp lệ".into(), true));
                browser
                    .locators
                    .insert(r#"[data-testid="login-error"]"#.into(), "error".into());
            } else {
                browser.url = "http://web.test/products".into();
            }
        }
        _ => {}
    }
    ok(Value::Null)
}

async fn element_property(
    State(state): State<Shared>,
    Path((_, element, property)): Path<(String, String, String)>,
) -> Reply {
    let browser = state.lock().unwrap();
    let Some((text, displayed)) = browser.elements.get(&element) else {
        return no_such_element();
    };
    match property.as_str() {
        "text" => ok(json!(text)),
        "displayed" => ok(json!(displayed)),
        _ => ok(Value::Null),
    }
}

async fn start_webdriver() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(Browser::default()));
    {
        let mut browser = state.lock().unwrap();
        for (locator, id, text) in [
            (r#"[data-testid="login-email"]"#, "email", ""),
            (r#"[data-testid="login-password"]"#, "password", ""),
            (r#"[data-testid="login-submit"]"#, "submit", "Đăng nhập"),
        ] {
            browser.locators.insert(locator.into(), id.into());
            browser.elements.insert(id.into(), (text.into(), true));
        }
    }

    let app = Router::new()
        .route("/session", post(new_session))
        .route("/session/{id}", axum::routing::delete(delete_session))
        .route("/session/{id}/url", post(navigate).get(current_url))
        .route("/session/{id}/element", post(find_element))
        .route("/session/{id}/elements", post(find_elements))
        .route(
            "/session/{id}/element/{element}/{command}",
            post(element_command).get(element_property),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (format!("http://{addr}"), state)
}

fn poller() -> Poller {
    Poller::with_options(
        PollOptions::new()
            .with_timeout_ms(2_000)
            .with_poll_interval_ms(20),
    )
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (endpoint, state) = start_webdriver().await;
    let session = WebDriverSession::start(&endpoint, &SessionOptions::default())
        .await
        .unwrap();
    assert_eq!(session.session_id(), SESSION);

    session.goto("http://web.test/login").await.unwrap();
    assert_eq!(session.current_url().await.unwrap(), "http://web.test/login");

    session.quit().await.unwrap();
    assert!(state.lock().unwrap().quit);
}

#[tokio::test]
async fn test_element_queries() {
    let (endpoint, state) = start_webdriver().await;
    let session = WebDriverSession::start(&endpoint, &SessionOptions::default())
        .await
        .unwrap();

    assert_eq!(
        session.text(&Selector::test_id("login-submit")).await.unwrap(),
        "Đăng nhập"
    );
    assert_eq!(session.count(&Selector::test_id("login-email")).await.unwrap(), 1);
    assert_eq!(session.count(&Selector::test_id("missing")).await.unwrap(), 0);
    assert!(!session.is_displayed(&Selector::test_id("missing")).await.unwrap());

    let err = session.click(&Selector::test_id("missing")).await.unwrap_err();
    assert!(matches!(err, DriverError::ElementNotFound { .. }));

    session
        .fill(&Selector::test_id("login-email"), "a@cellex.test")
        .await
        .unwrap();
    session
        .fill(&Selector::test_id("login-email"), "b@cellex.test")
        .await
        .unwrap();
    let browser = state.lock().unwrap();
    assert_eq!(browser.values.get("email").map(String::as_str), Some("b@cellex.test"));
    assert!(browser.commands.contains(&"clear email".to_string()));
}

#[tokio::test]
async fn test_login_page_over_webdriver() {
    let (endpoint, _) = start_webdriver().await;
    let session = WebDriverSession::start(&endpoint, &SessionOptions::default())
        .await
        .unwrap();
    let page = LoginPage::new(Arc::new(session), "http://web.test", poller());

    page.open().await.unwrap();
    assert!(page.is_current().await.unwrap());
    page.login("u@cellex.test", "ValidPass123").await.unwrap();
    assert!(!page.is_current().await.unwrap());
}

#[tokio::test]
async fn test_login_rejection_over_webdriver() {
    let (endpoint, _) = start_webdriver().await;
    let session = WebDriverSession::start(&endpoint, &SessionOptions::default())
        .await
        .unwrap();
    let page = LoginPage::new(Arc::new(session), "http://web.test", poller());

    page.open().await.unwrap();
    let err = page.login("u@cellex.test", "123").await.unwrap_err();
    assert_eq!(
        err,
        DispatchError::Rejected {
            message: "Mật khẩu không hợp lệ".into()
        }
    );
}

#[tokio::test]
async fn test_session_refused() {
    let err = WebDriverSession::start("http://127.0.0.1:1", &SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::Transport(_) | DriverError::Session { .. }));
}
