//! Shared fixtures: a fake email provider and a running service instance.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use base64::{Engine, engine::general_purpose::STANDARD};
use dsme_reports::AppState;
use dsme_reports::routes::report_routes;
use dsme_reports::services::credentials::StoreBootstrap;
use dsme_reports::services::mailer::Mailer;
use serde_json::{Value, json};

/// One email as received by the fake provider.
#[derive(Debug, Clone)]
pub struct ReceivedEmail {
    pub authorization: Option<String>,
    pub body: Value,
}

impl ReceivedEmail {
    pub fn attachment_filename(&self) -> &str {
        self.body["attachments"][0]["filename"].as_str().unwrap()
    }

    pub fn attachment_bytes(&self) -> Vec<u8> {
        let encoded = self.body["attachments"][0]["content"].as_str().unwrap();
        STANDARD.decode(encoded).unwrap()
    }
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    pub received: Arc<Mutex<Vec<ReceivedEmail>>>,
    pub reject_with: Option<&'static str>,
}

impl FakeProvider {
    pub fn rejecting(message: &'static str) -> Self {
        Self {
            reject_with: Some(message),
            ..Self::default()
        }
    }

    pub fn received(&self) -> Vec<ReceivedEmail> {
        self.received.lock().unwrap().clone()
    }
}

async fn fake_send(
    State(provider): State<FakeProvider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    provider
        .received
        .lock()
        .unwrap()
        .push(ReceivedEmail { authorization, body });

    match provider.reject_with {
        Some(message) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "statusCode": 422, "name": "validation_error", "message": message })),
        ),
        None => (StatusCode::OK, Json(json!({ "id": "email-0001" }))),
    }
}

/// Bind to port 0 and return the base URL.
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base64 service-account credential pointing at a fresh database file.
pub fn temp_credential() -> String {
    let path = std::env::temp_dir().join(format!("dsme-test-{}.db", uuid::Uuid::new_v4()));
    let account = json!({
        "type": "service_account",
        "project_id": "dsme-test",
        "client_email": "svc@dsme-test.iam",
        "database_url": format!("sqlite://{}?mode=rwc", path.display()),
    });
    STANDARD.encode(account.to_string())
}

pub struct TestService {
    pub base: String,
    pub provider: FakeProvider,
    pub client: reqwest::Client,
}

impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

pub async fn start_with(provider: FakeProvider, api_key: Option<&str>) -> TestService {
    let provider_app = Router::new()
        .route("/emails", post(fake_send))
        .with_state(provider.clone());
    let provider_base = spawn(provider_app).await;

    let state = AppState {
        store: StoreBootstrap::new(Some(temp_credential())),
        mailer: Mailer::new(api_key.map(str::to_string), provider_base),
    };
    let base = spawn(report_routes::app(state, None)).await;

    TestService {
        base,
        provider,
        client: reqwest::Client::new(),
    }
}

pub async fn start() -> TestService {
    start_with(FakeProvider::default(), Some("re_test_key")).await
}

pub fn sample_report(name: &str, company: &str) -> Value {
    json!({
        "demographics": { "nombre": name, "email": "a@x.com" },
        "empresa": { "nombre": company },
        "pilarScores": { "1": 20, "2": 25, "3": 15, "4": 30, "5": 10 },
        "ismeScore": 66.67
    })
}

/// Submits a report and returns its id.
pub async fn submit(service: &TestService, report: &Value) -> String {
    let resp = service
        .client
        .post(service.url("/api/submit-report"))
        .json(report)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

pub async fn list(service: &TestService) -> Vec<Value> {
    let resp = service
        .client
        .get(service.url("/api/list-reports"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}
