//! End-to-end checks of the real HTTP client against a local stub backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ecoscan_core::api::account::CHAT_UNAVAILABLE;
use ecoscan_core::scan::messages::{
    LOGIN_REQUIRED, LOST_CONNECTION, NETWORK_ERROR, SERVER_ERROR,
};
use ecoscan_core::{
    ApiClient, CancellationToken, CapturePipeline, FinalImage, PollSettings,
    ScanService,
};
use ecoscan_core::model::{
    ApiOutcome, ChatRequest, Credentials, ProfileUpdate, SignupRequest,
};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Default)]
struct Stub {
    task_queries: AtomicUsize,
    uploads: AtomicUsize,
}

type Shared = Arc<Stub>;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn fast_polling() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(10),
        timeout: Some(Duration::from_secs(10)),
    }
}

fn label_image() -> FinalImage {
    let img = RgbImage::from_fn(48, 32, |x, y| Rgb([x as u8 * 5, y as u8 * 7, 90]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();

    let mut pipeline = CapturePipeline::default();
    pipeline.accept_bytes(bytes.into_inner()).unwrap();
    pipeline.finalize().unwrap().clone()
}

async fn accept_upload(
    State(stub): State<Shared>,
    mut multipart: Multipart,
) -> Response {
    let mut saw_image = false;
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("product_image") {
            assert_eq!(field.file_name(), Some("scan.png"));
            assert_eq!(field.content_type(), Some("image/png"));
            saw_image = !field.bytes().await.unwrap().is_empty();
        }
    }
    if !saw_image {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "No image provided"})),
        )
            .into_response();
    }
    stub.uploads.fetch_add(1, Ordering::SeqCst);
    (StatusCode::ACCEPTED, Json(json!({"task_id": "abc"}))).into_response()
}

async fn task_pending_once(
    State(stub): State<Shared>,
    Path(task_id): Path<String>,
) -> Json<Value> {
    assert_eq!(task_id, "abc");
    let n = stub.task_queries.fetch_add(1, Ordering::SeqCst);
    if n == 0 {
        Json(json!({"data": {"status": "PENDING"}}))
    } else {
        Json(json!({"data": {"status": "COMPLETED", "result": {"score": 80}}}))
    }
}

fn scan_router(stub: Shared) -> Router {
    Router::new()
        .route("/api/scan", post(accept_upload))
        .route("/api/tasks/{task_id}", get(task_pending_once))
        .with_state(stub)
}

#[tokio::test]
async fn accepted_scan_is_polled_until_complete() {
    let stub = Shared::default();
    let base = serve(scan_router(stub.clone())).await;
    let service = ScanService::new(ApiClient::new(&base).unwrap(), fast_polling());

    let outcome = service
        .submit_scan(&label_image(), &CancellationToken::new())
        .await;

    assert_eq!(outcome, ApiOutcome::Success(json!({"score": 80})));
    assert_eq!(stub.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(stub.task_queries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn inline_result_is_returned_without_polling() {
    let stub = Shared::default();
    let router = Router::new()
        .route(
            "/api/scan",
            post(|| async {
                Json(json!({
                    "success": true,
                    "data": {"healthScore": 64, "structureData": {"product_name": "Oat Bar"}}
                }))
            }),
        )
        .route("/api/tasks/{task_id}", get(task_pending_once))
        .with_state(stub.clone());
    let base = serve(router).await;
    let service = ScanService::new(ApiClient::new(&base).unwrap(), fast_polling());

    let outcome = service
        .submit_scan(&label_image(), &CancellationToken::new())
        .await;

    assert_eq!(outcome.data().unwrap()["healthScore"], 64);
    assert_eq!(stub.task_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unauthorized_and_server_errors_map_to_messages() {
    let router = Router::new().route(
        "/api/scan",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "message": "Authentication required"})),
            )
        }),
    );
    let base = serve(router).await;
    let service = ScanService::new(ApiClient::new(&base).unwrap(), fast_polling());
    let outcome = service
        .submit_scan(&label_image(), &CancellationToken::new())
        .await;
    assert_eq!(outcome.message(), Some(LOGIN_REQUIRED));

    let router = Router::new().route(
        "/api/scan",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = serve(router).await;
    let service = ScanService::new(ApiClient::new(&base).unwrap(), fast_polling());
    let outcome = service
        .submit_scan(&label_image(), &CancellationToken::new())
        .await;
    assert_eq!(outcome.message(), Some(SERVER_ERROR));

    let router = Router::new().route(
        "/api/scan",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "message": "No image selected"})),
            )
        }),
    );
    let base = serve(router).await;
    let service = ScanService::new(ApiClient::new(&base).unwrap(), fast_polling());
    let outcome = service
        .submit_scan(&label_image(), &CancellationToken::new())
        .await;
    assert_eq!(outcome.message(), Some("No image selected"));
}

#[tokio::test]
async fn unreachable_backend_reports_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = ScanService::new(
        ApiClient::new(format!("http://{addr}")).unwrap(),
        fast_polling(),
    );
    let outcome = service
        .submit_scan(&label_image(), &CancellationToken::new())
        .await;
    assert_eq!(outcome.message(), Some(NETWORK_ERROR));
}

#[tokio::test]
async fn unknown_task_status_is_lost_connection() {
    let stub = Shared::default();
    let router = Router::new()
        .route("/api/scan", post(accept_upload))
        .route(
            "/api/tasks/{task_id}",
            get(|State(stub): State<Shared>| async move {
                stub.task_queries.fetch_add(1, Ordering::SeqCst);
                Json(json!({"data": {"status": "RUNNING"}}))
            }),
        )
        .with_state(stub.clone());
    let base = serve(router).await;
    let service = ScanService::new(ApiClient::new(&base).unwrap(), fast_polling());

    let outcome = service
        .submit_scan(&label_image(), &CancellationToken::new())
        .await;
    assert_eq!(outcome.message(), Some(LOST_CONNECTION));
    assert_eq!(stub.task_queries.load(Ordering::SeqCst), 1);
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("session=ok"))
}

fn account_router() -> Router {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "message": "Authentication required"})),
        )
            .into_response()
    };

    Router::new()
        .route(
            "/api/login",
            post(|Json(body): Json<Value>| async move {
                if body["password"] == "hunter2" {
                    (
                        [(header::SET_COOKIE, "session=ok; Path=/")],
                        Json(json!({"success": true, "message": "Logged in successfully"})),
                    )
                        .into_response()
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"success": false, "message": "Invalid credentials"})),
                    )
                        .into_response()
                }
            }),
        )
        .route(
            "/api/signup",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "success": false,
                        "message": "Invalid input",
                        "errors": {"email": ["Not a valid email address."]}
                    })),
                )
            }),
        )
        .route(
            "/api/profile",
            get(move |headers: HeaderMap| async move {
                if !has_session(&headers) {
                    return unauthorized();
                }
                Json(json!({
                    "username": "ana",
                    "healthConditions": "diabetes",
                    "allergies": "peanuts",
                    "dietType": "vegan",
                    "ingredientsToAvoid": "palm oil"
                }))
                .into_response()
            })
            .post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                if !has_session(&headers) {
                    return unauthorized();
                }
                assert_eq!(body["dietType"], "keto");
                Json(json!({"success": true, "message": "Profile updated"}))
                    .into_response()
            }),
        )
        .route(
            "/api/history",
            get(|| async {
                Json(json!({"success": true, "data": [{
                    "id": 7,
                    "productName": "Oat Bar",
                    "healthScore": 72,
                    "ecoScore": 55,
                    "image": "/uploads/oat.jpg",
                    "timestamp": "2024-05-01T12:30:00"
                }]}))
            }),
        )
        .route(
            "/api/history/clear",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "message": "Failed to clear history"})),
                )
            }),
        )
        .route(
            "/api/chat",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"response": format!("You asked: {}", body["query"].as_str().unwrap_or(""))}))
            }),
        )
        .route("/api/logout", post(|| async { Json(json!({"success": true})) }))
}

#[tokio::test]
async fn session_cookie_carries_across_calls() {
    let base = serve(account_router()).await;
    let client = ApiClient::new(&base).unwrap();

    assert!(!client.check_auth_status().await);
    assert_eq!(client.get_profile().await, None);

    let rejected = client
        .login(&Credentials {
            username: "ana".into(),
            password: "wrong".into(),
        })
        .await;
    assert!(!rejected.success);
    assert_eq!(rejected.message, "Invalid credentials");

    let accepted = client
        .login(&Credentials {
            username: "ana".into(),
            password: "hunter2".into(),
        })
        .await;
    assert!(accepted.success);
    assert!(client.check_auth_status().await);

    let profile = client.get_profile().await.unwrap();
    assert_eq!(profile.diet_type, "vegan");

    let update = ProfileUpdate {
        diet_type: "keto".into(),
        ..ProfileUpdate::from(&profile)
    };
    assert!(client.update_profile(&update).await.success);
    assert!(client.logout().await);
}

#[tokio::test]
async fn signup_validation_details_are_appended() {
    let base = serve(account_router()).await;
    let client = ApiClient::new(&base).unwrap();
    let reply = client
        .signup(&SignupRequest {
            username: "ana".into(),
            email: "nope".into(),
            password: "hunter2".into(),
        })
        .await;
    assert!(!reply.success);
    assert_eq!(
        reply.message,
        "Invalid input: email: Not a valid email address."
    );
}

#[tokio::test]
async fn history_and_chat_calls() {
    let base = serve(account_router()).await;
    let client = ApiClient::new(&base).unwrap();

    let history = client.get_history().await.into_result().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].product_name, "Oat Bar");
    assert_eq!(history[0].health_score, Some(72.0));

    let cleared = client.clear_history().await;
    assert!(!cleared.success);
    assert_eq!(cleared.message, "Failed to clear history");

    let reply = client
        .chat(&ChatRequest {
            query: "is it vegan?".into(),
            context: "Product: Oat Bar.".into(),
        })
        .await;
    assert_eq!(reply, "You asked: is it vegan?");
}

#[tokio::test]
async fn chat_falls_back_when_backend_is_missing_the_route() {
    let base = serve(Router::new()).await;
    let client = ApiClient::new(&base).unwrap();
    let reply = client
        .chat(&ChatRequest {
            query: "hello".into(),
            context: String::new(),
        })
        .await;
    assert_eq!(reply, CHAT_UNAVAILABLE);
}
