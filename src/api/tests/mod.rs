use super::*;
use crate::pipeline::test_helpers::{CountingExtractor, create_pipeline_with_config, serve_pages, test_config};
use crate::types::Extraction;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;


/// Router over a pipeline whose extractor reports "Example Title" with three
/// pages served by `server`
struct TestApp {
    app: Router,
    pipeline: Arc<SegmentPipeline>,
    extractor: Arc<CountingExtractor>,
    server: MockServer,
    _temp_dir: TempDir,
}

async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

async fn create_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let server = MockServer::start().await;
    let images = serve_pages(&server, &[0, 1, 2]).await;
    let extractor = Arc::new(CountingExtractor::new(Extraction {
        title: "Example Title".into(),
        images,
    }));

    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir);
    configure(&mut config);

    let pipeline = Arc::new(create_pipeline_with_config(config, extractor.clone()).await);
    let app = create_router(pipeline.clone(), pipeline.get_config());

    TestApp {
        app,
        pipeline,
        extractor,
        server,
        _temp_dir: temp_dir,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_version() {
    let test = create_test_app().await;

    let response = send(&test.app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn cors_headers_present_when_enabled() {
    let test = create_test_app_with(|config| {
        config.server.api.cors_enabled = true;
        config.server.api.cors_origins = vec!["*".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&test.app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn cors_headers_absent_when_disabled() {
    let test = create_test_app_with(|config| config.server.api.cors_enabled = false).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(&test.app, request).await;

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn swagger_ui_follows_config() {
    let enabled = create_test_app_with(|config| config.server.api.swagger_ui = true).await;
    let response = send(&enabled.app, get("/swagger-ui/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let disabled = create_test_app_with(|config| config.server.api.swagger_ui = false).await;
    let response = send(&disabled.app, get("/swagger-ui/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let test = create_test_app().await;
    let response = send(&test.app, get("/downloads")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn server_answers_over_tcp_and_stops_on_signal() {
    let test = create_test_app().await;

    let mut config = (*test.pipeline.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let listener = bind(&config).await.unwrap();
    let address = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(serve(
        listener,
        test.pipeline.clone(),
        Arc::new(config),
        async move {
            stop_rx.await.ok();
        },
    ));

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/acquire?work=Example&segment=1", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // The peer address keys the segment record when no forwarding header is sent
    let record = test
        .pipeline
        .db
        .get_segment("Example", "1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.last_client.as_deref(), Some("127.0.0.1"));

    drop(response);
    drop(client);
    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
