//! End-to-end acquisition against a fake reader site
//!
//! Exercises the real HTTP extractor, image retriever, SQLite store and PDF
//! renderer, both through the library API and through the REST router.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{assert_pages_in_order, mount_segment, requests_to, test_config};
use segment_dl::{AcquireRequest, Error, ExtractionError, SegmentPipeline};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn create_pipeline(server: &MockServer) -> (SegmentPipeline, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, &server.uri());
    let pipeline = SegmentPipeline::new(config).await.unwrap();
    (pipeline, temp_dir)
}

#[tokio::test]
async fn pages_are_assembled_in_index_order() {
    let server = MockServer::start().await;
    // Listed out of order on the page; data-index decides
    mount_segment(&server, "example", "5", "Example Title", &[2, 0, 3, 1]).await;
    let (pipeline, temp_dir) = create_pipeline(&server).await;

    let outcome = pipeline
        .acquire(AcquireRequest::new("example", "5"), "203.0.113.9")
        .await
        .unwrap();

    assert!(!outcome.is_cached());
    assert_eq!(outcome.title(), "Example Title");
    assert_eq!(
        outcome.document(),
        &temp_dir.path().join("documents").join("Example_Title.pdf")
    );
    assert_pages_in_order(outcome.document(), &[0, 1, 2, 3]);

    let leftover = std::fs::read_dir(temp_dir.path().join("staging"))
        .unwrap()
        .count();
    assert_eq!(leftover, 0, "staging area must be removed after assembly");
    // The site logo carries another class and is never fetched
    assert_eq!(requests_to(&server, "/logo.png").await, 0);
}

#[tokio::test]
async fn repeat_request_touches_neither_page_nor_images() {
    let server = MockServer::start().await;
    mount_segment(&server, "example", "6", "Repeat", &[0, 1]).await;
    let (pipeline, _temp_dir) = create_pipeline(&server).await;

    let first = pipeline
        .acquire(AcquireRequest::new("example", "6"), "a")
        .await
        .unwrap();
    let page_hits = requests_to(&server, "/read/").await;
    let image_hits = requests_to(&server, "/img/").await;
    assert_eq!((page_hits, image_hits), (1, 2));

    let second = pipeline
        .acquire(AcquireRequest::new("example", "6"), "b")
        .await
        .unwrap();

    assert!(second.is_cached());
    assert_eq!(second.document(), first.document());
    assert_eq!(requests_to(&server, "/read/").await, page_hits);
    assert_eq!(requests_to(&server, "/img/").await, image_hits);

    let record = pipeline
        .db
        .get_segment("example", "6")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.request_count, 2);
}

#[tokio::test]
async fn page_without_title_fails_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/read/untitled/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><img class=\"page-image\" data-index=\"0\" src=\"/a.png\"></body></html>",
        ))
        .mount(&server)
        .await;
    let (pipeline, _temp_dir) = create_pipeline(&server).await;

    let result = pipeline
        .acquire(AcquireRequest::new("untitled", "1"), "a")
        .await;

    assert!(matches!(
        result,
        Err(Error::Extraction(ExtractionError::Markup { .. }))
    ));
    let record = pipeline
        .db
        .get_segment("untitled", "1")
        .await
        .unwrap()
        .unwrap();
    assert!(record.canonical_title.is_none());
    assert!(record.completed_at.is_none());
}

#[tokio::test]
async fn missing_reader_page_reports_status() {
    let server = MockServer::start().await;
    let (pipeline, _temp_dir) = create_pipeline(&server).await;

    let result = pipeline
        .acquire(AcquireRequest::new("gone", "1"), "a")
        .await;

    assert!(matches!(
        result,
        Err(Error::Extraction(ExtractionError::Status { status: 404, .. }))
    ));
}

#[tokio::test]
async fn download_mode_round_trip_over_http() {
    let server = MockServer::start().await;
    mount_segment(&server, "my-work", "12", "My Work: Part 12", &[0, 1, 2]).await;
    let (pipeline, _temp_dir) = create_pipeline(&server).await;
    let pipeline = Arc::new(pipeline);
    let app = segment_dl::api::create_router(pipeline.clone(), pipeline.get_config());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/acquire?work=my-work&segment=12&mode=download")
                .header("X-Forwarded-For", "198.51.100.4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(location, "/document?work=My%20Work%3A%20Part%2012");

    let response = app
        .oneshot(
            Request::builder()
                .uri(location.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"My_Work__Part_12.pdf\""
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let document = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(document.get_pages().len(), 3);

    let record = pipeline
        .db
        .get_segment("my-work", "12")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.last_client.as_deref(), Some("198.51.100.4"));
}
