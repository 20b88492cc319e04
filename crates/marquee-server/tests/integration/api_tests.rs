use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use marquee_core::CacheBackend;
use marquee_core::models::CandidatePage;
use marquee_core::testutil::{
    MOCK_REJECTED_MESSAGE, MockPrimary, MockSecondary, forbidden, make_candidate, make_page,
};

use crate::common::setup_test_app;

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app(&MockPrimary::with_page(make_page(1)), &MockSecondary::with_urls(&[]));

    let (status, json) = get_json(app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["enrichment_mode"], "sequential");
    assert_eq!(json["enrichers"][0], "mock-secondary");
}

#[tokio::test]
async fn search_returns_enriched_aggregate_and_caches_it() {
    let primary = MockPrimary::with_page(CandidatePage {
        candidates: vec![make_candidate(156673325, "The Truman Show")],
        total: 40,
        page: 1,
        per_page: 1,
    });
    let secondary = MockSecondary::with_urls(&["https://www.youtube.com/watch?v=gVosTabd_9M"]);
    let app = setup_test_app(&primary, &secondary);

    let (status, json) = get_json(
        app.router,
        "/api/v2/movie/search?query=truman%20show&perPage=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isSuccess"], true);
    assert_eq!(json["perPage"], 1);
    assert_eq!(json["totalCount"], 40);
    assert_eq!(json["messages"].as_array().unwrap().len(), 0);

    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["video"]["id"], 156673325);
    assert_eq!(data[0]["video"]["uri"], "/videos/156673325");
    assert_eq!(
        data[0]["videoUrls"],
        serde_json::json!([
            "https://vimeo.com/156673325",
            "https://www.youtube.com/watch?v=gVosTabd_9M"
        ])
    );

    let cached = app.backend.get_string("truman show:PerPage:1").await.unwrap();
    assert!(cached.is_some());
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let primary = MockPrimary::with_page(make_page(2));
    let secondary = MockSecondary::with_urls(&["y"]);
    let app = setup_test_app(&primary, &secondary);
    let uri = "/api/v2/movie/search?query=alien&page=1&perPage=2";

    let (_, first) = get_json(app.router.clone(), uri).await;
    let (_, second) = get_json(app.router, uri).await;

    assert_eq!(first, second);
    assert_eq!(primary.call_count(), 1);
    assert_eq!(secondary.call_count(), 2);
}

#[tokio::test]
async fn missing_query_is_reported_in_messages() {
    let primary = MockPrimary::with_page(make_page(1));
    let app = setup_test_app(&primary, &MockSecondary::with_urls(&[]));

    let (status, json) = get_json(app.router, "/api/v2/movie/search?perPage=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isSuccess"], false);
    assert!(json.get("data").is_none());
    assert_eq!(json["messages"][0]["message"], "Query can not be null!");
    assert_eq!(primary.call_count(), 0);
}

#[tokio::test]
async fn no_results_is_a_failed_aggregate() {
    let app = setup_test_app(&MockPrimary::with_page(make_page(0)), &MockSecondary::with_urls(&[]));

    let (status, json) = get_json(app.router, "/api/v2/movie/search?query=ascascascasc&perPage=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isSuccess"], false);
    assert_eq!(json["perPage"], 0);
    assert_eq!(json["messages"][0]["message"], "There is no video result!");
}

#[tokio::test]
async fn secondary_rejection_keeps_primary_results() {
    let secondary = MockSecondary::with_responses(vec![Err(forbidden("mock-secondary"))]);
    let app = setup_test_app(&MockPrimary::with_page(make_page(2)), &secondary);

    let (status, json) = get_json(app.router, "/api/v2/movie/search?query=alien").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isSuccess"], false);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["messages"][0]["message"], MOCK_REJECTED_MESSAGE);
    assert_eq!(secondary.call_count(), 1);
}

#[tokio::test]
async fn malformed_page_returns_400() {
    let app = setup_test_app(&MockPrimary::with_page(make_page(1)), &MockSecondary::with_urls(&[]));

    let (status, json) = get_json(app.router, "/api/v2/movie/search?query=alien&page=first").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn openapi_document_lists_search_route() {
    let app = setup_test_app(&MockPrimary::with_page(make_page(1)), &MockSecondary::with_urls(&[]));

    let (status, json) = get_json(app.router, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/v2/movie/search"].is_object());
}
