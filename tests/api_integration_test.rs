use axum::body::Body;
use axum::http::{Request, StatusCode};
use sea_orm::ConnectionTrait;
use serde_json::Value;
use tower::ServiceExt;

mod common;
use common::{cluster, setup, setup_test_app};

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn list_names(app: &axum::Router, query: &str) -> Vec<String> {
    let (status, body) = get(app, &format!("/api/v1/clusters?{query}")).await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    let clusters: Vec<cluster::Model> = serde_json::from_slice(&body).unwrap();
    clusters.into_iter().map(|cluster| cluster.name).collect()
}

#[tokio::test]
async fn test_list_without_filters() {
    let (db, ctx) = setup().await;
    let app = setup_test_app(db, ctx);

    let (status, body) = get(&app, "/api/v1/clusters").await;
    assert_eq!(status, StatusCode::OK);
    let clusters: Vec<cluster::Model> = serde_json::from_slice(&body).unwrap();
    assert_eq!(clusters.len(), 3);
}

#[tokio::test]
async fn test_query_string_drives_the_filter_set() {
    let (db, ctx) = setup().await;
    let app = setup_test_app(db, ctx);

    assert_eq!(list_names(&app, "name__ic=core").await, vec!["core-1"]);
    assert_eq!(list_names(&app, "q=edge").await, vec!["edge-2"]);
    assert_eq!(
        list_names(&app, "status=active&status=planned&weight__n=30").await,
        vec!["core-1", "edge-2"]
    );
    assert_eq!(list_names(&app, "filter=planned").await, vec!["edge-2"]);
}

#[tokio::test]
async fn test_invalid_values_return_bad_request_with_details() {
    let (db, ctx) = setup().await;
    let app = setup_test_app(db, ctx);

    let (status, body) = get(&app, "/api/v1/clusters?weight__gte=ten&status=gone").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body: Value = serde_json::from_slice(&body).unwrap();
    let details = body["details"].as_array().expect("details should be listed");
    assert_eq!(details.len(), 2);
    let fields: Vec<&str> = details
        .iter()
        .filter_map(|detail| detail["field"].as_str())
        .collect();
    assert!(fields.contains(&"weight__gte"));
    assert!(fields.contains(&"status"));
}

#[tokio::test]
async fn test_unknown_tag_returns_bad_request() {
    let (db, ctx) = setup().await;
    let app = setup_test_app(db, ctx);

    let (status, _) = get(&app, "/api/v1/clusters?tag=missing").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_saved_filter_id_returns_bad_request() {
    let (db, ctx) = setup().await;
    let app = setup_test_app(db, ctx);

    let (status, _) = get(&app, "/api/v1/clusters?filter_id=first").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_database_errors_are_sanitized() {
    let (db, ctx) = setup().await;
    db.execute_unprepared("DROP TABLE virtualization_cluster")
        .await
        .unwrap();
    let app = setup_test_app(db, ctx);

    let (status, body) = get(&app, "/api/v1/clusters?name=core-1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8_lossy(&body);
    assert!(!body.contains("virtualization_cluster"), "{body}");
}
