//! Request-level tests for the `/patient-data` surface

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chartsync_aggregator::{router, AggregatorService};
use chartsync_domain::{MemoryStore, Table};
use chartsync_test_utils::{medication_record, patient_record, referral_record};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> (Arc<MemoryStore>, axum::Router) {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(AggregatorService::new(store.clone()));
    (store, router(service))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn get_without_patient_id_returns_400() {
    let (_, app) = app();

    let response = app
        .oneshot(Request::get("/patient-data").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "patient_id required"})
    );
}

#[tokio::test]
async fn get_with_empty_patient_id_returns_400() {
    let (_, app) = app();

    let response = app
        .oneshot(
            Request::get("/patient-data?patient_id=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_returns_full_bundle() {
    let (store, app) = app();
    store.seed(Table::Patients, [patient_record("p1", "Marcus", "Hawkins")]);
    store.seed(Table::Medications, [medication_record("m1", "p1", "Statin")]);

    let response = app
        .oneshot(
            Request::get("/patient-data?patient_id=p1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bundle = body_json(response).await;
    assert_eq!(bundle["patient"]["first_name"], json!("Marcus"));
    assert_eq!(bundle["medications"]["local"][0]["id"], json!("m1"));
    // every key present even when empty
    assert_eq!(bundle["vitals"], json!([]));
    assert_eq!(bundle["history"]["surgical"], json!([]));
    assert_eq!(bundle["billing"]["payments"], json!([]));
}

#[tokio::test]
async fn put_unknown_table_is_rejected_without_side_effect() {
    let (store, app) = app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/patient-data",
            json!({"table": "secret_table", "id": "x", "updates": {"a": 1}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn put_updates_whitelisted_row() {
    let (store, app) = app();
    store.seed(Table::Medications, [medication_record("m1", "p1", "Statin")]);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/patient-data",
            json!({"table": "patient_medications", "id": "m1", "updates": {"dose": "20mg"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["dose"], json!("20mg"));
    assert_eq!(body["data"]["name"], json!("Statin"));
}

#[tokio::test]
async fn post_inserts_and_returns_generated_id() {
    let (_, app) = app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/patient-data",
            json!({"table": "patient_problems", "record": {"patient_id": "p1", "description": "Asthma"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["id"].is_string());
    assert_eq!(body["data"]["description"], json!("Asthma"));
}

#[tokio::test]
async fn post_patients_is_rejected() {
    let (store, app) = app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/patient-data",
            json!({"table": "patients", "record": {"first_name": "Eve"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn delete_removes_row_and_reports_success() {
    let (store, app) = app();
    store.seed(Table::Referrals, [referral_record("r1", "p1")]);

    let response = app
        .oneshot(
            Request::delete("/patient-data?table=referrals&id=r1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"success": true}));
    assert_eq!(store.row_count(Table::Referrals), 0);
}

#[tokio::test]
async fn delete_appointments_is_rejected() {
    let (_, app) = app();

    let response = app
        .oneshot(
            Request::delete("/patient-data?table=appointments&id=a1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failure_surfaces_as_500() {
    let (store, app) = app();
    store.seed(Table::Medications, [medication_record("m1", "p1", "Statin")]);
    store.fail_on(Table::Medications);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/patient-data",
            json!({"table": "patient_medications", "id": "m1", "updates": {"dose": "20mg"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(response).await["error"].is_string());
}
