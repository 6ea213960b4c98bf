use actix_web::{http::StatusCode, test, test::TestRequest, App};
use course_payment_engine::{
    db_types::{Course, PaymentTransaction, TransactionStatus},
    traits::EnrollmentManagement,
};
use cpg_common::Secret;
use serde_json::json;

use super::{
    helpers::{flow_api, place_order, route_config, send, sign_payment, TestDb, ADMIN_TOKEN, COURSE_ID},
    mocks::{issuing_gateway, MockGateway},
};
use crate::{
    middleware::{AdminToken, ADMIN_TOKEN_HEADER},
    server::configure_routes,
};

fn new_course() -> serde_json::Value {
    json!({ "id": "async-rust", "title": "Async Rust", "price": 120000, "currency": "inr" })
}

#[actix_web::test]
async fn admin_routes_need_the_token() {
    let db = TestDb::new().await;
    let api = flow_api(&db, MockGateway::new());
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let (status, _) = send(&app, TestRequest::post().uri("/admin/courses").set_json(new_course())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::post()
        .uri("/admin/courses")
        .insert_header((ADMIN_TOKEN_HEADER, "endpoint-test-admin-tokeN"))
        .set_json(new_course());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, TestRequest::post().uri("/admin/transactions/txn_any/refund")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    db.close().await;
}

#[actix_web::test]
async fn admin_routes_are_closed_without_a_configured_token() {
    let db = TestDb::new().await;
    let api = flow_api(&db, MockGateway::new());
    let mut routes = route_config();
    routes.admin_token = AdminToken::new(Secret::default());
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, routes))).await;

    let req = TestRequest::post().uri("/admin/courses").insert_header((ADMIN_TOKEN_HEADER, "")).set_json(new_course());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    db.close().await;
}

#[actix_web::test]
async fn upsert_course() {
    let db = TestDb::new().await;
    let api = flow_api(&db, MockGateway::new());
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let req =
        TestRequest::post().uri("/admin/courses").insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN)).set_json(new_course());
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let course: Course = serde_json::from_str(&body).unwrap();
    assert_eq!(course.currency, "INR");
    assert!(course.published);

    let (status, body) = send(&app, TestRequest::get().uri("/courses/async-rust")).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Course = serde_json::from_str(&body).unwrap();
    assert_eq!(fetched.price.value(), 120_000);

    let invalid = json!({ "id": "async-rust", "title": "", "price": 120000, "currency": "INR" });
    let req = TestRequest::post().uri("/admin/courses").insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN)).set_json(invalid);
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    db.close().await;
}

#[actix_web::test]
async fn refund_completed_payment() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(1));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let order = place_order(&app, "alice").await;
    let refund_uri = format!("/admin/transactions/{}/refund", order.transaction_id);

    // Pending payments cannot be refunded
    let req = TestRequest::post().uri(&refund_uri).insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let callback = json!({
        "kind": "success",
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": "pay_refund01",
        "signature": sign_payment(&order.gateway_order_id, "pay_refund01"),
    });
    let (status, _) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&callback)).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::post().uri(&refund_uri).insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let tx: PaymentTransaction = serde_json::from_str(&body).unwrap();
    assert_eq!(tx.status, TransactionStatus::Refunded);
    assert_eq!(tx.gateway_payment_id.as_deref(), Some("pay_refund01"));
    assert!(db.db.fetch_enrollment("alice", COURSE_ID).await.unwrap().is_some());

    // A late redelivery of the refunded payment is acknowledged without changing anything
    let (status, body) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&callback)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(db.transaction(&order.transaction_id).await.status, TransactionStatus::Refunded);

    // A different payment for the same order is not
    let other = json!({
        "kind": "success",
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": "pay_refund02",
        "signature": sign_payment(&order.gateway_order_id, "pay_refund02"),
    });
    let (status, _) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&other)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = TestRequest::post().uri("/admin/transactions/txn_missing/refund").insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    db.close().await;
}
