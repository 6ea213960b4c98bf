use actix_web::{http::StatusCode, test, test::TestRequest, App};
use course_payment_engine::{
    db_types::{Enrollment, TransactionStatus},
    traits::EnrollmentManagement,
    CheckoutParams,
    CheckoutResult,
};
use serde_json::json;

use super::{
    helpers::{flow_api, place_order, route_config, send, sign_payment, TestDb, COURSE_ID, FREE_COURSE_ID},
    mocks::{issuing_gateway, MockGateway},
};
use crate::server::configure_routes;

#[actix_web::test]
async fn begin_checkout() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(1));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let order = place_order(&app, "alice").await;
    let uri = format!("/checkout/{}", order.transaction_id);
    let (status, body) = send(&app, TestRequest::post().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let params: CheckoutParams = serde_json::from_str(&body).unwrap();
    assert_eq!(params.gateway_key_id, "rzp_test_mock");
    assert_eq!(params.gateway_order_id, order.gateway_order_id);
    assert_eq!(params.amount.value(), 50_000);
    assert_eq!(params.currency, "INR");

    // The widget is already open for this transaction
    let (status, _) = send(&app, TestRequest::post().uri(&uri)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, TestRequest::post().uri("/checkout/txn_unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    db.close().await;
}

#[actix_web::test]
async fn successful_payment_enrolls_student() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(1));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let order = place_order(&app, "alice").await;
    let signature = sign_payment(&order.gateway_order_id, "pay_29QQoUBi66xm2f");
    let outcome = json!({
        "kind": "success",
        "razorpay_order_id": order.gateway_order_id,
        "razorpay_payment_id": "pay_29QQoUBi66xm2f",
        "razorpay_signature": signature,
    });
    let (status, body) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&outcome)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: CheckoutResult = serde_json::from_str(&body).unwrap();
    let CheckoutResult::Paid { transaction, enrollment } = result else {
        panic!("Expected a paid result, got {body}");
    };
    assert_eq!(transaction.status, TransactionStatus::Completed);
    assert_eq!(transaction.gateway_payment_id.as_deref(), Some("pay_29QQoUBi66xm2f"));
    assert_eq!(enrollment.course_id, COURSE_ID);

    // Repeating the callback changes nothing
    let (status, body) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&outcome)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = send(&app, TestRequest::get().uri("/enrollments/alice")).await;
    assert_eq!(status, StatusCode::OK);
    let enrollments: Vec<Enrollment> = serde_json::from_str(&body).unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0].id, enrollment.id);
    db.close().await;
}

#[actix_web::test]
async fn tampered_signature_is_forbidden() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(1));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let order = place_order(&app, "alice").await;
    let mut signature = sign_payment(&order.gateway_order_id, "pay_29QQoUBi66xm2f");
    let flipped = if signature.starts_with('a') { "b" } else { "a" };
    signature.replace_range(0..1, flipped);
    let outcome = json!({
        "kind": "success",
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": "pay_29QQoUBi66xm2f",
        "signature": signature,
    });
    let (status, body) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&outcome)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let tx = db.transaction(&order.transaction_id).await;
    assert_eq!(tx.status, TransactionStatus::Failed);
    assert!(tx.gateway_payment_id.is_none());
    assert!(db.db.fetch_enrollment("alice", COURSE_ID).await.unwrap().is_none());
    db.close().await;
}

#[actix_web::test]
async fn uppercased_signature_is_forbidden() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(1));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let order = place_order(&app, "alice").await;
    let signature = sign_payment(&order.gateway_order_id, "pay_29QQoUBi66xm2f");
    let uppercased = signature.to_uppercase();
    assert_ne!(uppercased, signature);
    let outcome = json!({
        "kind": "success",
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": "pay_29QQoUBi66xm2f",
        "signature": uppercased,
    });
    let (status, body) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&outcome)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    let tx = db.transaction(&order.transaction_id).await;
    assert_eq!(tx.status, TransactionStatus::Failed);
    db.close().await;
}

#[actix_web::test]
async fn dismissed_checkout() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(1));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let order = place_order(&app, "alice").await;
    let (status, _) = send(&app, TestRequest::post().uri(&format!("/checkout/{}", order.transaction_id))).await;
    assert_eq!(status, StatusCode::OK);
    let outcome = json!({ "kind": "cancelled", "gateway_order_id": order.gateway_order_id });
    let (status, body) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&outcome)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: CheckoutResult = serde_json::from_str(&body).unwrap();
    assert!(matches!(result, CheckoutResult::Dismissed { .. }));
    assert_eq!(result.transaction().status, TransactionStatus::Failed);
    assert!(db.db.fetch_enrollment("alice", COURSE_ID).await.unwrap().is_none());

    // A late success for the dismissed attempt cannot complete it
    let signature = sign_payment(&order.gateway_order_id, "pay_late");
    let outcome = json!({
        "kind": "success",
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": "pay_late",
        "signature": signature,
    });
    let (status, _) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&outcome)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    db.close().await;
}

#[actix_web::test]
async fn unknown_callback_kind() {
    let db = TestDb::new().await;
    let api = flow_api(&db, MockGateway::new());
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let outcome = json!({ "kind": "refunded", "gateway_order_id": "order_mock0001" });
    let (status, _) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&outcome)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let outcome = json!({ "kind": "cancelled", "gateway_order_id": "order_nobody_created" });
    let (status, _) = send(&app, TestRequest::post().uri("/checkout/callback").set_json(&outcome)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    db.close().await;
}

#[actix_web::test]
async fn free_enrollment() {
    let db = TestDb::new().await;
    let api = flow_api(&db, MockGateway::new());
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let request = json!({ "student_id": "carol", "course_id": FREE_COURSE_ID });
    let (status, body) = send(&app, TestRequest::post().uri("/enrollments/free").set_json(&request)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let first: Enrollment = serde_json::from_str(&body).unwrap();
    let (status, body) = send(&app, TestRequest::post().uri("/enrollments/free").set_json(&request)).await;
    assert_eq!(status, StatusCode::OK);
    let second: Enrollment = serde_json::from_str(&body).unwrap();
    assert_eq!(first.id, second.id);

    let request = json!({ "student_id": "carol", "course_id": COURSE_ID });
    let (status, _) = send(&app, TestRequest::post().uri("/enrollments/free").set_json(&request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(db.db.fetch_enrollment("carol", COURSE_ID).await.unwrap().is_none());
    db.close().await;
}
