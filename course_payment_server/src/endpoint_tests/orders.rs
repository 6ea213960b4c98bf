use actix_web::{http::StatusCode, test, test::TestRequest, App};
use course_payment_engine::{
    db_types::{PaymentTransaction, TransactionStatus},
    traits::{GatewayError, TransactionManagement},
    NewOrderRequest,
};
use cpg_common::MinorUnits;

use super::{
    helpers::{flow_api, order_request, place_order, route_config, send, TestDb, COURSE_ID},
    mocks::{issuing_gateway, MockGateway},
};
use crate::server::configure_routes;

#[actix_web::test]
async fn create_order() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(1));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let order = place_order(&app, "alice").await;
    assert_eq!(order.gateway_order_id, "order_mock0001");
    let tx = db.transaction(&order.transaction_id).await;
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.amount, MinorUnits::from(50_000));
    assert_eq!(tx.student_id, "alice");
    assert!(tx.gateway_payment_id.is_none());
    db.close().await;
}

#[actix_web::test]
async fn create_order_for_wrong_price() {
    let db = TestDb::new().await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().never();
    let api = flow_api(&db, gateway);
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let request = NewOrderRequest::new("alice", COURSE_ID, MinorUnits::from(100), "INR");
    let (status, body) = send(&app, TestRequest::post().uri("/orders").set_json(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("error"), "{body}");

    let request = NewOrderRequest::new("alice", COURSE_ID, MinorUnits::from(-50_000), "INR");
    let (status, _) = send(&app, TestRequest::post().uri("/orders").set_json(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = NewOrderRequest::new("alice", "no-such-course", MinorUnits::from(50_000), "INR");
    let (status, _) = send(&app, TestRequest::post().uri("/orders").set_json(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(db.db.fetch_transactions_for_student("alice").await.unwrap().is_empty());
    db.close().await;
}

#[actix_web::test]
async fn create_order_when_gateway_is_down() {
    let db = TestDb::new().await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_order()
        .times(1)
        .returning(|_, _, _| Err(GatewayError::Unavailable("connection refused".into())));
    let api = flow_api(&db, gateway);
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let (status, body) = send(&app, TestRequest::post().uri("/orders").set_json(order_request("alice"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("connection refused"), "{body}");
    assert!(db.db.fetch_transactions_for_student("alice").await.unwrap().is_empty());
    db.close().await;
}

#[actix_web::test]
async fn malformed_order_body() {
    let db = TestDb::new().await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().never();
    let api = flow_api(&db, gateway);
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("content-type", "application/json"))
        .set_payload(r#"{"student_id":"alice","course_id":"rust-101","amount":"lots"}"#);
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    db.close().await;
}

#[actix_web::test]
async fn new_order_supersedes_pending_attempt() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(2));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let first = place_order(&app, "alice").await;
    let second = place_order(&app, "alice").await;
    assert_eq!(db.transaction(&first.transaction_id).await.status, TransactionStatus::Failed);
    assert_eq!(db.transaction(&second.transaction_id).await.status, TransactionStatus::Pending);

    let (status, body) = send(&app, TestRequest::get().uri("/students/alice/transactions")).await;
    assert_eq!(status, StatusCode::OK);
    let transactions: Vec<PaymentTransaction> = serde_json::from_str(&body).unwrap();
    assert_eq!(transactions.len(), 2);
    db.close().await;
}

#[actix_web::test]
async fn fetch_transaction() {
    let db = TestDb::new().await;
    let api = flow_api(&db, issuing_gateway(1));
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let order = place_order(&app, "bob").await;
    let (status, body) = send(&app, TestRequest::get().uri(&format!("/transactions/{}", order.transaction_id))).await;
    assert_eq!(status, StatusCode::OK);
    let tx: PaymentTransaction = serde_json::from_str(&body).unwrap();
    assert_eq!(tx.id, order.transaction_id);
    assert_eq!(tx.gateway_order_id, order.gateway_order_id);

    let (status, body) = send(&app, TestRequest::get().uri("/transactions/txn_doesnotexist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("txn_doesnotexist"), "{body}");
    db.close().await;
}

#[actix_web::test]
async fn course_lookup_and_health() {
    let db = TestDb::new().await;
    let api = flow_api(&db, MockGateway::new());
    let app = test::init_service(App::new().configure(|cfg| configure_routes(cfg, api, route_config()))).await;

    let (status, body) = send(&app, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");

    let (status, body) = send(&app, TestRequest::get().uri(&format!("/courses/{COURSE_ID}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""price":50000"#), "{body}");

    let (status, _) = send(&app, TestRequest::get().uri("/courses/cobol-for-beginners")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    db.close().await;
}
