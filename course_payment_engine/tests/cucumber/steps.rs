use cpg_common::MinorUnits;
use course_payment_engine::{
    db_types::TransactionStatus,
    CheckoutOutcome,
    CheckoutResult,
    NewOrderRequest,
    PaymentFlowError,
};
use cucumber::{then, when};

use crate::cucumber::{payment_world::pair, PaymentWorld};

#[when(expr = "{word} orders {word} for {int} {word}")]
async fn place_order(world: &mut PaymentWorld, student: String, course: String, amount: i64, currency: String) {
    let request = NewOrderRequest::new(student.as_str(), course.as_str(), MinorUnits::from(amount), currency.as_str());
    let result = world.api().create_order(request).await;
    if let Some(order) = world.record_result(result) {
        world.orders.entry(pair(&student, &course)).or_default().push(order);
    }
}

#[when(expr = "{word} opens the checkout for {word}")]
async fn open_checkout(world: &mut PaymentWorld, student: String, course: String) {
    let order = world.latest_order(&student, &course);
    let result = world.api().begin_checkout(&order.transaction_id).await;
    if let Some(params) = world.record_result(result) {
        assert_eq!(params.gateway_order_id, order.gateway_order_id);
        assert_eq!(params.transaction_id, order.transaction_id);
    }
}

#[when(expr = "{word} pays for {word} with a valid signature")]
async fn pay_valid(world: &mut PaymentWorld, student: String, course: String) {
    let order = world.latest_order(&student, &course);
    let (payment_id, signature) = world.system().gateway.pay(&order.gateway_order_id);
    submit_payment(world, &student, &course, payment_id, signature).await;
}

#[when(expr = "{word} pays for {word} with a tampered signature")]
async fn pay_tampered(world: &mut PaymentWorld, student: String, course: String) {
    let order = world.latest_order(&student, &course);
    let (payment_id, _) = world.system().gateway.pay(&order.gateway_order_id);
    let forged = world.system().gateway.sign(&order.gateway_order_id, "pay_someone_else");
    submit_payment(world, &student, &course, payment_id, forged).await;
}

#[when(expr = "the payment confirmation for {word} by {word} is delivered again")]
async fn repeat_payment(world: &mut PaymentWorld, course: String, student: String) {
    let (payment_id, signature) =
        world.payments.get(&pair(&student, &course)).cloned().expect("No payment has been made yet");
    submit_payment(world, &student, &course, payment_id, signature).await;
}

#[when(expr = "a different payment for {word} by {word} is confirmed")]
async fn different_payment(world: &mut PaymentWorld, course: String, student: String) {
    let order = world.latest_order(&student, &course);
    let (payment_id, signature) = world.system().gateway.pay(&order.gateway_order_id);
    let result = world.api().process_payment_confirmation(&order.gateway_order_id, &payment_id, &signature).await;
    world.record_result(result);
}

async fn submit_payment(world: &mut PaymentWorld, student: &str, course: &str, payment_id: String, signature: String) {
    let order = world.latest_order(student, course);
    world.payments.insert(pair(student, course), (payment_id.clone(), signature.clone()));
    let outcome = CheckoutOutcome::Success {
        gateway_order_id: order.gateway_order_id,
        gateway_payment_id: payment_id,
        signature,
    };
    let result = world.api().handle_checkout_outcome(outcome).await;
    if let Some(result) = world.record_result(result) {
        assert!(matches!(result, CheckoutResult::Paid { .. }), "Expected a paid checkout, got {result:?}");
    }
}

#[when(expr = "{word} dismisses the checkout for {word}")]
async fn dismiss(world: &mut PaymentWorld, student: String, course: String) {
    let order = world.latest_order(&student, &course);
    let outcome = CheckoutOutcome::Cancelled { gateway_order_id: order.gateway_order_id };
    let result = world.api().handle_checkout_outcome(outcome).await;
    if let Some(result) = world.record_result(result) {
        assert!(matches!(result, CheckoutResult::Dismissed { .. }), "Expected a dismissal, got {result:?}");
    }
}

#[when(expr = "an administrator refunds the payment of {word} for {word}")]
async fn refund(world: &mut PaymentWorld, student: String, course: String) {
    let order = world.latest_order(&student, &course);
    let result = world.api().refund(&order.transaction_id).await;
    world.record_result(result);
}

#[when(expr = "{word} enrolls for free in {word}")]
async fn enroll_free(world: &mut PaymentWorld, student: String, course: String) {
    let result = world.api().enrollments().enroll_free(&student, &course).await;
    world.record_result(result);
}

#[when(expr = "the transaction of {word} for {word} is moved to {word}")]
async fn move_transaction(world: &mut PaymentWorld, student: String, course: String, status: String) {
    let order = world.latest_order(&student, &course);
    let status: TransactionStatus = status.parse().expect("Not a transaction status");
    let payment_id = world.payments.get(&pair(&student, &course)).map(|(p, _)| p.clone());
    let result = world.api().transactions().transition(&order.transaction_id, status, payment_id).await;
    world.record_result(result);
}

#[when(expr = "pending transactions older than {int}ms expire")]
async fn expire(world: &mut PaymentWorld, ms: i64) {
    tokio::time::sleep(std::time::Duration::from_millis(ms.unsigned_abs() + 10)).await;
    let result = world.api().expire_stale_transactions(chrono::Duration::milliseconds(ms)).await;
    world.record_result(result);
}

#[then(expr = "the transaction of {word} for {word} is {word}")]
async fn check_status(world: &mut PaymentWorld, student: String, course: String, status: String) {
    let order = world.latest_order(&student, &course);
    let tx = world.transaction(&order).await;
    assert_eq!(tx.status.to_string(), status, "Unexpected status for {}", tx.id);
    assert_eq!(tx.gateway_payment_id.is_some(), tx.status.carries_payment_id());
}

#[then(expr = "attempt {int} of {word} for {word} is {word}")]
async fn check_attempt_status(world: &mut PaymentWorld, n: usize, student: String, course: String, status: String) {
    let order = world.nth_order(&student, &course, n - 1);
    let tx = world.transaction(&order).await;
    assert_eq!(tx.status.to_string(), status, "Unexpected status for attempt {n}");
}

#[then(expr = "the transaction of {word} for {word} has a gateway order id")]
async fn check_order_id(world: &mut PaymentWorld, student: String, course: String) {
    let order = world.latest_order(&student, &course);
    let tx = world.transaction(&order).await;
    assert!(!tx.gateway_order_id.is_empty());
    assert_eq!(tx.gateway_order_id, order.gateway_order_id);
}

#[then(expr = "the transaction of {word} for {word} records the payment")]
async fn check_payment_recorded(world: &mut PaymentWorld, student: String, course: String) {
    let order = world.latest_order(&student, &course);
    let tx = world.transaction(&order).await;
    let (payment_id, _) = world.payments.get(&pair(&student, &course)).cloned().expect("No payment has been made");
    assert_eq!(tx.gateway_payment_id, Some(payment_id));
}

#[then(expr = "{word} is enrolled in {word}")]
async fn check_enrolled(world: &mut PaymentWorld, student: String, course: String) {
    let enrollment = world.api().enrollments().enrollment(&student, &course).await.expect("Error fetching enrollment");
    let enrollment = enrollment.unwrap_or_else(|| panic!("{student} is not enrolled in {course}"));
    assert_eq!(enrollment.progress, 0);
    assert!(!enrollment.completed);
}

#[then(expr = "{word} is not enrolled in {word}")]
async fn check_not_enrolled(world: &mut PaymentWorld, student: String, course: String) {
    let enrollment = world.api().enrollments().enrollment(&student, &course).await.expect("Error fetching enrollment");
    assert!(enrollment.is_none(), "{student} should not be enrolled in {course}");
}

#[then(expr = "{word} has {int} enrollment(s)")]
async fn count_enrollments(world: &mut PaymentWorld, student: String, count: usize) {
    let enrollments = world.api().enrollments().enrollments_for_student(&student).await.expect("Error");
    assert_eq!(enrollments.len(), count);
}

#[then(expr = "{word} has {int} transaction(s)")]
async fn count_transactions(world: &mut PaymentWorld, student: String, count: usize) {
    let transactions = world.api().transactions_for_student(&student).await.expect("Error");
    assert_eq!(transactions.len(), count);
}

#[then(expr = "the gateway created {int} order(s)")]
async fn count_gateway_orders(world: &mut PaymentWorld, count: u64) {
    assert_eq!(world.system().gateway.orders_created(), count);
}

#[then("the request succeeds")]
async fn request_succeeds(world: &mut PaymentWorld) {
    assert!(world.last_error.is_none(), "Unexpected error: {:?}", world.last_error);
}

#[then(expr = "the request fails with {word}")]
async fn request_fails(world: &mut PaymentWorld, kind: String) {
    let err = world.last_error.as_ref().expect("The last request did not fail");
    let name = match err {
        PaymentFlowError::InvalidRequest(_) => "InvalidRequest",
        PaymentFlowError::GatewayUnavailable(_) => "GatewayUnavailable",
        PaymentFlowError::SignatureMismatch(_) => "SignatureMismatch",
        PaymentFlowError::IllegalTransition { .. } => "IllegalTransition",
        PaymentFlowError::TransactionNotFound(_) => "TransactionNotFound",
        PaymentFlowError::CheckoutInFlight(_) => "CheckoutInFlight",
        PaymentFlowError::DatabaseError(_) => "DatabaseError",
    };
    assert_eq!(name, kind, "Unexpected error: {err}");
}
