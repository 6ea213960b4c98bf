//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Since each worker thread processes its requests sequentially, handlers must never block the current thread. Every
//! database and gateway call is awaited, so a worker can serve other requests while a checkout is waiting on the
//! payment provider.
use actix_web::{get, web, HttpResponse, Responder};
use course_payment_engine::{
    db_types::{NewCourse, TransactionId},
    traits::{CourseManagement, PaymentBackend, PaymentGateway, TransactionManagement},
    CheckoutOutcome,
    CourseApi,
    EnrollmentApi,
    NewOrderRequest,
    PaymentFlowApi,
    TransactionStateApi,
};
use log::*;

use crate::{
    data_objects::{FreeEnrollmentRequest, PaymentConfirmed, PaymentWebhook},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires admin) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AdminMiddlewareFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Courses  ----------------------------------------------------
route!(course => Get "/courses/{id}" impl CourseManagement);
pub async fn course<B: CourseManagement>(
    path: web::Path<String>,
    api: web::Data<CourseApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let course_id = path.into_inner();
    debug!("💻️ GET course {course_id}");
    let course = api.fetch_course(&course_id).await?;
    match course {
        Some(course) => Ok(HttpResponse::Ok().json(course)),
        None => Err(ServerError::NoRecordFound(format!("Course {course_id}"))),
    }
}

route!(upsert_course => Post "/admin/courses" impl CourseManagement where requires admin);
/// Route handler for the admin course endpoint
///
/// The payment flow only needs a read model of the catalog: the id, title, price, currency and whether the course is
/// published. The catalog service pushes changes here. Prices are in minor units.
pub async fn upsert_course<B: CourseManagement>(
    body: web::Json<NewCourse>,
    api: web::Data<CourseApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let course = body.into_inner();
    info!("💻️ POST upsert course {} ({} {})", course.id, course.price, course.currency);
    let course = api.upsert_course(course).await?;
    Ok(HttpResponse::Ok().json(course))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl PaymentBackend, PaymentGateway);
/// Route handler for the orders endpoint
///
/// Creates a hosted order at the payment gateway for a course and records a `pending` transaction for it. The
/// response carries the transaction id, which the client uses to open the checkout, and the gateway's order id.
pub async fn create_order<B: PaymentBackend, G: PaymentGateway>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST order for {} by {}", request.course_id, request.student_id);
    let order = api.create_order(request).await?;
    Ok(HttpResponse::Created().json(order))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout_callback => Post "/checkout/callback" impl PaymentBackend, PaymentGateway);
/// Route handler for the checkout widget's result.
///
/// The body is a tagged union on `kind`:
/// * `success` carries the gateway order id, payment id and signature. If the signature is authentic the transaction
///   completes and the student is enrolled. If not, the transaction fails and a 403 is returned.
/// * `cancelled` carries the gateway order id. The transaction fails; this is not an error.
pub async fn checkout_callback<B: PaymentBackend, G: PaymentGateway>(
    body: web::Json<CheckoutOutcome>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let outcome = body.into_inner();
    debug!("💻️ POST checkout outcome for order {}", outcome.gateway_order_id());
    let result = api.handle_checkout_outcome(outcome).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(begin_checkout => Post "/checkout/{transaction_id}" impl PaymentBackend, PaymentGateway);
pub async fn begin_checkout<B: PaymentBackend, G: PaymentGateway>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = TransactionId::from(path.into_inner());
    debug!("💻️ POST begin checkout for {id}");
    let params = api.begin_checkout(&id).await?;
    Ok(HttpResponse::Ok().json(params))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(payment_webhook => Post "/payment" impl PaymentBackend, PaymentGateway);
/// Route handler for the gateway's payment webhook.
///
/// The webhook is a second delivery path for the same confirmation the checkout widget reports, and it can race the
/// client callback. It must be mounted behind the HMAC middleware.
pub async fn payment_webhook<B: PaymentBackend, G: PaymentGateway>(
    body: web::Json<PaymentWebhook>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let PaymentWebhook { gateway_order_id, gateway_payment_id, signature } = body.into_inner();
    info!("💻️ Payment webhook for order {gateway_order_id}, payment {gateway_payment_id}");
    let (transaction, enrollment) =
        api.process_payment_confirmation(&gateway_order_id, &gateway_payment_id, &signature).await?;
    Ok(HttpResponse::Ok().json(PaymentConfirmed { transaction, enrollment }))
}

//----------------------------------------------   Enrollments  ----------------------------------------------------
route!(enroll_free => Post "/enrollments/free" impl PaymentBackend);
pub async fn enroll_free<B: PaymentBackend>(
    body: web::Json<FreeEnrollmentRequest>,
    api: web::Data<EnrollmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let FreeEnrollmentRequest { student_id, course_id } = body.into_inner();
    debug!("💻️ POST free enrollment of {student_id} in {course_id}");
    let enrollment = api.enroll_free(&student_id, &course_id).await?;
    Ok(HttpResponse::Ok().json(enrollment))
}

route!(enrollments => Get "/enrollments/{student_id}" impl PaymentBackend);
pub async fn enrollments<B: PaymentBackend>(
    path: web::Path<String>,
    api: web::Data<EnrollmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let student_id = path.into_inner();
    debug!("💻️ GET enrollments for {student_id}");
    let enrollments = api.enrollments_for_student(&student_id).await?;
    Ok(HttpResponse::Ok().json(enrollments))
}

//----------------------------------------------   Transactions  ----------------------------------------------------
route!(transaction => Get "/transactions/{id}" impl TransactionManagement);
pub async fn transaction<B: TransactionManagement>(
    path: web::Path<String>,
    api: web::Data<TransactionStateApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = TransactionId::from(path.into_inner());
    debug!("💻️ GET transaction {id}");
    let tx = api.fetch_transaction(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Transaction {id}")))?;
    Ok(HttpResponse::Ok().json(tx))
}

route!(student_transactions => Get "/students/{student_id}/transactions" impl PaymentBackend, PaymentGateway);
pub async fn student_transactions<B: PaymentBackend, G: PaymentGateway>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let student_id = path.into_inner();
    debug!("💻️ GET transactions for {student_id}");
    let transactions = api.transactions_for_student(&student_id).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

route!(refund => Post "/admin/transactions/{id}/refund" impl PaymentBackend, PaymentGateway where requires admin);
/// Route handler for refunds
///
/// Only completed payments can be refunded. The money itself is returned through the gateway's dashboard; this call
/// records the refund and notifies listeners. The student's enrollment is left as it is.
pub async fn refund<B: PaymentBackend, G: PaymentGateway>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = TransactionId::from(path.into_inner());
    info!("💻️ POST refund for transaction {id}");
    let tx = api.refund(&id).await?;
    Ok(HttpResponse::Ok().json(tx))
}
