//! Admin access middleware for the course payment server.
//! This middleware can be placed on any route or service.
//!
//! It checks the `cpg_admin_token` header of the incoming request against the [`AdminToken`] registered as app data.
//! If the tokens match, the request is allowed to continue. Otherwise, a 403 Forbidden response is returned. If no
//! admin token has been configured, every request is denied.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorForbidden,
    web,
    Error,
};
use cpg_common::Secret;
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::helpers::{header_value, tokens_match};

pub const ADMIN_TOKEN_HEADER: &str = "cpg_admin_token";

/// The configured admin token. Register it with `App::app_data(web::Data::new(AdminToken::new(..)))`.
#[derive(Debug, Clone, Default)]
pub struct AdminToken(Secret<String>);

impl AdminToken {
    pub fn new(token: Secret<String>) -> Self {
        Self(token)
    }

    pub fn is_configured(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn matches(&self, provided: &str) -> bool {
        tokens_match(self.0.reveal(), provided)
    }
}

#[derive(Default)]
pub struct AdminMiddlewareFactory;

impl AdminMiddlewareFactory {
    pub fn new() -> Self {
        AdminMiddlewareFactory
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminMiddlewareService { service: Rc::new(service) })
    }
}

pub struct AdminMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let allowed = match req.app_data::<web::Data<AdminToken>>() {
                Some(token) if token.is_configured() => {
                    header_value(req.request(), ADMIN_TOKEN_HEADER).is_some_and(|provided| token.matches(provided))
                },
                _ => {
                    warn!("🔐️ No admin token is configured. Admin route {} is closed.", req.path());
                    false
                },
            };
            if allowed {
                service.call(req).await
            } else {
                warn!("🔐️ Denied admin request to {} from {:?}", req.path(), req.peer_addr());
                Err(ErrorForbidden("Insufficient permissions"))
            }
        })
    }
}
