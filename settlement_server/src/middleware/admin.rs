//! Bearer token guard for the admin routes.
//!
//! Every request must carry `Authorization: Bearer <SPG_ADMIN_TOKEN>`. If no admin token is configured, every request
//! is refused.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use futures::future::{ok, Ready};
use log::*;
use settlement_common::Secret;

use crate::errors::{AuthError, ServerError};

pub struct AdminTokenMiddlewareFactory {
    token: Secret<String>,
}

impl AdminTokenMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        AdminTokenMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminTokenMiddlewareService { token: self.token.clone(), service: Rc::new(service) })
    }
}

pub struct AdminTokenMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminTokenMiddlewareService<S>
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
        let check = check_bearer_token(req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()), &self.token);
        Box::pin(async move {
            match check {
                Ok(()) => service.call(req).await,
                Err(e) => {
                    warn!("🔐️ Admin request to {} refused. {e}", req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}

/// Checks an `Authorization` header value against the configured admin token.
pub fn check_bearer_token(header: Option<&str>, token: &Secret<String>) -> Result<(), AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let presented = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(AuthError::InvalidToken)?;
    if token.is_empty() || !constant_time_eq(presented.as_bytes(), token.reveal().as_bytes()) {
        return Err(AuthError::InvalidToken);
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
