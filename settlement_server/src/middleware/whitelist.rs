//! Peer address guard for the payment notification routes.
//!
//! When a whitelist is configured, only requests whose remote IP is on the list reach the inner service. The remote
//! IP honours `X-Forwarded-For` and `Forwarded` if the server options say so. Requests with no discernible address are
//! refused.

use std::{future::Future, net::IpAddr, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ok, Ready};
use log::*;

use crate::{
    config::ServerOptions,
    errors::{AuthError, ServerError},
    helpers::remote_ip_from_parts,
};

pub struct PeerWhitelistMiddlewareFactory {
    whitelist: Option<Rc<Vec<IpAddr>>>,
    options: ServerOptions,
}

impl PeerWhitelistMiddlewareFactory {
    /// `None` lets every peer through.
    pub fn new(whitelist: Option<Vec<IpAddr>>, options: ServerOptions) -> Self {
        PeerWhitelistMiddlewareFactory { whitelist: whitelist.map(Rc::new), options }
    }
}

impl<S, B> Transform<S, ServiceRequest> for PeerWhitelistMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = PeerWhitelistMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(PeerWhitelistMiddlewareService {
            whitelist: self.whitelist.clone(),
            options: self.options,
            service: Rc::new(service),
        })
    }
}

pub struct PeerWhitelistMiddlewareService<S> {
    whitelist: Option<Rc<Vec<IpAddr>>>,
    options: ServerOptions,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for PeerWhitelistMiddlewareService<S>
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
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        let peer_ip = remote_ip_from_parts(
            req.headers(),
            peer_addr.as_deref(),
            self.options.use_x_forwarded_for,
            self.options.use_forwarded,
        );
        let allowed = is_whitelisted(peer_ip, self.whitelist.as_deref().map(Vec::as_slice));
        Box::pin(async move {
            if allowed {
                service.call(req).await
            } else {
                warn!("💻️ Payment notification to {} refused for peer {peer_ip:?}.", req.path());
                Err(ServerError::AuthenticationError(AuthError::ForbiddenPeer).into())
            }
        })
    }
}

pub fn is_whitelisted(peer_ip: Option<IpAddr>, whitelist: Option<&[IpAddr]>) -> bool {
    match (peer_ip, whitelist) {
        (_, None) => true,
        (Some(ip), Some(list)) => {
            info!("💻️ Payment notification from {ip}");
            list.contains(&ip)
        },
        (None, Some(_)) => {
            warn!("💻️ No IP address found in payment notifier request, denying access.");
            false
        },
    }
}
