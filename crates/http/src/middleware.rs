use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, header};
use axum::response::Response;
use tower::{Layer, Service};

use tollgate_core::CallerContext;
use tollgate_gate::{AdmissionGate, RequestContext};

use crate::response::{annotate_response, too_many_requests};

/// Tower layer that gates every request through the admission engine.
#[derive(Clone)]
pub struct AdmissionLayer {
    gate: Arc<AdmissionGate>,
}

impl AdmissionLayer {
    #[must_use]
    pub fn new(gate: Arc<AdmissionGate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Tower service that enforces admission control on requests.
///
/// An authentication layer upstream may insert a [`CallerContext`] into the
/// request extensions; requests without one are treated as anonymous and
/// keyed by network origin plus client signature.
#[derive(Clone)]
pub struct AdmissionService<S> {
    inner: S,
    gate: Arc<AdmissionGate>,
}

impl<S> Service<Request<Body>> for AdmissionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let caller = caller_context(&req);
            let ctx = RequestContext::new(req.uri().path(), caller);

            let decision = gate.admit(&ctx).await;
            if !decision.allowed {
                return Ok(too_many_requests(&decision));
            }

            let response = inner.call(req).await?;
            Ok(annotate_response(response, &decision))
        })
    }
}

/// Resolve the caller for a request.
///
/// Prefers the identity installed by the auth collaborator; otherwise
/// derives an anonymous context from the forwarded address (or the socket
/// peer) and the `User-Agent` header.
fn caller_context(req: &Request<Body>) -> CallerContext {
    if let Some(caller) = req.extensions().get::<CallerContext>() {
        return caller.clone();
    }

    let ip = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_owned())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_owned());

    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    CallerContext::Anonymous { ip, user_agent }
}
