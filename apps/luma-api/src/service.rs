//! Hyper `Service` answering the API routes.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use http::StatusCode;
use hyper::body::Incoming;

use crate::body::ApiBody;
use crate::response::{self, Message};
use crate::router::{Resolution, resolve};

/// The API as a hyper service. Stateless; clones are free.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiService;

impl ApiService {
    /// Create the service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Answer a request. The body is never read.
    #[must_use]
    pub fn handle<B>(&self, req: &http::Request<B>) -> http::Response<ApiBody> {
        match resolve(req.method(), req.uri().path()) {
            Resolution::Matched(route) => {
                let message = Message {
                    message: route.message().to_owned(),
                };
                response::json(StatusCode::OK, &message).unwrap_or_else(|e| {
                    tracing::error!(error = %e, "failed to encode response");
                    response::internal_error()
                })
            }
            Resolution::Redirect(location) => {
                response::redirect(StatusCode::MOVED_PERMANENTLY, location)
            }
            Resolution::NotFound => response::not_found(),
        }
    }
}

impl hyper::service::Service<http::Request<Incoming>> for ApiService {
    type Response = http::Response<ApiBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let started = Instant::now();
        let response = self.handle(&req);
        tracing::info!(
            method = %req.method(),
            path = %req.uri().path(),
            status = response.status().as_u16(),
            latency_us = started.elapsed().as_micros(),
            "handled request",
        );
        Box::pin(async move { Ok(response) })
    }
}
