//! Serves a chain over HTTP
//!
//! Traversals are synchronous, so each request runs its chain on the blocking
//! thread pool and the buffered result is converted into an axum response.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, Uri, Version},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::{debug, error, warn};

use super::error::ApiError;
use crate::config::ChainConfig;
use crate::domain::chain::{BufferedResponse, Chain, Request, ResponseWriter};

/// A chain mounted as an HTTP endpoint
#[derive(Debug, Clone)]
pub struct ChainService {
    chain: Arc<Chain>,
    clone_per_request: bool,
    max_body_bytes: usize,
}

impl ChainService {
    pub fn new(chain: Arc<Chain>) -> Self {
        Self::from_config(chain, &ChainConfig::default())
    }

    pub fn from_config(chain: Arc<Chain>, config: &ChainConfig) -> Self {
        Self {
            chain,
            clone_per_request: config.clone_per_request,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Run each request on a clone of the chain instead of the shared instance
    pub fn with_clone_per_request(mut self, enabled: bool) -> Self {
        self.clone_per_request = enabled;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// The instance a single request runs on
    fn instance(&self) -> Arc<Chain> {
        if self.clone_per_request {
            self.chain.fork()
        } else {
            self.chain.clone()
        }
    }
}

/// Fallback handler passing every request through the chain
pub async fn dispatch(
    State(service): State<ChainService>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected request body");
            return ApiError::rejected_body(rejection).into_response();
        }
    };

    let mut http = axum::http::Request::new(body);
    *http.method_mut() = method;
    *http.uri_mut() = uri;
    *http.version_mut() = version;
    *http.headers_mut() = headers;

    let request = Request::new(http);
    let chain = service.instance();

    let outcome = tokio::task::spawn_blocking(move || {
        let mut response = BufferedResponse::new();
        let result = chain.run(&mut response, &request);
        (response, result)
    })
    .await;

    match outcome {
        Ok((response, Ok(()))) => into_axum(response),
        Ok((response, Err(err))) => {
            warn!(error = %err, status = ?response.status(), "Chain finished with error");

            if response.status().is_some() {
                into_axum(response)
            } else {
                ApiError::chain(&err).into_response()
            }
        }
        Err(err) => {
            error!(error = %err, "Chain execution panicked");
            ApiError::internal("Chain execution failed").into_response()
        }
    }
}

fn into_axum(response: BufferedResponse) -> Response {
    let response = response.into_http().map(Body::from);
    debug!(status = %response.status(), "Chain response ready");
    response
}
