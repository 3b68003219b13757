//! Demo pipeline served by the `serve` command
//!
//! ```text
//! request-id -> auth [api-key] -> route -> greet -> echo -> done
//!                                    \________________/^
//!                                     POST /echo jumps here
//! ```

use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode};
use tracing::debug;

use crate::config::ChainConfig;
use crate::domain::chain::{
    handler_fn, Chain, ChainError, ContextKey, Handler, Link, Request, ResponseWriter,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const HANDLERS_HEADER: &str = "x-chain-handlers";

const VISITED: &str = "visited";
const REQUEST_ID: &str = "request_id";

/// Build the demo pipeline from configuration
pub fn build_pipeline(config: &ChainConfig) -> Result<Arc<Chain>, ChainError> {
    let key = ContextKey::new(config.context_key.as_str());
    let auth_key = ContextKey::new(format!("{}.auth", config.context_key));

    let auth = Chain::new(auth_key.clone());
    auth.append(
        "api-key",
        Link::leaf(ApiKeyCheck {
            expected: config.api_key.clone(),
            key: key.clone(),
            auth_key,
        }),
    )?;

    let chain = Chain::new(key.clone());
    chain.append("request-id", Link::leaf(AssignRequestId { key: key.clone() }))?;
    chain.append("auth", auth)?;
    chain.append("route", route(key.clone()))?;
    chain.append("greet", greet(key.clone()))?;
    chain.append("echo", echo(key.clone()))?;
    chain.append("done", done(key))?;

    debug!(handlers = ?chain.names(), "Pipeline built");
    Ok(chain)
}

/// Record that `name` ran during the current traversal
fn visit(chain: &Chain, name: &str) {
    let mut visited = chain.get_as::<Vec<String>>(VISITED).unwrap_or_default();
    visited.push(name.to_string());
    chain.set(VISITED, visited);
}

/// Redirect, recording a failure on the chain if the target is unknown
fn jump(chain: &Chain, target: &str) {
    if let Err(err) = chain.move_to(target) {
        chain.set_error(err);
    }
}

/// Assigns the request id and starts the visit log
struct AssignRequestId {
    key: ContextKey,
}

impl Handler for AssignRequestId {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let Some(chain) = req.chain(&self.key) else {
            return;
        };

        let id = req
            .header(REQUEST_ID_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if let Ok(value) = HeaderValue::from_str(&id) {
            w.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        chain.set(REQUEST_ID, id);
        chain.set(VISITED, vec!["request-id"]);
    }
}

/// Rejects requests without the configured API key
struct ApiKeyCheck {
    expected: Option<String>,
    key: ContextKey,
    auth_key: ContextKey,
}

impl Handler for ApiKeyCheck {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let (Some(chain), Some(auth)) = (req.chain(&self.key), req.chain(&self.auth_key)) else {
            return;
        };

        visit(&chain, "api-key");

        let Some(expected) = self.expected.as_deref() else {
            return;
        };

        if req.header(API_KEY_HEADER) != Some(expected) {
            w.write_status(StatusCode::UNAUTHORIZED);
            w.write(b"missing or invalid api key\n");
            auth.set_error(anyhow::anyhow!("missing or invalid api key"));
        }
    }
}

fn route(key: ContextKey) -> Link {
    handler_fn(move |_, req| {
        let Some(chain) = req.chain(&key) else {
            return;
        };

        visit(&chain, "route");

        if *req.method() == Method::POST && req.uri().path() == "/echo" {
            jump(&chain, "echo");
        }
    })
    .into()
}

fn greet(key: ContextKey) -> Link {
    handler_fn(move |w, req| {
        let Some(chain) = req.chain(&key) else {
            return;
        };

        visit(&chain, "greet");

        let id = chain.get_as::<String>(REQUEST_ID).unwrap_or_default();
        w.write(format!("Hello from chainer (request {})\n", id).as_bytes());
        jump(&chain, "done");
    })
    .into()
}

fn echo(key: ContextKey) -> Link {
    handler_fn(move |w, req| {
        if let Some(chain) = req.chain(&key) {
            visit(&chain, "echo");
        }

        w.write(req.body());
    })
    .into()
}

fn done(key: ContextKey) -> Link {
    handler_fn(move |w, req| {
        let Some(chain) = req.chain(&key) else {
            return;
        };

        visit(&chain, "done");

        let visited = chain.get_as::<Vec<String>>(VISITED).unwrap_or_default();
        if let Ok(value) = HeaderValue::from_str(&visited.join(",")) {
            w.headers_mut().insert(HANDLERS_HEADER, value);
        }
    })
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::BufferedResponse;
    use bytes::Bytes;

    fn config(api_key: Option<&str>) -> ChainConfig {
        ChainConfig {
            api_key: api_key.map(str::to_string),
            ..ChainConfig::default()
        }
    }

    fn request(method: Method, path: &str, headers: &[(&str, &str)], body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method(method).uri(path);

        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        Request::new(builder.body(Bytes::from_static(body.as_bytes())).unwrap())
    }

    fn handlers(response: &BufferedResponse) -> Option<&str> {
        response
            .headers()
            .get(HANDLERS_HEADER)
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_pipeline_topology() {
        let chain = build_pipeline(&config(None)).unwrap();

        assert_eq!(
            chain.names(),
            vec!["request-id", "auth", "route", "greet", "echo", "done"]
        );
    }

    #[test]
    fn test_greeting_skips_echo() {
        let chain = build_pipeline(&config(None)).unwrap();
        let mut response = BufferedResponse::new();

        let req = request(Method::GET, "/", &[(REQUEST_ID_HEADER, "req-1")], "");
        chain.serve(&mut response, &req);

        assert!(chain.last_error().is_none());
        assert_eq!(response.body_text(), "Hello from chainer (request req-1)\n");
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-1");
        assert_eq!(
            handlers(&response),
            Some("request-id,api-key,route,greet,done")
        );
    }

    #[test]
    fn test_echo_route_skips_greeting() {
        let chain = build_pipeline(&config(None)).unwrap();
        let mut response = BufferedResponse::new();

        chain.serve(&mut response, &request(Method::POST, "/echo", &[], "ping"));

        assert_eq!(response.body_text(), "ping");
        assert_eq!(handlers(&response), Some("request-id,api-key,route,echo,done"));
    }

    #[test]
    fn test_missing_api_key_stops_pipeline() {
        let chain = build_pipeline(&config(Some("secret"))).unwrap();
        let mut response = BufferedResponse::new();

        chain.serve(&mut response, &request(Method::GET, "/", &[], ""));

        assert_eq!(response.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(response.body_text(), "missing or invalid api key\n");
        assert_eq!(
            chain.last_error().unwrap().to_string(),
            "missing or invalid api key"
        );
        assert!(handlers(&response).is_none());
    }

    #[test]
    fn test_valid_api_key_passes() {
        let chain = build_pipeline(&config(Some("secret"))).unwrap();
        let mut response = BufferedResponse::new();

        let req = request(Method::GET, "/", &[(API_KEY_HEADER, "secret")], "");
        chain.serve(&mut response, &req);

        assert!(chain.last_error().is_none());
        assert_eq!(response.status(), Some(StatusCode::OK));
    }

    #[test]
    fn test_generated_request_id() {
        let chain = build_pipeline(&config(None)).unwrap();
        let mut response = BufferedResponse::new();

        chain.serve(&mut response, &request(Method::GET, "/", &[], ""));

        let id = chain.get_as::<String>(REQUEST_ID).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_eq!(response.headers()[REQUEST_ID_HEADER], id.as_str());
    }
}
