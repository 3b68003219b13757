use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health;
use super::middleware::logging_middleware;
use super::service::{dispatch, ChainService};

/// Create the router serving `service` for every path except the probes
pub fn create_router(service: ChainService) -> Router {
    let body_limit = service.max_body_bytes();

    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        // Everything else goes through the chain
        .fallback(dispatch)
        .with_state(service)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::domain::chain::{handler_fn, Chain};
    use crate::pipeline::{build_pipeline, API_KEY_HEADER, HANDLERS_HEADER};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn demo(api_key: Option<&str>) -> Router {
        let config = ChainConfig {
            api_key: api_key.map(str::to_string),
            ..ChainConfig::default()
        };
        let chain = build_pipeline(&config).unwrap();
        create_router(ChainService::from_config(chain, &config))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Chain counting the requests it has seen in a variable
    fn counter() -> std::sync::Arc<Chain> {
        let chain = Chain::new("counter");
        let key = chain.key().clone();

        chain
            .append(
                "count",
                handler_fn(move |w, req| {
                    let Some(chain) = req.chain(&key) else {
                        return;
                    };
                    let count = chain.get_as::<u64>("count").unwrap_or(0) + 1;
                    chain.set("count", count);
                    w.write(count.to_string().as_bytes());
                }),
            )
            .unwrap();
        chain
    }

    #[tokio::test]
    async fn test_live_endpoint() {
        let response = demo(None).oneshot(get_request("/live")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_lists_handlers() {
        let response = demo(None).oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["chain"]["key"], "chainer");
        assert_eq!(
            json["chain"]["handlers"],
            serde_json::json!(["request-id", "auth", "route", "greet", "echo", "done"])
        );
    }

    #[tokio::test]
    async fn test_greeting() {
        let request = Request::builder()
            .uri("/hello")
            .header("x-request-id", "abc")
            .body(Body::empty())
            .unwrap();

        let response = demo(None).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "abc");
        assert_eq!(
            response.headers()[HANDLERS_HEADER],
            "request-id,api-key,route,greet,done"
        );
        assert_eq!(
            body_text(response).await,
            "Hello from chainer (request abc)\n"
        );
    }

    #[tokio::test]
    async fn test_echo() {
        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from("ping"))
            .unwrap();

        let response = demo(None).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ping");
    }

    #[tokio::test]
    async fn test_handler_written_status_passes_through() {
        let response = demo(Some("secret"))
            .oneshot(get_request("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "missing or invalid api key\n");
    }

    #[tokio::test]
    async fn test_valid_api_key() {
        let request = Request::builder()
            .uri("/")
            .header(API_KEY_HEADER, "secret")
            .body(Body::empty())
            .unwrap();

        let response = demo(Some("secret")).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unwritten_error_becomes_json_500() {
        let chain = Chain::new("failing");
        let key = chain.key().clone();
        chain
            .append(
                "fail",
                handler_fn(move |_, req| {
                    if let Some(chain) = req.chain(&key) {
                        chain.set_error(anyhow::anyhow!("backend unavailable"));
                    }
                }),
            )
            .unwrap();

        let response = create_router(ChainService::new(chain))
            .oneshot(get_request("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["error"]["message"], "backend unavailable");
        assert_eq!(json["error"]["type"], "chain_error");
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_500() {
        let chain = Chain::new("panicking");
        chain
            .append("panic", handler_fn(|_, _| panic!("handler bug")))
            .unwrap();

        let response = create_router(ChainService::new(chain))
            .oneshot(get_request("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["error"]["type"], "server_error");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let chain = build_pipeline(&ChainConfig::default()).unwrap();
        let router = create_router(ChainService::new(chain).with_max_body_bytes(4));

        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from("too large"))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_clone_per_request_isolates_variables() {
        let router = create_router(ChainService::new(counter()).with_clone_per_request(true));

        for _ in 0..3 {
            let response = router.clone().oneshot(get_request("/")).await.unwrap();
            assert_eq!(body_text(response).await, "1");
        }
    }

    #[tokio::test]
    async fn test_shared_instance_keeps_variables() {
        let chain = counter();
        let router =
            create_router(ChainService::new(chain.clone()).with_clone_per_request(false));

        for expected in 1..=3 {
            let response = router.clone().oneshot(get_request("/")).await.unwrap();
            assert_eq!(body_text(response).await, expected.to_string());
        }
        assert_eq!(chain.get_as::<u64>("count"), Some(3));
    }
}
