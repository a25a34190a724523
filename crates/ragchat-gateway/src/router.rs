use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{chat_handler, health_handler};
use super::server::AppState;

/// Allow-listed origins with credentials. Methods and request headers are mirrored
/// because wildcards are not permitted alongside credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring invalid CORS origin '{origin}': {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub(crate) fn build_router(state: AppState, cors_origins: &[String], max_body_size: usize) -> Router {
    let chat = Router::new()
        .route("/chat", post(chat_handler))
        .layer(RequestBodyLimitLayer::new(max_body_size));

    Router::new()
        .route("/health", get(health_handler))
        .merge(chat)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::*;
    use crate::handlers::{ChatAnswer, ChatFailure, ChatJob, FailureKind};

    const ORIGIN: &str = "http://localhost:5173";

    fn make_router(include_sources: bool) -> (Router, mpsc::Receiver<ChatJob>) {
        let (tx, rx) = mpsc::channel(16);
        let state = AppState {
            chat_tx: tx,
            include_sources,
            started_at: Instant::now(),
        };
        (build_router(state, &[ORIGIN.to_owned()], 1_048_576), rx)
    }

    /// Answer the next job with `reply` and hand back the request that was received.
    fn answer_next(
        mut rx: mpsc::Receiver<ChatJob>,
        reply: crate::handlers::ChatReply,
    ) -> tokio::task::JoinHandle<crate::handlers::ChatRequest> {
        tokio::spawn(async move {
            let job = rx.recv().await.unwrap();
            let request = job.request.clone();
            let _ = job.reply.send(reply);
            request
        })
    }

    fn chat_request(body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn answer(content: &str, sources: &[&str]) -> crate::handlers::ChatReply {
        Ok(ChatAnswer {
            content: content.into(),
            sources: sources.iter().map(|s| (*s).to_owned()).collect(),
        })
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (app, _rx) = make_router(false);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].is_u64());
    }

    #[tokio::test]
    async fn chat_returns_agent_answer_with_empty_sources() {
        let (app, rx) = make_router(false);
        let worker = answer_next(rx, answer("Stay hard.", &["book.pdf#3"]));

        let resp = app
            .oneshot(chat_request(&serde_json::json!({"query": "motivate me"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            json_body(resp).await,
            serde_json::json!({"response": "Stay hard.", "sources": []})
        );

        let received = worker.await.unwrap();
        assert_eq!(received.query, "motivate me");
        assert!(received.session_id.is_none());
    }

    #[tokio::test]
    async fn chat_includes_sources_when_enabled() {
        let (app, rx) = make_router(true);
        let _worker = answer_next(rx, answer("ok", &["book.pdf#3", "book.pdf#7"]));

        let resp = app
            .oneshot(chat_request(&serde_json::json!({"query": "q"})))
            .await
            .unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["sources"], serde_json::json!(["book.pdf#3", "book.pdf#7"]));
    }

    #[tokio::test]
    async fn chat_forwards_session_identifiers() {
        let (app, rx) = make_router(false);
        let worker = answer_next(rx, answer("ok", &[]));

        let body = serde_json::json!({"query": "q", "session_id": "s1", "user_id": "alice"});
        let resp = app.oneshot(chat_request(&body)).await.unwrap();
        assert_eq!(resp.status(), 200);

        let received = worker.await.unwrap();
        assert_eq!(received.session_id.as_deref(), Some("s1"));
        assert_eq!(received.user_id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn blank_query_is_unprocessable() {
        let (app, mut rx) = make_router(false);
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"query": "   "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(resp).await["detail"], "query must not be empty");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_query_is_rejected() {
        let (app, _rx) = make_router(false);
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"question": "q"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (app, _rx) = make_router(false);
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn agent_failures_map_to_status_and_detail() {
        let cases = [
            (FailureKind::Upstream, 502),
            (FailureKind::RateLimited, 503),
            (FailureKind::SessionConflict, 403),
            (FailureKind::Internal, 500),
        ];
        for (kind, status) in cases {
            let (app, rx) = make_router(false);
            let _worker = answer_next(rx, Err(ChatFailure::new(kind, "boom")));
            let resp = app
                .oneshot(chat_request(&serde_json::json!({"query": "q"})))
                .await
                .unwrap();
            assert_eq!(resp.status(), status);
            assert_eq!(json_body(resp).await["detail"], "boom");
        }
    }

    #[tokio::test]
    async fn closed_dispatcher_is_service_unavailable() {
        let (app, rx) = make_router(false);
        drop(rx);
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"query": "q"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn dropped_reply_is_service_unavailable() {
        let (app, mut rx) = make_router(false);
        tokio::spawn(async move {
            let job = rx.recv().await.unwrap();
            drop(job);
        });
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"query": "q"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn body_size_limit() {
        let (tx, _rx) = mpsc::channel(1);
        let state = AppState {
            chat_tx: tx,
            include_sources: false,
            started_at: Instant::now(),
        };
        let app = build_router(state, &[], 64);
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(vec![b'a'; 128]))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cors_preflight_allows_frontend_origin() {
        let (app, _rx) = make_router(false);
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/chat")
            .header("origin", ORIGIN)
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);

        let headers = resp.headers();
        assert_eq!(headers["access-control-allow-origin"], ORIGIN);
        assert_eq!(headers["access-control-allow-credentials"], "true");
        assert_eq!(headers["access-control-allow-methods"], "POST");
        assert_eq!(headers["access-control-allow-headers"], "content-type");
    }

    #[tokio::test]
    async fn cors_ignores_unknown_origin() {
        let (app, _rx) = make_router(false);
        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(!resp.headers().contains_key("access-control-allow-origin"));
    }

    #[test]
    fn invalid_origins_are_skipped() {
        let _layer = cors_layer(&["http://ok.example".into(), "bad\norigin".into()]);
    }
}
