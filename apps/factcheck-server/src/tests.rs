//! Tests for the fact-check server API
//!
//! Test categories:
//! - Verification endpoint against a scripted evidence engine
//! - Claim relay endpoints (trigger, session, push)
//! - `ResponsesEngine` wire format against a local upstream
//! - Property tests over arbitrary claims and engine labels

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::{EngineError, EngineReply, EvidenceEngine, EvidenceQuery};

/// Engine that replays one canned answer and counts calls
struct ScriptedEngine {
    reply: Result<EngineReply, String>,
    calls: AtomicUsize,
    last_query: Mutex<Option<EvidenceQuery>>,
}

impl ScriptedEngine {
    fn replying(status: u16, body: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(EngineReply {
                status,
                body: body.to_string(),
            }),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        })
    }

    fn raw(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(EngineReply {
                status,
                body: body.to_string(),
            }),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        })
    }

    fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("connection refused".to_string()),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn query(&self, query: &EvidenceQuery) -> Result<EngineReply, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        self.reply.clone().map_err(EngineError::Transport)
    }
}

/// Responses-style envelope: tool call first, then the message
fn envelope(payload: Value) -> Value {
    json!({
        "id": "resp_abc",
        "model": "gpt-5",
        "usage": {"input_tokens": 120, "output_tokens": 80},
        "output": [
            {
                "type": "web_search_call",
                "id": "ws_1",
                "action": {"sources": [{"url": "https://nasa.example/earth"}]}
            },
            {
                "type": "message",
                "role": "assistant",
                "content": [{"type": "output_text", "text": payload.to_string()}]
            }
        ]
    })
}

fn flat_earth_payload() -> Value {
    json!({
        "verdict": "False",
        "confidence": "High",
        "explanation": "Satellite imagery and geodesy show the Earth is an oblate spheroid.",
        "sources": [
            {"title": "Earth", "url": "https://nasa.example/earth", "publisher": "NASA", "date": "2024-03-01"},
            {"title": "Shape of the Earth", "url": "https://esa.example/shape"}
        ]
    })
}

mod http_endpoint_tests {
    //! HTTP endpoint integration tests using axum-test

    use std::time::Duration;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use claim_relay::RelayEvent;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::api::router;
    use crate::orchestrator::VerificationOrchestrator;
    use crate::state::AppState;

    fn server_with(engine: Option<Arc<ScriptedEngine>>) -> (TestServer, AppState) {
        let engine = engine.map(|e| e as Arc<dyn EvidenceEngine>);
        let state = AppState::new(VerificationOrchestrator::new(engine));
        let server = TestServer::new(router(state.clone())).unwrap();
        (server, state)
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let (server, _) = server_with(None);
        let response = server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_factcheck_flat_earth_is_false() {
        let engine = ScriptedEngine::replying(200, envelope(flat_earth_payload()));
        let (server, _) = server_with(Some(engine.clone()));

        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "The Earth is flat", "url": "https://blog.example/post"}))
            .await;
        response.assert_status_ok();

        let body = response.json::<Value>();
        assert_eq!(body["verdict"], "False");
        assert_eq!(body["confidence"], "High");
        assert!(!body["explanation"].as_str().unwrap().is_empty());
        assert_eq!(body["sources"][0]["url"], "https://nasa.example/earth");
        assert_eq!(body["sources"][1].get("publisher"), None);
        assert_eq!(body["raw"]["response_id"], "resp_abc");
        assert_eq!(body["raw"]["tool_sources"].as_array().unwrap().len(), 1);

        assert_eq!(engine.calls(), 1);
        let query = engine.last_query.lock().unwrap().clone().unwrap();
        assert!(query.user.contains("\"The Earth is flat\""));
        assert!(query.user.contains("https://blog.example/post"));
        assert!(!query.store);
    }

    #[tokio::test]
    async fn test_factcheck_trims_claim_before_querying() {
        let engine = ScriptedEngine::replying(200, envelope(flat_earth_payload()));
        let (server, _) = server_with(Some(engine.clone()));

        server
            .post("/factcheck")
            .json(&json!({"claim": "   The Earth is flat \n"}))
            .await
            .assert_status_ok();

        let query = engine.last_query.lock().unwrap().clone().unwrap();
        assert!(query.user.contains("\"The Earth is flat\""));
        assert!(!query.user.contains("Context URL"));
    }

    #[tokio::test]
    async fn test_factcheck_rejects_blank_claim_without_engine_call() {
        let engine = ScriptedEngine::replying(200, envelope(flat_earth_payload()));
        let (server, _) = server_with(Some(engine.clone()));

        for body in [json!({"claim": ""}), json!({"claim": "   "}), json!({})] {
            let response = server.post("/factcheck").json(&body).await;
            response.assert_status_bad_request();
            assert_eq!(response.json::<Value>(), json!({"error": "Missing claim"}));
        }
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_factcheck_rejects_malformed_body() {
        let (server, _) = server_with(None);
        let response = server
            .post("/factcheck")
            .bytes("{not json".into())
            .content_type("application/json")
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_factcheck_without_json_body_is_missing_claim() {
        let engine = ScriptedEngine::replying(200, envelope(flat_earth_payload()));
        let (server, _) = server_with(Some(engine.clone()));

        let response = server.post("/factcheck").await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>(), json!({"error": "Missing claim"}));

        let response = server.post("/factcheck").text("The Earth is flat").await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>(), json!({"error": "Missing claim"}));

        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_factcheck_unconfigured_is_500() {
        let (server, _) = server_with(None);
        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "The Earth is flat"}))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.json::<Value>();
        assert_eq!(body["error"], "Misconfigured");
        assert!(body["details"].as_str().unwrap().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_factcheck_passes_engine_status_through() {
        let engine = ScriptedEngine::raw(500, "upstream exploded");
        let (server, _) = server_with(Some(engine));

        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "The Earth is flat"}))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);

        let body = response.json::<Value>();
        assert_eq!(body["error"], "UpstreamError");
        assert_eq!(body["status"], 500);
        assert_eq!(body["details"], "upstream exploded");
        assert_eq!(body.get("verdict"), None);
    }

    #[tokio::test]
    async fn test_factcheck_unreachable_engine_is_502() {
        let (server, _) = server_with(Some(ScriptedEngine::unreachable()));

        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "The Earth is flat"}))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);

        let body = response.json::<Value>();
        assert_eq!(body["error"], "UpstreamError");
        assert_eq!(body["status"], Value::Null);
    }

    #[tokio::test]
    async fn test_factcheck_without_message_is_extraction_failure() {
        let raw = json!({
            "id": "resp_empty",
            "output": [{"type": "web_search_call", "id": "ws_9"}]
        });
        let (server, _) = server_with(Some(ScriptedEngine::replying(200, raw.clone())));

        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "The Earth is flat"}))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);

        let body = response.json::<Value>();
        assert_eq!(body["error"], "ExtractionFailed");
        assert_eq!(body["raw"], raw);
        assert_eq!(body.get("verdict"), None);
    }

    #[tokio::test]
    async fn test_factcheck_non_json_message_is_extraction_failure() {
        let raw = json!({
            "output": [{
                "type": "message",
                "content": [{"type": "output_text", "text": "I think it is false."}]
            }]
        });
        let (server, _) = server_with(Some(ScriptedEngine::replying(200, raw)));

        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "The Earth is flat"}))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        assert_eq!(response.json::<Value>()["error"], "ExtractionFailed");
    }

    #[tokio::test]
    async fn test_factcheck_non_json_body_keeps_raw_text() {
        let (server, _) = server_with(Some(ScriptedEngine::raw(200, "<html>oops</html>")));

        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "The Earth is flat"}))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);

        let body = response.json::<Value>();
        assert_eq!(body["error"], "ExtractionFailed");
        assert_eq!(body["raw"], "<html>oops</html>");
    }

    #[tokio::test]
    async fn test_factcheck_coerces_unknown_labels() {
        let payload = json!({
            "verdict": "Partly true",
            "confidence": "Very high",
            "explanation": "Mixed evidence.",
            "sources": []
        });
        let (server, _) = server_with(Some(ScriptedEngine::replying(200, envelope(payload))));

        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "Coffee is healthy"}))
            .await;
        response.assert_status_ok();

        let body = response.json::<Value>();
        assert_eq!(body["verdict"], "Unclear");
        assert_eq!(body["confidence"], Value::Null);
    }

    #[tokio::test]
    async fn test_fire_claim_stores_and_pushes() {
        let (server, state) = server_with(None);
        let mut rx = state.relay.channel().subscribe();

        let response = server
            .post("/claims")
            .json(&json!({"claim": "  Vaccines cause autism ", "url": "https://forum.example/t/1"}))
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        assert_eq!(response.json::<Value>(), json!({"accepted": true}));

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            RelayEvent::NewClaim {
                claim: "Vaccines cause autism".into(),
                url: Some("https://forum.example/t/1".into()),
            }
        );

        let session = server.get("/session").await.json::<Value>();
        assert_eq!(session["lastClaim"], "Vaccines cause autism");
        assert_eq!(session["lastUrl"], "https://forum.example/t/1");
        assert!(session["lastUpdatedAt"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_events_stream_carries_fired_claim() {
        let (_, state) = server_with(None);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        let mut events = client
            .get(format!("{}/events", base))
            .send()
            .await
            .unwrap();
        assert_eq!(events.status(), reqwest::StatusCode::OK);
        assert!(events.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));
        assert_eq!(state.relay.channel().listeners(), 1);

        let fired = client
            .post(format!("{}/claims", base))
            .json(&json!({"claim": " X "}))
            .send()
            .await
            .unwrap();
        assert_eq!(fired.status(), reqwest::StatusCode::ACCEPTED);

        let mut frame = String::new();
        while !frame.contains("\n\n") {
            let chunk = tokio::time::timeout(Duration::from_secs(2), events.chunk())
                .await
                .expect("no relay event within 2s")
                .unwrap()
                .expect("event stream ended");
            frame.push_str(std::str::from_utf8(&chunk).unwrap());
        }

        let mut lines = frame.trim_end().lines();
        assert_eq!(lines.next(), Some("event: NEW_CLAIM"));
        let data = lines.next().unwrap().strip_prefix("data: ").unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(data).unwrap(),
            json!({"type": "NEW_CLAIM", "claim": "X", "url": null})
        );
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn test_fire_blank_claim_is_rejected() {
        let (server, state) = server_with(None);
        let mut rx = state.relay.channel().subscribe();

        let response = server
            .post("/claims")
            .json(&json!({"claim": "   ", "source": "manual"}))
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>(), json!({"error": "Missing claim"}));

        assert!(rx.try_recv().is_err());
        assert_eq!(
            server.get("/session").await.json::<Value>(),
            json!({"lastClaim": null, "lastUrl": null, "lastUpdatedAt": null})
        );
    }

    #[tokio::test]
    async fn test_session_put_then_delete() {
        let (server, state) = server_with(None);

        server
            .put("/session")
            .json(&json!({
                "lastClaim": "The moon landing was faked",
                "lastUrl": "https://news.example/a",
                "lastUpdatedAt": 1_700_000_000_000_i64
            }))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let stored = state.relay.store().read().await.unwrap();
        assert_eq!(stored.text(), "The moon landing was faked");
        assert_eq!(stored.captured_at().timestamp_millis(), 1_700_000_000_000);

        let session = server.get("/session").await.json::<Value>();
        assert_eq!(session["lastUpdatedAt"], 1_700_000_000_000_i64);

        server
            .delete("/session")
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert!(state.relay.store().read().await.is_none());

        // clearing twice is fine
        server
            .delete("/session")
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_session_put_blank_claim_is_rejected() {
        let (server, state) = server_with(None);
        server
            .put("/session")
            .json(&json!({"lastClaim": "  "}))
            .await
            .assert_status_bad_request();
        assert!(state.relay.store().read().await.is_none());
    }
}

mod responses_engine_tests {
    //! `ResponsesEngine` against a local upstream

    use std::time::Duration;

    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use axum_test::TestServer;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::api::router;
    use crate::engine::{EngineConfig, ResponsesEngine};
    use crate::orchestrator::VerificationOrchestrator;
    use crate::prompt::build_query;
    use crate::state::AppState;

    #[derive(Clone, Default)]
    struct Captured {
        requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn upstream_handler(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        captured.requests.lock().unwrap().push((auth, body));
        Json(envelope(flat_earth_payload()))
    }

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1/responses", addr)
    }

    fn engine_for(endpoint: String) -> ResponsesEngine {
        ResponsesEngine::new(EngineConfig {
            endpoint,
            api_key: "sk-test-key".into(),
            model: "gpt-5".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_responses_payload_with_bearer_auth() {
        let captured = Captured::default();
        let app = Router::new()
            .route("/v1/responses", post(upstream_handler))
            .with_state(captured.clone());
        let engine = engine_for(spawn_upstream(app).await);

        let reply = engine
            .query(&build_query("The Earth is flat", Some("https://blog.example")))
            .await
            .unwrap();
        assert!(reply.is_success());

        let requests = captured.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (auth, body) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test-key"));
        assert_eq!(body["model"], "gpt-5");
        assert_eq!(body["store"], false);
        assert_eq!(body["tools"], json!([{"type": "web_search"}]));
        assert_eq!(body["include"], json!(["web_search_call.action.sources"]));
        assert_eq!(body["text"]["format"]["name"], "fact_check_result");
        assert_eq!(body["input"][0]["role"], "system");
        assert!(body["input"][1]["content"]
            .as_str()
            .unwrap()
            .contains("The Earth is flat"));
    }

    #[tokio::test]
    async fn returns_non_success_status_unchanged() {
        let app = Router::new().route(
            "/v1/responses",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let engine = engine_for(spawn_upstream(app).await);

        let reply = engine.query(&build_query("claim", None)).await.unwrap();
        assert_eq!(reply.status, 429);
        assert_eq!(reply.body, "slow down");
        assert!(!reply.is_success());
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let app = Router::new().route(
            "/v1/responses",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let endpoint = spawn_upstream(app).await;
        let engine = ResponsesEngine::new(EngineConfig {
            endpoint,
            api_key: "sk-test-key".into(),
            model: "gpt-5".into(),
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        let err = engine.query(&build_query("claim", None)).await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
    }

    #[tokio::test]
    async fn end_to_end_flat_earth_through_real_engine() {
        let captured = Captured::default();
        let app = Router::new()
            .route("/v1/responses", post(upstream_handler))
            .with_state(captured);
        let engine: Arc<dyn EvidenceEngine> = Arc::new(engine_for(spawn_upstream(app).await));

        let state = AppState::new(VerificationOrchestrator::new(Some(engine)));
        let server = TestServer::new(router(state)).unwrap();

        let response = server
            .post("/factcheck")
            .json(&json!({"claim": "The Earth is flat"}))
            .await;
        response.assert_status_ok();

        let body = response.json::<Value>();
        assert_eq!(body["verdict"], "False");
        assert_eq!(body["raw"]["model"], "gpt-5");
    }
}

mod property_tests {
    use proptest::prelude::*;

    use claim_relay::{Verdict, VerificationRequest};

    use super::*;
    use crate::error::VerificationError;
    use crate::orchestrator::VerificationOrchestrator;

    fn engine_label() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("True".to_string()),
            Just("False".to_string()),
            Just("Misleading".to_string()),
            Just("Unclear".to_string()),
            Just("false".to_string()),
            "[A-Za-z ]{0,16}",
        ]
    }

    fn engine_body() -> impl Strategy<Value = (u16, Value)> {
        prop_oneof![
            engine_label().prop_map(|label| {
                let payload = json!({"verdict": label, "explanation": "x", "sources": []});
                (200, envelope(payload))
            }),
            (400u16..600).prop_map(|status| (status, json!({"error": "nope"}))),
            Just((200, json!({"output": []}))),
        ]
    }

    proptest! {
        /// Property: a non-empty claim yields a closed-vocabulary verdict or a typed error
        #[test]
        fn verdict_is_closed_or_typed_error(
            claim in "[a-zA-Z0-9 ]{0,8}[a-zA-Z0-9][a-zA-Z0-9 ]{0,40}",
            (status, body) in engine_body(),
        ) {
            let engine = ScriptedEngine::replying(status, body);
            let orchestrator = VerificationOrchestrator::new(Some(engine as Arc<dyn EvidenceEngine>));
            let rt = tokio::runtime::Runtime::new().unwrap();

            match rt.block_on(orchestrator.verify(&VerificationRequest::new(claim, None))) {
                Ok(result) => prop_assert!(Verdict::ALL.contains(&result.verdict)),
                Err(VerificationError::UpstreamError { status: Some(s), .. }) => {
                    prop_assert!(!(200..300).contains(&s))
                }
                Err(VerificationError::ExtractionFailed { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        /// Property: whitespace-only claims never reach the engine
        #[test]
        fn blank_claims_never_query(claim in "[ \t\n]{0,12}") {
            let engine = ScriptedEngine::replying(200, envelope(flat_earth_payload()));
            let orchestrator =
                VerificationOrchestrator::new(Some(engine.clone() as Arc<dyn EvidenceEngine>));
            let rt = tokio::runtime::Runtime::new().unwrap();

            let outcome = rt.block_on(orchestrator.verify(&VerificationRequest::new(claim, None)));
            prop_assert!(matches!(outcome, Err(VerificationError::InvalidInput)));
            prop_assert_eq!(engine.calls(), 0);
        }
    }
}
