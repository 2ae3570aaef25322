//! Integration tests for the tutor client and session.
//! These tests run the real HTTP client against a local mock server.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use tutor::chat::{APOLOGY, ChatConfig, TurnOutcome, TutorSession};
    use tutor::settings::TOKEN_KEY;
    use tutor::{
        ChatBackend, ChatStreamRequest, HISTORY_WINDOW, MemorySettingsStore, Renderer,
        TutorClient, TutorStyle,
    };

    #[derive(Default)]
    struct CaptureRenderer {
        text: String,
    }

    impl Renderer for CaptureRenderer {
        fn print_text(&mut self, text: &str) {
            self.text.push_str(text);
        }

        fn print_error(&mut self, _error: &str) {}

        fn print_info(&mut self, _info: &str) {}

        fn finish_response(&mut self) {}
    }

    fn client_for(server: &MockServer) -> TutorClient {
        TutorClient::new(Some(format!("{}/api/v1", server.uri()))).expect("Failed to create client")
    }

    fn session_for(server: &MockServer, token: Option<&str>) -> TutorSession<TutorClient> {
        let mut settings = MemorySettingsStore::new();
        if let Some(token) = token {
            settings = settings.with(TOKEN_KEY, token);
        }
        let config = ChatConfig::new("bio-101")
            .with_document("doc-7")
            .with_document_name("Chapter 3");
        TutorSession::new(client_for(server), Arc::new(settings), config)
    }

    #[tokio::test]
    async fn test_streamed_answer_with_sources() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "project_id": "bio-101",
                "message": "[Tutor style: Balanced] What is chlorophyll?",
                "selected_documents": ["doc-7"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"Chlorophyll absorbs light.__SOURCES__:[{"doc_id":"doc-7","doc_name":"Chapter 3","chunk_text":"Chlorophyll..."}]"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server, Some("test-token"));
        let mut renderer = CaptureRenderer::default();
        let outcome = session
            .send_turn("What is chlorophyll?", &mut renderer)
            .await;

        assert!(outcome.is_completed(), "unexpected outcome: {outcome:?}");
        assert_eq!(
            session.messages().last().unwrap().content,
            "Chlorophyll absorbs light."
        );
        assert_eq!(renderer.text, "Chlorophyll absorbs light.");
        assert_eq!(session.last_sources().len(), 1);
        assert!(!session.in_flight());
    }

    #[tokio::test]
    async fn test_request_body_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let mut session = session_for(&server, None);
        let mut renderer = CaptureRenderer::default();
        session.send_turn("hi", &mut renderer).await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());

        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let history = body["session_history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["role"], "assistant");
        assert!(history[0]["content"].as_str().unwrap().contains("Chapter 3"));
        assert!(
            body["system_prompt"]
                .as_str()
                .unwrap()
                .contains("Document being studied: Chapter 3")
        );
    }

    #[tokio::test]
    async fn test_non_ok_status_shows_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"detail": "index unavailable"})),
            )
            .mount(&server)
            .await;

        let mut session = session_for(&server, Some("test-token"));
        let mut renderer = CaptureRenderer::default();
        let outcome = session.send_turn("q", &mut renderer).await;

        match outcome {
            TurnOutcome::Failed(err) => {
                assert!(err.is_transport());
                assert_eq!(err.status_code(), Some(500));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(session.message_count(), 3);
        assert_eq!(session.messages().last().unwrap().content, APOLOGY);
        assert!(!session.in_flight());
        assert!(!renderer.text.contains("index unavailable"));
    }

    #[tokio::test]
    async fn test_error_detail_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("x-request-id", "req-42")
                    .set_body_json(json!({"detail": "Project not found"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ChatStreamRequest::new("missing", TutorStyle::Simple, "q");
        let err = match client.stream_chat(&request, None).await {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        };
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.request_id(), Some("req-42"));
        assert!(err.to_string().contains("Project not found"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ChatStreamRequest::new("bio-101", TutorStyle::Balanced, "q");
        let err = match client.stream_chat(&request, Some("expired")).await {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        };
        assert!(err.is_authentication());
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_body_streams_as_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string("streamed answer"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ChatStreamRequest::new("bio-101", TutorStyle::Detailed, "q");
        let mut stream = client.stream_chat(&request, None).await.unwrap();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"streamed answer");
    }

    #[tokio::test]
    async fn test_history_never_exceeds_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string("answer"))
            .mount(&server)
            .await;

        let mut session = session_for(&server, None);
        let mut renderer = CaptureRenderer::default();
        for i in 0..12 {
            session.send_turn(&format!("question {i}"), &mut renderer).await;
        }
        assert_eq!(session.message_count(), 25);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 12);
        for request in &requests {
            let body: ChatStreamRequest = serde_json::from_slice(&request.body).unwrap();
            assert!(body.session_history.len() <= HISTORY_WINDOW);
        }
        let last: ChatStreamRequest =
            serde_json::from_slice(&requests.last().unwrap().body).unwrap();
        assert_eq!(last.session_history.len(), HISTORY_WINDOW);
        assert_eq!(last.session_history.last().unwrap().content, "answer");
    }

    #[tokio::test]
    async fn test_unreachable_backend_shows_apology() {
        let client = TutorClient::new(Some("http://127.0.0.1:1/api/v1".to_string())).unwrap();
        let config = ChatConfig::new("bio-101");
        let mut session =
            TutorSession::new(client, Arc::new(MemorySettingsStore::new()), config);
        let mut renderer = CaptureRenderer::default();

        let outcome = session.send_turn("q", &mut renderer).await;

        match outcome {
            TurnOutcome::Failed(err) => assert!(err.is_transport()),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(session.messages().last().unwrap().content, APOLOGY);
        assert!(!session.in_flight());
    }
}
