//! End-to-end conversations driven through the session service and the HTTP router,
//! persisting into the in-memory backend.

mod common {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use blueox::backend::InMemoryBackend;
    use blueox::workflows::applications::{SubmissionService, UploadedFile};
    use blueox::workflows::conversation::{
        ConversationService, FormSubmission, InMemoryDraftStore, PathCatalog,
    };
    use blueox::workflows::matching::{JobMatcher, MatchPolicy, MatchingService};

    pub(super) type Service =
        ConversationService<InMemoryBackend, InMemoryBackend, InMemoryBackend, InMemoryDraftStore>;

    pub(super) fn build_service() -> (Arc<Service>, Arc<InMemoryBackend>) {
        let (service, backend) = unwrapped_service();
        (Arc::new(service), backend)
    }

    pub(super) fn unwrapped_service() -> (Service, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::with_sample_jobs());
        let service = ConversationService::new(
            Arc::new(PathCatalog::standard()),
            Arc::new(InMemoryDraftStore::default()),
            MatchingService::new(backend.clone(), JobMatcher::new(MatchPolicy::default())),
            SubmissionService::new(backend.clone(), backend.clone()),
        );
        (service, backend)
    }

    pub(super) fn contact_form() -> FormSubmission {
        let values: BTreeMap<String, String> = [
            ("fullName", "Chinedu Okafor"),
            ("email", "chinedu@example.com"),
            ("whatsapp", "+234 801 000 0000"),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect();
        FormSubmission {
            values,
            uploaded_fields: Vec::new(),
        }
    }

    pub(super) fn cv() -> UploadedFile {
        UploadedFile {
            field: "cv".to_string(),
            file_name: "Europass CV.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF-1.7 cv".to_vec(),
        }
    }
}

mod service {
    use super::common::*;
    use blueox::workflows::applications::{ApplicationRepository, ApplicationStatus};
    use blueox::workflows::conversation::{
        AnswerValue, ChatEntry, ConversationState, PathId, SessionError, UserEvent,
    };
    use serde_json::json;

    async fn walk_worker_path(service: &Service) -> blueox::workflows::conversation::SessionId {
        let opened = service.open(None).await;
        let id = opened.session_id.clone();
        service
            .handle(&id, UserEvent::SelectPath(PathId::WorkerJob))
            .await
            .expect("path chosen");
        for answer in [
            AnswerValue::list(["Netherlands"]),
            AnswerValue::list(["Electricians"]),
            AnswerValue::text("3-5 years"),
            AnswerValue::text("2,500 - 3,000 EUR"),
            AnswerValue::text("Immediately"),
        ] {
            service
                .handle(&id, UserEvent::Answer(answer))
                .await
                .expect("answer accepted");
        }
        id
    }

    #[tokio::test]
    async fn worker_path_matches_selects_and_submits() {
        let (service, backend) = build_service();
        let id = walk_worker_path(&service).await;

        let view = service.view(&id).await.expect("session exists");
        let ConversationState::ChoosingJob { matches } = &view.state else {
            panic!("expected job suggestions, got {:?}", view.state);
        };
        assert_eq!(matches[0].title, "Industrial Electrician");
        assert_eq!(view.progress, 86);

        let job_id = matches[0].id.clone();
        let view = service
            .handle(&id, UserEvent::SelectJob(job_id.clone()))
            .await
            .expect("job selected");
        assert!(matches!(view.state, ConversationState::AwaitingForm { .. }));
        assert!(!view.form_fields.is_empty());
        assert!(view.transcript.contains(&ChatEntry::User {
            content: "Selected: Industrial Electrician at Voltwerk BV".to_string()
        }));

        let view = service
            .handle(
                &id,
                UserEvent::Submit {
                    form: contact_form(),
                    uploads: vec![cv()],
                },
            )
            .await
            .expect("submitted");
        let ConversationState::Complete { application_id } = &view.state else {
            panic!("expected completion, got {:?}", view.state);
        };

        let stored = backend
            .fetch_application(application_id)
            .await
            .expect("lookup")
            .expect("application stored");
        assert_eq!(stored.status, ApplicationStatus::Pending);
        assert_eq!(stored.user_path, PathId::WorkerJob);
        assert_eq!(stored.data.get("selectedJob"), Some(&json!(job_id.0)));
        assert_eq!(stored.data.get("uploadedDocuments"), Some(&json!(["cv"])));
        assert_eq!(stored.data.get("fullName"), Some(&json!("Chinedu Okafor")));
        assert_eq!(backend.object_count(), 1);
    }

    #[tokio::test]
    async fn job_lookup_outage_falls_through_to_the_form() {
        let (service, backend) = build_service();
        backend.set_jobs_offline(true);
        let id = walk_worker_path(&service).await;

        let view = service.view(&id).await.expect("session exists");
        assert_eq!(view.state, ConversationState::AwaitingForm { selected_job: None });
    }

    #[tokio::test]
    async fn out_of_turn_events_leave_state_untouched() {
        let (service, _) = build_service();
        let opened = service.open(None).await;
        let id = opened.session_id;

        let error = service
            .handle(&id, UserEvent::Answer(AnswerValue::text("Netherlands")))
            .await
            .expect_err("answer before path is rejected");
        assert!(matches!(error, SessionError::Conversation(_)));

        let view = service.view(&id).await.expect("session exists");
        assert_eq!(view.state, ConversationState::Idle);
    }

    #[tokio::test]
    async fn abandoned_conversation_resumes_from_its_draft() {
        let (service, _) = build_service();
        let opened = service.open(None).await;
        let id = opened.session_id;
        service
            .handle(&id, UserEvent::SelectPath(PathId::StudentUniversity))
            .await
            .expect("path chosen");
        service
            .handle(&id, UserEvent::Answer(AnswerValue::text("Master's Degree")))
            .await
            .expect("first answer");
        service
            .handle(&id, UserEvent::Answer(AnswerValue::list(["Poland", "Hungary"])))
            .await
            .expect("second answer");

        let view = service.resume(&id).await.expect("draft restored");
        assert_eq!(view.path, Some(PathId::StudentUniversity));
        assert_eq!(view.state, ConversationState::AwaitingAnswer { step_index: 2 });
        assert_eq!(view.answers.len(), 2);
    }

    #[tokio::test]
    async fn reset_discards_answers_and_draft() {
        let (service, _) = build_service();
        let opened = service.open(None).await;
        let id = opened.session_id;
        service
            .handle(&id, UserEvent::SelectPath(PathId::StudentJob))
            .await
            .expect("path chosen");
        service
            .handle(&id, UserEvent::Answer(AnswerValue::text("Bachelor's Degree")))
            .await
            .expect("answer");

        let view = service.reset(&id).await.expect("reset");
        assert_eq!(view.state, ConversationState::Idle);
        assert!(view.answers.is_empty());
        assert!(matches!(service.view(&id).await, Err(SessionError::NotFound(_))));
        assert!(matches!(
            service.resume(&id).await,
            Err(SessionError::NotFound(_))
        ));
        assert_eq!(service.live_sessions(), 0);
    }

    #[tokio::test]
    async fn company_path_redirects_without_persisting() {
        let (service, backend) = build_service();
        let opened = service.open(None).await;
        let view = service
            .handle(&opened.session_id, UserEvent::SelectPath(PathId::Company))
            .await
            .expect("path chosen");
        assert_eq!(view.state, ConversationState::Redirected);
        assert!(backend.list_applications().await.expect("list").is_empty());
        assert!(matches!(
            service.view(&opened.session_id).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn closed_sessions_are_forgotten() {
        let (service, _) = build_service();
        let opened = service.open(None).await;
        assert!(service.close(&opened.session_id));
        assert!(matches!(
            service.view(&opened.session_id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(!service.close(&opened.session_id));
    }

    #[tokio::test]
    async fn idle_sessions_expire_when_new_ones_open() {
        let (service, _) = unwrapped_service();
        let service = service.with_idle_limit(chrono::Duration::zero());
        let first = service.open(None).await;
        service
            .handle(&first.session_id, UserEvent::SelectPath(PathId::WorkerJob))
            .await
            .expect("path chosen");
        assert_eq!(service.live_sessions(), 1);

        let second = service.open(None).await;
        assert_eq!(service.live_sessions(), 1);
        assert!(matches!(
            service.view(&first.session_id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(service.view(&second.session_id).await.is_ok());
    }

    #[tokio::test]
    async fn active_sessions_survive_the_idle_sweep() {
        let (service, _) = build_service();
        let first = service.open(None).await;
        service.open(None).await;
        assert_eq!(service.live_sessions(), 2);
        assert!(service.view(&first.session_id).await.is_ok());
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use blueox::workflows::conversation::conversation_router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(router: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(serde_json::to_vec(&body).expect("serialize body")),
                None => Body::empty(),
            })
            .expect("request");
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json")
        };
        (status, payload)
    }

    #[tokio::test]
    async fn paths_endpoint_lists_the_catalog() {
        let (service, _) = build_service();
        let router = conversation_router(service);

        let (status, payload) = send(&router, "GET", "/api/v1/paths", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["paths"].as_array().map(Vec::len), Some(4));

        let (status, _) = send(&router, "GET", "/api/v1/paths/astronaut", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn conversation_events_flow_over_http() {
        let (service, _) = build_service();
        let router = conversation_router(service);

        let (status, opened) = send(&router, "POST", "/api/v1/conversations", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(opened["state"], json!("idle"));
        let session = opened["session_id"].as_str().expect("session id").to_string();
        let events = format!("/api/v1/conversations/{session}/events");

        let (status, view) = send(
            &router,
            "POST",
            &events,
            Some(json!({ "type": "select_path", "path": "worker_job" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], json!("awaiting_answer"));
        assert_eq!(view["step_index"], json!(0));

        let (status, _) = send(
            &router,
            "POST",
            &events,
            Some(json!({ "type": "answer", "value": ["Atlantis"] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &router,
            "POST",
            &events,
            Some(json!({ "type": "decline_jobs" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_upload_encoding_is_unprocessable() {
        let (service, _) = build_service();
        let router = conversation_router(service);
        let (_, opened) = send(&router, "POST", "/api/v1/conversations", None).await;
        let session = opened["session_id"].as_str().expect("session id");

        let (status, payload) = send(
            &router,
            "POST",
            &format!("/api/v1/conversations/{session}/events"),
            Some(json!({
                "type": "submit",
                "values": {},
                "uploads": [{ "field": "cv", "file_name": "cv.pdf", "content": "not base64!" }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(payload["error"].as_str().unwrap_or_default().contains("base64"));
    }

    #[tokio::test]
    async fn finished_sessions_are_gone_over_http() {
        let (service, _) = build_service();
        let router = conversation_router(service);
        let (_, opened) = send(&router, "POST", "/api/v1/conversations", None).await;
        let session = opened["session_id"].as_str().expect("session id").to_string();

        let (status, view) = send(
            &router,
            "POST",
            &format!("/api/v1/conversations/{session}/events"),
            Some(json!({ "type": "select_path", "path": "company" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], json!("redirected"));

        let (status, _) = send(&router, "GET", &format!("/api/v1/conversations/{session}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_closes_the_conversation() {
        let (service, _) = build_service();
        let router = conversation_router(service.clone());
        let (_, opened) = send(&router, "POST", "/api/v1/conversations", None).await;
        let uri = format!(
            "/api/v1/conversations/{}",
            opened["session_id"].as_str().expect("session id")
        );

        let (status, payload) = send(&router, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(payload, Value::Null);
        assert_eq!(service.live_sessions(), 0);

        let (status, _) = send(&router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&router, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_sessions_are_not_found() {
        let (service, _) = build_service();
        let router = conversation_router(service);
        let (status, _) = send(&router, "GET", "/api/v1/conversations/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&router, "POST", "/api/v1/conversations/missing/resume", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
