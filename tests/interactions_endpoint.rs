#[cfg(test)]
mod interactions_endpoint_tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use ticketbot::config::{AppConfig, DiscordConfig, ServerConfig, TicketSettings};
    use ticketbot::main_module::build_router;
    use ticketbot::shared::state::AppState;
    use ticketbot::tests::test_util::{
        setup, sign_interaction, test_keypair, test_public_key_hex, FakePlatform,
    };

    fn now() -> String {
        chrono::Utc::now().timestamp().to_string()
    }

    fn config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            discord: DiscordConfig {
                token: "token".to_string(),
                application_id: "app".to_string(),
                public_key: test_public_key_hex(),
                api_url: "http://localhost".to_string(),
                guild_id: None,
                register_commands: false,
                timeout_secs: 5,
            },
            tickets: TicketSettings {
                staff_role_id: Some("staff".to_string()),
                ..TicketSettings::default()
            },
        }
    }

    fn app() -> (Arc<FakePlatform>, Arc<AppState>) {
        setup();
        let platform = Arc::new(FakePlatform::new());
        let state = AppState::new(config(), platform.clone()).unwrap();
        (platform, Arc::new(state))
    }

    fn signed(body: &Value) -> Request<Body> {
        let raw = body.to_string();
        let timestamp = now();
        let signature = sign_interaction(&test_keypair(), &timestamp, raw.as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/discord/interactions")
            .header("content-type", "application/json")
            .header("x-signature-ed25519", signature)
            .header("x-signature-timestamp", timestamp)
            .body(Body::from(raw))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn member(user_id: &str, roles: &[&str]) -> Value {
        json!({
            "user": { "id": user_id, "username": user_id },
            "roles": roles,
            "permissions": "0"
        })
    }

    fn component(custom_id: &str, channel_id: &str, member: Value, values: &[&str]) -> Value {
        json!({
            "id": "i1",
            "type": 3,
            "token": "t",
            "guild_id": "guild-1",
            "channel_id": channel_id,
            "member": member,
            "data": { "custom_id": custom_id, "component_type": 2, "values": values }
        })
    }

    #[tokio::test]
    async fn test_ping_is_answered_with_pong() {
        let (_platform, state) = app();
        let (status, body) = send(&state, signed(&json!({ "id": "1", "type": 1 }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn test_unsigned_and_tampered_requests_are_rejected() {
        let (_platform, state) = app();

        let unsigned = Request::builder()
            .method("POST")
            .uri("/api/discord/interactions")
            .body(Body::from(r#"{"id":"1","type":1}"#))
            .unwrap();
        let (status, _) = send(&state, unsigned).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let timestamp = now();
        let signature = sign_interaction(&test_keypair(), &timestamp, br#"{"id":"1","type":1}"#);
        let tampered = Request::builder()
            .method("POST")
            .uri("/api/discord/interactions")
            .header("x-signature-ed25519", signature)
            .header("x-signature-timestamp", timestamp)
            .body(Body::from(r#"{"id":"1","type":2}"#))
            .unwrap();
        let (status, _) = send(&state, tampered).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_replayed_request_is_rejected() {
        let (_platform, state) = app();
        let body = br#"{"id":"1","type":1}"#;
        let old = (chrono::Utc::now().timestamp() - 3600).to_string();
        let signature = sign_interaction(&test_keypair(), &old, body);

        let replay = Request::builder()
            .method("POST")
            .uri("/api/discord/interactions")
            .header("x-signature-ed25519", signature)
            .header("x-signature-timestamp", old)
            .body(Body::from(&body[..]))
            .unwrap();
        let (status, _) = send(&state, replay).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_liveness_endpoints() {
        let (_platform, state) = app();

        let response = build_router(state.clone())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Ticket bot is alive");

        let (status, body) = send(
            &state,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["open_tickets"], 0);
    }

    #[tokio::test]
    async fn test_ticket_flow_over_http() {
        let (platform, state) = app();

        let (_, body) = send(
            &state,
            signed(&component("ticket_select", "panel", member("U1", &[]), &["support"])),
        )
        .await;
        assert_eq!(body, json!({ "type": 5, "data": { "flags": 64 } }));
        let fake = platform.wait_for(|s| s.interaction_edits.len() == 1).await;
        let created = fake.interaction_edits[0].1.content.clone().unwrap();
        assert!(created.starts_with("✅ Ticket created: <#"));
        let channel = created
            .trim_start_matches("✅ Ticket created: <#")
            .trim_end_matches('>')
            .to_string();

        send(
            &state,
            signed(&component("ticket_select", "panel", member("U1", &[]), &["billings"])),
        )
        .await;
        let fake = platform.wait_for(|s| s.interaction_edits.len() == 2).await;
        assert_eq!(
            fake.interaction_edits[1].1.content.as_deref(),
            Some(format!("You already have an open ticket: <#{channel}>").as_str())
        );

        let (_, body) = send(
            &state,
            signed(&component("ticket_lock", &channel, member("U1", &[]), &[])),
        )
        .await;
        assert_eq!(body, json!({ "type": 6 }));
        let fake = platform.wait_for(|s| s.followups.len() == 1).await;
        let refusal = &fake.followups[0].1;
        assert_eq!(refusal.content.as_deref(), Some("Only staff can lock tickets."));
        assert!(refusal.is_ephemeral());

        let (_, body) = send(
            &state,
            signed(&component("ticket_lock", &channel, member("S1", &["staff"]), &[])),
        )
        .await;
        assert_eq!(body, json!({ "type": 6 }));
        let fake = platform.wait_for(|s| s.interaction_edits.len() == 3).await;
        let redraw = serde_json::to_value(&fake.interaction_edits[2].1).unwrap();
        assert_eq!(redraw["components"][0]["components"][0]["disabled"], true);
        assert!(state.controller.lookup(&channel).await.unwrap().locked);

        let (_, body) = send(
            &state,
            signed(&component("ticket_delete", &channel, member("S1", &["staff"]), &[])),
        )
        .await;
        assert_eq!(body["type"], 9);
        assert_eq!(body["data"]["custom_id"], "close_modal:notrans");

        let submit = json!({
            "id": "i2",
            "type": 5,
            "token": "t",
            "guild_id": "guild-1",
            "channel_id": channel,
            "member": member("S1", &["staff"]),
            "data": {
                "custom_id": "close_modal:notrans",
                "components": [{ "type": 1, "components": [
                    { "type": 4, "custom_id": "close_reason", "value": "done" }
                ]}]
            }
        });
        let (_, body) = send(&state, signed(&submit)).await;
        assert_eq!(body["data"]["content"], "Closing ticket... processing.");

        let (_, body) = send(&state, signed(&submit)).await;
        assert_eq!(body["data"]["flags"], 64);
        assert_ne!(body["data"]["content"], "Closing ticket... processing.");

        platform.wait_for(|s| s.deleted.contains(&channel)).await;
        assert!(state.controller.lookup(&channel).await.is_none());
    }

    #[tokio::test]
    async fn test_settings_commands_require_admin() {
        let (_platform, state) = app();
        let command = |permissions: &str| {
            json!({
                "id": "i3",
                "type": 2,
                "token": "t",
                "guild_id": "guild-1",
                "channel_id": "general",
                "member": { "user": { "id": "A1", "username": "a" }, "roles": [], "permissions": permissions },
                "data": {
                    "name": "setstaff",
                    "options": [{ "name": "role", "type": 8, "value": "mods" }]
                }
            })
        };

        let (_, body) = send(&state, signed(&command("0"))).await;
        assert_eq!(
            body["data"]["content"],
            "Only administrators can change ticket settings."
        );
        assert_eq!(
            state.settings.snapshot().await.staff_role_id.as_deref(),
            Some("staff")
        );

        let (_, body) = send(&state, signed(&command("8"))).await;
        assert_eq!(body["data"]["content"], "✅ Staff role set to <@&mods>.");
        assert_eq!(
            state.settings.snapshot().await.staff_role_id.as_deref(),
            Some("mods")
        );
    }

    #[tokio::test]
    async fn test_ticket_command_posts_panel() {
        let (platform, state) = app();
        let body = json!({
            "id": "i4",
            "type": 2,
            "token": "t",
            "guild_id": "guild-1",
            "channel_id": "support-desk",
            "member": member("U9", &[]),
            "data": { "name": "ticket" }
        });

        let (_, response) = send(&state, signed(&body)).await;

        assert_eq!(response["data"]["content"], "✅ Ticket panel posted.");
        let inspected = platform.inspect().await;
        let sent = inspected.sent_to("support-desk");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].embeds[0].title.as_deref(), Some("Open a Ticket"));
    }
}
