use std::time::Duration;

use log::debug;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::channels::{
    ChannelError, ChannelMessage, ChatPlatform, CreateChannel, FileUpload, GuildChannel,
    GuildInfo, MessagePayload, PlatformUser,
};
use crate::config::DiscordConfig;
use crate::tickets::permissions::PermissionOverwrite;

pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// Discord REST client authenticated as the bot user.
pub struct DiscordProvider {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    application_id: String,
}

#[derive(Debug, Deserialize)]
struct DiscordErrorResponse {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

impl DiscordProvider {
    pub fn new(config: &DiscordConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.token.clone(),
            application_id: config.application_id.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bot {}", self.bot_token))
    }

    async fn parse_error_response(response: reqwest::Response) -> ChannelError {
        let status = response.status();

        if status.as_u16() == 401 {
            return ChannelError::AuthenticationFailed("Invalid bot token".to_string());
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return ChannelError::RateLimited { retry_after };
        }

        let error_text = response.text().await.unwrap_or_default();

        if status.as_u16() == 404 {
            return ChannelError::NotFound(error_text);
        }

        if let Ok(error_response) = serde_json::from_str::<DiscordErrorResponse>(&error_text) {
            return ChannelError::ApiError {
                code: Some(format!("{} ({})", status, error_response.code)),
                message: error_response.message,
            };
        }

        ChannelError::ApiError {
            code: Some(status.to_string()),
            message: error_text,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ChannelError> {
        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::parse_error_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChannelError::InvalidResponse(e.to_string()))
    }

    /// For endpoints whose body, if any, is not needed.
    async fn execute_empty(&self, request: RequestBuilder) -> Result<(), ChannelError> {
        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::parse_error_response(response).await);
        }
        Ok(())
    }

    async fn open_dm_channel(&self, user_id: &str) -> Result<String, ChannelError> {
        let channel: DmChannel = self
            .execute(
                self.request(Method::POST, "/users/@me/channels")
                    .json(&serde_json::json!({ "recipient_id": user_id })),
            )
            .await?;
        Ok(channel.id)
    }
}

#[async_trait::async_trait]
impl ChatPlatform for DiscordProvider {
    async fn guild(&self, guild_id: &str) -> Result<GuildInfo, ChannelError> {
        self.execute(self.request(Method::GET, &format!("/guilds/{guild_id}")))
            .await
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<GuildChannel>, ChannelError> {
        self.execute(self.request(Method::GET, &format!("/guilds/{guild_id}/channels")))
            .await
    }

    async fn create_channel(
        &self,
        guild_id: &str,
        request: &CreateChannel,
    ) -> Result<GuildChannel, ChannelError> {
        debug!("Creating channel {} in guild {}", request.name, guild_id);
        self.execute(
            self.request(Method::POST, &format!("/guilds/{guild_id}/channels"))
                .json(request),
        )
        .await
    }

    async fn edit_overwrite(
        &self,
        channel_id: &str,
        overwrite: &PermissionOverwrite,
    ) -> Result<(), ChannelError> {
        self.execute_empty(
            self.request(
                Method::PUT,
                &format!("/channels/{}/permissions/{}", channel_id, overwrite.id),
            )
            .json(overwrite),
        )
        .await
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<(), ChannelError> {
        self.execute_empty(
            self.request(Method::PATCH, &format!("/channels/{channel_id}"))
                .json(&serde_json::json!({ "name": name })),
        )
        .await
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), ChannelError> {
        self.execute_empty(self.request(Method::DELETE, &format!("/channels/{channel_id}")))
            .await
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &MessagePayload,
    ) -> Result<ChannelMessage, ChannelError> {
        self.execute(
            self.request(Method::POST, &format!("/channels/{channel_id}/messages"))
                .json(message),
        )
        .await
    }

    async fn send_file(
        &self,
        channel_id: &str,
        message: &MessagePayload,
        file: &FileUpload,
    ) -> Result<ChannelMessage, ChannelError> {
        let mut payload =
            serde_json::to_value(message).map_err(|e| ChannelError::InvalidResponse(e.to_string()))?;
        payload["attachments"] = serde_json::json!([{ "id": 0, "filename": file.filename }]);

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ChannelError::ApiError {
                code: None,
                message: e.to_string(),
            })?;

        let form = reqwest::multipart::Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", part);

        self.execute(
            self.request(Method::POST, &format!("/channels/{channel_id}/messages"))
                .multipart(form),
        )
        .await
    }

    async fn fetch_user(&self, user_id: &str) -> Result<PlatformUser, ChannelError> {
        self.execute(self.request(Method::GET, &format!("/users/{user_id}")))
            .await
    }

    async fn send_direct_message(
        &self,
        user_id: &str,
        message: &MessagePayload,
    ) -> Result<ChannelMessage, ChannelError> {
        let dm_channel = self.open_dm_channel(user_id).await?;
        self.send_message(&dm_channel, message).await
    }

    async fn fetch_messages(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, ChannelError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }

        self.execute(
            self.request(Method::GET, &format!("/channels/{channel_id}/messages"))
                .query(&query),
        )
        .await
    }

    async fn register_commands(
        &self,
        guild_id: Option<&str>,
        commands: &[serde_json::Value],
    ) -> Result<(), ChannelError> {
        let path = match guild_id {
            Some(guild) => format!(
                "/applications/{}/guilds/{}/commands",
                self.application_id, guild
            ),
            None => format!("/applications/{}/commands", self.application_id),
        };
        self.execute_empty(self.request(Method::PUT, &path).json(commands))
            .await
    }

    async fn edit_interaction_response(
        &self,
        interaction_token: &str,
        message: &MessagePayload,
    ) -> Result<(), ChannelError> {
        let path = format!(
            "/webhooks/{}/{}/messages/@original",
            self.application_id, interaction_token
        );
        self.execute_empty(self.request(Method::PATCH, &path).json(message))
            .await
    }

    async fn send_interaction_followup(
        &self,
        interaction_token: &str,
        message: &MessagePayload,
    ) -> Result<(), ChannelError> {
        let path = format!("/webhooks/{}/{}", self.application_id, interaction_token);
        self.execute_empty(self.request(Method::POST, &path).json(message))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::permissions;
    use mockito::Matcher;

    fn provider(server: &mockito::ServerGuard) -> DiscordProvider {
        DiscordProvider::new(&DiscordConfig {
            token: "test-token".to_string(),
            application_id: "app-1".to_string(),
            public_key: String::new(),
            api_url: server.url(),
            guild_id: None,
            register_commands: false,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn message_json(id: &str, channel_id: &str) -> String {
        serde_json::json!({
            "id": id,
            "channel_id": channel_id,
            "content": "hi",
            "timestamp": "2024-05-01T10:00:00+00:00",
            "author": { "id": "bot", "username": "ticketbot" },
            "attachments": [
                { "id": "a1", "filename": "ticket-1-transcript.html", "url": "https://cdn.discordapp.com/a1" }
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_send_message_authenticates_as_bot() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/channels/42/messages")
            .match_header("authorization", "Bot test-token")
            .match_body(Matcher::PartialJson(serde_json::json!({ "content": "hello" })))
            .with_status(200)
            .with_body(message_json("m1", "42"))
            .create_async()
            .await;

        let sent = provider(&server)
            .send_message("42", &MessagePayload::text("hello"))
            .await
            .unwrap();

        assert_eq!(sent.id, "m1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_maps_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/channels/42")
            .with_status(429)
            .with_header("retry-after", "1.5")
            .create_async()
            .await;

        let err = provider(&server).delete_channel("42").await.unwrap_err();

        assert!(matches!(err, ChannelError::RateLimited { retry_after: Some(r) } if r == 1.5));
    }

    #[tokio::test]
    async fn test_api_error_carries_discord_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/channels/42")
            .with_status(403)
            .with_body(r#"{"message":"Missing Permissions","code":50013}"#)
            .create_async()
            .await;

        let err = provider(&server)
            .rename_channel("42", "✅-ticket-1")
            .await
            .unwrap_err();

        match err {
            ChannelError::ApiError { code, message } => {
                assert_eq!(message, "Missing Permissions");
                assert!(code.unwrap().contains("50013"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/9")
            .with_status(404)
            .with_body(r#"{"message":"Unknown User","code":10013}"#)
            .create_async()
            .await;

        let err = provider(&server).fetch_user("9").await.unwrap_err();
        assert!(matches!(err, ChannelError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_messages_passes_cursor() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/channels/42/messages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "100".into()),
                Matcher::UrlEncoded("before".into(), "500".into()),
            ]))
            .with_status(200)
            .with_body(format!("[{}]", message_json("499", "42")))
            .create_async()
            .await;

        let page = provider(&server)
            .fetch_messages("42", Some("500"), 100)
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "499");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_edit_overwrite_targets_member() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/channels/42/permissions/u1")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "type": 1,
                "deny": "2048"
            })))
            .with_status(204)
            .create_async()
            .await;

        provider(&server)
            .edit_overwrite("42", &permissions::lock_delta(&"u1".to_string()))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_direct_message_opens_dm_channel_first() {
        let mut server = mockito::Server::new_async().await;
        let open = server
            .mock("POST", "/users/@me/channels")
            .match_body(Matcher::Json(serde_json::json!({ "recipient_id": "u1" })))
            .with_status(200)
            .with_body(r#"{"id":"dm-7","type":1}"#)
            .create_async()
            .await;
        let send = server
            .mock("POST", "/channels/dm-7/messages")
            .with_status(200)
            .with_body(message_json("m2", "dm-7"))
            .create_async()
            .await;

        provider(&server)
            .send_direct_message("u1", &MessagePayload::text("closed"))
            .await
            .unwrap();

        open.assert_async().await;
        send.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_file_is_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/channels/t1/messages")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data".to_string()),
            )
            .match_body(Matcher::Regex("payload_json".to_string()))
            .with_status(200)
            .with_body(message_json("m3", "t1"))
            .create_async()
            .await;

        let sent = provider(&server)
            .send_file(
                "t1",
                &MessagePayload::text("Transcript"),
                &FileUpload::html("ticket-1-transcript.html", b"<html></html>".to_vec()),
            )
            .await
            .unwrap();

        assert_eq!(sent.attachments[0].url, "https://cdn.discordapp.com/a1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_register_commands_scopes_to_guild() {
        let mut server = mockito::Server::new_async().await;
        let guild = server
            .mock("PUT", "/applications/app-1/guilds/g1/commands")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let global = server
            .mock("PUT", "/applications/app-1/commands")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let provider = provider(&server);
        provider
            .register_commands(Some("g1"), &[serde_json::json!({ "name": "ticket" })])
            .await
            .unwrap();
        provider.register_commands(None, &[]).await.unwrap();

        guild.assert_async().await;
        global.assert_async().await;
    }

    #[tokio::test]
    async fn test_interaction_webhooks_use_application_and_token() {
        let mut server = mockito::Server::new_async().await;
        let edit = server
            .mock("PATCH", "/webhooks/app-1/tok-1/messages/@original")
            .match_body(Matcher::PartialJson(serde_json::json!({ "content": "done" })))
            .with_status(200)
            .with_body(message_json("m2", "42"))
            .create_async()
            .await;
        let followup = server
            .mock("POST", "/webhooks/app-1/tok-1")
            .match_body(Matcher::PartialJson(serde_json::json!({ "flags": 64 })))
            .with_status(200)
            .with_body(message_json("m3", "42"))
            .create_async()
            .await;

        let provider = provider(&server);
        provider
            .edit_interaction_response("tok-1", &MessagePayload::text("done"))
            .await
            .unwrap();
        provider
            .send_interaction_followup("tok-1", &MessagePayload::ephemeral("nope"))
            .await
            .unwrap();

        edit.assert_async().await;
        followup.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_interaction_token_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/webhooks/app-1/old/messages/@original")
            .with_status(404)
            .with_body(r#"{"message": "Unknown Webhook", "code": 10015}"#)
            .create_async()
            .await;

        let err = provider(&server)
            .edit_interaction_response("old", &MessagePayload::text("late"))
            .await
            .unwrap_err();

        assert!(matches!(err, ChannelError::NotFound(_)));
    }
}
