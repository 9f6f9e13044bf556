use async_trait::async_trait;
use log::*;
use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use smm_common::Secret;
use smm_engine::{
    db_types::{BotIdentity, InboundUpdate},
    traits::{BotTransport, TransportError},
};

use crate::{config::TelegramConfig, rest::RestClient, UpstreamError};

/// A minimal Telegram Bot API client: `getMe`, `getUpdates`, `sendMessage` and `getChatMember`.
#[derive(Clone)]
pub struct TelegramTransport {
    config: TelegramConfig,
    client: RestClient,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: String,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
}

impl ChatMember {
    fn is_admin(&self) -> bool {
        matches!(self.status.as_str(), "administrator" | "creator")
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

impl From<Update> for Option<InboundUpdate> {
    fn from(update: Update) -> Self {
        let message = update.message?;
        let text = message.text?;
        let (user_id, user_name) = match message.from {
            Some(user) => (user.id, user.username.unwrap_or(user.first_name)),
            None => (message.chat.id, String::default()),
        };
        Some(InboundUpdate { update_id: update.update_id, chat_id: message.chat.id, user_id, user_name, text })
    }
}

impl TelegramTransport {
    pub fn new(config: TelegramConfig) -> Result<Self, UpstreamError> {
        let client = RestClient::new()?;
        Ok(Self { config, client })
    }

    fn url(&self, token: &Secret<String>, method: &str) -> String {
        format!("{}/bot{}/{method}", self.config.api_url.trim_end_matches('/'), token.reveal())
    }

    async fn call<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, UpstreamError> {
        let response: ApiResponse<T> = match self.client.json(req).await {
            Ok(r) => r,
            // Telegram reports errors as JSON bodies with a non-2xx status
            Err(UpstreamError::QueryError { status, message }) => {
                let description = serde_json::from_str::<ApiResponse<serde_json::Value>>(&message)
                    .ok()
                    .and_then(|r| r.description)
                    .unwrap_or(message);
                return Err(UpstreamError::QueryError { status, message: description });
            },
            Err(e) => return Err(e),
        };
        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(UpstreamError::QueryError {
                status: response.error_code.unwrap_or(500),
                message: response.description.unwrap_or_else(|| "Telegram returned no result".into()),
            }),
        }
    }
}

#[async_trait]
impl BotTransport for TelegramTransport {
    async fn validate(&self, token: &Secret<String>) -> Result<BotIdentity, TransportError> {
        let req = self.client.request(Method::GET, &self.url(token, "getMe"));
        let me: User = self.call(req).await?;
        let username = me.username.unwrap_or(me.first_name);
        debug!("🤖️ Token belongs to @{username}");
        Ok(BotIdentity { id: me.id, username })
    }

    async fn next_updates(&self, token: &Secret<String>, offset: i64) -> Result<Vec<InboundUpdate>, TransportError> {
        let query = [("offset", offset.to_string()), ("timeout", self.config.poll_timeout.to_string())];
        let req = self.client.request(Method::GET, &self.url(token, "getUpdates")).query(&query);
        let updates: Vec<Update> = self.call(req).await?;
        // Updates without text still advance the offset, so they are mapped to a blank message rather than dropped
        let updates = updates
            .into_iter()
            .map(|u| {
                let update_id = u.update_id;
                Option::<InboundUpdate>::from(u).unwrap_or(InboundUpdate {
                    update_id,
                    chat_id: 0,
                    user_id: 0,
                    user_name: String::default(),
                    text: String::default(),
                })
            })
            .collect();
        Ok(updates)
    }

    async fn send_message(&self, token: &Secret<String>, chat_id: i64, text: &str) -> Result<(), TransportError> {
        let body = SendMessage { chat_id, text };
        let req = self.client.request(Method::POST, &self.url(token, "sendMessage")).json(&body);
        let _: serde_json::Value = self.call(req).await?;
        trace!("🤖️ Message sent to chat {chat_id}");
        Ok(())
    }

    async fn is_chat_admin(&self, token: &Secret<String>, chat_id: i64, user_id: i64) -> Result<bool, TransportError> {
        let query = [("chat_id", chat_id.to_string()), ("user_id", user_id.to_string())];
        let req = self.client.request(Method::GET, &self.url(token, "getChatMember")).query(&query);
        let member: ChatMember = self.call(req).await?;
        trace!("🤖️ {user_id} is '{}' in chat {chat_id}", member.status);
        Ok(member.is_admin())
    }
}

#[cfg(test)]
mod test {
    use wiremock::{
        matchers::{method, path, query_param},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;

    fn transport(server: &MockServer) -> TelegramTransport {
        TelegramTransport::new(TelegramConfig { api_url: server.uri(), poll_timeout: 0 }).unwrap()
    }

    fn token() -> Secret<String> {
        Secret::new("123:ABC".to_string())
    }

    #[tokio::test]
    async fn validates_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot123:ABC/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true, "result": {"id": 123, "is_bot": true, "first_name": "Shop", "username": "shop_bot"}
            })))
            .mount(&server)
            .await;
        let identity = transport(&server).validate(&token()).await.unwrap();
        assert_eq!(identity, BotIdentity { id: 123, username: "shop_bot".into() });
    }

    #[tokio::test]
    async fn rejected_tokens_are_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false, "error_code": 401, "description": "Unauthorized"
            })))
            .mount(&server)
            .await;
        let err = transport(&server).validate(&token()).await.unwrap_err();
        match err {
            TransportError::InvalidToken(msg) => {
                assert_eq!(msg, "Unauthorized");
            },
            e => panic!("Unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn polls_updates_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot123:ABC/getUpdates"))
            .and(query_param("offset", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": [
                    {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 5}, "from": {"id": 5, "first_name": "Ann", "username": "ann"}, "text": "/start 7"}},
                    {"update_id": 11, "message": {"message_id": 2, "chat": {"id": 5}, "from": {"id": 5, "first_name": "Ann"}, "sticker": {}}},
                    {"update_id": 12, "message": {"message_id": 3, "chat": {"id": 6}, "from": {"id": 6, "first_name": "Bo"}, "text": "/balance"}}
                ]
            })))
            .mount(&server)
            .await;
        let updates = transport(&server).next_updates(&token(), 10).await.unwrap();
        let ids = updates.iter().map(|u| u.update_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(updates[0].text, "/start 7");
        assert_eq!(updates[0].user_name, "ann");
        assert!(updates[1].text.is_empty());
        assert_eq!(updates[2].user_name, "Bo");
    }

    #[tokio::test]
    async fn chat_admins() {
        let server = MockServer::start().await;
        for (user, status) in [("1", "creator"), ("2", "administrator"), ("3", "member"), ("4", "left")] {
            Mock::given(method("GET"))
                .and(path("/bot123:ABC/getChatMember"))
                .and(query_param("chat_id", "-100"))
                .and(query_param("user_id", user))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "ok": true, "result": {"status": status, "user": {"id": 1, "is_bot": false, "first_name": "Ann"}}
                })))
                .mount(&server)
                .await;
        }
        let transport = transport(&server);
        let mut admins = Vec::new();
        for user in 1..=4 {
            admins.push(transport.is_chat_admin(&token(), -100, user).await.unwrap());
        }
        assert_eq!(admins, vec![true, true, false, false]);
    }
}
