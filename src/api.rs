//! The `Api` client: owns the HTTP transport and wraps every REST endpoint.
//!
//! All wrappers funnel through a pair of private request helpers that attach
//! the access token and schema version, classify non-2xx responses into
//! [`Error::Api`] and decode 2xx bodies. The update stream
//! entry points are [`Api::get_updates`] (one page) and
//! [`Api::start_polling`] (background loop, see [`crate::polling`]).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{Config, PollingConfig, API_VERSION};
use crate::error::{Error, ErrorBody, Result};
use crate::models::{
    ActionRequestBody, BotInfo, CallbackAnswer, Chat, ChatList, ChatMember, ChatMembersList,
    ChatPatch, GetSubscriptionsResult, Message, MessageList, NewMessageBody, SenderAction,
    SimpleQueryResult, SubscriptionRequestBody, UpdateList, UserIdsList,
};
use crate::polling::{self, UpdateSource, UpdateStream};

/// Extra client-side slack on top of the server's long-poll hold time, so a
/// well-behaved server always answers before the client gives up.
const LONG_POLL_GRACE_SECS: u64 = 5;

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Client for the platform Bot API.
///
/// Cheap to clone; clones share the same connection pool and can issue
/// requests concurrently.
#[derive(Debug, Clone)]
pub struct Api {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    version: String,
    polling: PollingConfig,
}

impl Api {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
            version: API_VERSION.to_string(),
            polling: PollingConfig::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api.base_url.clone(),
            access_token: config.api.access_token.clone(),
            version: config.api.version.clone(),
            polling: config.polling.clone(),
        }
    }

    // ── Transport ──────────────────────────────────────────────────────────────

    fn builder(&self, method: Method, path: &str, query: &[(&str, String)]) -> RequestBuilder {
        let url = join_url(&self.base_url, path);
        debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("v", self.version.as_str()),
            ])
            .query(query)
    }

    async fn read_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(e) => Error::Api {
                    code: e.code,
                    message: e.message,
                },
                Err(_) => Error::Api {
                    code: status.as_u16().to_string(),
                    message: body,
                },
            };
            warn!("api request failed: {}", err);
            return Err(err);
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn request_empty<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.builder(method, path, query).send().await?;
        self.read_response(response).await
    }

    async fn request_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T> {
        let response = self.builder(method, path, query).json(body).send().await?;
        self.read_response(response).await
    }

    // ── Bot ────────────────────────────────────────────────────────────────────

    /// Info about the bot this access token belongs to.
    pub async fn get_bot(&self) -> Result<BotInfo> {
        self.request_empty(Method::GET, "me", &[]).await
    }

    // ── Chats ──────────────────────────────────────────────────────────────────

    pub async fn get_chats(&self, count: Option<u32>, marker: Option<i64>) -> Result<ChatList> {
        let mut query = Vec::new();
        if let Some(count) = count {
            query.push(("count", count.to_string()));
        }
        if let Some(marker) = marker {
            query.push(("marker", marker.to_string()));
        }
        self.request_empty(Method::GET, "chats", &query).await
    }

    pub async fn get_chat(&self, chat_id: i64) -> Result<Chat> {
        self.request_empty(Method::GET, &format!("chats/{chat_id}"), &[])
            .await
    }

    /// The bot's own membership in the given chat.
    pub async fn get_chat_membership(&self, chat_id: i64) -> Result<ChatMember> {
        self.request_empty(Method::GET, &format!("chats/{chat_id}/members/me"), &[])
            .await
    }

    pub async fn get_chat_members(
        &self,
        chat_id: i64,
        count: Option<u32>,
        marker: Option<i64>,
    ) -> Result<ChatMembersList> {
        let mut query = Vec::new();
        if let Some(count) = count {
            query.push(("count", count.to_string()));
        }
        if let Some(marker) = marker {
            query.push(("marker", marker.to_string()));
        }
        self.request_empty(Method::GET, &format!("chats/{chat_id}/members"), &query)
            .await
    }

    pub async fn leave_chat(&self, chat_id: i64) -> Result<SimpleQueryResult> {
        self.request_empty(Method::DELETE, &format!("chats/{chat_id}/members/me"), &[])
            .await
    }

    pub async fn edit_chat(&self, chat_id: i64, patch: &ChatPatch) -> Result<Chat> {
        self.request_json(Method::PATCH, &format!("chats/{chat_id}"), &[], patch)
            .await
    }

    pub async fn add_members(&self, chat_id: i64, user_ids: Vec<i64>) -> Result<SimpleQueryResult> {
        let body = UserIdsList { user_ids };
        self.request_json(Method::POST, &format!("chats/{chat_id}/members"), &[], &body)
            .await
    }

    pub async fn remove_member(&self, chat_id: i64, user_id: i64) -> Result<SimpleQueryResult> {
        let query = [("user_id", user_id.to_string())];
        self.request_empty(Method::DELETE, &format!("chats/{chat_id}/members"), &query)
            .await
    }

    /// Show a transient action (typing, sending photo, ...) to chat members.
    pub async fn send_action(
        &self,
        chat_id: i64,
        action: SenderAction,
    ) -> Result<SimpleQueryResult> {
        let body = ActionRequestBody { action };
        self.request_json(Method::POST, &format!("chats/{chat_id}/actions"), &[], &body)
            .await
    }

    // ── Messages ───────────────────────────────────────────────────────────────

    /// Messages in a chat, newest first. `from`/`to` are epoch-millisecond
    /// bounds; `to` must be less than `from`.
    pub async fn get_messages(
        &self,
        chat_id: Option<i64>,
        message_ids: &[String],
        from: Option<i64>,
        to: Option<i64>,
        count: Option<u32>,
    ) -> Result<MessageList> {
        let mut query = Vec::new();
        if let Some(chat_id) = chat_id {
            query.push(("chat_id", chat_id.to_string()));
        }
        for mid in message_ids {
            query.push(("message_ids", mid.clone()));
        }
        if let Some(from) = from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = to {
            query.push(("to", to.to_string()));
        }
        if let Some(count) = count {
            query.push(("count", count.to_string()));
        }
        self.request_empty(Method::GET, "messages", &query).await
    }

    /// Send a message to a chat or directly to a user.
    pub async fn send_message(
        &self,
        chat_id: Option<i64>,
        user_id: Option<i64>,
        message: &NewMessageBody,
    ) -> Result<Message> {
        let mut query = Vec::new();
        if let Some(chat_id) = chat_id {
            query.push(("chat_id", chat_id.to_string()));
        }
        if let Some(user_id) = user_id {
            query.push(("user_id", user_id.to_string()));
        }
        self.request_json(Method::POST, "messages", &query, message)
            .await
    }

    pub async fn edit_message(
        &self,
        message_id: i64,
        message: &NewMessageBody,
    ) -> Result<SimpleQueryResult> {
        let query = [("message_id", message_id.to_string())];
        self.request_json(Method::PUT, "messages", &query, message)
            .await
    }

    pub async fn delete_message(&self, message_id: i64) -> Result<SimpleQueryResult> {
        let query = [("message_id", message_id.to_string())];
        self.request_empty(Method::DELETE, "messages", &query).await
    }

    /// Answer a pressed inline-keyboard button with an updated message
    /// and/or a one-time notification.
    pub async fn answer_callback(
        &self,
        callback_id: i64,
        answer: &CallbackAnswer,
    ) -> Result<SimpleQueryResult> {
        let query = [("callback_id", callback_id.to_string())];
        self.request_json(Method::POST, "answers", &query, answer)
            .await
    }

    // ── Subscriptions ──────────────────────────────────────────────────────────

    pub async fn get_subscriptions(&self) -> Result<GetSubscriptionsResult> {
        self.request_empty(Method::GET, "subscriptions", &[]).await
    }

    /// Register `url` to receive updates as webhook pushes.
    pub async fn subscribe(
        &self,
        url: impl Into<String>,
        update_types: Vec<String>,
    ) -> Result<SimpleQueryResult> {
        let body = SubscriptionRequestBody {
            url: url.into(),
            update_types,
            version: self.version.clone(),
        };
        self.request_json(Method::POST, "subscriptions", &[], &body)
            .await
    }

    pub async fn unsubscribe(&self, url: &str) -> Result<SimpleQueryResult> {
        let query = [("url", url.to_string())];
        self.request_empty(Method::DELETE, "subscriptions", &query)
            .await
    }

    // ── Updates ────────────────────────────────────────────────────────────────

    /// Fetch one page of updates starting at `marker`.
    ///
    /// The request is held open server-side for up to `timeout` seconds while
    /// the server waits for events. A client-side timeout on this call is the
    /// long-poll window elapsing, not a failure, and yields an empty page;
    /// every other transport problem is a real error.
    pub async fn get_updates(
        &self,
        limit: u32,
        timeout: u32,
        marker: Option<i64>,
        types: &[String],
    ) -> Result<UpdateList> {
        let mut query = vec![
            ("limit", limit.to_string()),
            ("timeout", timeout.to_string()),
        ];
        if let Some(marker) = marker {
            query.push(("marker", marker.to_string()));
        }
        for t in types {
            query.push(("types", t.clone()));
        }

        let request = self
            .builder(Method::GET, "updates", &query)
            .timeout(Duration::from_secs(u64::from(timeout) + LONG_POLL_GRACE_SECS));

        match request.send().await {
            Ok(response) => self.read_response(response).await,
            Err(e) if e.is_timeout() => {
                debug!("long poll window elapsed with no data");
                Ok(UpdateList::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start the background polling loop and return its update stream.
    ///
    /// `marker` resumes from a previously observed position; `None` starts
    /// from whatever the server considers current. The marker is not
    /// persisted anywhere; callers that must not lose progress across
    /// restarts should remember the position themselves.
    pub fn start_polling(&self, marker: Option<i64>) -> UpdateStream {
        polling::poll_updates(self.clone(), self.polling.clone(), marker)
    }
}

#[async_trait]
impl UpdateSource for Api {
    async fn fetch_updates(
        &self,
        limit: u32,
        timeout: u32,
        marker: Option<i64>,
        types: &[String],
    ) -> Result<UpdateList> {
        self.get_updates(limit, timeout, marker, types).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_handles_trailing_slash() {
        assert_eq!(
            join_url("https://botapi.example.com/", "me"),
            "https://botapi.example.com/me"
        );
        assert_eq!(
            join_url("https://botapi.example.com", "chats/5"),
            "https://botapi.example.com/chats/5"
        );
    }

    #[test]
    fn test_from_config_carries_polling_settings() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://botapi.example.com/"
            access_token = "secret"

            [polling]
            limit = 7
            "#,
        )
        .unwrap();

        let api = Api::from_config(&config);
        assert_eq!(api.polling.limit, 7);
        assert_eq!(api.version, API_VERSION);
    }
}
