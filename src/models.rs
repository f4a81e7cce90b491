//! Data model for the platform REST API.
//!
//! Everything here is plain serde-derived request/response shapes. The
//! tagged unions with non-trivial decoding live in [`crate::updates`] and
//! [`crate::attachments`].

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attachments::{Attachment, AttachmentRequest};

/// Convert a platform epoch-millisecond timestamp to UTC wall time.
pub(crate) fn from_epoch_ms(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ts).single()
}

// ── Users and bots ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    /// Public username. `None` if the user is not accessible or never set one.
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotInfo {
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub full_avatar_url: Option<String>,
}

// ── Chats ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Dialog,
    Chat,
    Channel,
}

/// Chat status for the current bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    Active,
    Removed,
    Left,
    Closed,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub chat_id: i64,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub status: ChatStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: Option<Image>,
    pub last_event_time: i64,
    /// Always 2 for `dialog` chats.
    pub participants_count: i32,
    /// Visible to chat admins only.
    #[serde(default)]
    pub owner_id: Option<i64>,
    /// user id -> last activity time; admins only, `None` in chat lists.
    #[serde(default)]
    pub participants: Option<HashMap<String, i64>>,
    pub is_public: bool,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatList {
    pub chats: Vec<Chat>,
    /// Reference to the next page of chats.
    #[serde(default)]
    pub marker: Option<i64>,
}

/// Chat admin permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAdminPermission {
    ReadAllMessages,
    AddRemoveMembers,
    AddAdmins,
    ChangeChatInfo,
    PinMessage,
    Write,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMember {
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub full_avatar_url: Option<String>,
    pub last_access_time: i64,
    pub is_owner: bool,
    pub is_admin: bool,
    pub join_time: i64,
    /// Present only when the member is an admin.
    #[serde(default)]
    pub permissions: Option<Vec<ChatAdminPermission>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMembersList {
    pub members: Vec<ChatMember>,
    #[serde(default)]
    pub marker: Option<i64>,
}

/// Mutable chat fields for `PATCH chats/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserIdsList {
    pub user_ids: Vec<i64>,
}

/// Actions shown to chat members while the bot is working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    TypingOn,
    TypingOff,
    SendingPhoto,
    SendingVideo,
    SendingAudio,
    MarkSeen,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ActionRequestBody {
    pub action: SenderAction,
}

// ── Messages ───────────────────────────────────────────────────────────────────

/// Message recipient. Either a chat or a user, depending on how it was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default)]
    pub chat_id: Option<i64>,
    pub chat_type: ChatType,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLinkType {
    Forward,
    Reply,
}

/// Forwarded or replied-to message embedded in another message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedMessage {
    #[serde(rename = "type")]
    pub link_type: MessageLinkType,
    pub sender: User,
    #[serde(default)]
    pub chat_id: Option<i64>,
    pub message: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Unique message identifier.
    pub mid: String,
    /// Sequence number of the message within its chat.
    pub seq: i64,
    #[serde(default)]
    pub text: Option<String>,
    /// Attachments in platform order; elements the client cannot recognize
    /// decode to [`Attachment::Unknown`] without disturbing their neighbors.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Set when this message replies to another one.
    #[serde(default)]
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: User,
    pub recipient: Recipient,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub link: Option<LinkedMessage>,
    pub body: MessageBody,
}

impl Message {
    /// Wall-clock time the message was created, if the timestamp is in range.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        from_epoch_ms(self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
}

/// Sent to the bot when a user presses an inline-keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Identifier of the keyboard the button belongs to.
    pub callback_id: String,
    /// Payload of the pressed button.
    #[serde(default)]
    pub payload: Option<String>,
    pub user: User,
}

/// Outgoing message body for `POST`/`PUT messages`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewMessageBody {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRequest>,
    /// When `Some(false)`, chat participants are not notified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<bool>,
}

impl NewMessageBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Reaction to a pressed button: an updated message and/or a one-time
/// notification for the user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallbackAnswer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<NewMessageBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimpleQueryResult {
    pub success: bool,
}

// ── Subscriptions ──────────────────────────────────────────────────────────────

/// One registered webhook subscription.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subscription {
    pub url: String,
    /// Epoch milliseconds when the subscription was created.
    pub time: i64,
    #[serde(default)]
    pub update_types: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetSubscriptionsResult {
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SubscriptionRequestBody {
    pub url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_types: Vec<String>,
    pub version: String,
}

// ── Updates page ───────────────────────────────────────────────────────────────

/// One page of the event stream, as returned by `GET updates`.
///
/// Events are kept raw here: each element is re-decoded individually by the
/// poller so one malformed event cannot fail the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateList {
    #[serde(default)]
    pub updates: Vec<Value>,
    /// Pointer to the next page; absent when there is nothing more right now.
    #[serde(default)]
    pub marker: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_deserializes_with_optional_fields_missing() {
        let chat: Chat = serde_json::from_value(serde_json::json!({
            "chat_id": 17,
            "type": "dialog",
            "status": "active",
            "last_event_time": 1_554_719_682_555i64,
            "participants_count": 2,
            "is_public": false
        }))
        .unwrap();

        assert_eq!(chat.chat_id, 17);
        assert_eq!(chat.chat_type, ChatType::Dialog);
        assert_eq!(chat.status, ChatStatus::Active);
        assert!(chat.title.is_none());
        assert!(chat.owner_id.is_none());
    }

    #[test]
    fn test_new_message_body_skips_empty_attachments() {
        let body = NewMessageBody::text("hi");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["text"], "hi");
        assert!(json.get("attachments").is_none());
        assert!(json.get("notify").is_none());
    }

    #[test]
    fn test_message_sent_at_converts_epoch_millis() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "sender": { "user_id": 1, "name": "a" },
            "recipient": { "chat_id": 2, "chat_type": "chat" },
            "timestamp": 1_554_719_682_555i64,
            "body": { "mid": "m.1", "seq": 4, "text": "hello" }
        }))
        .unwrap();

        let at = message.sent_at().unwrap();
        assert_eq!(at.timestamp_millis(), 1_554_719_682_555);
    }

    #[test]
    fn test_sender_action_wire_names() {
        assert_eq!(
            serde_json::to_value(SenderAction::TypingOn).unwrap(),
            "typing_on"
        );
        assert_eq!(
            serde_json::to_value(SenderAction::MarkSeen).unwrap(),
            "mark_seen"
        );
    }
}
