//! The `Update` union: every kind of event the platform delivers to a bot.
//!
//! Decoding follows the same two-pass scheme as attachments: read the
//! `update_type` discriminator from a minimal envelope, then decode the full
//! payload into the concrete variant. Updates the client cannot make sense
//! of (an unlisted discriminator, a missing one, a payload that does not
//! match its tag) become [`Update::Unknown`] so a single bad event never
//! terminates a poll page or a webhook push. Decoding is pure: the same
//! bytes always produce the same variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{from_epoch_ms, Callback, Message};

/// Closed set of update discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    MessageCreated,
    MessageEdited,
    MessageRemoved,
    MessageRestored,
    MessageCallback,
    BotAdded,
    BotRemoved,
    BotStarted,
    UserAdded,
    UserRemoved,
    ChatTitleChanged,
}

impl UpdateType {
    /// Wire name of the discriminator, e.g. `message_created`.
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateType::MessageCreated => "message_created",
            UpdateType::MessageEdited => "message_edited",
            UpdateType::MessageRemoved => "message_removed",
            UpdateType::MessageRestored => "message_restored",
            UpdateType::MessageCallback => "message_callback",
            UpdateType::BotAdded => "bot_added",
            UpdateType::BotRemoved => "bot_removed",
            UpdateType::BotStarted => "bot_started",
            UpdateType::UserAdded => "user_added",
            UpdateType::UserRemoved => "user_removed",
            UpdateType::ChatTitleChanged => "chat_title_changed",
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Variant payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCreatedUpdate {
    /// Epoch milliseconds when the event occurred.
    pub timestamp: i64,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEditedUpdate {
    pub timestamp: i64,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRemovedUpdate {
    pub timestamp: i64,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRestoredUpdate {
    pub timestamp: i64,
    pub message_id: String,
}

/// A user pressed an inline-keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCallbackUpdate {
    pub timestamp: i64,
    pub callback: Callback,
    /// The message carrying the keyboard. `None` when it was deleted before
    /// this update reached the bot.
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotAddedUpdate {
    pub timestamp: i64,
    pub chat_id: i64,
    /// Who added the bot.
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRemovedUpdate {
    pub timestamp: i64,
    pub chat_id: i64,
    /// Who removed the bot.
    pub user_id: i64,
}

/// A user pressed the `Start` button in a dialog with the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStartedUpdate {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAddedUpdate {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user_id: i64,
    /// Who invited the user.
    pub inviter_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRemovedUpdate {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user_id: i64,
    /// Admin who removed the user.
    pub admin_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTitleChangedUpdate {
    pub timestamp: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub title: String,
}

// ── The union ──────────────────────────────────────────────────────────────────

/// One event from the platform, decoded into its concrete shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "update_type", rename_all = "snake_case")]
pub enum Update {
    MessageCreated(MessageCreatedUpdate),
    MessageEdited(MessageEditedUpdate),
    MessageRemoved(MessageRemovedUpdate),
    MessageRestored(MessageRestoredUpdate),
    MessageCallback(MessageCallbackUpdate),
    BotAdded(BotAddedUpdate),
    BotRemoved(BotRemovedUpdate),
    BotStarted(BotStartedUpdate),
    UserAdded(UserAddedUpdate),
    UserRemoved(UserRemovedUpdate),
    ChatTitleChanged(ChatTitleChangedUpdate),
    /// Event this client does not know about. Kept so consumers can decide
    /// whether to ignore it or react to a newer platform feature.
    Unknown,
}

/// Minimal envelope: only the discriminator.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    update_type: Option<String>,
}

fn concrete<T>(value: &Value) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    T::deserialize(value).ok()
}

impl Update {
    /// Decode one update from raw bytes. Never fails; see [`Update::Unknown`].
    pub fn decode(raw: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Update::Unknown,
        }
    }

    /// Decode one update from an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(tag) = Envelope::deserialize(value).ok().and_then(|e| e.update_type) else {
            return Update::Unknown;
        };
        let decoded = match tag.as_str() {
            "message_created" => concrete(value).map(Update::MessageCreated),
            "message_edited" => concrete(value).map(Update::MessageEdited),
            "message_removed" => concrete(value).map(Update::MessageRemoved),
            "message_restored" => concrete(value).map(Update::MessageRestored),
            "message_callback" => concrete(value).map(Update::MessageCallback),
            "bot_added" => concrete(value).map(Update::BotAdded),
            "bot_removed" => concrete(value).map(Update::BotRemoved),
            "bot_started" => concrete(value).map(Update::BotStarted),
            "user_added" => concrete(value).map(Update::UserAdded),
            "user_removed" => concrete(value).map(Update::UserRemoved),
            "chat_title_changed" => concrete(value).map(Update::ChatTitleChanged),
            _ => None,
        };
        decoded.unwrap_or(Update::Unknown)
    }

    /// Discriminator of this update; `None` for [`Update::Unknown`].
    pub fn update_type(&self) -> Option<UpdateType> {
        match self {
            Update::MessageCreated(_) => Some(UpdateType::MessageCreated),
            Update::MessageEdited(_) => Some(UpdateType::MessageEdited),
            Update::MessageRemoved(_) => Some(UpdateType::MessageRemoved),
            Update::MessageRestored(_) => Some(UpdateType::MessageRestored),
            Update::MessageCallback(_) => Some(UpdateType::MessageCallback),
            Update::BotAdded(_) => Some(UpdateType::BotAdded),
            Update::BotRemoved(_) => Some(UpdateType::BotRemoved),
            Update::BotStarted(_) => Some(UpdateType::BotStarted),
            Update::UserAdded(_) => Some(UpdateType::UserAdded),
            Update::UserRemoved(_) => Some(UpdateType::UserRemoved),
            Update::ChatTitleChanged(_) => Some(UpdateType::ChatTitleChanged),
            Update::Unknown => None,
        }
    }

    /// Epoch milliseconds when the event occurred; `None` for [`Update::Unknown`].
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Update::MessageCreated(u) => Some(u.timestamp),
            Update::MessageEdited(u) => Some(u.timestamp),
            Update::MessageRemoved(u) => Some(u.timestamp),
            Update::MessageRestored(u) => Some(u.timestamp),
            Update::MessageCallback(u) => Some(u.timestamp),
            Update::BotAdded(u) => Some(u.timestamp),
            Update::BotRemoved(u) => Some(u.timestamp),
            Update::BotStarted(u) => Some(u.timestamp),
            Update::UserAdded(u) => Some(u.timestamp),
            Update::UserRemoved(u) => Some(u.timestamp),
            Update::ChatTitleChanged(u) => Some(u.timestamp),
            Update::Unknown => None,
        }
    }

    /// Wall-clock time the event occurred, if the timestamp is in range.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp().and_then(from_epoch_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::{Attachment, Button};
    use serde_json::json;

    fn message_value(text: &str, attachments: Value) -> Value {
        json!({
            "sender": { "user_id": 11, "name": "alice", "username": "alice" },
            "recipient": { "chat_id": 42, "chat_type": "chat" },
            "timestamp": 1_554_719_682_555i64,
            "body": {
                "mid": "mid.001",
                "seq": 7,
                "text": text,
                "attachments": attachments
            }
        })
    }

    #[test]
    fn test_message_created_decodes_with_attachments_in_order() {
        let raw = json!({
            "update_type": "message_created",
            "timestamp": 1_554_719_682_555i64,
            "message": message_value("look at this", json!([
                {
                    "type": "image",
                    "payload": { "photo_id": 5, "token": "t", "url": "https://img.example/a.png" }
                },
                {
                    "type": "inline_keyboard",
                    "callback_id": "kb-9",
                    "payload": { "buttons": [
                        [ { "type": "callback", "text": "yes", "payload": "y" } ],
                        [ { "type": "callback", "text": "no", "payload": "n" } ]
                    ]}
                }
            ]))
        });

        let update = Update::from_value(&raw);
        assert_eq!(update.update_type(), Some(UpdateType::MessageCreated));

        let Update::MessageCreated(u) = update else {
            panic!("wrong variant");
        };
        assert_eq!(u.message.body.text.as_deref(), Some("look at this"));

        let attachments = &u.message.body.attachments;
        assert_eq!(attachments.len(), 2);
        let Attachment::Image(img) = &attachments[0] else {
            panic!("first attachment should be an image, got {:?}", attachments[0]);
        };
        assert_eq!(img.payload.url, "https://img.example/a.png");
        let Attachment::InlineKeyboard(kb) = &attachments[1] else {
            panic!("second attachment should be a keyboard, got {:?}", attachments[1]);
        };
        assert_eq!(kb.payload.buttons.len(), 2);
        assert_eq!(kb.payload.buttons[0].len(), 1);
        assert!(matches!(kb.payload.buttons[0][0], Button::Callback(_)));
    }

    #[test]
    fn test_every_known_discriminator_decodes_to_matching_variant() {
        let cases = [
            (json!({ "update_type": "message_removed", "timestamp": 1, "message_id": "m" }),
             UpdateType::MessageRemoved),
            (json!({ "update_type": "message_restored", "timestamp": 1, "message_id": "m" }),
             UpdateType::MessageRestored),
            (json!({ "update_type": "bot_added", "timestamp": 1, "chat_id": 2, "user_id": 3 }),
             UpdateType::BotAdded),
            (json!({ "update_type": "bot_removed", "timestamp": 1, "chat_id": 2, "user_id": 3 }),
             UpdateType::BotRemoved),
            (json!({ "update_type": "bot_started", "timestamp": 1, "chat_id": 2, "user_id": 3 }),
             UpdateType::BotStarted),
            (json!({ "update_type": "user_added", "timestamp": 1, "chat_id": 2, "user_id": 3, "inviter_id": 4 }),
             UpdateType::UserAdded),
            (json!({ "update_type": "user_removed", "timestamp": 1, "chat_id": 2, "user_id": 3, "admin_id": 4 }),
             UpdateType::UserRemoved),
            (json!({ "update_type": "chat_title_changed", "timestamp": 1, "chat_id": 2, "user_id": 3, "title": "t" }),
             UpdateType::ChatTitleChanged),
        ];

        for (raw, expected) in cases {
            let update = Update::from_value(&raw);
            assert_eq!(update.update_type(), Some(expected), "input: {raw}");
        }
    }

    #[test]
    fn test_callback_update_tolerates_deleted_message() {
        let raw = json!({
            "update_type": "message_callback",
            "timestamp": 5,
            "callback": {
                "timestamp": 5,
                "callback_id": "kb-1",
                "payload": "pressed",
                "user": { "user_id": 8, "name": "bob" }
            }
        });

        let Update::MessageCallback(u) = Update::from_value(&raw) else {
            panic!("wrong variant");
        };
        assert!(u.message.is_none());
        assert_eq!(u.callback.payload.as_deref(), Some("pressed"));
    }

    #[test]
    fn test_unrecognized_discriminator_is_sentinel() {
        let update = Update::from_value(&json!({
            "update_type": "message_reacted",
            "timestamp": 1
        }));
        assert_eq!(update, Update::Unknown);
        assert_eq!(update.update_type(), None);
    }

    #[test]
    fn test_known_discriminator_with_bad_payload_is_sentinel() {
        // message_created requires a message object.
        let update = Update::from_value(&json!({
            "update_type": "message_created",
            "timestamp": 1
        }));
        assert_eq!(update, Update::Unknown);
    }

    #[test]
    fn test_garbage_bytes_are_sentinel_not_panic() {
        assert_eq!(Update::decode(b"not json"), Update::Unknown);
        assert_eq!(Update::decode(b"[1,2,3]"), Update::Unknown);
        assert_eq!(Update::decode(b"{}"), Update::Unknown);
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let raw = json!({
            "update_type": "chat_title_changed",
            "timestamp": 77,
            "chat_id": 1,
            "user_id": 2,
            "title": "new title"
        });

        let first = Update::from_value(&raw);
        let reencoded = serde_json::to_value(&first).unwrap();
        let second = Update::from_value(&reencoded);

        assert_eq!(first, second);
        assert_eq!(reencoded["update_type"], "chat_title_changed");
    }

    #[test]
    fn test_occurred_at_uses_epoch_millis() {
        let update = Update::from_value(&json!({
            "update_type": "bot_started", "timestamp": 1_554_719_682_555i64,
            "chat_id": 1, "user_id": 2
        }));
        assert_eq!(
            update.occurred_at().unwrap().timestamp_millis(),
            1_554_719_682_555
        );
    }
}
