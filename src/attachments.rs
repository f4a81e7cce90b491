//! Attachment and inline-keyboard button unions.
//!
//! Both unions arrive as JSON objects discriminated by a `type` field whose
//! payload shape depends on the tag, so decoding is two-pass: a minimal
//! envelope read to learn the tag, then a full decode of the same value into
//! the concrete variant. Anything outside the known tag set, or a payload
//! that does not match its tag's shape, becomes the `Unknown` sentinel
//! instead of an error, so one bad element never poisons the message (or the
//! batch) around it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::User;

/// Minimal envelope: just enough to read the discriminator.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

fn sniff_tag(value: &Value) -> Option<String> {
    Envelope::deserialize(value).ok().and_then(|e| e.kind)
}

fn concrete<T>(value: &Value) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    T::deserialize(value).ok()
}

// ── Attachments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoPayload {
    #[serde(default)]
    pub photo_id: Option<i64>,
    #[serde(default)]
    pub token: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoAttachment {
    pub payload: PhotoPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub url: String,
}

/// Shared shape for video, audio, file, sticker and share attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub payload: MediaPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPayload {
    /// Contact card in VCF format.
    #[serde(rename = "vcfInfo", default)]
    pub vcf_info: Option<String>,
    /// Platform user info, when the contact is a platform user.
    #[serde(rename = "tamInfo", default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactAttachment {
    pub payload: ContactPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAttachment {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardAttachment {
    /// Keyboard identifier, echoed back in button callbacks.
    pub callback_id: String,
    pub payload: Keyboard,
}

/// A message attachment.
///
/// Deserializing never fails: unrecognized or malformed elements become
/// [`Attachment::Unknown`], which keeps a message's attachment list intact
/// and in platform order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    Image(PhotoAttachment),
    Video(MediaAttachment),
    Audio(MediaAttachment),
    File(MediaAttachment),
    Contact(ContactAttachment),
    Sticker(MediaAttachment),
    Share(MediaAttachment),
    Location(LocationAttachment),
    InlineKeyboard(InlineKeyboardAttachment),
    /// Attachment type this client does not know about.
    Unknown,
}

impl Attachment {
    /// Decode one attachment from raw bytes.
    pub fn decode(raw: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Attachment::Unknown,
        }
    }

    /// Decode one attachment from an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(tag) = sniff_tag(value) else {
            return Attachment::Unknown;
        };
        let decoded = match tag.as_str() {
            "image" => concrete(value).map(Attachment::Image),
            "video" => concrete(value).map(Attachment::Video),
            "audio" => concrete(value).map(Attachment::Audio),
            "file" => concrete(value).map(Attachment::File),
            "contact" => concrete(value).map(Attachment::Contact),
            "sticker" => concrete(value).map(Attachment::Sticker),
            "share" => concrete(value).map(Attachment::Share),
            "location" => concrete(value).map(Attachment::Location),
            "inline_keyboard" => concrete(value).map(Attachment::InlineKeyboard),
            _ => None,
        };
        decoded.unwrap_or(Attachment::Unknown)
    }
}

impl<'de> Deserialize<'de> for Attachment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Attachment::from_value(&value))
    }
}

// ── Inline keyboard ────────────────────────────────────────────────────────────

/// Two-dimensional grid of buttons: outer list is rows, inner is columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyboard {
    pub buttons: Vec<Vec<Button>>,
}

/// How a client renders a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Positive,
    Negative,
    #[default]
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkButton {
    pub text: String,
    #[serde(default)]
    pub intent: Intent,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackButton {
    pub text: String,
    #[serde(default)]
    pub intent: Intent,
    /// Sent back to the bot when the button is pressed.
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContactButton {
    pub text: String,
    #[serde(default)]
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestGeoLocationButton {
    pub text: String,
    #[serde(default)]
    pub intent: Intent,
    /// When `true`, the location is sent without asking for confirmation.
    #[serde(default)]
    pub quick: bool,
}

/// One button in an inline keyboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    Link(LinkButton),
    Callback(CallbackButton),
    RequestContact(RequestContactButton),
    RequestGeoLocation(RequestGeoLocationButton),
    /// Button type this client does not know about.
    Unknown,
}

impl Button {
    pub fn from_value(value: &Value) -> Self {
        let Some(tag) = sniff_tag(value) else {
            return Button::Unknown;
        };
        let decoded = match tag.as_str() {
            "link" => concrete(value).map(Button::Link),
            "callback" => concrete(value).map(Button::Callback),
            "request_contact" => concrete(value).map(Button::RequestContact),
            "request_geo_location" => concrete(value).map(Button::RequestGeoLocation),
            _ => None,
        };
        decoded.unwrap_or(Button::Unknown)
    }
}

impl<'de> Deserialize<'de> for Button {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Button::from_value(&value))
    }
}

// ── Outgoing attachments ───────────────────────────────────────────────────────

/// Payload for attaching an image to an outgoing message. Fields are
/// mutually exclusive: a direct URL or a token of an existing attachment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhotoRequestPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Handle of a previously uploaded media object.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedInfo {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFileInfo {
    #[serde(rename = "fileId")]
    pub file_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StickerRequestPayload {
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactRequestPayload {
    pub name: String,
    #[serde(rename = "contactId", skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
    #[serde(rename = "vcfInfo", skip_serializing_if = "Option::is_none")]
    pub vcf_info: Option<String>,
    #[serde(rename = "vcfPhone", skip_serializing_if = "Option::is_none")]
    pub vcf_phone: Option<String>,
}

/// Attachment of an outgoing message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentRequest {
    Image { payload: PhotoRequestPayload },
    Video { payload: UploadedInfo },
    Audio { payload: UploadedInfo },
    File { payload: UploadedFileInfo },
    Sticker { payload: StickerRequestPayload },
    Contact { payload: ContactRequestPayload },
    Location { latitude: f64, longitude: f64 },
    InlineKeyboard { payload: Keyboard },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keyboard_value() -> Value {
        json!({
            "type": "inline_keyboard",
            "callback_id": "kb-1",
            "payload": {
                "buttons": [
                    [
                        { "type": "link", "text": "docs", "intent": "default", "url": "https://example.org" },
                        { "type": "callback", "text": "ok", "intent": "positive", "payload": "confirm" }
                    ],
                    [
                        { "type": "request_contact", "text": "share contact" },
                        { "type": "request_geo_location", "text": "where am i", "quick": true }
                    ]
                ]
            }
        })
    }

    #[test]
    fn test_keyboard_grid_decodes_every_button_kind() {
        let attachment = Attachment::from_value(&keyboard_value());

        let Attachment::InlineKeyboard(kb) = attachment else {
            panic!("expected inline keyboard, got {attachment:?}");
        };
        assert_eq!(kb.callback_id, "kb-1");
        assert_eq!(kb.payload.buttons.len(), 2);
        assert_eq!(kb.payload.buttons[0].len(), 2);
        assert_eq!(kb.payload.buttons[1].len(), 2);

        match &kb.payload.buttons[0][0] {
            Button::Link(b) => assert_eq!(b.url, "https://example.org"),
            other => panic!("expected link button, got {other:?}"),
        }
        match &kb.payload.buttons[0][1] {
            Button::Callback(b) => {
                assert_eq!(b.payload, "confirm");
                assert_eq!(b.intent, Intent::Positive);
            }
            other => panic!("expected callback button, got {other:?}"),
        }
        match &kb.payload.buttons[1][0] {
            Button::RequestContact(b) => assert_eq!(b.intent, Intent::Default),
            other => panic!("expected contact button, got {other:?}"),
        }
        match &kb.payload.buttons[1][1] {
            Button::RequestGeoLocation(b) => assert!(b.quick),
            other => panic!("expected geolocation button, got {other:?}"),
        }
    }

    #[test]
    fn test_image_round_trips() {
        let raw = json!({
            "type": "image",
            "payload": { "photo_id": 99, "token": "tok", "url": "https://img.example/1.png" }
        });

        let first = Attachment::from_value(&raw);
        let reencoded = serde_json::to_value(&first).unwrap();
        let second = Attachment::from_value(&reencoded);

        assert_eq!(first, second);
        let Attachment::Image(img) = first else {
            panic!("expected image");
        };
        assert_eq!(img.payload.photo_id, Some(99));
        assert_eq!(img.payload.url, "https://img.example/1.png");
    }

    #[test]
    fn test_unrecognized_type_becomes_unknown() {
        let att = Attachment::from_value(&json!({ "type": "hologram", "payload": {} }));
        assert_eq!(att, Attachment::Unknown);
    }

    #[test]
    fn test_known_tag_with_wrong_shape_becomes_unknown() {
        // "image" requires a payload object with a url.
        let att = Attachment::from_value(&json!({ "type": "image", "payload": 7 }));
        assert_eq!(att, Attachment::Unknown);
    }

    #[test]
    fn test_bad_element_does_not_disturb_neighbors() {
        let list: Vec<Attachment> = serde_json::from_value(json!([
            { "type": "sticker", "payload": { "url": "https://s.example/1" } },
            "not an object at all",
            { "type": "location", "latitude": 1.5, "longitude": -2.5 }
        ]))
        .unwrap();

        assert_eq!(list.len(), 3);
        assert!(matches!(list[0], Attachment::Sticker(_)));
        assert_eq!(list[1], Attachment::Unknown);
        assert!(matches!(list[2], Attachment::Location(_)));
    }

    #[test]
    fn test_decode_rejects_garbage_bytes() {
        assert_eq!(Attachment::decode(b"{{{"), Attachment::Unknown);
    }

    #[test]
    fn test_attachment_request_wire_tags() {
        let req = AttachmentRequest::InlineKeyboard {
            payload: Keyboard {
                buttons: vec![vec![Button::Callback(CallbackButton {
                    text: "go".into(),
                    intent: Intent::Default,
                    payload: "p1".into(),
                })]],
            },
        };
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["type"], "inline_keyboard");
        assert_eq!(json["payload"]["buttons"][0][0]["type"], "callback");
        assert_eq!(json["payload"]["buttons"][0][0]["payload"], "p1");
    }
}
