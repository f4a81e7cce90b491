//! Async client for a chat-bot platform Bot HTTP API.
//!
//! The crate covers three things:
//!
//! - thin REST wrappers for bots, chats, messages and subscriptions
//!   ([`Api`]);
//! - a cursor-based long-poll loop that turns the `updates` endpoint into a
//!   stream of decoded events ([`Api::start_polling`], [`polling`]);
//! - webhook delivery for bots that receive pushes instead ([`webhook`]).
//!
//! Incoming events arrive as tagged JSON unions. They decode into the
//! [`Update`], [`attachments::Attachment`] and [`attachments::Button`] enums;
//! payloads the client does not recognize become `Unknown` sentinels rather
//! than errors, so new platform event kinds never break a running bot.
//!
//! ```no_run
//! use botapi::{Api, Update};
//!
//! #[tokio::main]
//! async fn main() -> botapi::Result<()> {
//!     let token = std::env::var("BOT_TOKEN").expect("BOT_TOKEN is not set");
//!     let api = Api::new("https://botapi.example.com/", token);
//!
//!     let me = api.get_bot().await?;
//!     println!("polling as {}", me.name);
//!
//!     let mut updates = api.start_polling(None);
//!     while let Some(update) = updates.recv().await {
//!         if let Update::MessageCreated(u) = update? {
//!             let text = u.message.body.text.unwrap_or_default();
//!             println!("<{}> {}", u.message.sender.name, text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod attachments;
pub mod config;
pub mod error;
pub mod models;
pub mod polling;
pub mod updates;
pub mod webhook;

pub use api::Api;
pub use attachments::{Attachment, Button, Intent, Keyboard};
pub use config::{ApiConfig, Config, PollingConfig};
pub use error::{Error, Result};
pub use polling::{poll_updates, UpdateSource, UpdateStream};
pub use updates::{Update, UpdateType};
