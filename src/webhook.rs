//! Push-mode delivery: the platform POSTs one update per request to a
//! subscribed URL instead of being long-polled.
//!
//! Each request is decoded independently with the same envelope decoder the
//! poller uses and written to an update channel. Decode failures are not
//! rejected: the platform retries rejected pushes, which would turn one
//! malformed event into repeated deliveries. They are passed through as
//! [`Update::Unknown`] for the consumer to judge. The whole request body is
//! read before decoding, so a bad payload still drains the connection.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::updates::Update;

/// Decode one pushed update body. Never fails; unrecognized or malformed
/// payloads come back as [`Update::Unknown`]. Usable from any HTTP
/// framework's handler.
pub fn decode_push(body: &[u8]) -> Update {
    Update::decode(body)
}

#[derive(Clone)]
struct WebhookState {
    tx: mpsc::Sender<Update>,
}

/// Router with a single `POST /` route that decodes pushes into `tx`.
///
/// Nest it wherever the subscribed URL points, e.g.
/// `Router::new().nest("/webhook", webhook::router(tx))`.
pub fn router(tx: mpsc::Sender<Update>) -> Router {
    Router::new()
        .route("/", post(receive_update))
        .with_state(WebhookState { tx })
}

async fn receive_update(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let update = decode_push(&body);
    if matches!(update, Update::Unknown) {
        debug!("received unrecognized webhook push ({} bytes)", body.len());
    }
    if state.tx.send(update).await.is_err() {
        warn!("update sink is closed, dropping pushed update");
    }
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updates::UpdateType;

    fn handler_state() -> (WebhookState, mpsc::Receiver<Update>) {
        let (tx, rx) = mpsc::channel(8);
        (WebhookState { tx }, rx)
    }

    #[tokio::test]
    async fn test_push_is_decoded_and_delivered() {
        let (state, mut rx) = handler_state();
        let body = Bytes::from_static(
            br#"{ "update_type": "bot_started", "timestamp": 1, "chat_id": 2, "user_id": 3 }"#,
        );

        let status = receive_update(State(state), body).await;

        assert_eq!(status, StatusCode::OK);
        let update = rx.recv().await.unwrap();
        assert_eq!(update.update_type(), Some(UpdateType::BotStarted));
    }

    #[tokio::test]
    async fn test_malformed_push_is_accepted_as_sentinel() {
        let (state, mut rx) = handler_state();

        let status = receive_update(State(state), Bytes::from_static(b"%%% not json")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(rx.recv().await.unwrap(), Update::Unknown);
    }

    #[tokio::test]
    async fn test_closed_sink_does_not_fail_the_request() {
        let (state, rx) = handler_state();
        drop(rx);

        let body = Bytes::from_static(b"{}");
        assert_eq!(receive_update(State(state), body).await, StatusCode::OK);
    }

    #[test]
    fn test_decode_push_matches_poll_decoding() {
        let raw = br#"{ "update_type": "message_removed", "timestamp": 9, "message_id": "m.5" }"#;
        assert_eq!(decode_push(raw), Update::decode(raw));
    }
}
