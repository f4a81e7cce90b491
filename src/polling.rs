//! Cursor-based long-poll loop.
//!
//! One background task per client repeatedly fetches pages of updates from an
//! [`UpdateSource`], decodes them and hands them to a bounded channel in page
//! order. While the server reports a backlog the loop fetches page after page
//! with no delay; once a page comes back empty it pauses for the configured
//! pacing interval before asking again. The task exclusively owns the cursor
//! marker: it only ever advances after a fully fetched page, so an
//! interrupted fetch can never skip events.
//!
//! Delivery is strictly sequential (one in-flight fetch, one send at a time),
//! which preserves the platform's event ordering end to end. A slow consumer
//! fills the channel and blocks the poller before its next fetch; that
//! back-pressure is the intended throttle.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

use crate::config::PollingConfig;
use crate::error::Result;
use crate::models::UpdateList;
use crate::updates::Update;

/// Where the poller gets its pages from.
///
/// Implemented by [`crate::Api`]; tests substitute a scripted source.
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Fetch one page of raw updates starting at `marker`. `timeout` is the
    /// server-side long-poll hold time in seconds.
    async fn fetch_updates(
        &self,
        limit: u32,
        timeout: u32,
        marker: Option<i64>,
        types: &[String],
    ) -> Result<UpdateList>;
}

#[async_trait]
impl<S: UpdateSource + ?Sized> UpdateSource for Arc<S> {
    async fn fetch_updates(
        &self,
        limit: u32,
        timeout: u32,
        marker: Option<i64>,
        types: &[String],
    ) -> Result<UpdateList> {
        (**self).fetch_updates(limit, timeout, marker, types).await
    }
}

/// Receiving end of a polling loop.
///
/// Yields decoded updates until the loop ends: after an `Err` item (fatal
/// transport or server failure) or after [`UpdateStream::stop`], the channel
/// closes and `recv` returns `None`. Dropping the stream also stops the loop.
pub struct UpdateStream {
    rx: mpsc::Receiver<Result<Update>>,
    stop: Option<oneshot::Sender<()>>,
}

impl UpdateStream {
    /// Next update, or `None` once the loop has ended and drained.
    pub async fn recv(&mut self) -> Option<Result<Update>> {
        self.rx.recv().await
    }

    /// Ask the loop to stop. It exits at its next suspension point without
    /// starting another fetch; an already in-flight fetch is left to finish
    /// on its own and its result is discarded.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Stream for UpdateStream {
    type Item = Result<Update>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Spawn a polling loop over `source` and return its stream.
///
/// `marker` seeds the cursor; `None` starts at the server's current position.
pub fn poll_updates<S>(source: S, config: PollingConfig, marker: Option<i64>) -> UpdateStream
where
    S: UpdateSource + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let (stop_tx, stop_rx) = oneshot::channel();
    tokio::spawn(run_loop(source, config, marker, tx, stop_rx));
    UpdateStream {
        rx,
        stop: Some(stop_tx),
    }
}

async fn run_loop<S: UpdateSource>(
    source: S,
    config: PollingConfig,
    mut marker: Option<i64>,
    tx: mpsc::Sender<Result<Update>>,
    mut stop: oneshot::Receiver<()>,
) {
    info!("update poller started (marker: {:?})", marker);

    'outer: loop {
        // Pacing delay: before the first fetch, and again after every empty
        // page, so an idle server is not hammered in a hot loop.
        tokio::select! {
            _ = &mut stop => break 'outer,
            _ = time::sleep(Duration::from_secs(config.pause)) => {}
        }

        // Drain the backlog: back-to-back fetches while pages are non-empty.
        loop {
            if stop_requested(&mut stop) {
                break 'outer;
            }

            let page = match source
                .fetch_updates(config.limit, config.timeout, marker, &config.types)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!("update fetch failed: {e}");
                    send_or_stop(&tx, &mut stop, Err(e)).await;
                    break 'outer;
                }
            };

            if page.updates.is_empty() {
                break;
            }

            debug!("fetched {} updates", page.updates.len());
            for raw in &page.updates {
                let update = Update::from_value(raw);
                if matches!(update, Update::Unknown) {
                    debug!("passing through unrecognized update");
                }
                if !send_or_stop(&tx, &mut stop, Ok(update)).await {
                    break 'outer;
                }
            }

            // Only a fully fetched, fully delivered page advances the cursor.
            if let Some(next) = page.marker {
                marker = Some(next);
            }
        }
    }

    info!("update poller stopped");
    // tx drops here; the stream sees end-of-stream after the last item.
}

fn stop_requested(stop: &mut oneshot::Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(oneshot::error::TryRecvError::Empty))
}

/// Push one item into the sink. Returns `false` when the loop should end:
/// a stop was signaled mid-send or the consumer went away.
async fn send_or_stop(
    tx: &mpsc::Sender<Result<Update>>,
    stop: &mut oneshot::Receiver<()>,
    item: Result<Update>,
) -> bool {
    tokio::select! {
        _ = &mut *stop => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}
