//! Server-Sent Events support

use super::types::ConversationView;
use crate::store::Snapshot;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// Stream rendered snapshots: the current one first, then every change
pub fn sse_stream(
    snapshot_rx: watch::Receiver<Snapshot>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // WatchStream yields the current value immediately, then each update
    let snapshots = WatchStream::new(snapshot_rx).map(|snapshot| Ok(snapshot_event(&snapshot)));

    Sse::new(snapshots).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn snapshot_event(snapshot: &Snapshot) -> Event {
    let view = ConversationView::render(snapshot);
    let data = serde_json::to_string(&view).unwrap_or_else(|_| "{}".to_string());
    Event::default().event("snapshot").data(data)
}
