//! Server-sent event stream of tally changes.
//!
//! Each `GET /events` request gets its own session loop running on a
//! background task. The session writes frames into a small channel; the
//! response body reads them back out as SSE events:
//!
//! - [`Frame::Data`] becomes `data: <json>`
//! - [`Frame::KeepAlive`] becomes an empty comment, `: ` on its own line
//!
//! When the client goes away Axum drops the body, which drops the
//! channel receiver, which the session sees as a peer disconnect.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use ballot_core::{ChannelTransport, Frame};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::state::AppState;

/// Frames a session may have in flight before its writes start waiting.
const FRAME_BUFFER: usize = 1;

/// Open an event stream.
///
/// # Route
///
/// `GET /events`
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (transport, frames) = ChannelTransport::new(FRAME_BUFFER);
    let ballot = state.ballot.clone();
    let cancel = ballot.session_token();

    tokio::spawn(async move {
        let exit = ballot.run_session(transport, cancel).await;
        debug!(?exit, "Event stream closed");
    });

    Sse::new(ReceiverStream::new(frames).map(|frame| Ok(to_event(&frame))))
}

fn to_event(frame: &Frame) -> Event {
    match frame {
        Frame::Data(payload) => Event::default().data(&**payload),
        Frame::KeepAlive => Event::default().comment(""),
    }
}
