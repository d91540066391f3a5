//! Server-sent event stream of catalog updates.

use std::collections::VecDeque;
use std::time::Instant;

use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{get, web, Error, HttpResponse, Responder};
use futures_util::{stream::unfold, Stream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration, Interval, MissedTickBehavior};

use crate::events::GalleryEvent;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(15);

struct EventsStreamState {
    receiver: broadcast::Receiver<GalleryEvent>,
    interval: Interval,
    pending: VecDeque<Bytes>,
    last_ping: Instant,
}

fn sse_event(event: &str, data: &str) -> Bytes {
    let mut payload = String::new();
    payload.push_str("event: ");
    payload.push_str(event);
    payload.push('\n');
    for line in data.lines() {
        payload.push_str("data: ");
        payload.push_str(line);
        payload.push('\n');
    }
    payload.push('\n');
    Bytes::from(payload)
}

fn push_ping_if_needed(pending: &mut VecDeque<Bytes>, last_ping: &mut Instant) {
    if pending.is_empty() && last_ping.elapsed() >= PING_INTERVAL {
        *last_ping = Instant::now();
        pending.push_back(Bytes::from(": ping\n\n"));
    }
}

enum StreamSignal<E> {
    Tick,
    Event(Result<E, RecvError>),
}

async fn recv_signal<E: Clone>(
    receiver: &mut broadcast::Receiver<E>,
    interval: &mut Interval,
) -> StreamSignal<E> {
    tokio::select! {
        _ = interval.tick() => StreamSignal::Tick,
        result = receiver.recv() => StreamSignal::Event(result),
    }
}

fn sse_response<S>(stream: S) -> HttpResponse
where
    S: Stream<Item = Result<Bytes, Error>> + 'static,
{
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::CONNECTION, "keep-alive"))
        .streaming(stream)
}

#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "Catalog event stream (catalog_changed, reshuffled, artifact_ready)")
    )
)]
#[get("/api/events")]
/// Stream catalog notifications via server-sent events.
pub async fn events_stream(state: web::Data<AppState>) -> impl Responder {
    let receiver = state.events.subscribe();
    let mut interval = tokio::time::interval(PING_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let stream = unfold(
        EventsStreamState {
            receiver,
            interval,
            pending: VecDeque::new(),
            last_ping: Instant::now(),
        },
        |mut ctx| async move {
            loop {
                if let Some(bytes) = ctx.pending.pop_front() {
                    return Some((Ok::<Bytes, Error>(bytes), ctx));
                }

                match recv_signal(&mut ctx.receiver, &mut ctx.interval).await {
                    StreamSignal::Tick => {}
                    StreamSignal::Event(Ok(event)) => {
                        let json = serde_json::to_string(&event)
                            .unwrap_or_else(|_| "null".to_string());
                        ctx.pending.push_back(sse_event(event.name(), &json));
                    }
                    StreamSignal::Event(Err(RecvError::Lagged(skipped))) => {
                        tracing::debug!(skipped, "event stream lagged");
                    }
                    StreamSignal::Event(Err(RecvError::Closed)) => return None,
                }

                push_ping_if_needed(&mut ctx.pending, &mut ctx.last_ping);
            }
        },
    );

    sse_response(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_event_frames_each_line() {
        let bytes = sse_event("reshuffled", "{\"generation\":1}");
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "event: reshuffled\ndata: {\"generation\":1}\n\n"
        );
    }

    #[test]
    fn ping_only_when_idle_and_due() {
        let mut pending = VecDeque::new();
        let mut last_ping = Instant::now();
        push_ping_if_needed(&mut pending, &mut last_ping);
        assert!(pending.is_empty());

        let mut last_ping = Instant::now() - PING_INTERVAL;
        push_ping_if_needed(&mut pending, &mut last_ping);
        assert_eq!(pending.len(), 1);
    }
}
