use actix_web::web::Bytes;
use actix_web::{get, web, HttpRequest, HttpResponse};
use futures_util::stream::unfold;
use siren_core::{SubscriberId, UnitCode};
use siren_engine::{DispatchEvent, EventFanout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::auth::caller_unit;
use crate::state::AppState;

/// Removes the subscription when the client disconnects and the stream
/// state is dropped; subscriptions are never silently leaked.
struct StreamGuard {
    fanout: Arc<EventFanout>,
    unit: UnitCode,
    id: SubscriberId,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.fanout.unsubscribe(&self.unit, self.id);
        tracing::debug!(unit = %self.unit, subscriber = %self.id, "subscription closed");
    }
}

struct StreamState {
    receiver: mpsc::Receiver<DispatchEvent>,
    pending: Option<DispatchEvent>,
    heartbeat: Duration,
    _guard: StreamGuard,
}

/// Long-lived per-unit event stream. Emits `connected` on subscribe, then
/// fanout events in publish order; a comment heartbeat keeps idle
/// connections alive across transport timeouts.
#[get("/v1/stream/sse")]
pub async fn sse(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let unit = match caller_unit(&req) {
        Ok(unit) => unit,
        Err(response) => return response,
    };

    let subscription = state.fanout.subscribe(unit.clone());
    tracing::info!(unit = %unit, subscriber = %subscription.id, "subscription opened");
    let guard = StreamGuard {
        fanout: state.fanout.clone(),
        unit: unit.clone(),
        id: subscription.id,
    };
    let stream_state = StreamState {
        receiver: subscription.receiver,
        pending: Some(DispatchEvent::Connected { unit }),
        heartbeat: Duration::from_secs(state.config.heartbeat_secs.max(1)),
        _guard: guard,
    };

    let stream = unfold(stream_state, |mut st| async move {
        if let Some(event) = st.pending.take() {
            return Some((Ok::<Bytes, actix_web::Error>(frame(&event)), st));
        }
        match tokio::time::timeout(st.heartbeat, st.receiver.recv()).await {
            Ok(Some(event)) => Some((Ok(frame(&event)), st)),
            Ok(None) => None,
            Err(_) => Some((Ok(Bytes::from_static(b": heartbeat\n\n")), st)),
        }
    });

    HttpResponse::Ok()
        .insert_header(("Content-Type", "text/event-stream"))
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(stream)
}

fn frame(event: &DispatchEvent) -> Bytes {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Bytes::from(format!("event: {}\ndata: {}\n\n", event.kind(), data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_follow_sse_wire_format() {
        let event = DispatchEvent::Connected {
            unit: UnitCode::from("AMB-01"),
        };
        let bytes = frame(&event);
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.starts_with("event: connected\ndata: "));
        assert!(text.ends_with("\n\n"));
        assert!(text.contains("\"unit\":\"AMB-01\""));
    }
}
