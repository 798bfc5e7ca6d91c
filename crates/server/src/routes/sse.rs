// SPDX-License-Identifier: MIT

//! `GET /events` (spec §6), grounded on `internal/sse/sse.go` /
//! `internal/sse/client.go`'s one-pinger-per-client design, reimplemented as
//! an axum SSE stream instead of a hand-rolled chunked body writer.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use ote_engine::HubMessage;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct Frame {
    event: u8,
    task_id: i64,
    value: serde_json::Value,
}

pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.manager.subscribe();
    let manager = state.manager.clone();

    let connect = stream::once(async {
        Ok(Event::default()
            .event("connect")
            .data(r#"{"status":"connected"}"#))
    });

    let body = stream::unfold(rx, move |mut rx| {
        let manager = manager.clone();
        async move {
            let message = rx.recv().await;
            match message {
                Some(HubMessage::Status(e)) => {
                    let frame = Frame {
                        event: 1,
                        task_id: e.task_id,
                        value: serde_json::to_value(&e).unwrap_or_default(),
                    };
                    let json = serde_json::to_string(&frame).unwrap_or_default();
                    Some((Ok(Event::default().data(json)), rx))
                }
                Some(HubMessage::Log(e)) => {
                    let frame = Frame {
                        event: 2,
                        task_id: e.task_id,
                        value: serde_json::to_value(&e).unwrap_or_default(),
                    };
                    let json = serde_json::to_string(&frame).unwrap_or_default();
                    Some((Ok(Event::default().data(json)), rx))
                }
                Some(HubMessage::Heartbeat) => {
                    Some((Ok(Event::default().data(r#"{"ping":"pong"}"#)), rx))
                }
                None => {
                    manager.unsubscribe(id);
                    None
                }
            }
        }
    });

    Sse::new(connect.chain(body))
}
