//! wsframe demo server
//!
//! A small chat relay exercising the framework end to end: an echo route,
//! a room route that republishes messages as application events, selector
//! filtered fan-out back to subscribed sessions, and a close handler
//! logging every termination.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsframe::{
    close_handler_fn, event_handler_fn, handler_fn, AppEvent, Config, ContextShape, FieldKind,
    OutboundFrame, SessionDispatcher,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "wsframe=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("wsframe demo server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_default();

    // Inbound chat messages become application events; a background task
    // feeds them back through the dispatcher's fan-out.
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<AppEvent>();

    let chat_tx = events_tx.clone();
    let dispatcher = Arc::new(
        SessionDispatcher::builder()
            .config(config.dispatcher.clone())
            .route(
                "/echo",
                handler_fn(|_ctx, payload| async move { Ok(Some(payload)) }),
            )
            .route(
                "/rooms/{room}",
                handler_fn(move |ctx, payload| {
                    let chat_tx = chat_tx.clone();
                    async move {
                        let room = ctx.variables.value("room").unwrap_or("lobby").to_string();
                        let event = AppEvent::new(
                            "chat",
                            json!({
                                "room": room,
                                "from": ctx.session.id(),
                                "body": payload,
                            }),
                        );
                        let _ = chat_tx.send(event);
                        Ok(Some(json!({"delivered": true, "room": room})))
                    }
                }),
            )
            .event_shape(
                "chat",
                ContextShape::new()
                    .field("payload.room", FieldKind::String)
                    .field("payload.from", FieldKind::String)
                    .field("payload.body", FieldKind::Any),
            )
            .event_selector(
                "chat",
                "payload.room ne ''",
                event_handler_fn(|session, event| {
                    // Do not echo the message back to its sender
                    if event.payload["from"] == session.id() {
                        return None;
                    }
                    Some(OutboundFrame::new("/rooms", event.payload.clone()))
                }),
            )
            .event_shape(
                "announcement",
                ContextShape::new()
                    .field("payload.audience", FieldKind::String)
                    .field("payload.text", FieldKind::String),
            )
            .event_selector(
                "announcement",
                "payload.audience eq 'all'",
                event_handler_fn(|_session, event| {
                    Some(OutboundFrame::new("/announcements", event.payload.clone()))
                }),
            )
            .close_handler(close_handler_fn(|notification| {
                tracing::info!(
                    session_id = %notification.session_id,
                    code = notification.status.code,
                    "Session ended"
                );
            }))
            .build()?,
    );

    // Periodic server-wide announcement
    let ticker_tx = events_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        let mut n: u64 = 0;
        loop {
            interval.tick().await;
            n += 1;
            let _ = ticker_tx.send(AppEvent::new(
                "announcement",
                json!({"audience": "all", "text": format!("server heartbeat #{n}")}),
            ));
        }
    });

    // Feed queued events through the dispatcher
    let event_dispatcher = Arc::clone(&dispatcher);
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            event_dispatcher.on_application_event(&event).await;
        }
    });

    wsframe::transport::serve(dispatcher, &config.server.bind_addr()).await?;
    Ok(())
}
