use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::session::Session;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_failed_upgrade(|error| warn!("не удалось поднять WebSocket: {}", error))
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let client_id = state.hub.register(tx).await;
    info!(connection = %client_id, "клиент подключился");

    // Отправка клиенту событий из канала
    let send_id = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match event.encode() {
                Ok(text) => text,
                Err(e) => {
                    warn!(connection = %send_id, "не удалось сериализовать {}: {}", event.name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // События одного клиента обрабатываются строго по очереди
    let mut session = Session::new(client_id.clone(), state);
    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientEvent::decode(&text) {
                    Ok(event) => session.handle(event).await,
                    Err(e) => warn!(connection = %client_id, "кадр отброшен: {}", e),
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => debug!(connection = %client_id, "нетекстовый кадр пропущен"),
            },
            _ = &mut send_task => break,
        }
    }

    session.close().await;
    send_task.abort();
}
