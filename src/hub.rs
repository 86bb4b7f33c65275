//! Транспортный слой: реестр соединений и состав комнат.
//!
//! Каждое соединение представлено отправляющей половиной неограниченного
//! канала; задача сокета вычитывает из него события и пишет в WebSocket.
//! Порядок событий для одного получателя сохраняется каналом.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{ConnectionId, RoomId, ServerEvent};

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Default)]
struct HubInner {
    connections: HashMap<ConnectionId, EventSender>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

#[derive(Clone, Default)]
pub struct Hub {
    inner: Arc<RwLock<HubInner>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, sender: EventSender) -> ConnectionId {
        let id = Uuid::new_v4().to_string();
        self.inner
            .write()
            .await
            .connections
            .insert(id.clone(), sender);
        id
    }

    /// Убирает соединение из реестра и из всех комнат.
    pub async fn unregister(&self, id: &str) {
        let mut inner = self.inner.write().await;
        inner.connections.remove(id);
        inner.rooms.retain(|_, members| {
            members.remove(id);
            !members.is_empty()
        });
    }

    pub async fn is_connected(&self, id: &str) -> bool {
        self.inner
            .read()
            .await
            .connections
            .get(id)
            .is_some_and(|tx| !tx.is_closed())
    }

    pub async fn join_room(&self, id: &str, room_id: &str) {
        let mut inner = self.inner.write().await;
        if !inner.connections.contains_key(id) {
            return;
        }
        inner
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(id.to_string());
    }

    pub async fn is_member(&self, room_id: &str, id: &str) -> bool {
        self.inner
            .read()
            .await
            .rooms
            .get(room_id)
            .is_some_and(|members| members.contains(id))
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Отправка одному получателю. Закрытый или неизвестный адресат молча пропускается.
    pub async fn send(&self, id: &str, event: ServerEvent) {
        if let Some(tx) = self.inner.read().await.connections.get(id) {
            let name = event.name();
            if tx.send(event).is_err() {
                debug!(connection = %id, event = name, "получатель уже отключился");
            }
        }
    }

    /// Рассылка по комнате; `exclude` исключает одного участника (обычно отправителя).
    pub async fn broadcast(&self, room_id: &str, event: ServerEvent, exclude: Option<&str>) {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room_id) else {
            return;
        };
        for member in members {
            if Some(member.as_str()) == exclude {
                continue;
            }
            if let Some(tx) = inner.connections.get(member) {
                let _ = tx.send(event.clone());
            }
        }
    }
}
