//! Таблицы координатора: хосты комнат и заявки на вход.
//!
//! Сами по себе таблицы не синхронизированы, ими владеет
//! [`AdmissionCoordinator`](crate::admission::AdmissionCoordinator) под одним замком.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::protocol::{ConnectionId, RoomId};

/// Комната -> соединение хоста. Отсутствие записи означает "хоста нет".
#[derive(Debug, Default)]
pub struct RoomDirectory {
    hosts: HashMap<RoomId, ConnectionId>,
}

impl RoomDirectory {
    pub fn host_of(&self, room_id: &str) -> Option<&ConnectionId> {
        self.hosts.get(room_id)
    }

    pub fn is_host(&self, room_id: &str, id: &str) -> bool {
        self.host_of(room_id).is_some_and(|host| host == id)
    }

    /// Назначает хоста, только если его ещё нет. Возвращает `true` при назначении.
    pub fn assign_if_vacant(&mut self, room_id: &str, id: &str) -> bool {
        if self.hosts.contains_key(room_id) {
            return false;
        }
        self.hosts.insert(room_id.to_string(), id.to_string());
        true
    }

    /// Удаляет все комнаты, где `id` был хостом, и возвращает их.
    pub fn remove_host(&mut self, id: &str) -> Vec<RoomId> {
        let rooms: Vec<RoomId> = self
            .hosts
            .iter()
            .filter(|(_, host)| host.as_str() == id)
            .map(|(room, _)| room.clone())
            .collect();
        for room in &rooms {
            self.hosts.remove(room);
        }
        rooms
    }

    pub fn count(&self) -> usize {
        self.hosts.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub name: String,
    pub room_id: RoomId,
    pub requested_at: Instant,
}

/// Одна глобальная таблица: у соединения максимум одна заявка.
#[derive(Debug, Default)]
pub struct PendingTable {
    requests: HashMap<ConnectionId, PendingRequest>,
}

impl PendingTable {
    /// Новая заявка вытесняет предыдущую от того же соединения.
    pub fn insert(&mut self, id: &str, name: &str, room_id: &str) {
        self.requests.insert(
            id.to_string(),
            PendingRequest {
                name: name.to_string(),
                room_id: room_id.to_string(),
                requested_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<&PendingRequest> {
        self.requests.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<PendingRequest> {
        self.requests.remove(id)
    }

    pub fn is_expired(request: &PendingRequest, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.saturating_duration_since(request.requested_at) >= ttl)
    }

    /// Вынимает просроченные заявки.
    pub fn drain_expired(&mut self, ttl: Duration, now: Instant) -> Vec<(ConnectionId, PendingRequest)> {
        let expired: Vec<ConnectionId> = self
            .requests
            .iter()
            .filter(|(_, req)| Self::is_expired(req, Some(ttl), now))
            .map(|(id, _)| id.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.requests.remove(&id).map(|req| (id, req)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
