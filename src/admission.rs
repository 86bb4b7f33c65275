//! Допуск в комнату: назначение хоста, заявки и решения по ним.
//!
//! Все таблицы лежат под одним `Mutex`, и каждая операция целиком, вместе
//! с рассылкой, выполняется под ним. Замок координатора всегда берётся
//! раньше замка [`Hub`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::directory::{PendingTable, RoomDirectory};
use crate::hub::Hub;
use crate::protocol::{ConnectionId, RoomId, ServerEvent};

#[derive(Debug, Clone, Copy, Default)]
pub struct AdmissionPolicy {
    pub verify_host: bool,
    pub gate_join_room: bool,
    pub pending_ttl: Option<Duration>,
}

impl From<&Config> for AdmissionPolicy {
    fn from(config: &Config) -> Self {
        Self {
            verify_host: config.verify_host,
            gate_join_room: config.gate_join_room,
            pending_ttl: config.pending_ttl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    BecameHost,
    /// Хост повторно прислал заявку в свою же комнату.
    AlreadyHost,
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Approved,
    Rejected,
    /// Заявки нет, заявитель отключился или решение пришло не от хоста.
    Ignored,
}

/// Что осталось от соединения после очистки.
#[derive(Debug, Default, PartialEq)]
pub struct Cleanup {
    pub dropped_request: bool,
    pub orphaned_rooms: Vec<RoomId>,
}

#[derive(Default)]
struct Tables {
    rooms: RoomDirectory,
    pending: PendingTable,
}

pub struct AdmissionCoordinator {
    tables: Mutex<Tables>,
    hub: Hub,
    policy: AdmissionPolicy,
}

impl AdmissionCoordinator {
    pub fn new(hub: Hub, policy: AdmissionPolicy) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            hub,
            policy,
        }
    }

    pub async fn submit_join_request(&self, id: &str, name: &str, room_id: &str) -> JoinOutcome {
        let mut tables = self.tables.lock().await;

        let host = match tables.rooms.host_of(room_id).cloned() {
            Some(host) if host == id => return JoinOutcome::AlreadyHost,
            Some(host) => host,
            None => {
                tables.rooms.assign_if_vacant(room_id, id);
                self.hub.join_room(id, room_id).await;
                self.hub
                    .send(id, ServerEvent::RoleAssigned { is_host: true })
                    .await;
                info!(connection = %id, room = %room_id, name = %name, "назначен хостом комнаты");
                return JoinOutcome::BecameHost;
            }
        };

        tables.pending.insert(id, name, room_id);
        self.hub
            .send(
                &host,
                ServerEvent::UserRequested {
                    name: name.to_string(),
                    requester_id: id.to_string(),
                    room_id: room_id.to_string(),
                },
            )
            .await;
        self.hub.send(id, ServerEvent::WaitingForApproval).await;
        info!(connection = %id, room = %room_id, host = %host, "заявка ждёт решения хоста");
        JoinOutcome::Waiting
    }

    pub async fn resolve_join_request(
        &self,
        host_id: &str,
        requester_id: &str,
        room_id: &str,
        approved: bool,
    ) -> ResolveOutcome {
        let mut tables = self.tables.lock().await;

        let Some(request) = tables.pending.get(requester_id) else {
            debug!(requester = %requester_id, "решение по несуществующей заявке");
            return ResolveOutcome::Ignored;
        };
        if PendingTable::is_expired(request, self.policy.pending_ttl, Instant::now()) {
            debug!(requester = %requester_id, "решение по просроченной заявке");
            return ResolveOutcome::Ignored;
        }
        if self.policy.verify_host
            && (!tables.rooms.is_host(room_id, host_id) || request.room_id != room_id)
        {
            warn!(caller = %host_id, room = %room_id, requester = %requester_id, "решение не от хоста комнаты");
            return ResolveOutcome::Ignored;
        }
        if !self.hub.is_connected(requester_id).await {
            return ResolveOutcome::Ignored;
        }

        let Some(request) = tables.pending.remove(requester_id) else {
            return ResolveOutcome::Ignored;
        };

        if !approved {
            self.hub.send(requester_id, ServerEvent::JoinRejected).await;
            info!(requester = %requester_id, room = %room_id, "заявка отклонена");
            return ResolveOutcome::Rejected;
        }

        self.hub.join_room(requester_id, room_id).await;
        self.hub
            .send(
                requester_id,
                ServerEvent::JoinApproved {
                    room_id: room_id.to_string(),
                    host_id: host_id.to_string(),
                },
            )
            .await;
        self.hub
            .send(
                requester_id,
                ServerEvent::JoinRoomConfirmed {
                    name: request.name.clone(),
                },
            )
            .await;
        self.hub
            .broadcast(
                room_id,
                ServerEvent::UserJoined {
                    name: request.name.clone(),
                    id: requester_id.to_string(),
                },
                Some(requester_id),
            )
            .await;
        // Обе стороны могут уже договариваться о медиа; перезапуск безопасен.
        self.hub.send(requester_id, ServerEvent::StartCall).await;
        self.hub.send(host_id, ServerEvent::StartCall).await;

        info!(requester = %requester_id, name = %request.name, room = %room_id, "заявка одобрена");
        ResolveOutcome::Approved
    }

    /// Проверка для `join-room` при включённом `gate_join_room`.
    pub async fn may_attach(&self, id: &str, room_id: &str) -> bool {
        if !self.policy.gate_join_room {
            return true;
        }
        let tables = self.tables.lock().await;
        tables.rooms.is_host(room_id, id) || self.hub.is_member(room_id, id).await
    }

    /// Отключение целиком под замком координатора: транспорт забывает
    /// соединение, комната получает `user-left`, заявка и комнаты хоста
    /// удаляются. `last_join` это комната и имя из последнего `request-to-join`.
    pub async fn disconnect(&self, id: &str, last_join: Option<(&str, &str)>) -> Cleanup {
        let mut tables = self.tables.lock().await;
        self.hub.unregister(id).await;

        if let Some((room_id, name)) = last_join {
            if !name.is_empty() {
                self.hub
                    .broadcast(
                        room_id,
                        ServerEvent::UserLeft {
                            name: name.to_string(),
                            id: id.to_string(),
                        },
                        Some(id),
                    )
                    .await;
                debug!(connection = %id, room = %room_id, "user-left разослан");
            }
        }

        let dropped_request = tables.pending.remove(id).is_some();
        let orphaned_rooms = tables.rooms.remove_host(id);
        if dropped_request {
            info!(connection = %id, "брошенная заявка удалена");
        }
        for room in &orphaned_rooms {
            info!(connection = %id, room = %room, "хост ушёл, комната закрыта");
        }
        Cleanup {
            dropped_request,
            orphaned_rooms,
        }
    }

    /// Снимает просроченные заявки и сообщает заявителям отказ.
    pub async fn expire_pending(&self) -> Vec<ConnectionId> {
        let Some(ttl) = self.policy.pending_ttl else {
            return Vec::new();
        };
        let mut tables = self.tables.lock().await;
        let expired = tables.pending.drain_expired(ttl, Instant::now());
        let mut ids = Vec::with_capacity(expired.len());
        for (id, request) in expired {
            self.hub.send(&id, ServerEvent::JoinRejected).await;
            info!(requester = %id, room = %request.room_id, "заявка истекла");
            ids.push(id);
        }
        ids
    }

    /// Фоновая уборка просроченных заявок. Без TTL ничего не запускается.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let ttl = self.policy.pending_ttl?;
        let period = (ttl / 4).max(Duration::from_millis(250));
        let admission = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                admission.expire_pending().await;
            }
        }))
    }

    pub async fn room_count(&self) -> usize {
        self.tables.lock().await.rooms.count()
    }

    pub async fn pending_count(&self) -> usize {
        self.tables.lock().await.pending.len()
    }

    pub async fn host_of(&self, room_id: &str) -> Option<ConnectionId> {
        self.tables.lock().await.rooms.host_of(room_id).cloned()
    }

    pub async fn has_pending(&self, id: &str) -> bool {
        self.tables.lock().await.pending.get(id).is_some()
    }
}
