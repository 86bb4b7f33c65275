//! Жизненный цикл одного соединения: разбор событий и уборка при отключении.

use tracing::{info, warn};

use crate::app_state::AppState;
use crate::protocol::{ClientEvent, ConnectionId, RoomId};
use crate::relay::WebrtcSignal;

/// Соединение и то, что оно последним сообщило о себе в `request-to-join`.
pub struct Session {
    id: ConnectionId,
    state: AppState,
    room_id: Option<RoomId>,
    name: Option<String>,
}

impl Session {
    pub fn new(id: ConnectionId, state: AppState) -> Self {
        Self {
            id,
            state,
            room_id: None,
            name: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn handle(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::RequestToJoin { room_id, name } => {
                self.room_id = Some(room_id.clone());
                self.name = Some(name.clone());
                self.state
                    .admission
                    .submit_join_request(&self.id, &name, &room_id)
                    .await;
            }
            ClientEvent::HostResponse {
                requester_id,
                approved,
                room_id,
            } => {
                self.state
                    .admission
                    .resolve_join_request(&self.id, &requester_id, &room_id, approved)
                    .await;
            }
            ClientEvent::SendMessage {
                room_id,
                name,
                text,
                time,
            } => {
                self.state.relay.chat(&room_id, name, text, time).await;
            }
            ClientEvent::JoinRoom(room) => {
                let room_id = room.room_id();
                if self.state.admission.may_attach(&self.id, room_id).await {
                    self.state.relay.join_room_raw(&self.id, room_id).await;
                } else {
                    warn!(connection = %self.id, room = %room_id, "join-room без допуска отклонён");
                }
            }
            ClientEvent::Offer { sdp, room_id } => {
                self.state
                    .relay
                    .signal(&self.id, &room_id, WebrtcSignal::Offer(sdp))
                    .await;
            }
            ClientEvent::Answer { sdp, room_id } => {
                self.state
                    .relay
                    .signal(&self.id, &room_id, WebrtcSignal::Answer(sdp))
                    .await;
            }
            ClientEvent::IceCandidate { candidate, room_id } => {
                self.state
                    .relay
                    .signal(&self.id, &room_id, WebrtcSignal::IceCandidate(candidate))
                    .await;
            }
        }
    }

    /// Отключение: вся уборка одним шагом координатора.
    pub async fn close(self) {
        let last_join = self.room_id.as_deref().zip(self.name.as_deref());
        self.state.admission.disconnect(&self.id, last_join).await;
        info!(connection = %self.id, "соединение закрыто");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::protocol::{RoomRef, ServerEvent};
    use tokio::sync::mpsc;

    async fn open(state: &AppState) -> (Session, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = state.hub.register(tx).await;
        (Session::new(id, state.clone()), rx)
    }

    fn join(room: &str, name: &str) -> ClientEvent {
        ClientEvent::RequestToJoin {
            room_id: room.into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn host_leaving_closes_room() {
        let state = AppState::new(Config::default());
        let (mut a, _rx_a) = open(&state).await;
        a.handle(join("r1", "A")).await;
        assert!(state.admission.host_of("r1").await.is_some());

        a.close().await;
        assert!(state.admission.host_of("r1").await.is_none());
        assert_eq!(state.hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn pending_requester_leaving_drops_request() {
        let state = AppState::new(Config::default());
        let (mut a, mut rx_a) = open(&state).await;
        let (mut b, mut rx_b) = open(&state).await;
        a.handle(join("r1", "A")).await;
        b.handle(join("r1", "B")).await;
        assert_eq!(state.admission.pending_count().await, 1);
        while rx_a.try_recv().is_ok() {}
        while rx_b.try_recv().is_ok() {}

        let b_id = b.id().to_string();
        b.close().await;
        assert_eq!(state.admission.pending_count().await, 0);
        // Уход видят все в комнате, даже если заявителя ещё не приняли.
        assert_eq!(
            rx_a.try_recv().unwrap(),
            ServerEvent::UserLeft {
                name: "B".into(),
                id: b_id
            }
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejection_with_empty_room_id_still_resolves() {
        let state = AppState::new(Config::default());
        let (mut a, _rx_a) = open(&state).await;
        let (mut b, mut rx_b) = open(&state).await;
        a.handle(join("r1", "A")).await;
        b.handle(join("r1", "B")).await;
        while rx_b.try_recv().is_ok() {}

        let frame = format!(
            r#"{{"event":"host-response","data":{{"requesterId":"{}","approved":false,"roomId":""}}}}"#,
            b.id()
        );
        a.handle(ClientEvent::decode(&frame).unwrap()).await;

        assert_eq!(rx_b.try_recv().unwrap(), ServerEvent::JoinRejected);
        assert_eq!(state.admission.pending_count().await, 0);
    }

    #[tokio::test]
    async fn unjoined_connection_leaves_quietly() {
        let state = AppState::new(Config::default());
        let (mut a, mut rx_a) = open(&state).await;
        let (mut raw, _rx_raw) = open(&state).await;
        a.handle(join("r1", "A")).await;
        raw.handle(ClientEvent::JoinRoom(RoomRef::Id("r1".into())))
            .await;
        while rx_a.try_recv().is_ok() {}

        raw.close().await;
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn gated_join_room_refuses_strangers() {
        let config = Config {
            gate_join_room: true,
            ..Config::default()
        };
        let state = AppState::new(config);
        let (mut a, _rx_a) = open(&state).await;
        let (mut b, _rx_b) = open(&state).await;
        a.handle(join("r1", "A")).await;

        b.handle(ClientEvent::JoinRoom(RoomRef::Object {
            room_id: "r1".into(),
        }))
        .await;
        assert!(!state.hub.is_member("r1", b.id()).await);
    }
}
