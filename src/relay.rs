//! Пересылка сигналинга WebRTC и чата внутри комнаты. Своего состояния нет.

use serde_json::Value;
use tracing::debug;

use crate::hub::Hub;
use crate::protocol::ServerEvent;

/// Сигнал WebRTC, уходит всем в комнате, кроме отправителя.
#[derive(Debug, Clone, PartialEq)]
pub enum WebrtcSignal {
    Offer(Value),
    Answer(Value),
    IceCandidate(Value),
}

impl From<WebrtcSignal> for ServerEvent {
    fn from(signal: WebrtcSignal) -> Self {
        match signal {
            WebrtcSignal::Offer(sdp) => ServerEvent::Offer { sdp },
            WebrtcSignal::Answer(sdp) => ServerEvent::Answer { sdp },
            WebrtcSignal::IceCandidate(candidate) => ServerEvent::IceCandidate { candidate },
        }
    }
}

#[derive(Clone)]
pub struct Relay {
    hub: Hub,
}

impl Relay {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    pub async fn signal(&self, sender: &str, room_id: &str, signal: WebrtcSignal) {
        let event = ServerEvent::from(signal);
        debug!(from = %sender, room = %room_id, event = event.name(), "сигнал");
        self.hub.broadcast(room_id, event, Some(sender)).await;
    }

    /// Чат уходит всей комнате, включая отправителя.
    pub async fn chat(&self, room_id: &str, name: String, text: String, time: Value) {
        debug!(room = %room_id, "сообщение чата");
        self.hub
            .broadcast(
                room_id,
                ServerEvent::ReceiveMessage { name, text, time },
                None,
            )
            .await;
    }

    /// Подключение к комнате без допуска.
    pub async fn join_room_raw(&self, id: &str, room_id: &str) {
        self.hub.join_room(id, room_id).await;
        debug!(connection = %id, room = %room_id, "подключён к каналу сигналинга");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn signals_skip_sender_and_chat_does_not() {
        let hub = Hub::new();
        let relay = Relay::new(hub.clone());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        let a = hub.register(tx_a).await;
        let b = hub.register(tx_b).await;
        let _c = hub.register(tx_c).await;
        relay.join_room_raw(&a, "r1").await;
        relay.join_room_raw(&b, "r1").await;

        relay
            .signal(&a, "r1", WebrtcSignal::Offer(json!({"type": "offer", "sdp": "v=0"})))
            .await;
        assert!(rx_a.try_recv().is_err());
        assert_eq!(
            rx_b.try_recv().unwrap(),
            ServerEvent::Offer {
                sdp: json!({"type": "offer", "sdp": "v=0"})
            }
        );

        relay
            .chat("r1", "A".into(), "hi".into(), json!("10:00"))
            .await;
        let expected = ServerEvent::ReceiveMessage {
            name: "A".into(),
            text: "hi".into(),
            time: json!("10:00"),
        };
        assert_eq!(rx_a.try_recv().unwrap(), expected);
        assert_eq!(rx_b.try_recv().unwrap(), expected);
        assert!(rx_c.try_recv().is_err());
    }
}
