//! Формат кадров: `{"event": "<имя>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

pub type ConnectionId = String;
pub type RoomId = String;

/// События от клиента.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    RequestToJoin {
        room_id: RoomId,
        #[serde(default)]
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    HostResponse {
        requester_id: ConnectionId,
        approved: bool,
        room_id: RoomId,
    },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        room_id: RoomId,
        #[serde(default)]
        name: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        time: Value,
    },
    JoinRoom(RoomRef),
    #[serde(rename_all = "camelCase")]
    Offer { sdp: Value, room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    Answer { sdp: Value, room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    IceCandidate { candidate: Value, room_id: RoomId },
}

/// `join-room` исторически принимает голую строку, новые клиенты шлют объект.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoomRef {
    Id(RoomId),
    #[serde(rename_all = "camelCase")]
    Object { room_id: RoomId },
}

impl RoomRef {
    pub fn room_id(&self) -> &str {
        match self {
            RoomRef::Id(id) => id,
            RoomRef::Object { room_id } => room_id,
        }
    }
}

impl ClientEvent {
    /// Пустой `roomId` недопустим только в `request-to-join`.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let event: ClientEvent = serde_json::from_str(text)?;
        if let ClientEvent::RequestToJoin { room_id, .. } = &event {
            if room_id.is_empty() {
                return Err(ProtocolError::EmptyRoomId);
            }
        }
        Ok(event)
    }
}

/// События, которые сервер рассылает клиентам.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    RoleAssigned { is_host: bool },
    #[serde(rename_all = "camelCase")]
    UserRequested {
        name: String,
        requester_id: ConnectionId,
        room_id: RoomId,
    },
    WaitingForApproval,
    #[serde(rename_all = "camelCase")]
    JoinApproved { room_id: RoomId, host_id: ConnectionId },
    JoinRoomConfirmed { name: String },
    UserJoined { name: String, id: ConnectionId },
    StartCall,
    JoinRejected,
    ReceiveMessage { name: String, text: String, time: Value },
    UserLeft { name: String, id: ConnectionId },
    Offer { sdp: Value },
    Answer { sdp: Value },
    IceCandidate { candidate: Value },
}

impl ServerEvent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Имя события на проводе, для логов.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::RoleAssigned { .. } => "role-assigned",
            ServerEvent::UserRequested { .. } => "user-requested",
            ServerEvent::WaitingForApproval => "waiting-for-approval",
            ServerEvent::JoinApproved { .. } => "join-approved",
            ServerEvent::JoinRoomConfirmed { .. } => "join-room-confirmed",
            ServerEvent::UserJoined { .. } => "user-joined",
            ServerEvent::StartCall => "start-call",
            ServerEvent::JoinRejected => "join-rejected",
            ServerEvent::ReceiveMessage { .. } => "receive-message",
            ServerEvent::UserLeft { .. } => "user-left",
            ServerEvent::Offer { .. } => "offer",
            ServerEvent::Answer { .. } => "answer",
            ServerEvent::IceCandidate { .. } => "ice-candidate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_request_to_join() {
        let event =
            ClientEvent::decode(r#"{"event":"request-to-join","data":{"roomId":"r1","name":"A"}}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::RequestToJoin {
                room_id: "r1".into(),
                name: "A".into()
            }
        );
    }

    #[test]
    fn join_room_accepts_both_shapes() {
        for frame in [
            r#"{"event":"join-room","data":"r1"}"#,
            r#"{"event":"join-room","data":{"roomId":"r1"}}"#,
        ] {
            match ClientEvent::decode(frame).unwrap() {
                ClientEvent::JoinRoom(room) => assert_eq!(room.room_id(), "r1"),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn signaling_payloads_stay_opaque() {
        let event = ClientEvent::decode(
            r#"{"event":"ice-candidate","data":{"candidate":{"candidate":"a=1","sdpMid":"0"},"roomId":"r1"}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::IceCandidate { candidate, .. } => {
                assert_eq!(candidate, json!({"candidate": "a=1", "sdpMid": "0"}))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(
            ClientEvent::decode("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientEvent::decode(r#"{"event":"host-response","data":{"requesterId":"x"}}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientEvent::decode(r#"{"event":"launch-rockets","data":{}}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientEvent::decode(r#"{"event":"request-to-join","data":{"roomId":"","name":"A"}}"#),
            Err(ProtocolError::EmptyRoomId)
        ));
    }

    #[test]
    fn only_request_to_join_needs_room_id() {
        let event = ClientEvent::decode(
            r#"{"event":"host-response","data":{"requesterId":"b","approved":false,"roomId":""}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::HostResponse {
                requester_id: "b".into(),
                approved: false,
                room_id: String::new(),
            }
        );
        assert!(ClientEvent::decode(r#"{"event":"offer","data":{"sdp":"x","roomId":""}}"#).is_ok());
    }

    #[test]
    fn encodes_camel_case_fields() {
        let json: Value = serde_json::from_str(
            &ServerEvent::JoinApproved {
                room_id: "r1".into(),
                host_id: "h".into(),
            }
            .encode()
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            json,
            json!({"event": "join-approved", "data": {"roomId": "r1", "hostId": "h"}})
        );

        let json: Value = serde_json::from_str(&ServerEvent::StartCall.encode().unwrap()).unwrap();
        assert_eq!(json, json!({"event": "start-call"}));
    }
}
