use thiserror::Error;

/// Ошибки разбора кадров WebSocket.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("некорректный кадр: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("пустой идентификатор комнаты")]
    EmptyRoomId,
}
