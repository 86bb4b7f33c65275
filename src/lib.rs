//! Сервер сигналинга для видеозвонков: хост комнаты решает, кого пускать,
//! а сервер пересылает offer/answer/ICE и чат участникам.

pub mod admission;
pub mod app_state;
pub mod config;
pub mod directory;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod relay;
pub mod routes;
pub mod session;
pub mod ws;

pub use app_state::AppState;
pub use config::Config;
pub use routes::router;
