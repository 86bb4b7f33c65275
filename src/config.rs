//! Настройки сервера из переменных окружения.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Клиент по умолчанию (dev-сервер фронтенда).
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,

    /// Единственный разрешённый origin для CORS, `None` означает "любой".
    pub allowed_origin: Option<String>,

    /// Принимать решение по заявке только от текущего хоста комнаты.
    pub verify_host: bool,

    /// Пускать в `join-room` только хоста или уже принятых участников.
    pub gate_join_room: bool,

    /// Срок жизни заявки на вход. `None`: заявка ждёт хоста бесконечно.
    pub pending_ttl: Option<Duration>,

    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("некорректный BIND_ADDRESS: {0}")]
    InvalidBindAddress(String),

    #[error("некорректный флаг {name}: {value}")]
    InvalidFlag { name: String, value: String },

    #[error("некорректный PENDING_TTL_SECS: {0}")]
    InvalidPendingTtl(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 5000)),
            allowed_origin: Some(DEFAULT_ALLOWED_ORIGIN.to_string()),
            verify_host: false,
            gate_join_room: false,
            pending_ttl: None,
            static_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Для тестов: та же логика, но из готовой карты.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw_addr = vars
            .get("BIND_ADDRESS")
            .map(String::as_str)
            .unwrap_or(DEFAULT_BIND_ADDRESS);
        let bind_address = raw_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(raw_addr.to_string()))?;

        let allowed_origin = match vars.get("ALLOWED_ORIGIN").map(|s| s.trim()) {
            Some("*") => None,
            Some("") | None => Some(DEFAULT_ALLOWED_ORIGIN.to_string()),
            Some(origin) => Some(origin.to_string()),
        };

        let pending_ttl = match vars.get("PENDING_TTL_SECS") {
            None => None,
            Some(value) if value.trim().is_empty() => None,
            Some(value) => {
                let secs: u64 = value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidPendingTtl(value.clone()))?;
                if secs == 0 {
                    return Err(ConfigError::InvalidPendingTtl(value.clone()));
                }
                Some(Duration::from_secs(secs))
            }
        };

        Ok(Self {
            bind_address,
            allowed_origin,
            verify_host: parse_flag(vars, "VERIFY_HOST")?,
            gate_join_room: parse_flag(vars, "GATE_JOIN_ROOM")?,
            pending_ttl,
            static_dir: vars
                .get("STATIC_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        })
    }
}

fn parse_flag(vars: &HashMap<String, String>, name: &str) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(ConfigError::InvalidFlag {
                name: name.to_string(),
                value: v.clone(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_env() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config.bind_address.port(), 5000);
        assert_eq!(config.allowed_origin.as_deref(), Some("http://localhost:5173"));
        assert!(!config.verify_host);
        assert!(!config.gate_join_room);
        assert!(config.pending_ttl.is_none());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_vars(&vars(&[
            ("BIND_ADDRESS", "127.0.0.1:9000"),
            ("ALLOWED_ORIGIN", "*"),
            ("VERIFY_HOST", "true"),
            ("GATE_JOIN_ROOM", "1"),
            ("PENDING_TTL_SECS", "30"),
            ("STATIC_DIR", "public"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:9000".parse().unwrap());
        assert!(config.allowed_origin.is_none());
        assert!(config.verify_host);
        assert!(config.gate_join_room);
        assert_eq!(config.pending_ttl, Some(Duration::from_secs(30)));
        assert_eq!(config.static_dir, Some(PathBuf::from("public")));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Config::from_vars(&vars(&[("BIND_ADDRESS", "nope")])),
            Err(ConfigError::InvalidBindAddress(_))
        ));
        assert!(matches!(
            Config::from_vars(&vars(&[("VERIFY_HOST", "maybe")])),
            Err(ConfigError::InvalidFlag { .. })
        ));
        assert!(matches!(
            Config::from_vars(&vars(&[("PENDING_TTL_SECS", "0")])),
            Err(ConfigError::InvalidPendingTtl(_))
        ));
    }
}
