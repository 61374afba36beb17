use serde::{Deserialize, Serialize};
use std::{env, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Dev,
    Test,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "dev" | "development" => Self::Dev,
            "test" | "testing" => Self::Test,
            "staging" => Self::Staging,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl StorageBackend {
    pub fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Self::Postgres,
            _ => Self::Memory,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub environment: Environment,
    pub bind_addr: String,
    pub metrics_addr: Option<String>,
    pub log_level: String,
    pub storage: StorageBackend,
    /// Per-subscription event buffer capacity; events past this are dropped.
    pub event_buffer: usize,
    /// Idle seconds between SSE heartbeat comments.
    pub heartbeat_secs: u64,
}

impl ServiceConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        let service_name = env_var("SIREN_SERVICE_NAME", default_service_name.to_string());
        let environment = Environment::from_env(&env_var("SIREN_ENV", "local".to_string()));
        let bind_addr = env_var("SIREN_BIND_ADDR", "0.0.0.0:8080".to_string());
        let metrics_addr = env::var("SIREN_METRICS_ADDR").ok();
        let log_level = env_var("SIREN_LOG_LEVEL", "info".to_string());
        let storage = StorageBackend::from_env(&env_var("SIREN_STORAGE", "memory".to_string()));
        let event_buffer = env_var_usize("SIREN_EVENT_BUFFER", 32);
        let heartbeat_secs = env_var_u64("SIREN_HEARTBEAT_SECS", 15);

        Self {
            service_name,
            environment,
            bind_addr,
            metrics_addr,
            log_level,
            storage,
            event_buffer,
            heartbeat_secs,
        }
    }
}

fn env_var(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}
