use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub api_prefix: String,

    // Collaborators
    pub employee_directory_url: String,
    pub appointment_directory_url: String,
    pub notification_url: String,
    pub upstream_timeout: Duration,
    pub notify_queue_capacity: usize,
    pub fallback_sms_number: Option<String>,

    pub log_dir: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_assign_per_min: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend: StoreBackend = parse_or("STORE_BACKEND", StoreBackend::Mysql)?;
        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND is mysql");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            store_backend,
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            api_prefix: optional("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            employee_directory_url: required("EMPLOYEE_DIRECTORY_URL")?,
            appointment_directory_url: required("APPOINTMENT_DIRECTORY_URL")?,
            notification_url: required("NOTIFICATION_URL")?,
            upstream_timeout: Duration::from_millis(parse_or("UPSTREAM_TIMEOUT_MS", 3000)?),
            notify_queue_capacity: parse_or("NOTIFY_QUEUE_CAPACITY", 1024)?,
            fallback_sms_number: optional("FALLBACK_SMS_NUMBER"),

            log_dir: optional("LOG_DIR").unwrap_or_else(|| "logs".to_string()),

            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,
            rate_assign_per_min: parse_or("RATE_ASSIGN_PER_MIN", 120)?,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("{} must be set", key))
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
    }
}
