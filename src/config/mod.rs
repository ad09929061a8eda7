use std::env;
use std::io;

pub const DEFAULT_MONGO_URL: &str = "mongodb://localhost:27017";
pub const DEFAULT_DB_NAME: &str = "assessment_db";
pub const DEFAULT_COLLECTION: &str = "employees";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongo_url: String,
    pub db_name: String,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Reads settings from the process environment. Call after `dotenv()`.
    pub fn from_env() -> io::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> io::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let backend = match var("STORE_BACKEND", "mongo").to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => StoreBackend::Mongo,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("STORE_BACKEND must be 'mongo' or 'memory', got '{}'", other),
                ))
            }
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR", DEFAULT_BIND_ADDR),
            store: StoreConfig {
                backend,
                mongo_url: var("MONGO_URL", DEFAULT_MONGO_URL),
                db_name: var("DB_NAME", DEFAULT_DB_NAME),
                collection: var("EMPLOYEE_COLLECTION", DEFAULT_COLLECTION),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> io::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset_or_empty() {
        let config = config_from(&[("DB_NAME", "")]).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.store.backend, StoreBackend::Mongo);
        assert_eq!(config.store.mongo_url, DEFAULT_MONGO_URL);
        assert_eq!(config.store.db_name, DEFAULT_DB_NAME);
        assert_eq!(config.store.collection, DEFAULT_COLLECTION);
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("STORE_BACKEND", "Memory"),
            ("MONGO_URL", "mongodb://db:27017"),
            ("DB_NAME", "hr"),
            ("EMPLOYEE_COLLECTION", "staff"),
            ("BIND_ADDR", "0.0.0.0:9000"),
        ])
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.mongo_url, "mongodb://db:27017");
        assert_eq!(config.store.db_name, "hr");
        assert_eq!(config.store.collection, "staff");
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = config_from(&[("STORE_BACKEND", "postgres")]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
