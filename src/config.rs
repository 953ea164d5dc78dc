//! Engine configuration.
//!
//! The only process-wide setting the engine carries is the optional local
//! default store binding, used for datasets that are addressed by
//! `location` instead of an explicit data-source reference. The binding is
//! resolved once at init time and handed to the engine as an explicit
//! constructor argument, never read lazily from a global.

use std::env;

use crate::store::clickhouse::ClickHouseRunner;

#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub local_store_url: Option<String>,
    pub local_store_user: Option<String>,
    pub local_store_password: Option<String>,
    pub local_store_database: Option<String>,
}

fn read_env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl EngineConfig {
    /// Read the local default store binding from the environment. Absent
    /// variables simply leave the binding unconfigured; location-based
    /// resolution is then disabled.
    pub fn from_env() -> Self {
        Self {
            local_store_url: read_env_var("DATAGOV_STORE_URL"),
            local_store_user: read_env_var("DATAGOV_STORE_USER"),
            local_store_password: read_env_var("DATAGOV_STORE_PASSWORD"),
            local_store_database: read_env_var("DATAGOV_STORE_DATABASE"),
        }
    }

    /// Build the local default runner, if the binding is fully configured.
    pub fn local_runner(&self) -> Option<ClickHouseRunner> {
        let url = self.local_store_url.as_deref()?;
        let user = self.local_store_user.as_deref()?;
        let password = self.local_store_password.as_deref()?;
        let database = self.local_store_database.as_deref()?;
        log::info!("Local default store configured at {}", url);
        Some(ClickHouseRunner::connect(url, user, password, database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_binding_yields_no_runner() {
        let config = EngineConfig {
            local_store_url: Some("http://localhost:8123".to_string()),
            ..Default::default()
        };
        assert!(config.local_runner().is_none());
    }

    #[test]
    fn test_full_binding_yields_runner() {
        let config = EngineConfig {
            local_store_url: Some("http://localhost:8123".to_string()),
            local_store_user: Some("default".to_string()),
            local_store_password: Some("secret".to_string()),
            local_store_database: Some("datagov".to_string()),
        };
        assert!(config.local_runner().is_some());
    }
}
