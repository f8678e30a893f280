use std::path::Path;

use config::{Config, ConfigError, Environment as ConfigEnvironment, File};
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;
use tracing::{info, warn};

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_max_connection_retries")]
    pub max_connection_retries: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            max_connection_retries: default_max_connection_retries(),
        }
    }
}

impl DatabaseSettings {
    /// In-memory settings used by tests and throwaway servers.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            max_connection_retries: 0,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct AuthSettings {
    pub jwt_secret: Secret<String>,
    #[serde(
        default = "default_token_ttl_days",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub token_ttl_days: i64,
    /// Accounts registered with one of these emails get the admin role.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl AuthSettings {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

fn default_database_url() -> String {
    "sqlite:farmlink.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_connection_retries() -> u32 {
    3
}

fn default_token_ttl_days() -> i64 {
    30
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine current directory: {e}")))?
        .join("configuration");

    get_configuration_from(&base_path)
}

pub fn get_configuration_from(base_path: &Path) -> Result<Settings, ConfigError> {
    let environment: AppEnvironment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let environment_filename = format!("{}.yaml", environment.as_str());
    info!(
        "Loading configuration for {} from {}",
        environment.as_str(),
        base_path.display()
    );

    let settings = Config::builder()
        .add_source(File::from(base_path.join("base.yaml")))
        .add_source(File::from(base_path.join(&environment_filename)).required(false))
        .add_source(
            ConfigEnvironment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;

    info!(
        "Application: {}:{}",
        settings.application.host, settings.application.port
    );
    info!("Database: {}", settings.database.url);
    if matches!(environment, AppEnvironment::Production) && settings.auth.admin_emails.is_empty()
    {
        warn!("No admin emails configured; logistics status updates will be unavailable");
    }

    Ok(settings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Local,
    Production,
}

impl AppEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnvironment::Local => "local",
            AppEnvironment::Production => "production",
        }
    }
}

impl TryFrom<String> for AppEnvironment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::fs;

    fn write_config(dir: &Path) {
        fs::write(
            dir.join("base.yaml"),
            r#"
application:
  port: 5000
  host: 0.0.0.0
auth:
  jwt_secret: "base-secret"
"#,
        )
        .unwrap();
        fs::write(
            dir.join("local.yaml"),
            r#"
application:
  host: 127.0.0.1
auth:
  admin_emails: ["Root@Farm.test"]
"#,
        )
        .unwrap();
    }

    #[test]
    #[serial]
    fn layers_environment_file_over_base() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path());
        std::env::remove_var("APP_ENVIRONMENT");

        let settings = get_configuration_from(dir.path()).unwrap();

        assert_eq!(settings.application.port, 5000);
        assert_eq!(settings.application.host, "127.0.0.1");
        assert_eq!(settings.auth.jwt_secret.expose_secret(), "base-secret");
        assert_eq!(settings.auth.token_ttl_days, 30);
        assert_eq!(settings.database.url, "sqlite:farmlink.db");
        assert!(settings.auth.is_admin_email("root@farm.test"));
    }

    #[test]
    #[serial]
    fn environment_variables_override_files() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path());
        std::env::remove_var("APP_ENVIRONMENT");
        std::env::set_var("APP_APPLICATION__PORT", "8088");

        let settings = get_configuration_from(dir.path());
        std::env::remove_var("APP_APPLICATION__PORT");

        assert_eq!(settings.unwrap().application.port, 8088);
    }

    #[test]
    #[serial]
    fn rejects_unknown_environment() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path());
        std::env::set_var("APP_ENVIRONMENT", "staging");

        let result = get_configuration_from(dir.path());
        std::env::remove_var("APP_ENVIRONMENT");

        assert!(result.is_err());
    }

    #[test]
    fn in_memory_database_is_detected() {
        assert!(DatabaseSettings::in_memory().is_in_memory());
        assert!(!DatabaseSettings::default().is_in_memory());
    }
}
