//! Database connection configuration.
//!
//! Settings come from the environment (`DB_HOST`, `DB_DATABASE`, `DB_USER`,
//! `DB_PASSWORD`) with fixed defaults, or from builder-style setters.

use std::env;
use std::fmt;

/// Default host when `DB_HOST` is unset.
pub const DEFAULT_HOST: &str = "db";
/// Default database name when `DB_DATABASE` is unset.
pub const DEFAULT_DATABASE: &str = "mini_orm";
/// Default user when `DB_USER` is unset.
pub const DEFAULT_USER: &str = "root";
/// Default password when `DB_PASSWORD` is unset.
pub const DEFAULT_PASSWORD: &str = "root";

/// Connection settings for the shared database context.
///
/// For SQLite, `database` is the database file path (`":memory:"` for an
/// in-memory database); `host`, `user` and `password` are unused.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Hostname of the engine.
    pub host: String,
    /// Database name (SQLite: file path).
    pub database: String,
    /// Username for authentication.
    pub user: String,
    /// Password for authentication.
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Create a configuration with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `DB_HOST`, `DB_DATABASE`, `DB_USER` and `DB_PASSWORD`.
    pub fn from_env() -> Self {
        Self::from_env_with_prefix("DB")
    }

    /// Read `{prefix}_HOST`, `{prefix}_DATABASE`, `{prefix}_USER` and
    /// `{prefix}_PASSWORD`, falling back to the defaults for unset or empty
    /// variables. Test suites use `DB_TEST`.
    pub fn from_env_with_prefix(prefix: &str) -> Self {
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the database name (SQLite: file path).
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// A description suitable for logs. Never includes the password.
    pub fn dsn(&self) -> String {
        format!("{}@{}/{}", self.user, self.host, self.database)
    }

    fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str, default: &str| {
            lookup(&format!("{prefix}_{name}"))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            host: read("HOST", DEFAULT_HOST),
            database: read("DATABASE", DEFAULT_DATABASE),
            user: read("USER", DEFAULT_USER),
            password: read("PASSWORD", DEFAULT_PASSWORD),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.host, "db");
        assert_eq!(config.database, "mini_orm");
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "root");
    }

    #[test]
    fn test_lookup_with_prefix() {
        let vars: HashMap<&str, &str> = [
            ("DB_TEST_HOST", "localhost"),
            ("DB_TEST_DATABASE", "mini_orm_test"),
            ("DB_TEST_PASSWORD", ""),
            ("DB_HOST", "ignored"),
        ]
        .into_iter()
        .collect();
        let config =
            DatabaseConfig::from_lookup("DB_TEST", |k| vars.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.host, "localhost");
        assert_eq!(config.database, "mini_orm_test");
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "root");
    }

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::new()
            .host("db.example.com")
            .database("app")
            .user("app_user")
            .password("secret");
        assert_eq!(config.dsn(), "app_user@db.example.com/app");
    }

    #[test]
    fn test_password_never_printed() {
        let config = DatabaseConfig::new().password("hunter2");
        assert!(!config.dsn().contains("hunter2"));
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
