//! Store connection settings and connection utilities.

use switchy_database::Database;
use switchy_database_connection::Credentials;

use crate::DbError;

/// Environment variable holding the database host.
pub const HOST_VAR: &str = "DB_HOST";
/// Environment variable holding the database user.
pub const USER_VAR: &str = "DB_USER";
/// Environment variable holding the database password.
pub const PASSWORD_VAR: &str = "DB_PASSWORD";
/// Environment variable holding the database name.
pub const NAME_VAR: &str = "DB_NAME";

/// Connection settings as found in the environment. Any of them may be
/// missing; [`StoreSettings::validate`] decides whether a run can proceed.
#[derive(Clone, Default)]
pub struct StoreSettings {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl std::fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSettings")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("name", &self.name)
            .finish()
    }
}

impl StoreSettings {
    /// Reads the four `DB_*` variables. Empty values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            host: read(HOST_VAR),
            user: read(USER_VAR),
            password: read(PASSWORD_VAR),
            name: read(NAME_VAR),
        }
    }

    /// Checks that every setting is present.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::MissingConfig`] naming every unset variable.
    pub fn validate(&self) -> Result<StoreConfig, DbError> {
        let mut missing = Vec::new();
        for (value, var) in [
            (&self.host, HOST_VAR),
            (&self.user, USER_VAR),
            (&self.password, PASSWORD_VAR),
            (&self.name, NAME_VAR),
        ] {
            if value.is_none() {
                missing.push(var);
            }
        }

        match (&self.host, &self.user, &self.password, &self.name) {
            (Some(host), Some(user), Some(password), Some(name)) => Ok(StoreConfig {
                host: host.clone(),
                user: user.clone(),
                password: password.clone(),
                name: name.clone(),
            }),
            _ => Err(DbError::MissingConfig { variables: missing }),
        }
    }
}

/// Complete connection settings for one run.
#[derive(Clone)]
pub struct StoreConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl StoreConfig {
    /// Converts into connection credentials.
    #[must_use]
    pub fn into_credentials(self) -> Credentials {
        Credentials::new(self.host, self.name, self.user, Some(self.password))
    }
}

/// Opens a `MySQL` connection for a single run.
///
/// # Errors
///
/// Returns [`DbError::Connection`] if the connection cannot be established.
pub async fn connect(config: StoreConfig) -> Result<Box<dyn Database>, DbError> {
    log::debug!("Connecting to {}/{} as {}", config.host, config.name, config.user);

    switchy_database_connection::init_mysql_sqlx(config.into_credentials())
        .await
        .map_err(|e| DbError::Connection {
            message: e.to_string(),
        })
}
