//! Connector configuration.
//!
//! Configuration is read once at startup from a TOML file and passed by
//! reference from there on. Every field has a default, so an empty file (or no
//! file at all) yields a working development setup:
//!
//! ```toml
//! max_page_size = 200
//! production = false
//! features = ["IMPORT_NEW_USERS", "PUSH_NEW_USERS", "GROUP_PUSH"]
//!
//! [cache]
//! dir = "cache"
//! entry_lifetime_minutes = 30
//! lock_lifetime_minutes = 15
//!
//! [server]
//! bind = "127.0.0.1"
//! port = 5000
//!
//! [auth]
//! scheme = "header"
//! header_name = "Authorization"
//! header_value = "Bearer change-me"
//! ```

use crate::auth::AuthSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Provisioning capabilities an identity provider may use.
///
/// Endpoints that serve none of the enabled features answer 501.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningFeature {
    PushNewUsers,
    PushPendingUsers,
    ImportNewUsers,
    OppScimIncrementalImports,
    PushPasswordUpdates,
    PushProfileUpdates,
    PushUserDeactivation,
    ReactivateUsers,
    ImportProfileUpdates,
    GroupPush,
    ImportGroupsWithUsers,
}

impl ProvisioningFeature {
    pub const ALL: [ProvisioningFeature; 11] = [
        Self::PushNewUsers,
        Self::PushPendingUsers,
        Self::ImportNewUsers,
        Self::OppScimIncrementalImports,
        Self::PushPasswordUpdates,
        Self::PushProfileUpdates,
        Self::PushUserDeactivation,
        Self::ReactivateUsers,
        Self::ImportProfileUpdates,
        Self::GroupPush,
        Self::ImportGroupsWithUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PushNewUsers => "PUSH_NEW_USERS",
            Self::PushPendingUsers => "PUSH_PENDING_USERS",
            Self::ImportNewUsers => "IMPORT_NEW_USERS",
            Self::OppScimIncrementalImports => "OPP_SCIM_INCREMENTAL_IMPORTS",
            Self::PushPasswordUpdates => "PUSH_PASSWORD_UPDATES",
            Self::PushProfileUpdates => "PUSH_PROFILE_UPDATES",
            Self::PushUserDeactivation => "PUSH_USER_DEACTIVATION",
            Self::ReactivateUsers => "REACTIVATE_USERS",
            Self::ImportProfileUpdates => "IMPORT_PROFILE_UPDATES",
            Self::GroupPush => "GROUP_PUSH",
            Self::ImportGroupsWithUsers => "IMPORT_GROUPS_WITH_USERS",
        }
    }
}

impl fmt::Display for ProvisioningFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where import caches live and how long they stay trustworthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: PathBuf,
    /// Lifetime of a snapshot, measured from when it was written
    pub entry_lifetime_minutes: u64,
    /// How long a lock marker may go untouched before it counts as abandoned
    pub lock_lifetime_minutes: u64,
}

impl CacheSettings {
    pub fn entry_lifetime(&self) -> Duration {
        Duration::from_secs(self.entry_lifetime_minutes * 60)
    }

    pub fn lock_lifetime(&self) -> Duration {
        Duration::from_secs(self.lock_lifetime_minutes * 60)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            entry_lifetime_minutes: 30,
            lock_lifetime_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|_| ConfigError::invalid("server.bind", format!("'{}' is not an IP address", self.bind)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Top-level connector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub cache: CacheSettings,

    /// Upper bound on `count` for list requests, advertised as `filter.maxResults`
    pub max_page_size: usize,

    /// Hides stack traces from error responses
    pub production: bool,

    pub server: ServerSettings,

    /// Credential check applied to every SCIM endpoint; disabled when absent
    pub auth: Option<AuthSettings>,

    pub features: Vec<ProvisioningFeature>,

    /// JSON file used to populate the in-memory store at startup
    pub seed_file: Option<PathBuf>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            max_page_size: 200,
            production: false,
            server: ServerSettings::default(),
            auth: None,
            features: ProvisioningFeature::ALL.to_vec(),
            seed_file: None,
        }
    }
}

impl ConnectorConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::invalid("max_page_size", "must be at least 1"));
        }
        if self.cache.entry_lifetime_minutes == 0 {
            return Err(ConfigError::invalid(
                "cache.entry_lifetime_minutes",
                "must be at least 1",
            ));
        }
        if self.cache.lock_lifetime_minutes == 0 {
            return Err(ConfigError::invalid(
                "cache.lock_lifetime_minutes",
                "must be at least 1",
            ));
        }
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }
        self.server.socket_addr()?;
        Ok(())
    }

    /// Whether at least one of `features` is enabled.
    pub fn supports_any(&self, features: &[ProvisioningFeature]) -> bool {
        features.iter().any(|feature| self.features.contains(feature))
    }

    pub fn supports(&self, feature: ProvisioningFeature) -> bool {
        self.features.contains(&feature)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache.dir = dir.into();
        self
    }

    pub fn with_lifetimes(mut self, entry_minutes: u64, lock_minutes: u64) -> Self {
        self.cache.entry_lifetime_minutes = entry_minutes;
        self.cache.lock_lifetime_minutes = lock_minutes;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn with_auth(mut self, auth: AuthSettings) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_features(mut self, features: impl IntoIterator<Item = ProvisioningFeature>) -> Self {
        self.features = features.into_iter().collect();
        self
    }
}
