//! Configuration types and loading
//!
//! Sources are layered: built-in defaults, then an optional config file, then
//! `DECK__<SECTION>__<KEY>` environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::traits::Id;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Attachment file storage configuration
    pub storage: StorageConfig,

    /// Distributed cache configuration
    pub cache: CacheConfig,

    /// Attachment lifecycle configuration
    pub attachments: AttachmentsConfig,

    /// Localization settings
    pub l10n: L10nConfig,

    /// Boards, their cards and shares seeded at startup
    #[serde(default)]
    pub acl: AclConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for attachment files
    pub data_dir: String,
    /// Maximum size of a single uploaded file in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Namespace prefix for per-card attachment counts
    pub namespace: String,
    /// Lifetime of a cached count; 0 keeps it until invalidated
    pub count_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttachmentsConfig {
    /// How long a soft-deleted attachment can still be restored before the
    /// purge job removes it
    pub undo_window_seconds: u64,
    /// Seconds between purge runs; 0 disables the job
    pub purge_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct L10nConfig {
    pub default_locale: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AclConfig {
    #[serde(default)]
    pub boards: Vec<BoardConfig>,
}

/// A board with its owner, cards and shares
///
/// ```toml
/// [[acl.boards]]
/// id = 1
/// owner = "alice"
/// cards = [7, 8]
/// shares = [{ user = "bob" }, { group = "staff", edit = true }]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
    pub id: Id,
    pub owner: String,
    #[serde(default)]
    pub cards: Vec<Id>,
    #[serde(default)]
    pub shares: Vec<ShareConfig>,
}

/// A share names exactly one of `user` or `group`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShareConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub share: bool,
    #[serde(default)]
    pub manage: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_body_size_bytes: 64 * 1024 * 1024, // 64MB
            },
            storage: StorageConfig {
                data_dir: "/var/lib/deck/attachments".to_string(),
                max_upload_size: 50 * 1024 * 1024, // 50MB
            },
            cache: CacheConfig {
                namespace: "deck-card-attachments-".to_string(),
                count_ttl_seconds: 0,
            },
            attachments: AttachmentsConfig {
                undo_window_seconds: 5 * 60,
                purge_interval_seconds: 5 * 60,
            },
            l10n: L10nConfig {
                default_locale: "en".to_string(),
            },
            acl: AclConfig::default(),
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Config source error: {0}")]
    Source(#[from] config::ConfigError),
}

impl AppConfig {
    /// Load configuration from defaults, an optional file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: AppConfig = builder
            .add_source(
                config::Environment::with_prefix("DECK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "cache.namespace".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.storage.data_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "storage.data_dir".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        self.acl.validate()
    }

    /// JSON file holding attachment records, next to the attachment files
    pub fn records_path(&self) -> PathBuf {
        Path::new(&self.storage.data_dir).join("attachments.json")
    }

    /// Get the server address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::SocketAddr;
        let ip: std::net::IpAddr = self.server.host.parse().unwrap_or([0, 0, 0, 0].into());
        SocketAddr::new(ip, self.server.port)
    }

    /// Undo window as a chrono duration
    pub fn undo_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.attachments.undo_window_seconds as i64)
    }

    /// Interval of the purge job, `None` when disabled
    pub fn purge_interval(&self) -> Option<std::time::Duration> {
        match self.attachments.purge_interval_seconds {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }

    /// Count cache lifetime, `None` when counts never expire
    pub fn count_ttl(&self) -> Option<std::time::Duration> {
        match self.cache.count_ttl_seconds {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}

impl AclConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: "acl.boards".to_string(),
            message,
        };

        let mut card_boards: HashMap<Id, Id> = HashMap::new();
        for (i, board) in self.boards.iter().enumerate() {
            if self.boards[..i].iter().any(|b| b.id == board.id) {
                return Err(invalid(format!("board {} is listed twice", board.id)));
            }
            if board.owner.is_empty() {
                return Err(invalid(format!("board {} has no owner", board.id)));
            }
            for &card in &board.cards {
                if let Some(other) = card_boards.insert(card, board.id) {
                    return Err(invalid(format!(
                        "card {} is on boards {} and {}",
                        card, other, board.id
                    )));
                }
            }
            for share in &board.shares {
                if share.user.is_some() == share.group.is_some() {
                    return Err(invalid(format!(
                        "a share on board {} must name either a user or a group",
                        board.id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.namespace, "deck-card-attachments-");
        assert_eq!(config.attachments.undo_window_seconds, 300);
        assert!(config.count_ttl().is_none());
        assert_eq!(config.undo_window(), chrono::Duration::minutes(5));
        assert_eq!(
            config.purge_interval(),
            Some(std::time::Duration::from_secs(300))
        );
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig::default();
        let addr = config.server_addr();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_load_file_then_env() {
        let dir = std::env::temp_dir().join(format!("deck-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deck.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9000\n\n[cache]\ncount_ttl_seconds = 60\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.count_ttl(), Some(std::time::Duration::from_secs(60)));

        std::env::set_var("DECK__SERVER__PORT", "9100");
        let config = AppConfig::load(Some(&path)).unwrap();
        std::env::remove_var("DECK__SERVER__PORT");
        assert_eq!(config.server.port, 9100);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_acl_boards() {
        let dir = std::env::temp_dir().join(format!("deck-config-acl-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deck.toml");
        std::fs::write(
            &path,
            r#"
[[acl.boards]]
id = 1
owner = "alice"
cards = [7, 8]
shares = [{ user = "bob" }, { group = "staff", edit = true }]

[[acl.boards]]
id = 2
owner = "carol"
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(config.acl.boards.len(), 2);
        let board = &config.acl.boards[0];
        assert_eq!(board.owner, "alice");
        assert_eq!(board.cards, vec![7, 8]);
        assert_eq!(board.shares[0].user.as_deref(), Some("bob"));
        assert!(!board.shares[0].edit);
        assert_eq!(board.shares[1].group.as_deref(), Some("staff"));
        assert!(board.shares[1].edit);
        assert!(config.acl.boards[1].cards.is_empty());
    }

    #[test]
    fn test_acl_validation() {
        let board = |id: Id, cards: Vec<Id>| BoardConfig {
            id,
            owner: "alice".to_string(),
            cards,
            shares: vec![],
        };

        let shared_card = AclConfig {
            boards: vec![board(1, vec![7]), board(2, vec![7])],
        };
        assert!(matches!(
            shared_card.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let twice = AclConfig {
            boards: vec![board(1, vec![]), board(1, vec![])],
        };
        assert!(twice.validate().is_err());

        let mut ambiguous = board(1, vec![7]);
        ambiguous.shares.push(ShareConfig::default());
        assert!(AclConfig { boards: vec![ambiguous] }.validate().is_err());

        assert!(AclConfig {
            boards: vec![board(1, vec![7]), board(2, vec![8])]
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_records_next_to_files() {
        let config = AppConfig::default();
        assert_eq!(
            config.records_path(),
            PathBuf::from("/var/lib/deck/attachments/attachments.json")
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("deck-config-does-not-exist.toml");
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.l10n.default_locale, "en");
    }
}
