use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub appdir: Option<String>,
    #[serde(default)]
    pub imagedir: Option<String>,
    #[serde(default)]
    pub dbdir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub recommendations: RecommendConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_limit")]
    pub default_limit: i64,
    #[serde(default = "default_max_page_limit")]
    pub max_limit: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

/// Tuning for the recommendation scorer.
///
/// `min_score` is inclusive: a candidate is kept when its final score is
/// at least this value. The default of 1 keeps every strictly positive score.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RecommendConfig {
    #[serde(default = "default_recommend_limit")]
    pub limit: usize,
    #[serde(default = "default_collaborative_weight")]
    pub collaborative_weight: i64,
    #[serde(default = "default_min_score")]
    pub min_score: i64,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            limit: default_recommend_limit(),
            collaborative_weight: default_collaborative_weight(),
            min_score: default_min_score(),
        }
    }
}

fn default_port() -> String {
    "5000".to_string()
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_page_limit() -> i64 {
    12
}

fn default_max_page_limit() -> i64 {
    50
}

fn default_recommend_limit() -> usize {
    5
}

fn default_collaborative_weight() -> i64 {
    3
}

fn default_min_score() -> i64 {
    1
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(path, &content)
    }

    pub fn from_yaml(path: &str, content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::ParseError(path.to_string(), e))?;

        if config.auth.jwt_secret.is_none() {
            config.auth.jwt_secret = std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());
        }

        Ok(config)
    }

    pub fn get_database_path(&self) -> Option<String> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(sqlite.filename.clone());
        }

        if let Some(ref dbdir) = self.dbdir {
            let path = PathBuf::from(dbdir).join("recipes.db");
            return Some(path.to_string_lossy().to_string());
        }

        None
    }

    pub fn jwt_secret(&self) -> Result<&str, ConfigError> {
        self.auth
            .jwt_secret
            .as_deref()
            .ok_or(ConfigError::Missing("auth.jwt_secret (or JWT_SECRET)"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),
}
