use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::ProductionAggregation;
use crate::site::pvgis::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub site_provider: SiteProviderConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub enable_cors: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

fn default_request_timeout() -> u64 {
    30
}

/// Static identity provider: bearer token to user id.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub users: HashMap<String, Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub http_timeout_seconds: u64,
    #[serde(default = "default_loss_percent")]
    pub loss_percent: f64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_loss_percent() -> f64 {
    14.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub production_aggregation: ProductionAggregation,
    #[serde(default = "default_max_update_retries")]
    pub max_update_retries: u32,
    #[serde(default)]
    pub coefficient_table_path: Option<PathBuf>,
}

fn default_max_update_retries() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            production_aggregation: ProductionAggregation::default(),
            max_update_retries: default_max_update_retries(),
            coefficient_table_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub catalog_path: PathBuf,
    #[serde(default)]
    pub projects_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("OFFGRID__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }
}
