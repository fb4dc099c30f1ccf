//! Server configuration

use crate::cli::ServeArgs;
use docscore_service::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration: the service settings plus HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body (uploads included)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Training and scoring settings
    #[serde(flatten)]
    pub service: ServiceConfig,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &Path, args: &ServeArgs) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(listen) = &args.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(dir) = &args.models_dir {
            config.service.models_dir = dir.clone();
        }
        if let Some(dir) = &args.logs_dir {
            config.service.logs_dir = dir.clone();
        }

        config.service.validate()?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            service: ServiceConfig::default(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}
