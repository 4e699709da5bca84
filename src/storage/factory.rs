use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use super::config::{GcsConfig, GcsOptions, S3Config, S3Options, Settings};
use super::error::{StorageError, StorageResult};
use super::gcs::GcsClient;
use super::provider::StorageClient;
use super::s3::S3Client;

/// Environment variable selecting the provider in [`StorageClientFactory::from_env`].
pub const ENV_PROVIDER: &str = "CLOUD_STORAGE_PROVIDER";

/// Storage provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// AWS S3 and S3-compatible services
    Aws,
    /// Google Cloud Storage
    Gcs,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Aws => "aws",
            ProviderType::Gcs => "gcs",
        }
    }
}

impl Display for ProviderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" | "s3" => Ok(ProviderType::Aws),
            "gcs" | "gcp" => Ok(ProviderType::Gcs),
            _ => Err(StorageError::ConfigError(format!(
                "Unknown storage provider: {}",
                s
            ))),
        }
    }
}

/// Resolved configuration of one provider
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    S3(S3Config),
    Gcs(GcsConfig),
}

impl ProviderConfig {
    /// Resolve the configuration of `provider` from the environment and `settings`.
    pub fn resolve(provider: ProviderType, settings: Option<&Settings>) -> StorageResult<Self> {
        match provider {
            ProviderType::Aws => Ok(ProviderConfig::S3(S3Config::resolve(
                S3Options::new(),
                settings,
            )?)),
            ProviderType::Gcs => Ok(ProviderConfig::Gcs(GcsConfig::resolve(
                GcsOptions::new(),
                settings,
            )?)),
        }
    }

    pub fn provider(&self) -> ProviderType {
        match self {
            ProviderConfig::S3(_) => ProviderType::Aws,
            ProviderConfig::Gcs(_) => ProviderType::Gcs,
        }
    }
}

/// Factory for creating storage clients
pub struct StorageClientFactory;

impl StorageClientFactory {
    /// Create a storage client from a resolved configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The provider configuration
    ///
    /// # Returns
    ///
    /// A thread-safe reference to the client, meant to be built once at startup
    /// and shared.
    pub fn from_config(config: ProviderConfig) -> StorageResult<Arc<dyn StorageClient>> {
        match config {
            ProviderConfig::S3(config) => Ok(Arc::new(S3Client::new(config)?)),
            ProviderConfig::Gcs(config) => Ok(Arc::new(GcsClient::new(config)?)),
        }
    }

    /// Create a storage client for the provider named by `CLOUD_STORAGE_PROVIDER`,
    /// falling back to `settings.provider`.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * No provider is named, or the name is unknown
    /// * The provider's credentials cannot be resolved
    pub fn from_env(settings: Option<&Settings>) -> StorageResult<Arc<dyn StorageClient>> {
        let name = std::env::var(ENV_PROVIDER)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| settings.and_then(|s| s.provider.clone()))
            .ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "No storage provider configured, set {}",
                    ENV_PROVIDER
                ))
            })?;

        let provider = ProviderType::from_str(&name)?;
        Self::from_config(ProviderConfig::resolve(provider, settings)?)
    }
}
