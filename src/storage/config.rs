// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

//! Adapter configuration and credential resolution.
//!
//! Every value is resolved once, when the configuration is built, in this order:
//!
//! 1. explicit options passed by the caller
//! 2. process environment variables
//! 3. an external [`Settings`] object (usually loaded from a JSON file)
//! 4. a built-in default, where one exists
//!
//! The resulting [`S3Config`] / [`GcsConfig`] are immutable.

use super::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::path::Path;

pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_GCP_PROJECT_ID: &str = "gcp-us-central1-prod";

pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_AWS_ENDPOINT: &str = "AWS_ENDPOINT";
pub const ENV_AWS_ALLOW_HTTP: &str = "AWS_ALLOW_HTTP";
pub const ENV_GCP_PROJECT_ID: &str = "GCP_PROJECT_ID";
pub const ENV_GCS_SERVICE_ACCOUNT_PATH: &str = "GOOGLE_SERVICE_ACCOUNT_PATH";
pub const ENV_GCS_HMAC_ACCESS_ID: &str = "GCS_HMAC_ACCESS_ID";
pub const ENV_GCS_HMAC_SECRET: &str = "GCS_HMAC_SECRET";

/// Transport and SDK retry settings shared by both adapters.
///
/// A timeout of `0` disables it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: usize,
    pub retry_timeout_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 1200,
            connect_timeout_secs: 30,
            max_retries: 20,
            retry_timeout_secs: 1200,
            pool_idle_timeout_secs: 15,
            pool_max_idle_per_host: 5,
        }
    }
}

/// External, process-wide settings consulted after explicit options and the environment.
///
/// # Examples
///
/// ```
/// use cloud_storage_interface::storage::config::Settings;
///
/// let settings = Settings::from_json_str(r#"{"aws_region": "eu-west-1"}"#).unwrap();
/// assert_eq!(settings.aws_region.as_deref(), Some("eu-west-1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub aws_region: Option<String>,
    pub aws_endpoint: Option<String>,
    pub gcp_project_id: Option<String>,
    pub gcs_service_account_path: Option<String>,
    pub gcs_hmac_access_id: Option<String>,
    pub gcs_hmac_secret: Option<String>,
    pub client: Option<ClientSettings>,
}

impl Settings {
    /// Parse settings from a JSON document.
    pub fn from_json_str(json: &str) -> StorageResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StorageError::ConfigError(format!("Invalid settings: {}", e)))
    }

    /// Load settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read and `ConfigError` if it is not
    /// a valid settings document.
    pub fn from_json_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

/// Static key pair used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Explicit S3 options. Unset fields fall through to the environment and settings.
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub allow_http: Option<bool>,
    pub client: Option<ClientSettings>,
}

impl S3Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_access_key_id(mut self, value: impl Into<String>) -> Self {
        self.access_key_id = Some(value.into());
        self
    }

    pub fn with_secret_access_key(mut self, value: impl Into<String>) -> Self {
        self.secret_access_key = Some(value.into());
        self
    }

    pub fn with_session_token(mut self, value: impl Into<String>) -> Self {
        self.session_token = Some(value.into());
        self
    }

    pub fn with_region(mut self, value: impl Into<String>) -> Self {
        self.region = Some(value.into());
        self
    }

    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    pub fn with_endpoint(mut self, value: impl Into<String>) -> Self {
        self.endpoint = Some(value.into());
        self
    }

    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = Some(allow);
        self
    }

    pub fn with_client_settings(mut self, client: ClientSettings) -> Self {
        self.client = Some(client);
        self
    }
}

/// Resolved configuration for the S3-compatible adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub credentials: Credentials,
    pub region: String,
    pub endpoint: Option<String>,
    pub allow_http: bool,
    pub client: ClientSettings,
}

impl S3Config {
    /// Resolve the configuration against the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no access key id or secret access key can be found.
    pub fn resolve(options: S3Options, settings: Option<&Settings>) -> StorageResult<Self> {
        Self::resolve_with(options, settings, |name| std::env::var(name).ok())
    }

    /// Resolve the configuration using `env` as the environment lookup.
    pub fn resolve_with<F>(
        options: S3Options,
        settings: Option<&Settings>,
        env: F,
    ) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key_id = resolve_value(
            options.access_key_id,
            &env,
            ENV_AWS_ACCESS_KEY_ID,
            settings.and_then(|s| s.aws_access_key_id.clone()),
        )
        .ok_or_else(|| missing("S3", "access key id", ENV_AWS_ACCESS_KEY_ID))?;

        let secret_access_key = resolve_value(
            options.secret_access_key,
            &env,
            ENV_AWS_SECRET_ACCESS_KEY,
            settings.and_then(|s| s.aws_secret_access_key.clone()),
        )
        .ok_or_else(|| missing("S3", "secret access key", ENV_AWS_SECRET_ACCESS_KEY))?;

        let session_token = resolve_value(
            options.session_token,
            &env,
            ENV_AWS_SESSION_TOKEN,
            settings.and_then(|s| s.aws_session_token.clone()),
        );

        let region = resolve_value(
            options.region,
            &env,
            ENV_AWS_REGION,
            settings.and_then(|s| s.aws_region.clone()),
        )
        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());

        let endpoint = resolve_value(
            options.endpoint,
            &env,
            ENV_AWS_ENDPOINT,
            settings.and_then(|s| s.aws_endpoint.clone()),
        );

        let allow_http = options.allow_http.unwrap_or_else(|| {
            env(ENV_AWS_ALLOW_HTTP)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        });

        Ok(Self {
            credentials: Credentials {
                access_key_id,
                secret_access_key,
                session_token,
            },
            region,
            endpoint,
            allow_http,
            client: resolve_client(options.client, settings),
        })
    }
}

/// HMAC key pair for the GCS XML API, used for V4 signed URLs and POST policies.
#[derive(Clone, PartialEq, Eq)]
pub struct HmacKey {
    pub access_id: String,
    pub secret: String,
}

impl Debug for HmacKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacKey")
            .field("access_id", &self.access_id)
            .field("secret", &"***")
            .finish()
    }
}

/// Explicit GCS options. Unset fields fall through to the environment and settings.
#[derive(Debug, Clone, Default)]
pub struct GcsOptions {
    pub project_id: Option<String>,
    pub service_account_path: Option<String>,
    pub service_account_key: Option<String>,
    pub hmac_access_id: Option<String>,
    pub hmac_secret: Option<String>,
    pub client: Option<ClientSettings>,
}

impl GcsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_id(mut self, value: impl Into<String>) -> Self {
        self.project_id = Some(value.into());
        self
    }

    pub fn with_service_account_path(mut self, value: impl Into<String>) -> Self {
        self.service_account_path = Some(value.into());
        self
    }

    /// Service account key as a JSON string.
    pub fn with_service_account_key(mut self, value: impl Into<String>) -> Self {
        self.service_account_key = Some(value.into());
        self
    }

    pub fn with_hmac_key(mut self, access_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.hmac_access_id = Some(access_id.into());
        self.hmac_secret = Some(secret.into());
        self
    }

    pub fn with_client_settings(mut self, client: ClientSettings) -> Self {
        self.client = Some(client);
        self
    }
}

/// Resolved configuration for the GCS-compatible adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    /// Resolved for callers. The `object_store` GCS builder takes no project,
    /// so the adapter itself never reads it.
    pub project_id: String,
    pub service_account_path: Option<String>,
    pub service_account_key: Option<String>,
    pub hmac_key: Option<HmacKey>,
    pub client: ClientSettings,
}

impl GcsConfig {
    /// Resolve the configuration against the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if only one half of the HMAC key pair is available.
    pub fn resolve(options: GcsOptions, settings: Option<&Settings>) -> StorageResult<Self> {
        Self::resolve_with(options, settings, |name| std::env::var(name).ok())
    }

    /// Resolve the configuration using `env` as the environment lookup.
    pub fn resolve_with<F>(
        options: GcsOptions,
        settings: Option<&Settings>,
        env: F,
    ) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_id = resolve_value(
            options.project_id,
            &env,
            ENV_GCP_PROJECT_ID,
            settings.and_then(|s| s.gcp_project_id.clone()),
        )
        .unwrap_or_else(|| DEFAULT_GCP_PROJECT_ID.to_string());

        let service_account_path = resolve_value(
            options.service_account_path,
            &env,
            ENV_GCS_SERVICE_ACCOUNT_PATH,
            settings.and_then(|s| s.gcs_service_account_path.clone()),
        );

        let hmac_access_id = resolve_value(
            options.hmac_access_id,
            &env,
            ENV_GCS_HMAC_ACCESS_ID,
            settings.and_then(|s| s.gcs_hmac_access_id.clone()),
        );
        let hmac_secret = resolve_value(
            options.hmac_secret,
            &env,
            ENV_GCS_HMAC_SECRET,
            settings.and_then(|s| s.gcs_hmac_secret.clone()),
        );

        let hmac_key = match (hmac_access_id, hmac_secret) {
            (Some(access_id), Some(secret)) => Some(HmacKey { access_id, secret }),
            (None, None) => None,
            (Some(_), None) => return Err(missing("GCS", "HMAC secret", ENV_GCS_HMAC_SECRET)),
            (None, Some(_)) => {
                return Err(missing("GCS", "HMAC access id", ENV_GCS_HMAC_ACCESS_ID))
            }
        };

        Ok(Self {
            project_id,
            service_account_path,
            service_account_key: options.service_account_key,
            hmac_key,
            client: resolve_client(options.client, settings),
        })
    }
}

/// Pick the first non-empty value: explicit, environment, then settings.
fn resolve_value<F>(
    explicit: Option<String>,
    env: &F,
    var: &str,
    setting: Option<String>,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .filter(|v| !v.is_empty())
        .or_else(|| env(var).filter(|v| !v.is_empty()))
        .or_else(|| setting.filter(|v| !v.is_empty()))
}

fn resolve_client(explicit: Option<ClientSettings>, settings: Option<&Settings>) -> ClientSettings {
    explicit
        .or_else(|| settings.and_then(|s| s.client.clone()))
        .unwrap_or_default()
}

fn missing(provider: &str, what: &str, var: &str) -> StorageError {
    StorageError::ConfigError(format!(
        "{} requires a {} (pass it explicitly, set {} or provide it in settings)",
        provider, what, var
    ))
}
