// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Bucket to `object_store` resolution and the object operations shared by the adapters.

use super::config::{ClientSettings, GcsConfig, S3Config};
use super::error::{StorageError, StorageResult};
use super::provider::{string_to_path, ObjectEntry};
use futures::stream::{Stream, StreamExt};
use object_store::{
    aws::{AmazonS3, AmazonS3Builder},
    gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder},
    memory::InMemory,
    path::Path as ObjectPath,
    Attribute, ClientOptions, GetOptions, ObjectMeta, ObjectStore, PutPayload, PutResult,
    RetryConfig, WriteMultipart,
};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Part size of multipart uploads.
pub const MULTIPART_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Parts of one multipart upload in flight at the same time.
const MULTIPART_MAX_CONCURRENCY: usize = 8;

const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Resolves a bucket name to the object store serving it.
pub trait BucketStores: Send + Sync + Debug {
    /// Get the store for `bucket`.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` when the bucket is known not to exist and
    /// `ConfigError` when the store cannot be built.
    fn store(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>>;
}

/// Build connection options from client settings.
///
/// # Arguments
///
/// * `settings` - Timeout and connection pool settings, `0` disables a timeout
///
/// # Returns
///
/// A `ClientOptions` instance configured with the timeout and connection settings.
pub fn build_connection_options(settings: &ClientSettings) -> ClientOptions {
    let mut client_options = ClientOptions::default();
    client_options = if settings.timeout_secs == 0 {
        client_options.with_timeout_disabled()
    } else {
        client_options.with_timeout(Duration::from_secs(settings.timeout_secs))
    };
    client_options = if settings.connect_timeout_secs == 0 {
        client_options.with_connect_timeout_disabled()
    } else {
        client_options.with_connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
    };
    client_options
        .with_pool_idle_timeout(Duration::from_secs(settings.pool_idle_timeout_secs))
        .with_pool_max_idle_per_host(settings.pool_max_idle_per_host)
}

/// Build the SDK retry configuration from client settings.
pub fn build_retry_options(settings: &ClientSettings) -> RetryConfig {
    RetryConfig {
        backoff: Default::default(),
        max_retries: settings.max_retries,
        retry_timeout: Duration::from_secs(settings.retry_timeout_secs),
    }
}

/// Builds an `AmazonS3` store per bucket.
#[derive(Debug, Clone)]
pub struct S3Buckets {
    config: S3Config,
}

impl S3Buckets {
    pub fn new(config: S3Config) -> Self {
        Self { config }
    }

    /// Build an AWS S3 store for `bucket`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the store cannot be initialized (e.g. an invalid endpoint).
    pub fn build(&self, bucket: &str) -> StorageResult<AmazonS3> {
        let config = &self.config;
        let mut builder = AmazonS3Builder::new()
            .with_client_options(build_connection_options(&config.client))
            .with_retry(build_retry_options(&config.client))
            .with_bucket_name(bucket)
            .with_region(&config.region)
            .with_access_key_id(&config.credentials.access_key_id)
            .with_secret_access_key(&config.credentials.secret_access_key);

        if let Some(token) = &config.credentials.session_token {
            builder = builder.with_token(token);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create S3 store: {}", e)))
    }
}

impl BucketStores for S3Buckets {
    fn store(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        Ok(Arc::new(self.build(bucket)?))
    }
}

/// Builds a `GoogleCloudStorage` store per bucket.
#[derive(Debug, Clone)]
pub struct GcsBuckets {
    config: GcsConfig,
}

impl GcsBuckets {
    pub fn new(config: GcsConfig) -> Self {
        Self { config }
    }

    /// Build a GCS store for `bucket`.
    ///
    /// Without a service account the SDK falls back to application default
    /// credentials.
    pub fn build(&self, bucket: &str) -> StorageResult<GoogleCloudStorage> {
        let config = &self.config;
        let mut builder = GoogleCloudStorageBuilder::new()
            .with_client_options(build_connection_options(&config.client))
            .with_retry(build_retry_options(&config.client))
            .with_bucket_name(bucket);

        if let Some(path) = &config.service_account_path {
            builder = builder.with_service_account_path(path);
        }
        if let Some(key) = &config.service_account_key {
            builder = builder.with_service_account_key(key);
        }

        builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create GCS store: {}", e)))
    }
}

impl BucketStores for GcsBuckets {
    fn store(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        Ok(Arc::new(self.build(bucket)?))
    }
}

/// A fixed set of in-memory buckets, for local development and tests.
///
/// Buckets are declared up front; any other bucket name resolves to `BucketNotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuckets {
    buckets: HashMap<String, Arc<InMemory>>,
}

impl MemoryBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an empty bucket.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.buckets
            .entry(bucket.into())
            .or_insert_with(|| Arc::new(InMemory::new()));
        self
    }
}

impl BucketStores for MemoryBuckets {
    fn store(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        match self.buckets.get(bucket) {
            Some(store) => Ok(Arc::clone(store) as Arc<dyn ObjectStore>),
            None => Err(StorageError::bucket_not_found(bucket)),
        }
    }
}

/// Whether a provider error means the bucket itself is absent.
///
/// Listing a missing bucket is not always mapped to `NotFound` by the SDK, so
/// the provider's error code is matched as well.
pub(crate) fn is_missing_bucket(error: &object_store::Error) -> bool {
    if matches!(error, object_store::Error::NotFound { .. }) {
        return true;
    }
    let error_msg = format!("{:?}", error);
    error_msg.contains("NoSuchBucket")
        || error_msg.contains("bucket does not exist")
        || error_msg.contains("status: 404")
}

/// Whether an error is a provider `NotFound`.
pub(crate) fn is_not_found(error: &StorageError) -> bool {
    matches!(
        error,
        StorageError::ProviderError(object_store::Error::NotFound { .. })
    )
}

/// Check that the bucket behind `store` exists with one cheap listing request.
pub(crate) async fn ensure_bucket(store: &dyn ObjectStore, bucket: &str) -> StorageResult<()> {
    match store.list_with_delimiter(None).await {
        Ok(_) => Ok(()),
        Err(e) if is_missing_bucket(&e) => Err(StorageError::bucket_not_found(bucket)),
        Err(e) => Err(e.into()),
    }
}

/// Turn an object-level `NotFound` into `ObjectNotFound` or `BucketNotFound`.
pub(crate) async fn resolve_not_found(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> StorageError {
    match ensure_bucket(store, bucket).await {
        Ok(()) => StorageError::object_not_found(bucket, key),
        Err(e) => e,
    }
}

/// Upload a local file, in parts when it is at least `multipart_threshold` bytes.
pub(crate) async fn put_file(
    store: &dyn ObjectStore,
    key: &str,
    file: &Path,
    multipart_threshold: Option<u64>,
) -> StorageResult<PutResult> {
    let path = string_to_path(key)?;
    let size = tokio::fs::metadata(file).await?.len();

    match multipart_threshold {
        Some(threshold) if size >= threshold => {
            info!(
                "Uploading key={} in parts, size={}, threshold={}",
                key, size, threshold
            );
            put_file_multipart(store, &path, file).await
        }
        _ => {
            let data = tokio::fs::read(file).await?;
            info!("Uploading key={}, size={}", key, size);
            Ok(store.put(&path, PutPayload::from(data)).await?)
        }
    }
}

async fn put_file_multipart(
    store: &dyn ObjectStore,
    path: &ObjectPath,
    file: &Path,
) -> StorageResult<PutResult> {
    let upload = store.put_multipart(path).await?;
    let mut writer = WriteMultipart::new_with_chunk_size(upload, MULTIPART_CHUNK_SIZE);

    if let Err(e) = copy_into(&mut writer, file).await {
        if let Err(abort_error) = writer.abort().await {
            warn!("Failed to abort multipart upload of {}: {}", path, abort_error);
        }
        return Err(e);
    }

    Ok(writer.finish().await?)
}

async fn copy_into(writer: &mut WriteMultipart, file: &Path) -> StorageResult<()> {
    let mut source = tokio::fs::File::open(file).await?;
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let read = source.read(&mut buffer).await?;
        if read == 0 {
            return Ok(());
        }
        writer.wait_for_capacity(MULTIPART_MAX_CONCURRENCY).await?;
        writer.write(&buffer[..read]);
    }
}

/// Stream an object into a local file. The file is only created once the
/// object has been found.
pub(crate) async fn download_to(
    store: &dyn ObjectStore,
    key: &str,
    local_path: &Path,
) -> StorageResult<()> {
    let result = store.get(&string_to_path(key)?).await?;
    let written = write_stream_to(result.into_stream(), local_path).await?;

    info!(
        "Downloaded key={} to path={}, size={}",
        key,
        local_path.display(),
        written
    );
    Ok(())
}

/// Write every chunk of `stream` to a new file at `local_path`.
///
/// A partially written file is removed when the stream or a write fails.
async fn write_stream_to<S, B>(stream: S, local_path: &Path) -> StorageResult<usize>
where
    S: Stream<Item = object_store::Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut file = tokio::fs::File::create(local_path).await?;
    match copy_stream(stream, &mut file).await {
        Ok(written) => Ok(written),
        Err(e) => {
            drop(file);
            if let Err(remove_error) = tokio::fs::remove_file(local_path).await {
                warn!(
                    "Failed to remove partial download {}: {}",
                    local_path.display(),
                    remove_error
                );
            }
            Err(e)
        }
    }
}

async fn copy_stream<S, B>(mut stream: S, file: &mut tokio::fs::File) -> StorageResult<usize>
where
    S: Stream<Item = object_store::Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut written = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        written += chunk.as_ref().len();
        file.write_all(chunk.as_ref()).await?;
    }
    file.flush().await?;
    Ok(written)
}

/// The deepest directory that contains every key starting with `prefix`.
///
/// `object_store` lists by path segment, so `"logs/2024"` is listed from
/// `"logs"` and filtered afterwards. A root that is not a valid path falls
/// back to listing the whole bucket.
fn listing_root(prefix: &str) -> Option<ObjectPath> {
    prefix
        .rfind('/')
        .map(|idx| &prefix[..idx])
        .filter(|root| !root.is_empty())
        .and_then(|root| ObjectPath::parse(root).ok())
}

/// List every object whose key starts with `prefix`, in store order.
///
/// The SDK stream follows pagination, so the listing is complete. With
/// `include_content_type` each entry costs one extra metadata request.
pub(crate) async fn list_entries(
    store: &dyn ObjectStore,
    prefix: Option<&str>,
    include_content_type: bool,
) -> StorageResult<Vec<ObjectEntry>> {
    let prefix = prefix.filter(|p| !p.is_empty());
    let root = prefix.and_then(listing_root);

    let mut entries = Vec::new();
    let mut stream = store.list(root.as_ref());

    while let Some(meta) = stream.next().await {
        let meta = meta?;
        if let Some(prefix) = prefix {
            if !meta.location.as_ref().starts_with(prefix) {
                continue;
            }
        }
        if let Some(entry) = object_entry(store, meta, include_content_type).await? {
            entries.push(entry);
        }
    }

    info!(
        "Listed prefix={}, found count={} objects, with_content_type={}",
        prefix.unwrap_or(""),
        entries.len(),
        include_content_type
    );

    Ok(entries)
}

/// Describe one listed object.
///
/// Returns `None` when the content type was requested but the object was
/// deleted after it was listed.
async fn object_entry(
    store: &dyn ObjectStore,
    meta: ObjectMeta,
    include_content_type: bool,
) -> StorageResult<Option<ObjectEntry>> {
    let key = meta.location.to_string();
    let content_type = if include_content_type {
        match content_type(store, &meta.location).await {
            Ok(content_type) => content_type,
            Err(object_store::Error::NotFound { .. }) => {
                debug!("Skipping key={}, deleted while listing", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        None
    };

    Ok(Some(ObjectEntry {
        key,
        size: meta.size,
        last_modified: Some(meta.last_modified),
        content_type,
    }))
}

async fn content_type(
    store: &dyn ObjectStore,
    location: &ObjectPath,
) -> object_store::Result<Option<String>> {
    let options = GetOptions {
        head: true,
        ..Default::default()
    };
    let result = store.get_opts(location, options).await?;
    Ok(result.attributes.get(&Attribute::ContentType).map(|value| {
        let value: &str = value.as_ref();
        value.to_string()
    }))
}
