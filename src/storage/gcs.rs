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

use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use object_store::signer::Signer;
use object_store::{ObjectMeta, ObjectStore};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::config::{GcsConfig, HmacKey};
use super::error::{StorageError, StorageResult};
use super::factory::ProviderType;
use super::provider::{
    presign_expiry, string_to_path, ListOptions, ObjectEntry, PostUrl, PresignedPost,
    PresignedPostOptions, StorageClient, UploadOptions, UploadResult,
};
use super::signing::{PostPolicy, RequestSigner, SigningScheme};
use super::store::{download_to, list_entries, ensure_bucket, put_file, BucketStores, GcsBuckets};

/// Host of the GCS XML API.
pub const GCS_HOST: &str = "storage.googleapis.com";

/// Storage client for Google Cloud Storage.
///
/// Every operation first checks that the bucket exists, and object-scoped
/// operations that the object exists, so callers get `BucketNotFound` and
/// `ObjectNotFound` instead of generic provider errors.
#[derive(Debug, Clone)]
pub struct GcsClient {
    config: GcsConfig,
    signing_stores: GcsBuckets,
    buckets: Arc<dyn BucketStores>,
}

impl GcsClient {
    /// Create a client talking to GCS with the resolved `config`.
    ///
    /// No request is made; stores are built on first use of a bucket.
    pub fn new(config: GcsConfig) -> StorageResult<Self> {
        let buckets = GcsBuckets::new(config.clone());
        Ok(Self::with_buckets(config, buckets))
    }

    /// Create a client serving objects from `buckets`.
    ///
    /// URLs and policies are still signed with `config`.
    pub fn with_buckets(config: GcsConfig, buckets: impl BucketStores + 'static) -> Self {
        Self {
            signing_stores: GcsBuckets::new(config.clone()),
            config,
            buckets: Arc::new(buckets),
        }
    }

    /// Get the store of an existing bucket.
    async fn bucket(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        let store = self.buckets.store(bucket)?;
        ensure_bucket(store.as_ref(), bucket).await?;
        Ok(store)
    }

    /// Get the store and metadata of an existing object.
    async fn object(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(Arc<dyn ObjectStore>, ObjectMeta)> {
        let store = self.bucket(bucket).await?;
        match store.head(&string_to_path(key)?).await {
            Ok(meta) => Ok((store, meta)),
            Err(object_store::Error::NotFound { .. }) => {
                Err(StorageError::object_not_found(bucket, key))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn hmac_key(&self) -> Option<&HmacKey> {
        self.config.hmac_key.as_ref()
    }

    fn request_signer(key: &HmacKey) -> RequestSigner {
        RequestSigner::new(SigningScheme::Goog, &key.access_id, &key.secret)
    }
}

/// Form fields echoed back to the browser.
///
/// The key goes out verbatim so placeholders like `${filename}` survive.
fn post_fields(key: &str, options: &PresignedPostOptions) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("key".to_string(), key.to_string());
    if let Some(acl) = &options.acl {
        fields.insert("acl".to_string(), acl.clone());
    }
    if let Some(status) = &options.success_action_status {
        fields.insert("success_action_status".to_string(), status.clone());
    }
    fields
}

#[async_trait]
impl StorageClient for GcsClient {
    fn provider(&self) -> ProviderType {
        ProviderType::Gcs
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        options: &UploadOptions,
    ) -> StorageResult<UploadResult> {
        if let Some(threshold) = options.multipart_threshold {
            debug!("Ignoring multipart_threshold={} for GCS upload", threshold);
        }

        let store = self.bucket(bucket).await?;
        let result = put_file(store.as_ref(), key, file, None).await?;

        info!("Uploaded bucket={}, key={}", bucket, key);
        Ok(UploadResult {
            checksum: result.e_tag,
        })
    }

    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> StorageResult<bool> {
        let (store, _) = self.object(bucket, key).await?;
        download_to(store.as_ref(), key, local_path).await?;
        Ok(tokio::fs::try_exists(local_path).await?)
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in_secs: u64,
    ) -> StorageResult<String> {
        let expires_in = presign_expiry(expires_in_secs)?;
        self.object(bucket, key).await?;

        match self.hmac_key() {
            Some(hmac_key) => Ok(Self::request_signer(hmac_key).presign_get(
                GCS_HOST,
                &format!("/{}/{}", bucket, key),
                expires_in,
                Utc::now(),
            )),
            None => {
                let store = self.signing_stores.build(bucket)?;
                let url = store
                    .signed_url(Method::GET, &string_to_path(key)?, expires_in)
                    .await?;
                Ok(url.to_string())
            }
        }
    }

    async fn delete_file(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let store = self.bucket(bucket).await?;
        match store.delete(&string_to_path(key)?).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                info!("Deleted bucket={}, key={}", bucket, key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn file_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let store = self.bucket(bucket).await?;
        match store.head(&string_to_path(key)?).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_objects(
        &self,
        bucket: &str,
        options: &ListOptions,
    ) -> StorageResult<Vec<ObjectEntry>> {
        let store = self.bucket(bucket).await?;
        list_entries(
            store.as_ref(),
            options.prefix.as_deref(),
            options.include_content_type,
        )
        .await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://{}/{}/{}", GCS_HOST, bucket, key)
    }

    async fn presigned_post(
        &self,
        bucket: &str,
        key: &str,
        options: &PresignedPostOptions,
    ) -> StorageResult<PresignedPost> {
        let hmac_key = self.hmac_key().ok_or_else(|| {
            StorageError::ConfigError(
                "GCS presigned POST requires an HMAC key (GCS_HMAC_ACCESS_ID, GCS_HMAC_SECRET)"
                    .to_string(),
            )
        })?;
        string_to_path(key)?;
        self.bucket(bucket).await?;

        let now = Utc::now();
        let mut conditions = vec![
            json!(["starts-with", "$key", ""]),
            json!(["starts-with", "$Content-Type", ""]),
        ];
        if let Some(acl) = &options.acl {
            conditions.push(json!({ "acl": acl }));
        }
        if let Some(status) = &options.success_action_status {
            conditions.push(json!({ "success_action_status": status }));
        }

        let policy = PostPolicy {
            expiration: options.expiration_from(now),
            conditions,
            fields: post_fields(key, options),
        };
        let fields = Self::request_signer(hmac_key).post_policy(policy, now);

        Ok(PresignedPost {
            fields,
            url: PostUrl {
                host: GCS_HOST.to_string(),
            },
        })
    }
}
