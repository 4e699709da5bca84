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
use object_store::ObjectStore;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use url::Url;

use super::config::{S3Config, DEFAULT_AWS_REGION};
use super::error::{StorageError, StorageResult};
use super::factory::ProviderType;
use super::provider::{
    presign_expiry, string_to_path, ListOptions, ObjectEntry, PostUrl, PresignedPost,
    PresignedPostOptions, StorageClient, UploadOptions, UploadResult,
};
use super::signing::{PostPolicy, RequestSigner, SigningScheme};
use super::store::{
    download_to, is_missing_bucket, is_not_found, list_entries, ensure_bucket, put_file,
    resolve_not_found, BucketStores, S3Buckets,
};

/// Placeholder the browser replaces with the uploaded file name.
const FILENAME_PLACEHOLDER: &str = "${filename}";

/// Storage client for AWS S3 and S3-compatible services.
#[derive(Debug, Clone)]
pub struct S3Client {
    config: S3Config,
    signing_stores: S3Buckets,
    buckets: Arc<dyn BucketStores>,
}

impl S3Client {
    /// Create a client talking to S3 with the resolved `config`.
    ///
    /// No request is made; stores are built on first use of a bucket.
    ///
    /// # Errors
    ///
    /// Returns `UrlParseError` if the configured endpoint is not a valid URL.
    pub fn new(config: S3Config) -> StorageResult<Self> {
        let buckets = S3Buckets::new(config.clone());
        Self::with_buckets(config, buckets)
    }

    /// Create a client serving objects from `buckets`.
    ///
    /// URLs and policies are still signed with `config`.
    pub fn with_buckets(
        config: S3Config,
        buckets: impl BucketStores + 'static,
    ) -> StorageResult<Self> {
        if let Some(endpoint) = &config.endpoint {
            Url::parse(endpoint)?;
        }
        Ok(Self {
            signing_stores: S3Buckets::new(config.clone()),
            config,
            buckets: Arc::new(buckets),
        })
    }

    fn store(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        self.buckets.store(bucket)
    }

    fn request_signer(&self) -> RequestSigner {
        RequestSigner::new(
            SigningScheme::Aws {
                region: self.config.region.clone(),
            },
            &self.config.credentials.access_key_id,
            &self.config.credentials.secret_access_key,
        )
        .with_session_token(self.config.credentials.session_token.clone())
    }

    /// Host of the POST form action.
    fn post_host(&self, bucket: &str) -> StorageResult<String> {
        match &self.config.endpoint {
            Some(endpoint) => {
                let url = Url::parse(endpoint)?;
                url.host_str().map(str::to_string).ok_or_else(|| {
                    StorageError::ConfigError(format!("Endpoint has no host: {}", endpoint))
                })
            }
            None if self.config.region == DEFAULT_AWS_REGION => {
                Ok(format!("{}.s3.amazonaws.com", bucket))
            }
            None => Ok(format!("{}.s3.{}.amazonaws.com", bucket, self.config.region)),
        }
    }
}

/// Map errors from bucket-level requests, where `NotFound` means the bucket.
fn bucket_error(bucket: &str, error: StorageError) -> StorageError {
    match error {
        StorageError::ProviderError(e) if is_missing_bucket(&e) => {
            StorageError::bucket_not_found(bucket)
        }
        e => e,
    }
}

/// Condition on the key of a POST upload.
///
/// A key containing the file name placeholder only pins the part before it.
fn key_condition(key: &str) -> serde_json::Value {
    match key.find(FILENAME_PLACEHOLDER) {
        Some(idx) => json!(["starts-with", "$key", &key[..idx]]),
        None => json!({ "key": key }),
    }
}

#[async_trait]
impl StorageClient for S3Client {
    fn provider(&self) -> ProviderType {
        ProviderType::Aws
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        options: &UploadOptions,
    ) -> StorageResult<UploadResult> {
        let store = self.store(bucket)?;
        let result = put_file(store.as_ref(), key, file, options.multipart_threshold)
            .await
            .map_err(|e| bucket_error(bucket, e))?;

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
        let store = self.store(bucket)?;
        if let Err(e) = download_to(store.as_ref(), key, local_path).await {
            if is_not_found(&e) {
                return Err(resolve_not_found(store.as_ref(), bucket, key).await);
            }
            return Err(e);
        }
        Ok(tokio::fs::try_exists(local_path).await?)
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in_secs: u64,
    ) -> StorageResult<String> {
        let expires_in = presign_expiry(expires_in_secs)?;
        let store = self.signing_stores.build(bucket)?;
        let url = store
            .signed_url(Method::GET, &string_to_path(key)?, expires_in)
            .await?;
        Ok(url.to_string())
    }

    async fn delete_file(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let store = self.store(bucket)?;
        store
            .delete(&string_to_path(key)?)
            .await
            .map_err(|e| bucket_error(bucket, e.into()))?;

        info!("Deleted bucket={}, key={}", bucket, key);
        Ok(())
    }

    async fn file_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let store = self.store(bucket)?;
        match store.head(&string_to_path(key)?).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => {
                ensure_bucket(store.as_ref(), bucket).await?;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_objects(
        &self,
        bucket: &str,
        options: &ListOptions,
    ) -> StorageResult<Vec<ObjectEntry>> {
        let store = self.store(bucket)?;
        list_entries(
            store.as_ref(),
            options.prefix.as_deref(),
            options.include_content_type,
        )
        .await
        .map_err(|e| bucket_error(bucket, e))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
            None => format!("https://{}.s3.amazonaws.com/{}", bucket, key),
        }
    }

    async fn presigned_post(
        &self,
        bucket: &str,
        key: &str,
        options: &PresignedPostOptions,
    ) -> StorageResult<PresignedPost> {
        string_to_path(key)?;
        let now = Utc::now();
        let host = self.post_host(bucket)?;

        let mut conditions = vec![
            json!({ "bucket": bucket }),
            key_condition(key),
            json!(["starts-with", "$Content-Type", ""]),
        ];
        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), key.to_string());

        if let Some(acl) = &options.acl {
            conditions.push(json!({ "acl": acl }));
            fields.insert("acl".to_string(), acl.clone());
        }
        if let Some(status) = &options.success_action_status {
            conditions.push(json!({ "success_action_status": status }));
            fields.insert("success_action_status".to_string(), status.clone());
        }

        let policy = PostPolicy {
            expiration: options.expiration_from(now),
            conditions,
            fields,
        };

        Ok(PresignedPost {
            fields: self.request_signer().post_policy(policy, now),
            url: PostUrl { host },
        })
    }
}
