// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use object_store::path::Path as ObjectPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::time::Duration;

use super::error::{StorageError, StorageResult};
use super::factory::ProviderType;

/// Longest validity window accepted by `presigned_url` (7 days, the S3 limit).
pub const MAX_PRESIGNED_EXPIRY_SECS: u64 = 604_800;

/// Default lifetime of a presigned POST policy.
pub const DEFAULT_POST_EXPIRATION: Duration = Duration::from_secs(3600);

/// Result of an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Entity tag or content hash reported by the provider, if any
    pub checksum: Option<String>,
}

/// One entry of an object listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object key
    pub key: String,

    /// Object size in bytes
    pub size: u64,

    /// Last modified timestamp (if available)
    pub last_modified: Option<DateTime<Utc>>,

    /// Content type, only populated when requested through [`ListOptions`]
    pub content_type: Option<String>,
}

/// Host of the form action URL of a presigned POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostUrl {
    pub host: String,
}

/// Everything a browser needs to upload directly with a multipart form POST.
///
/// `fields` must be sent back verbatim as form fields, before the file field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedPost {
    pub fields: BTreeMap<String, String>,
    pub url: PostUrl,
}

/// Options for [`StorageClient::upload_file`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Files of at least this many bytes are uploaded in parts.
    ///
    /// Adapters that cannot upload in parts ignore it.
    pub multipart_threshold: Option<u64>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multipart_threshold(mut self, bytes: u64) -> Self {
        self.multipart_threshold = Some(bytes);
        self
    }
}

/// Options for [`StorageClient::list_objects`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only keys starting with this string are returned.
    pub prefix: Option<String>,

    /// Fetch the content type of every listed object.
    ///
    /// This costs one extra provider request per object.
    pub include_content_type: bool,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_content_type(mut self) -> Self {
        self.include_content_type = true;
        self
    }
}

/// Options for [`StorageClient::presigned_post`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresignedPostOptions {
    /// Canned ACL the upload must carry, echoed into the form fields
    pub acl: Option<String>,

    /// HTTP status returned on success, echoed into the form fields
    pub success_action_status: Option<String>,

    /// Policy expiration, defaults to one hour from now
    pub expiration: Option<DateTime<Utc>>,
}

impl PresignedPostOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    pub fn with_success_action_status(mut self, status: impl Into<String>) -> Self {
        self.success_action_status = Some(status.into());
        self
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// The policy expiration, relative to `now` when none was given.
    pub fn expiration_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.expiration.unwrap_or_else(|| {
            now + chrono::Duration::seconds(DEFAULT_POST_EXPIRATION.as_secs() as i64)
        })
    }
}

/// Capability contract shared by every cloud storage adapter.
///
/// Callers program against `dyn StorageClient` only, so the backing provider
/// (S3-compatible or GCS-compatible) can be swapped without changing call sites.
/// Every operation is one independent request sequence; adapters keep no
/// per-request state and add no retries of their own.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// The provider this client talks to.
    fn provider(&self) -> ProviderType;

    /// Upload a local file, replacing any object already stored under `key`.
    ///
    /// # Arguments
    ///
    /// * `bucket` - Target bucket
    /// * `key` - Target object key
    /// * `file` - Local file to upload
    /// * `options` - Upload options, see [`UploadOptions`]
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(UploadResult)` - The checksum reported by the provider
    /// * `Err(StorageError)` - If the upload fails
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The local file cannot be read
    /// * The bucket does not exist (`BucketNotFound`)
    /// * The provider rejects the request
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        options: &UploadOptions,
    ) -> StorageResult<UploadResult>;

    /// Download an object into `local_path`.
    ///
    /// Returns whether the local file exists once the download completed.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The object does not exist (`ObjectNotFound`)
    /// * The bucket does not exist (`BucketNotFound`)
    /// * The local file cannot be written
    async fn download_file(&self, bucket: &str, key: &str, local_path: &Path)
        -> StorageResult<bool>;

    /// Build a time-limited signed GET URL.
    ///
    /// `expires_in_secs` must be between 1 and [`MAX_PRESIGNED_EXPIRY_SECS`];
    /// other values are rejected with `ConfigError` and never clamped.
    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in_secs: u64,
    ) -> StorageResult<String>;

    /// Delete an object.
    ///
    /// Deleting an object that does not exist succeeds. A missing bucket is
    /// reported as `BucketNotFound`.
    async fn delete_file(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The object exists
    /// * `Ok(false)` - The bucket exists but the object does not
    /// * `Err(StorageError::BucketNotFound)` - The bucket does not exist
    async fn file_exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// List the objects of a bucket in provider order.
    ///
    /// The listing follows the provider's pagination until exhausted. With
    /// `include_content_type` every entry costs one additional request.
    async fn list_objects(&self, bucket: &str, options: &ListOptions)
        -> StorageResult<Vec<ObjectEntry>>;

    /// Unsigned URL of an object.
    ///
    /// Pure string construction: the URL only works if the object is publicly
    /// readable, which is not checked.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Build a signed policy allowing a browser to POST a file directly to the bucket.
    async fn presigned_post(
        &self,
        bucket: &str,
        key: &str,
        options: &PresignedPostOptions,
    ) -> StorageResult<PresignedPost>;
}

impl Debug for dyn StorageClient + '_ {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "StorageClient(provider={})", self.provider())
    }
}

/// Helper function to create an ObjectPath from a key
///
/// The key is used verbatim. Keys the store would rewrite (empty segments,
/// leading or trailing `/`, `.` or `..` segments) are rejected.
pub(crate) fn string_to_path(s: &str) -> StorageResult<ObjectPath> {
    if s.is_empty() {
        return Err(StorageError::ConfigError("Object key is empty".to_string()));
    }
    let path = ObjectPath::parse(s)
        .map_err(|e| StorageError::ConfigError(format!("Invalid object key {:?}: {}", s, e)))?;
    if path.as_ref() != s {
        return Err(StorageError::ConfigError(format!(
            "Invalid object key {:?}: stored as {:?}",
            s,
            path.as_ref()
        )));
    }
    Ok(path)
}

/// Validate a presigned URL lifetime.
pub(crate) fn presign_expiry(expires_in_secs: u64) -> StorageResult<Duration> {
    if expires_in_secs == 0 || expires_in_secs > MAX_PRESIGNED_EXPIRY_SECS {
        return Err(StorageError::ConfigError(format!(
            "expires_in must be between 1 and {} seconds, got {}",
            MAX_PRESIGNED_EXPIRY_SECS, expires_in_secs
        )));
    }
    Ok(Duration::from_secs(expires_in_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_upload_options_builder() {
        let options = UploadOptions::new().with_multipart_threshold(100 * 1024 * 1024);
        assert_eq!(options.multipart_threshold, Some(104_857_600));
        assert_eq!(UploadOptions::default().multipart_threshold, None);
    }

    #[test]
    fn test_list_options_builder() {
        let options = ListOptions::new().with_prefix("pre");
        assert_eq!(options.prefix.as_deref(), Some("pre"));
        assert!(!options.include_content_type);

        let options = options.with_content_type();
        assert!(options.include_content_type);
    }

    #[test]
    fn test_post_expiration_default() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let options = PresignedPostOptions::new();
        assert_eq!(
            options.expiration_from(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_post_expiration_explicit() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let expiration = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let options = PresignedPostOptions::new()
            .with_acl("public-read")
            .with_success_action_status("201")
            .with_expiration(expiration);

        assert_eq!(options.expiration_from(now), expiration);
        assert_eq!(options.acl.as_deref(), Some("public-read"));
        assert_eq!(options.success_action_status.as_deref(), Some("201"));
    }

    #[test]
    fn test_presign_expiry_bounds() {
        assert_eq!(presign_expiry(600).unwrap(), Duration::from_secs(600));
        assert_eq!(
            presign_expiry(MAX_PRESIGNED_EXPIRY_SECS).unwrap(),
            Duration::from_secs(604_800)
        );
        assert!(matches!(presign_expiry(0), Err(StorageError::ConfigError(_))));
        assert!(matches!(
            presign_expiry(MAX_PRESIGNED_EXPIRY_SECS + 1),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_string_to_path() {
        let object_path = string_to_path("path/to/file.txt").unwrap();
        assert_eq!(object_path.as_ref(), "path/to/file.txt");
    }

    #[test]
    fn test_string_to_path_keeps_key_verbatim() {
        for key in ["report {1}.csv", "100%.txt", "uploads/${filename}", "dir/my file.txt"] {
            assert_eq!(string_to_path(key).unwrap().as_ref(), key);
        }
    }

    #[test]
    fn test_string_to_path_rejects_rewritten_keys() {
        for key in ["a//b", "/lead", "trail/", "a/../b", ""] {
            assert!(
                matches!(string_to_path(key), Err(StorageError::ConfigError(_))),
                "{:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_object_entry_serialization() {
        let entry = ObjectEntry {
            key: "a".to_string(),
            size: 3,
            last_modified: None,
            content_type: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"key\":\"a\""));
        assert!(json.contains("\"content_type\":null"));
    }

    #[test]
    fn test_storage_client_debug() {
        struct MockClient;

        #[async_trait]
        impl StorageClient for MockClient {
            fn provider(&self) -> ProviderType {
                ProviderType::Aws
            }

            async fn upload_file(
                &self,
                _bucket: &str,
                _key: &str,
                _file: &Path,
                _options: &UploadOptions,
            ) -> StorageResult<UploadResult> {
                Ok(UploadResult { checksum: None })
            }

            async fn download_file(
                &self,
                _bucket: &str,
                _key: &str,
                _local_path: &Path,
            ) -> StorageResult<bool> {
                Ok(true)
            }

            async fn presigned_url(
                &self,
                _bucket: &str,
                _key: &str,
                _expires_in_secs: u64,
            ) -> StorageResult<String> {
                Ok(String::new())
            }

            async fn delete_file(&self, _bucket: &str, _key: &str) -> StorageResult<()> {
                Ok(())
            }

            async fn file_exists(&self, _bucket: &str, _key: &str) -> StorageResult<bool> {
                Ok(false)
            }

            async fn list_objects(
                &self,
                _bucket: &str,
                _options: &ListOptions,
            ) -> StorageResult<Vec<ObjectEntry>> {
                Ok(vec![])
            }

            fn public_url(&self, bucket: &str, key: &str) -> String {
                format!("{}/{}", bucket, key)
            }

            async fn presigned_post(
                &self,
                _bucket: &str,
                _key: &str,
                _options: &PresignedPostOptions,
            ) -> StorageResult<PresignedPost> {
                Ok(PresignedPost {
                    fields: BTreeMap::new(),
                    url: PostUrl {
                        host: String::new(),
                    },
                })
            }
        }

        let client: &dyn StorageClient = &MockClient;
        let debug_str = format!("{:?}", client);
        assert_eq!(debug_str, "StorageClient(provider=aws)");
    }
}
