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

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Missing credentials, an invalid settings file or an unusable argument.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Bucket \"{bucket}\" not found")]
    BucketNotFound { bucket: String },

    #[error("Object \"{key}\" not found in bucket \"{bucket}\"")]
    ObjectNotFound { bucket: String, key: String },

    /// Transport, authentication and permission failures reported by the provider.
    #[error("Provider error: {0}")]
    ProviderError(#[from] object_store::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl StorageError {
    pub(crate) fn bucket_not_found(bucket: &str) -> Self {
        StorageError::BucketNotFound {
            bucket: bucket.to_string(),
        }
    }

    pub(crate) fn object_not_found(bucket: &str, key: &str) -> Self {
        StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
