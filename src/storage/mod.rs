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

//! Cloud storage abstraction layer
//!
//! This module provides one interface, [`StorageClient`], over AWS S3 (and
//! S3-compatible services) and Google Cloud Storage.
//!
//! Transport, authentication and pagination are delegated to the `object_store`
//! crate. The adapters add what the providers disagree on: missing bucket and
//! object detection, public URLs and signed browser upload policies.

pub mod config;
pub mod error;
pub mod factory;
pub mod gcs;
pub mod provider;
pub mod s3;
pub mod signing;
pub mod store;

// Public exports
pub use config::{ClientSettings, GcsConfig, GcsOptions, S3Config, S3Options, Settings};
pub use error::{StorageError, StorageResult};
pub use factory::{ProviderConfig, ProviderType, StorageClientFactory};
pub use gcs::GcsClient;
pub use provider::{
    ListOptions, ObjectEntry, PostUrl, PresignedPost, PresignedPostOptions, StorageClient,
    UploadOptions, UploadResult,
};
pub use s3::S3Client;
pub use store::{BucketStores, MemoryBuckets};
