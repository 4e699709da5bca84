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

//! # Cloud Storage Interface
//!
//! One client interface over AWS S3 and Google Cloud Storage.
//!
//! Application code is written against [`StorageClient`] and the provider is
//! picked once, at startup, from configuration. Switching from S3 to GCS then
//! needs no change at the call sites.
//!
//! ## Features
//!
//! - **Objects**: upload (single or multipart), download, delete, existence checks, listings
//! - **URLs**: presigned GET URLs and unsigned public URLs
//! - **Browser uploads**: signed POST policies for direct form uploads
//! - **Configuration**: explicit options, environment variables or a JSON settings file
//!
//! ## Quick Start
//!
//! ### AWS S3 Example
//!
//! ```rust,no_run
//! use cloud_storage_interface::storage::{S3Client, S3Config, S3Options, StorageClient, UploadOptions};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = S3Config::resolve(
//!     S3Options::new()
//!         .with_access_key_id("ACCESS_KEY")
//!         .with_secret_access_key("SECRET_KEY")
//!         .with_region("us-east-1"),
//!     None,
//! )?;
//! let client = S3Client::new(config)?;
//!
//! let options = UploadOptions::new().with_multipart_threshold(100 * 1024 * 1024);
//! client
//!     .upload_file("my-bucket", "reports/today.csv", Path::new("today.csv"), &options)
//!     .await?;
//! println!("{}", client.presigned_url("my-bucket", "reports/today.csv", 600).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Provider From The Environment
//!
//! ```rust,no_run
//! use cloud_storage_interface::storage::{ListOptions, StorageClientFactory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! // CLOUD_STORAGE_PROVIDER=gcs
//! let client = StorageClientFactory::from_env(None)?;
//! for entry in client
//!     .list_objects("my-bucket", &ListOptions::new().with_prefix("reports/"))
//!     .await?
//! {
//!     println!("{} {}", entry.key, entry.size);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`storage`] - The client interface, its S3 and GCS adapters and their configuration
//! - [`util`] - Utility functions and helpers

pub mod storage;
pub mod util;

// Re-export commonly used types
pub use storage::{StorageClient, StorageClientFactory, StorageError, StorageResult};
