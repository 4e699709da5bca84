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

use crate::storage::StorageResult;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Write `text` to a temporary file, run `f` with its path and remove the file.
///
/// The file is removed whether `f` succeeds or fails. An error from `f` wins
/// over an error removing the file.
///
/// # Examples
///
/// ```rust,no_run
/// use cloud_storage_interface::storage::{StorageClientFactory, UploadOptions};
/// use cloud_storage_interface::util::tempfile::with_tempfile;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let client = StorageClientFactory::from_env(None)?;
/// let result = with_tempfile("hello", |path| {
///     let client = client.clone();
///     async move {
///         client
///             .upload_file("my-bucket", "hello.txt", &path, &UploadOptions::new())
///             .await
///     }
/// })
/// .await?;
/// println!("{:?}", result.checksum);
/// # Ok(())
/// # }
/// ```
pub async fn with_tempfile<F, Fut, T>(text: impl AsRef<[u8]>, f: F) -> StorageResult<T>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let mut file = NamedTempFile::new()?;
    file.write_all(text.as_ref())?;
    file.flush()?;

    let result = f(file.path().to_path_buf()).await;
    let closed = file.close();
    let value = result?;
    closed?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[tokio::test]
    async fn test_file_exists_during_block() {
        let (path, content) = with_tempfile("hello", |path| async move {
            let content = tokio::fs::read_to_string(&path).await?;
            Ok::<_, StorageError>((path, content))
        })
        .await
        .unwrap();

        assert_eq!(content, "hello");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_file_removed_on_error() {
        let mut seen = None;
        let result: StorageResult<()> = with_tempfile(b"data", |path| {
            seen = Some(path.clone());
            async move {
                assert!(path.exists());
                Err(StorageError::ConfigError("boom".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(StorageError::ConfigError(_))));
        assert!(!seen.unwrap().exists());
    }

    #[tokio::test]
    async fn test_block_error_wins_over_cleanup_error() {
        // The block removes the file itself, so closing it fails too
        let result: StorageResult<()> = with_tempfile("data", |path| async move {
            std::fs::remove_file(&path)?;
            Err(StorageError::ConfigError("boom".to_string()))
        })
        .await;

        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_cleanup_error_after_success() {
        let result = with_tempfile("data", |path| async move {
            std::fs::remove_file(&path)?;
            Ok::<_, StorageError>(())
        })
        .await;

        assert!(matches!(result, Err(StorageError::IoError(_))));
    }
}
